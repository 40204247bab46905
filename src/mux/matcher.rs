use std::sync::Arc;

use http::Method;
use once_cell::sync::Lazy;
use tracing::debug;

use super::core::MuxInner;
use crate::handler::{Handler, NotFoundHandler, RedirectHandler};
use crate::middleware::Middleware;
use crate::request::{Params, Request};
use crate::store::entry::Entry;
use crate::store::node;
use crate::store::pattern;

static NOT_FOUND: Lazy<Arc<dyn Handler>> = Lazy::new(|| Arc::new(NotFoundHandler));

/// Outcome of resolving a request against the pattern store.
///
/// For a direct hit, `pattern` echoes the registrant's string and
/// `params` is present (possibly empty). For a redirect, `handler` is the
/// library redirect handler, `pattern` names the target entry, and
/// `params` is absent. For not-found, `pattern` is empty and `params`
/// absent.
pub struct Resolution {
    pub handler: Arc<dyn Handler>,
    pub pattern: String,
    pub params: Option<Params>,
}

impl super::core::Mux {
    /// Resolve a request to `(handler, pattern, params)` without
    /// dispatching it.
    pub fn resolve(&self, req: &Request) -> Resolution {
        let inner = self.inner.read().unwrap();
        resolve_inner(&inner, req)
    }
}

pub(crate) fn resolve_inner(inner: &MuxInner, req: &Request) -> Resolution {
    // CONNECT addresses a host, not a resource: no path rewriting.
    let (host, path) = if req.method == Method::CONNECT {
        (req.host.clone(), req.path.clone())
    } else {
        (strip_port(&req.host).to_string(), clean_path(&req.path))
    };
    debug!(method = %req.method, host = %host, path = %path, "resolving");

    if let Some((pattern, handler, params)) = find_direct(inner, &host, &path, &req.method) {
        // Path cleaning rewrote the request: point the client at the
        // canonical form instead of serving it, except at the root.
        if path != req.path && path != "/" {
            return redirect(with_query(&path, req), pattern);
        }
        return Resolution {
            handler,
            pattern,
            params: Some(params),
        };
    }

    if path != "/" {
        if let Some(stripped) = path.strip_suffix('/') {
            if let Some(pattern) = probe(inner, &host, stripped, &req.method, false) {
                return redirect(with_query(stripped, req), pattern);
            }
        } else {
            let extended = format!("{path}/");
            if let Some(pattern) = probe(inner, &host, &extended, &req.method, true) {
                return redirect(with_query(&extended, req), pattern);
            }
        }
    }

    Resolution {
        handler: NOT_FOUND.clone(),
        pattern: String::new(),
        params: None,
    }
}

/// Global middlewares followed by the per-node lists visited along the
/// matched pattern. The root pattern and the not-found case only see the
/// global list.
pub(crate) fn middleware_chain(inner: &MuxInner, matched: &str) -> Vec<Arc<dyn Middleware>> {
    let mut chain = inner.middlewares.clone();
    if matched.is_empty() || matched == "/" {
        return chain;
    }
    let name = pattern::normalize_name(matched);
    chain.extend(node::middlewares_along(&inner.roots, &name));
    chain
}

/// Candidate strings to run entries against: the host-qualified form
/// first (when any registration used one), then the bare path.
fn forms(inner: &MuxInner, host: &str, path: &str) -> Vec<String> {
    let mut forms = Vec::with_capacity(2);
    if inner.host_qualified && !host.is_empty() {
        forms.push(format!("{host}{path}"));
    }
    forms.push(path.to_string());
    forms
}

fn find_direct(
    inner: &MuxInner,
    host: &str,
    path: &str,
    method: &Method,
) -> Option<(String, Arc<dyn Handler>, Params)> {
    for candidate in forms(inner, host, path) {
        if let Some(entry) = lookup_entry(inner, &candidate) {
            // An entry that cannot serve this method is no hit at all.
            if let Some(handler) = entry.select(method) {
                let params = entry.capture(&candidate);
                return Some((entry.pattern.clone(), handler, params));
            }
        }
    }
    None
}

/// The entry terminating exactly at `candidate`, if its regex agrees.
/// The non-slash slot is consulted before the slash slot.
fn lookup_entry<'a>(inner: &'a MuxInner, candidate: &str) -> Option<&'a Entry> {
    let name = candidate.trim_matches('/');
    if name.is_empty() {
        return inner
            .root_entry
            .as_ref()
            .filter(|entry| entry.regex.is_match(candidate));
    }
    let (found, remainder) = node::closer(&inner.roots, name);
    let found = found?;
    if !remainder.is_empty() {
        return None;
    }
    [found.entry_noslash.as_ref(), found.entry_slash.as_ref()]
        .into_iter()
        .flatten()
        .find(|entry| entry.regex.is_match(candidate))
}

/// Probe the slash-variant of an unmatched path. A redirect is only
/// worth issuing when the target entry can actually serve the request's
/// method; otherwise the client would be bounced into a 404.
fn probe(
    inner: &MuxInner,
    host: &str,
    target: &str,
    method: &Method,
    want_slash: bool,
) -> Option<String> {
    for candidate in forms(inner, host, target) {
        let name = candidate.trim_matches('/');
        if name.is_empty() {
            continue;
        }
        let (found, remainder) = node::closer(&inner.roots, name);
        let Some(found) = found else { continue };
        if !remainder.is_empty() {
            continue;
        }
        let slot = if want_slash {
            found.entry_slash.as_ref()
        } else {
            found.entry_noslash.as_ref()
        };
        if let Some(entry) = slot {
            if entry.regex.is_match(&candidate) && entry.select(method).is_some() {
                return Some(entry.pattern.clone());
            }
        }
    }
    None
}

fn redirect(location: String, pattern: String) -> Resolution {
    debug!(location = %location, pattern = %pattern, "redirect issued");
    Resolution {
        handler: Arc::new(RedirectHandler::new(location)),
        pattern,
        params: None,
    }
}

fn with_query(path: &str, req: &Request) -> String {
    if req.query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", req.query)
    }
}

/// Host header value without the `:port` suffix.
fn strip_port(host: &str) -> &str {
    host.split(':').next().unwrap_or("")
}

/// Normalize a request path the way the standard mux does: ensure a
/// leading slash, resolve `.` and `..` segments, and preserve a trailing
/// slash unless the result is the root itself.
fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let trailing = path.ends_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            segment => stack.push(segment),
        }
    }
    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &stack {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() {
        cleaned.push('/');
    } else if trailing {
        cleaned.push('/');
    }
    cleaned
}
