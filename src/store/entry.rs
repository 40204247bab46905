use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use regex::Regex;

use crate::error::RegistrationError;
use crate::handler::Handler;
use crate::request::Params;

/// Terminal payload at a tree node: the registrant's verbatim pattern,
/// its compiled regex, and the method-to-handler table. `method == None`
/// is the fallback slot consulted when no method-specific handler exists.
pub(crate) struct Entry {
    pub(crate) pattern: String,
    pub(crate) regex: Regex,
    by_method: HashMap<Method, Arc<dyn Handler>>,
    all: Option<Arc<dyn Handler>>,
}

impl Entry {
    pub(crate) fn new(pattern: String, regex: Regex) -> Self {
        Self {
            pattern,
            regex,
            by_method: HashMap::new(),
            all: None,
        }
    }

    /// Attach a handler for the given method token, or for the fallback
    /// slot when `method` is `None`. Each token can only be taken once.
    pub(crate) fn insert(
        &mut self,
        method: Option<Method>,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RegistrationError> {
        let duplicate = |label: &str| RegistrationError::DuplicateEndpoint {
            pattern: self.pattern.clone(),
            method: label.to_string(),
        };
        match method {
            None => {
                if self.all.is_some() {
                    return Err(duplicate("ALL"));
                }
                self.all = Some(handler);
            }
            Some(m) => {
                if self.by_method.contains_key(&m) {
                    return Err(duplicate(m.as_str()));
                }
                self.by_method.insert(m, handler);
            }
        }
        Ok(())
    }

    /// Method-specific handler first, fallback slot second.
    pub(crate) fn select(&self, method: &Method) -> Option<Arc<dyn Handler>> {
        self.by_method
            .get(method)
            .cloned()
            .or_else(|| self.all.clone())
    }

    /// Run the compiled regex and collect named captures in declaration
    /// order. Empty (but present) for patterns without parameters.
    pub(crate) fn capture(&self, candidate: &str) -> Params {
        let mut params = Params::new();
        if let Some(caps) = self.regex.captures(candidate) {
            for name in self.regex.capture_names().flatten() {
                if let Some(m) = caps.name(name) {
                    params.insert(name.to_string(), m.as_str().to_string());
                }
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NotFoundHandler;

    fn entry(pattern: &str) -> Entry {
        let parts = crate::store::pattern::parse_pattern(pattern).unwrap();
        Entry::new(parts.pattern, parts.regex)
    }

    fn handler() -> Arc<dyn Handler> {
        Arc::new(NotFoundHandler)
    }

    #[test]
    fn duplicate_method_is_rejected() {
        let mut e = entry("/path");
        e.insert(Some(Method::GET), handler()).unwrap();
        assert!(e.insert(Some(Method::GET), handler()).is_err());
        assert!(e.insert(Some(Method::POST), handler()).is_ok());
    }

    #[test]
    fn duplicate_fallback_is_rejected() {
        let mut e = entry("/path");
        e.insert(None, handler()).unwrap();
        assert!(e.insert(None, handler()).is_err());
        // A method token after the fallback is a distinct endpoint.
        assert!(e.insert(Some(Method::GET), handler()).is_ok());
    }

    #[test]
    fn select_falls_back_to_all() {
        let mut e = entry("/path");
        e.insert(None, handler()).unwrap();
        assert!(e.select(&Method::DELETE).is_some());

        let mut only_get = entry("/path");
        only_get.insert(Some(Method::GET), handler()).unwrap();
        assert!(only_get.select(&Method::GET).is_some());
        assert!(only_get.select(&Method::POST).is_none());
    }

    #[test]
    fn capture_extracts_named_groups_in_order() {
        let e = entry("/users/{uid}/posts/{pid}");
        let params = e.capture("/users/7/posts/41");
        assert_eq!(params.get("uid").map(String::as_str), Some("7"));
        assert_eq!(params.get("pid").map(String::as_str), Some("41"));
        assert_eq!(params.len(), 2);

        let plain = entry("/users");
        assert!(plain.capture("/users").is_empty());
    }
}
