use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RegistrationError;

/// Grammar for registration patterns: an optional dotted host, then
/// `/`-separated segments that are either literal words (dots allowed for
/// file-like names) or `{name}` parameters, with an optional trailing `/`.
static PATTERN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\w+(?:\.\w+)+)?(?:/(?:\w+(?:\.\w+)*|\{\w+\}))*/?$")
        .expect("pattern grammar regex")
});

/// Grammar for namespace names: no leading slash and the first segment
/// must be a literal. Later segments may be parameters, including the
/// bare `{}` sentinel used by the normalized form.
static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+(?:\.\w+)*(?:/(?:\w+(?:\.\w+)*|\{\w*\}))*$")
        .expect("namespace grammar regex")
});

/// A registration pattern decomposed for the store.
#[derive(Debug, Clone)]
pub(crate) struct PatternParts {
    /// The pattern exactly as the registrant supplied it.
    pub pattern: String,
    /// Leading dotted host token, when present.
    pub host: Option<String>,
    /// Tree key: parameters replaced by `{}`, extremal slashes trimmed.
    /// Empty for the root pattern `/`.
    pub name: String,
    /// Whether the pattern ends in `/` (selects the entry slot).
    pub trailing_slash: bool,
    /// Original parameter names, in order of appearance.
    pub param_names: Vec<String>,
    /// Anchored regex equivalent to the pattern.
    pub regex: Regex,
}

/// Validate and decompose a registration pattern.
pub(crate) fn parse_pattern(pattern: &str) -> Result<PatternParts, RegistrationError> {
    if pattern.is_empty() || !PATTERN_RE.is_match(pattern) {
        return Err(RegistrationError::InvalidPattern(pattern.to_string()));
    }

    // Anything before the first slash is a host token; the grammar only
    // admits dotted words there.
    let (host, path) = match pattern.find('/') {
        Some(0) => (None, pattern),
        Some(i) => (Some(pattern[..i].to_string()), &pattern[i..]),
        None => (Some(pattern.to_string()), ""),
    };

    let (name, param_names) = normalize(host.as_deref(), path);
    let regex = compile_regex(pattern, &param_names)
        .map_err(|_| RegistrationError::InvalidPattern(pattern.to_string()))?;

    Ok(PatternParts {
        pattern: pattern.to_string(),
        host,
        name,
        trailing_slash: pattern.ends_with('/'),
        param_names,
        regex,
    })
}

/// Validate a namespace name and return its normalized form plus the
/// original parameter names.
pub(crate) fn parse_namespace(name: &str) -> Result<(String, Vec<String>), RegistrationError> {
    if name.is_empty() || !NAMESPACE_RE.is_match(name) {
        return Err(RegistrationError::InvalidNamespace(name.to_string()));
    }
    let (normalized, params) = normalize(None, name);
    Ok((normalized, params))
}

/// Normalized tree name for an already-registered pattern. Registration
/// validated it, so this never fails.
pub(crate) fn normalize_name(pattern: &str) -> String {
    let (host, path) = match pattern.find('/') {
        Some(0) => (None, pattern),
        Some(i) => (Some(pattern[..i].to_string()), &pattern[i..]),
        None => (Some(pattern.to_string()), ""),
    };
    normalize(host.as_deref(), path).0
}

fn normalize(host: Option<&str>, path: &str) -> (String, Vec<String>) {
    let mut params = Vec::new();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(inner) = segment.strip_prefix('{') {
            params.push(inner.trim_end_matches('}').to_string());
            segments.push("{}");
        } else {
            segments.push(segment);
        }
    }

    let mut name = String::new();
    if let Some(h) = host {
        name.push_str(h);
    }
    if !segments.is_empty() {
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(&segments.join("/"));
    }
    (name, params)
}

/// Compile the anchored match regex for a pattern: `/` becomes `\/`,
/// `.` becomes `\.`, and each `{name}` becomes a `[^/]+` capture group.
/// The root pattern compiles to `^\/?$` so it serves both the `""` and
/// `"/"` forms left over after path cleaning.
fn compile_regex(pattern: &str, param_names: &[String]) -> Result<Regex, regex::Error> {
    if pattern == "/" {
        return Regex::new(r"^\/?$");
    }

    let mut source = String::with_capacity(pattern.len() + 8 * param_names.len());
    source.push('^');
    let mut names = param_names.iter();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                // Consume up to the closing brace; the name itself comes
                // from the accumulated list so capture-group names stay in
                // declaration order.
                for d in chars.by_ref() {
                    if d == '}' {
                        break;
                    }
                }
                let name = names.next().map(String::as_str).unwrap_or_default();
                source.push_str("(?P<");
                source.push_str(name);
                source.push_str(">[^\\/]+)");
            }
            '/' => source.push_str("\\/"),
            '.' => source.push_str("\\."),
            _ => source.push(c),
        }
    }
    source.push('$');
    Regex::new(&source)
}
