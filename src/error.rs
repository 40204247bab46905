use thiserror::Error;

/// Faults raised while populating the multiplexer.
///
/// All of these indicate programmer error at registration time, so the
/// registration surface panics with the `Display` form instead of
/// returning them. Runtime match failures are never errors; they are
/// encoded in the resolution result.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The pattern is empty, contains `//`, holds a `{}` with no name, or
    /// otherwise fails the pattern grammar.
    #[error("invalid pattern {0:?}")]
    InvalidPattern(String),

    /// The namespace name starts with `/`, opens with a parameter
    /// segment, or fails the namespace grammar.
    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),

    /// A namespace-scoped middleware registration was called with an
    /// empty middleware set.
    #[error("no middleware or handler given for {0:?}")]
    MissingHandler(String),

    /// The `(pattern, method)` pair is already registered on this entry.
    #[error("duplicate endpoint {pattern:?} for {method}")]
    DuplicateEndpoint { pattern: String, method: String },
}

/// Abort the registering thread. Recovery is not supported; a bad
/// registration means the route table itself is wrong.
pub(crate) fn fail(err: RegistrationError) -> ! {
    panic!("nsmux: {err}");
}
