use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Parameters captured from the matched pattern, keyed by the names the
/// registrant used.
pub type Params = HashMap<String, String>;

/// Cooperative cancellation signal for one request. The transport (or a
/// test) flips it; the middleware pipeline checks it before every
/// continuation step and stops silently once set.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Failures of the typed body readers.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The request carries no body at all.
    #[error("request has no body")]
    NilBody,

    /// The body is not a decimal integer numeral.
    #[error("body is not an integer numeral")]
    UnsupportedInt(#[source] std::num::ParseIntError),

    /// The body is not a decimal floating-point numeral.
    #[error("body is not a decimal numeral")]
    UnsupportedFloat(#[source] std::num::ParseFloatError),

    /// A text target was requested but the body is not valid UTF-8.
    #[error("body is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The body could not be decoded into the record target.
    #[error("malformed body")]
    Malformed(#[from] serde_json::Error),
}

/// The request view handed to middlewares and handlers: the parsed
/// transport request plus the parameters captured by the matcher.
///
/// All fields are owned; the view outlives any transport buffer.
pub struct Request {
    pub method: Method,
    /// Host the client addressed, possibly with a `:port` suffix.
    pub host: String,
    /// Raw request path before cleaning.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: String,
    /// Header map with lowercased names.
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    params: Params,
    cancel: CancelToken,
}

impl Request {
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            host: host.into(),
            path: path.into(),
            query: String::new(),
            headers: HashMap::new(),
            body: None,
            params: Params::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Build a request from an absolute URI, mirroring how tests and
    /// clients spell addresses.
    pub fn from_uri(method: Method, uri: &str) -> Self {
        match url::Url::parse(uri) {
            Ok(parsed) => {
                let mut req = Request::new(
                    method,
                    parsed.host_str().unwrap_or_default(),
                    parsed.path(),
                );
                req.query = parsed.query().unwrap_or_default().to_string();
                req
            }
            Err(_) => Request::new(method, "", uri),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decoded query-string pairs.
    pub fn query_params(&self) -> HashMap<String, String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Captured pattern parameters. Never null: an empty map is returned
    /// when the matched pattern had none.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn body_bytes(&self) -> Result<&[u8], BodyError> {
        self.body.as_deref().ok_or(BodyError::NilBody)
    }

    /// Body as text.
    pub fn parse_body_into_string(&self) -> Result<String, BodyError> {
        Ok(std::str::from_utf8(self.body_bytes()?)?.to_string())
    }

    /// Body parsed as a decimal integer numeral.
    pub fn parse_body_into_int(&self) -> Result<i64, BodyError> {
        let text = std::str::from_utf8(self.body_bytes()?)?;
        text.trim().parse().map_err(BodyError::UnsupportedInt)
    }

    /// Body parsed as a decimal floating-point numeral.
    pub fn parse_body_into_float(&self) -> Result<f64, BodyError> {
        let text = std::str::from_utf8(self.body_bytes()?)?;
        text.trim().parse().map_err(BodyError::UnsupportedFloat)
    }

    /// Body decoded as JSON into a record target.
    pub fn parse_body_into<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        Ok(serde_json::from_slice(self.body_bytes()?)?)
    }
}
