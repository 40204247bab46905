use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::Arc;

use may_minihttp::{HttpService, Request as RawRequest, Response as RawResponse};

use crate::mux::Mux;
use crate::request::Request;
use crate::response::{status_reason, ResponseBuffer};

/// `may_minihttp` service that parses the transport request into the
/// owned [`Request`] view and delegates to [`Mux::dispatch`].
///
/// Each connection drives its own clone of the service; `header_lines`
/// is that connection's reusable scratch space for formatted header
/// lines, cleared at the start of every response.
pub struct MuxService {
    mux: Arc<Mux>,
    header_lines: Vec<String>,
}

impl MuxService {
    pub fn new(mux: Arc<Mux>) -> Self {
        Self {
            mux,
            header_lines: Vec::new(),
        }
    }

    fn write_response(&mut self, buffer: ResponseBuffer, res: &mut RawResponse) {
        res.status_code(buffer.status() as usize, status_reason(buffer.status()));

        self.header_lines.clear();
        for (name, value) in &buffer.headers {
            self.header_lines.push(format!("{name}: {value}"));
        }
        for line in &self.header_lines {
            // SAFETY: `Response::header` in may_minihttp 0.1 only accepts
            // `&'static str`; there is no API taking owned header bytes.
            // The connection loop encodes the response into its write
            // buffer as soon as `call` returns, before this service sees
            // another request, and `header_lines` is not touched again
            // until the next `write_response` on this same connection.
            // Every borrow handed out here is therefore dead before the
            // buffer is cleared or dropped.
            let line = unsafe { std::mem::transmute::<&str, &'static str>(line.as_str()) };
            res.header(line);
        }

        res.body_vec(buffer.body);
    }
}

impl Clone for MuxService {
    fn clone(&self) -> Self {
        // Each connection starts with empty scratch space.
        Self::new(self.mux.clone())
    }
}

impl HttpService for MuxService {
    fn call(&mut self, req: RawRequest, res: &mut RawResponse) -> io::Result<()> {
        let mut request = parse_request(req);
        let mut buffer = ResponseBuffer::new();
        self.mux.dispatch(&mut buffer, &mut request);
        self.write_response(buffer, res);
        Ok(())
    }
}

/// Copy what the multiplexer needs out of the transport request. The
/// view is fully owned, so nothing borrows from the connection buffer.
pub(crate) fn parse_request(req: RawRequest) -> Request {
    let method: http::Method = req.method().parse().unwrap_or(http::Method::GET);
    let raw_path = req.path().to_string();
    let (path, query) = match raw_path.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (raw_path, String::new()),
    };

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    let host = headers.get("host").cloned().unwrap_or_default();

    let body = {
        let mut bytes = Vec::new();
        match req.body().read_to_end(&mut bytes) {
            Ok(n) if n > 0 => Some(bytes),
            _ => None,
        }
    };

    let mut request = Request::new(method, host, path).with_query(query);
    request.headers = headers;
    request.body = body;
    request
}
