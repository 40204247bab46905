/// Write half of a dispatch: the seam between the multiplexer and the
/// transport. The library's own handlers only ever need a status, headers,
/// and a body sink.
pub trait ResponseWriter {
    fn set_status(&mut self, status: u16);
    fn header(&mut self, name: &str, value: &str);
    fn write(&mut self, bytes: &[u8]);
}

/// An owned, inspectable response. The transport adapter buffers into one
/// of these before flushing to the wire, and tests use it as a recorder.
#[derive(Debug)]
pub struct ResponseBuffer {
    status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// First value recorded for a header, case-insensitive on the name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

impl ResponseWriter for ResponseBuffer {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }
}

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        301 => "Moved Permanently",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    }
}
