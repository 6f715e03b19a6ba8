//! Response sink and the in-memory response.

use std::collections::HashMap;

/// The sink a transport adapter hands to the dispatcher.
///
/// The dispatcher calls `write_status` at most once per request. Headers set
/// after the body has started are the transport's business; the in-memory
/// [`Response`] simply records them.
pub trait ResponseWriter {
    /// Writes the status line.
    fn write_status(&mut self, status: u16);

    /// Sets a response header, replacing an earlier value.
    fn set_header(&mut self, key: &str, value: &str);

    /// Appends bytes to the response body.
    fn write_body(&mut self, bytes: &[u8]);
}

/// An HTTP response recorded in memory.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Gets a header value, ignoring case.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a string.
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Returns the status text for the current status code.
    #[must_use]
    pub const fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            422 => "Unprocessable Entity",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown",
        }
    }
}

/// A response nobody wrote to is a 200 with no body.
impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ResponseWriter for Response {
    fn write_status(&mut self, status: u16) {
        self.status = status;
    }

    fn set_header(&mut self, key: &str, value: &str) {
        self.headers.insert(key.to_string(), value.to_string());
    }

    fn write_body(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }
}
