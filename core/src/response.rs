//! Normalized response model and its client-visible header views.
//!
//! # Design
//! Recorded statuses appear in two shapes on disk: a bare integer code or a
//! full `{http_version, code, message}` line. The untagged serde enum accepts
//! both and older cassettes keep loading. The synthesized header block is
//! byte-exact (`status line CRLF, one line per set header CRLF, final CRLF`)
//! because clients measure it (`header_size`) and stream it line by line
//! through header callbacks.

use serde::{Deserialize, Serialize};

use crate::headers::HeaderMap;

/// Response status, either a bare code or a full status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Status {
    Line {
        http_version: String,
        code: u16,
        message: String,
    },
    Code(u16),
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status::Code(code)
    }
}

/// A normalized HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    status: Status,
    #[serde(default, skip_serializing_if = "HeaderMap::is_empty")]
    headers: HeaderMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

impl Response {
    pub fn new(
        status: impl Into<Status>,
        headers: HeaderMap,
        body: impl Into<Option<String>>,
    ) -> Self {
        Response {
            status: status.into(),
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn code(&self) -> u16 {
        match &self.status {
            Status::Line { code, .. } => *code,
            Status::Code(code) => *code,
        }
    }

    pub fn http_version(&self) -> &str {
        match &self.status {
            Status::Line { http_version, .. } => http_version,
            Status::Code(_) => "1.1",
        }
    }

    /// The reason phrase: the recorded message when present, otherwise the
    /// canonical phrase for the code.
    pub fn reason(&self) -> &str {
        match &self.status {
            Status::Line { message, .. } if !message.is_empty() => message,
            _ => reason_phrase(self.code()),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The content type, under whichever spelling the server used.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .and_then(|(_, value)| value)
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The body, or the empty string when none was recorded.
    pub fn body_str(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    /// `HTTP/<version> <code> <reason>`.
    pub fn status_line(&self) -> String {
        format!("HTTP/{} {} {}", self.http_version(), self.code(), self.reason())
    }

    /// Header lines as a client-side header callback receives them: the
    /// status line, one line per set header, then the terminal empty line.
    /// No CRLF terminators.
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![self.status_line()];
        lines.extend(self.headers.emit_lines());
        lines.push(String::new());
        lines
    }

    /// The raw header block as it would appear on the wire, every line
    /// CRLF-terminated and closed by the empty line.
    pub fn header_block(&self) -> String {
        let mut block = self.status_line();
        block.push_str("\r\n");
        for line in self.headers.emit_lines() {
            block.push_str(&line);
            block.push_str("\r\n");
        }
        block.push_str("\r\n");
        block
    }
}

/// Canonical reason phrases for the codes that show up in cassettes.
fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_status(code: u16, message: &str) -> Status {
        Status::Line {
            http_version: "1.1".to_string(),
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn bare_code_status_uses_canonical_reason() {
        let response = Response::new(200, HeaderMap::new(), None);
        assert_eq!(response.status_line(), "HTTP/1.1 200 OK");
    }

    #[test]
    fn header_block_without_headers_is_status_line_and_blank_line() {
        let response = Response::new(line_status(200, "OK"), HeaderMap::new(), None);
        assert_eq!(response.header_block(), "HTTP/1.1 200 OK\r\n\r\n");
    }

    // The expected byte counts below match what the native client reports as
    // header_size for the same responses.
    #[test]
    fn header_block_size_with_three_headers() {
        let headers = HeaderMap::from([
            ("Host", "localhost:8000"),
            ("Connection", "close"),
            ("Content-type", "text/html; charset=UTF-8"),
        ]);
        let response = Response::new(line_status(200, "OK"), headers, None);
        assert_eq!(response.header_block().len(), 100);
    }

    #[test]
    fn header_block_size_with_not_found_status() {
        let headers = HeaderMap::from([
            ("Host", "localhost:8000"),
            ("Connection", "close"),
            ("Content-type", "text/html; charset=UTF-8"),
        ]);
        let response = Response::new(line_status(404, "Not Found"), headers, None);
        assert_eq!(response.header_block().len(), 107);
    }

    #[test]
    fn header_block_size_with_four_headers() {
        let headers = HeaderMap::from([
            ("Host", "localhost:8000"),
            ("Connection", "close"),
            ("Content-type", "text/html; charset=UTF-8"),
            ("X-Powered-By", "PHP/5.6.4-4ubuntu6"),
        ]);
        let response = Response::new(line_status(200, "OK"), headers, None);
        assert_eq!(response.header_block().len(), 134);
    }

    #[test]
    fn header_block_size_with_cache_headers() {
        let headers = HeaderMap::from([
            ("Host", "localhost:8000"),
            ("Connection", "close"),
            ("Content-type", "text/html; charset=UTF-8"),
            ("Cache-Control", "no-cache, must-revalidate"),
            ("Pragma", "no-cache"),
        ]);
        let response = Response::new(line_status(200, "OK"), headers, None);
        assert_eq!(response.header_block().len(), 160);
    }

    #[test]
    fn header_block_size_with_eight_headers() {
        let headers = HeaderMap::from([
            ("Host", "localhost:8000"),
            ("Connection", "close"),
            ("X-Powered-By", "PHP/5.6.4-4ubuntu6"),
            ("Expires", "Sat, 26 Jul 1997 05:00:00 GMT"),
            ("Last-Modified", "Sat, 13 Jun 2015 20:36:15 GMT"),
            ("Cache-Control", "no-store, no-cache, must-revalidate"),
            ("Pragma", "no-cache"),
            ("Content-type", "text/html; charset=UTF-8"),
        ]);
        let response = Response::new(line_status(200, "OK"), headers, None);
        assert_eq!(response.header_block().len(), 290);
    }

    #[test]
    fn header_lines_include_status_and_terminal_empty_line() {
        let headers = HeaderMap::from([("Content-Length", "0")]);
        let response = Response::new(line_status(200, "OK"), headers, "example response".to_string());
        assert_eq!(
            response.header_lines(),
            vec![
                "HTTP/1.1 200 OK".to_string(),
                "Content-Length: 0".to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn status_deserializes_from_bare_code_and_full_line() {
        let bare: Response = serde_yaml::from_str("status: 200\nbody: ok\n").unwrap();
        assert_eq!(bare.code(), 200);
        assert_eq!(bare.http_version(), "1.1");

        let full: Response = serde_yaml::from_str(
            "status:\n  http_version: '1.1'\n  code: 404\n  message: Not Found\nbody: gone\n",
        )
        .unwrap();
        assert_eq!(full.code(), 404);
        assert_eq!(full.reason(), "Not Found");
    }
}
