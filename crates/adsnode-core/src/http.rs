//! Minimal HTTP/1.1 framing for form posts
//!
//! Only what a single `Connection: close` POST needs: the request head, the
//! status line of the answer, and splitting the response stream into lines
//! for the log.

use alloc::string::String;
use core::fmt::Write;

use heapless::Vec;

use crate::config::Endpoint;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const DEFAULT_HTTP_PORT: u16 = 80;

/// Append `value` to `out` with `application/x-www-form-urlencoded` escaping.
pub fn push_form_encoded(out: &mut String, value: &str) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'*' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(HEX[(byte >> 4) as usize] as char);
                out.push(HEX[(byte & 0x0f) as usize] as char);
            }
        }
    }
}

/// A form POST to one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct PostRequest<'a> {
    endpoint: &'a Endpoint<'a>,
    body: &'a str,
}

impl<'a> PostRequest<'a> {
    pub const fn new(endpoint: &'a Endpoint<'a>, body: &'a str) -> Self {
        Self { endpoint, body }
    }

    pub const fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Request line and headers, terminated by the blank line. The body is
    /// sent separately.
    pub fn head(&self) -> String {
        let mut head = String::with_capacity(192);
        // Writing into a String cannot fail.
        let _ = write!(head, "POST {} HTTP/1.1\r\n", self.endpoint.path);
        let _ = if self.endpoint.port == DEFAULT_HTTP_PORT {
            write!(head, "Host: {}\r\n", self.endpoint.host)
        } else {
            write!(head, "Host: {}:{}\r\n", self.endpoint.host, self.endpoint.port)
        };
        head.push_str("Connection: close\r\n");
        let _ = write!(head, "Content-Type: {FORM_CONTENT_TYPE}\r\n");
        let _ = write!(head, "Content-Length: {}\r\n", self.content_length());
        head.push_str("\r\n");
        head
    }
}

/// First line of an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine<'a> {
    pub version: &'a str,
    pub code: u16,
    pub reason: &'a str,
}

impl<'a> StatusLine<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (version, rest) = line.split_once(' ')?;
        if !version.starts_with("HTTP/") {
            return None;
        }
        let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
        if code.len() != 3 {
            return None;
        }
        let code = code.parse().ok()?;
        Some(Self {
            version,
            code,
            reason,
        })
    }
}

/// `true` for any 2xx status code.
pub const fn is_success(code: u16) -> bool {
    code >= 200 && code < 300
}

/// Splits a byte stream into lines without allocating per chunk.
///
/// Lines longer than `N` bytes are emitted in `N`-byte pieces. A trailing
/// `\r` is stripped, invalid UTF-8 is replaced.
pub struct LineBuffer<const N: usize> {
    pending: Vec<u8, N>,
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn feed(&mut self, bytes: &[u8], on_line: &mut impl FnMut(&str)) {
        for &byte in bytes {
            if byte == b'\n' {
                self.emit(on_line);
                continue;
            }
            if self.pending.push(byte).is_err() {
                self.emit(on_line);
                // Just emptied, so this cannot fail unless N == 0.
                let _ = self.pending.push(byte);
            }
        }
    }

    /// Emit whatever is left after the stream ended.
    pub fn finish(&mut self, on_line: &mut impl FnMut(&str)) {
        if !self.pending.is_empty() {
            self.emit(on_line);
        }
    }

    fn emit(&mut self, on_line: &mut impl FnMut(&str)) {
        let mut line: &[u8] = &self.pending;
        if let [head @ .., b'\r'] = line {
            line = head;
        }
        on_line(&String::from_utf8_lossy(line));
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec as StdVec;
    use core::net::Ipv4Addr;

    fn collect<const N: usize>(chunks: &[&[u8]]) -> StdVec<String> {
        let mut lines = StdVec::new();
        let mut buffer = LineBuffer::<N>::new();
        let mut push = |line: &str| lines.push(String::from(line));
        for chunk in chunks {
            buffer.feed(chunk, &mut push);
        }
        buffer.finish(&mut push);
        lines
    }

    #[test]
    fn test_request_head() {
        let endpoint = Endpoint::DEFAULT;
        let body = "X1=300.00&X2=0.00";
        let head = PostRequest::new(&endpoint, body).head();

        assert_eq!(
            head,
            "POST /api/sensor-data HTTP/1.1\r\n\
             Host: 172.16.26.53:5176\r\n\
             Connection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: 17\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_host_header_omits_default_port() {
        let endpoint = Endpoint {
            host: Ipv4Addr::new(10, 0, 0, 2),
            port: 80,
            path: "/x",
        };
        let head = PostRequest::new(&endpoint, "").head();
        assert!(head.contains("Host: 10.0.0.2\r\n"));
        assert!(head.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn test_form_encoding() {
        let mut out = String::new();
        push_form_encoded(&mut out, "EX1");
        assert_eq!(out, "EX1");

        out.clear();
        push_form_encoded(&mut out, "a b&c=d/é");
        assert_eq!(out, "a+b%26c%3Dd%2F%C3%A9");
    }

    #[test]
    fn test_status_line() {
        let status = StatusLine::parse("HTTP/1.1 200 OK\r").unwrap();
        assert_eq!(status.code, 200);
        assert_eq!(status.reason, "OK");
        assert!(is_success(status.code));

        let status = StatusLine::parse("HTTP/1.0 400 BAD REQUEST").unwrap();
        assert_eq!(status.version, "HTTP/1.0");
        assert_eq!(status.reason, "BAD REQUEST");
        assert!(!is_success(status.code));

        assert_eq!(StatusLine::parse("HTTP/1.1 500").unwrap().code, 500);
        assert_eq!(StatusLine::parse("Data saved successfully"), None);
        assert_eq!(StatusLine::parse("HTTP/1.1 2000 OK"), None);
        assert_eq!(StatusLine::parse(""), None);
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let lines = collect::<64>(&[b"HTTP/1.1 20", b"0 OK\r\nConte", b"nt-Length: 2\r\n\r\nok"]);
        assert_eq!(lines, ["HTTP/1.1 200 OK", "Content-Length: 2", "", "ok"]);
    }

    #[test]
    fn test_long_line_is_split() {
        let lines = collect::<4>(&[b"abcdefghij\n"]);
        assert_eq!(lines, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let lines = collect::<16>(&[b"ok\xff\n"]);
        assert_eq!(lines, ["ok\u{fffd}"]);
    }
}
