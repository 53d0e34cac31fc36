//! Network seam of the report cycle
//!
//! The reporter only needs to open a connection, connect it, write a request,
//! drain the response and close it again. [`Transport`] and [`Connection`]
//! describe exactly that, so the same cycle runs over `embassy-net` on the
//! device, `std::net` in the simulator and a scripted double in tests.
//! Implementations apply their own connect and I/O timeouts.

use core::fmt::Debug;
use core::net::Ipv4Addr;

use log::{debug, error, info, warn};

use crate::config::Endpoint;
use crate::http::{LineBuffer, PostRequest, StatusLine, is_success};

/// Read buffer used while draining a response.
const RESPONSE_CHUNK: usize = 128;
/// Longest response line logged in one piece.
const MAX_RESPONSE_LINE: usize = 256;

/// One TCP connection handle.
pub trait Connection {
    type Error: Debug;

    fn connect(&mut self, host: Ipv4Addr, port: u16)
    -> impl Future<Output = Result<(), Self::Error>>;

    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;

    /// Read whatever is available. `Ok(0)` means the peer closed and nothing
    /// is buffered.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>>;

    /// Release the handle. Calling this more than once, or on a handle that
    /// never connected, is harmless.
    fn close(&mut self) -> impl Future<Output = ()>;
}

/// Source of connection handles, one per report cycle.
pub trait Transport {
    type Connection<'a>: Connection
    where
        Self: 'a;

    fn open(&mut self) -> Self::Connection<'_>;
}

/// What happened to a report on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The TCP connection could not be established.
    ConnectFailed,
    /// Connected, but the request could not be written completely.
    WriteFailed,
    /// Request written. `status` is the parsed HTTP status, if any line parsed.
    Sent { status: Option<u16>, lines: u16 },
}

impl Delivery {
    pub const fn is_sent(self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// POST `body` to `endpoint` over a freshly opened connection.
///
/// Every response line is logged. The connection is closed on every path.
pub async fn post_form<C: Connection>(conn: &mut C, endpoint: &Endpoint<'_>, body: &str) -> Delivery {
    let delivery = exchange(conn, endpoint, body).await;
    conn.close().await;

    match delivery {
        Delivery::ConnectFailed => error!("Connection to server failed"),
        Delivery::WriteFailed => error!("Sending request to server failed"),
        Delivery::Sent {
            status: Some(code), ..
        } if !is_success(code) => {
            warn!("Server answered with status {}", code)
        }
        Delivery::Sent { .. } => info!("Data sent successfully"),
    }
    delivery
}

async fn exchange<C: Connection>(conn: &mut C, endpoint: &Endpoint<'_>, body: &str) -> Delivery {
    if let Err(e) = conn.connect(endpoint.host, endpoint.port).await {
        debug!("connect to {}:{} failed: {:?}", endpoint.host, endpoint.port, e);
        return Delivery::ConnectFailed;
    }
    info!("Connected to server {}:{}", endpoint.host, endpoint.port);

    let request = PostRequest::new(endpoint, body);
    let head = request.head();
    for part in [head.as_bytes(), body.as_bytes()] {
        if let Err(e) = conn.write_all(part).await {
            debug!("request write failed: {:?}", e);
            return Delivery::WriteFailed;
        }
    }

    let mut status = None;
    let mut lines: u16 = 0;
    let mut on_line = |line: &str| {
        if lines == 0 {
            status = StatusLine::parse(line).map(|s| s.code);
        }
        lines = lines.saturating_add(1);
        info!("Server: {}", line);
    };

    let mut response = LineBuffer::<MAX_RESPONSE_LINE>::new();
    let mut chunk = [0u8; RESPONSE_CHUNK];
    loop {
        match conn.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => response.feed(&chunk[..n], &mut on_line),
            Err(e) => {
                debug!("response read ended: {:?}", e);
                break;
            }
        }
    }
    response.finish(&mut on_line);

    Delivery::Sent { status, lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;
    use embassy_futures::block_on;

    const RESPONSE: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\nData saved successfully";

    #[test]
    fn test_post_sends_request_and_reads_response() {
        let mut transport = MockTransport::responding(RESPONSE);
        let endpoint = Endpoint::DEFAULT;

        let delivery = block_on(async {
            let mut conn = transport.open();
            post_form(&mut conn, &endpoint, "X1=300.00").await
        });

        assert_eq!(
            delivery,
            Delivery::Sent {
                status: Some(200),
                lines: 4
            }
        );
        assert_eq!(transport.connected_to, Some((endpoint.host, endpoint.port)));
        assert!(transport.sent_str().starts_with("POST /api/sensor-data HTTP/1.1\r\n"));
        assert!(transport.sent_str().ends_with("\r\n\r\nX1=300.00"));
        assert_eq!(transport.closes, 1);
    }

    #[test]
    fn test_connect_failure_still_closes() {
        let mut transport = MockTransport::refusing();
        let delivery = block_on(async {
            let mut conn = transport.open();
            post_form(&mut conn, &Endpoint::DEFAULT, "X1=1.00").await
        });

        assert_eq!(delivery, Delivery::ConnectFailed);
        assert!(transport.sent.is_empty());
        assert_eq!(transport.closes, 1);
    }

    #[test]
    fn test_write_failure() {
        let mut transport = MockTransport::responding(RESPONSE);
        transport.fail_writes = true;
        let delivery = block_on(async {
            let mut conn = transport.open();
            post_form(&mut conn, &Endpoint::DEFAULT, "X1=1.00").await
        });

        assert_eq!(delivery, Delivery::WriteFailed);
        assert_eq!(transport.closes, 1);
    }

    #[test]
    fn test_error_status_is_reported() {
        let mut transport =
            MockTransport::responding(b"HTTP/1.1 400 BAD REQUEST\r\n\r\nMissing data fields: P5");
        let delivery = block_on(async {
            let mut conn = transport.open();
            post_form(&mut conn, &Endpoint::DEFAULT, "X1=1.00").await
        });

        assert_eq!(
            delivery,
            Delivery::Sent {
                status: Some(400),
                lines: 3
            }
        );
    }

    #[test]
    fn test_read_error_keeps_partial_line() {
        let mut transport = MockTransport::responding(RESPONSE);
        transport.fail_reads_after = Some(RESPONSE.len() - 12);
        let delivery = block_on(async {
            let mut conn = transport.open();
            post_form(&mut conn, &Endpoint::DEFAULT, "X1=1.00").await
        });

        // Status, header, blank line and the cut-off "Data saved".
        assert_eq!(
            delivery,
            Delivery::Sent {
                status: Some(200),
                lines: 4
            }
        );
        assert_eq!(transport.closes, 1);
    }

    #[test]
    fn test_close_twice_counts_once() {
        let mut transport = MockTransport::responding(RESPONSE);
        block_on(async {
            let mut conn = transport.open();
            post_form(&mut conn, &Endpoint::DEFAULT, "X1=1.00").await;
            conn.close().await;
        });

        assert_eq!(transport.closes, 1);
    }

    #[test]
    fn test_empty_response() {
        let mut transport = MockTransport::responding(b"");
        let delivery = block_on(async {
            let mut conn = transport.open();
            post_form(&mut conn, &Endpoint::DEFAULT, "X1=1.00").await
        });

        assert_eq!(
            delivery,
            Delivery::Sent {
                status: None,
                lines: 0
            }
        );
    }
}
