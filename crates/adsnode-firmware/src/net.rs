//! embassy-net TCP transport for the report cycle

use adsnode_core::config::NetTimeouts;
use adsnode_core::transport::{Connection, Transport};
use core::net::Ipv4Addr;
use embassy_net::tcp::{ConnectError, Error as TcpIoError, TcpSocket};
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::{Duration, with_timeout};
use log::debug;

const RX_BUFFER_SIZE: usize = 1024;
const TX_BUFFER_SIZE: usize = 1024;

#[derive(Debug)]
pub enum TcpError {
    /// No IPv4 configuration yet, so there is nothing to connect from.
    LinkDown,
    Connect(ConnectError),
    Io(TcpIoError),
    /// The peer accepted no more data.
    WriteZero,
    Timeout,
}

/// Hands out one socket at a time over the station interface.
pub struct TcpTransport<'d> {
    stack: Stack<'d>,
    timeouts: NetTimeouts,
    rx_buffer: [u8; RX_BUFFER_SIZE],
    tx_buffer: [u8; TX_BUFFER_SIZE],
}

impl<'d> TcpTransport<'d> {
    pub const fn new(stack: Stack<'d>, timeouts: NetTimeouts) -> Self {
        Self {
            stack,
            timeouts,
            rx_buffer: [0; RX_BUFFER_SIZE],
            tx_buffer: [0; TX_BUFFER_SIZE],
        }
    }

    /// Wait until the station has an IPv4 configuration.
    pub async fn wait_link_up(&self) {
        self.stack.wait_config_up().await;
    }
}

impl<'d> Transport for TcpTransport<'d> {
    type Connection<'a>
        = TcpConnection<'a>
    where
        Self: 'a;

    fn open(&mut self) -> TcpConnection<'_> {
        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(Duration::from_millis(self.timeouts.io_ms)));
        TcpConnection {
            stack: self.stack,
            socket,
            timeouts: self.timeouts,
            closed: false,
        }
    }
}

pub struct TcpConnection<'a> {
    stack: Stack<'a>,
    socket: TcpSocket<'a>,
    timeouts: NetTimeouts,
    closed: bool,
}

impl TcpConnection<'_> {
    fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.io_ms)
    }
}

impl Connection for TcpConnection<'_> {
    type Error = TcpError;

    async fn connect(&mut self, host: Ipv4Addr, port: u16) -> Result<(), TcpError> {
        if !self.stack.is_config_up() {
            return Err(TcpError::LinkDown);
        }
        let remote = IpEndpoint::new(IpAddress::Ipv4(host), port);
        with_timeout(
            Duration::from_millis(self.timeouts.connect_ms),
            self.socket.connect(remote),
        )
        .await
        .map_err(|_| TcpError::Timeout)?
        .map_err(TcpError::Connect)
    }

    async fn write_all(&mut self, mut data: &[u8]) -> Result<(), TcpError> {
        let timeout = self.io_timeout();
        while !data.is_empty() {
            let written = with_timeout(timeout, self.socket.write(data))
                .await
                .map_err(|_| TcpError::Timeout)?
                .map_err(TcpError::Io)?;
            if written == 0 {
                return Err(TcpError::WriteZero);
            }
            data = &data[written..];
        }
        with_timeout(timeout, self.socket.flush())
            .await
            .map_err(|_| TcpError::Timeout)?
            .map_err(TcpError::Io)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TcpError> {
        with_timeout(self.io_timeout(), self.socket.read(buf))
            .await
            .map_err(|_| TcpError::Timeout)?
            .map_err(TcpError::Io)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.socket.close();
        if with_timeout(self.io_timeout(), self.socket.flush()).await.is_err() {
            debug!("socket did not drain before close, aborting");
            self.socket.abort();
        }
    }
}
