//! Socket transports for Modbus TCP and UDP.
//!
//! This module provides the [`SocketTransport`] trait and its two
//! implementations, [`TcpTransport`] and [`UdpTransport`]. Transports only
//! know about sockets and bytes; MBAP framing lives in
//! [`TcpIpProtocol`](crate::TcpIpProtocol).
//!
//! # Design
//!
//! - **Protocol agnostic** - Handles only byte transmission, no Modbus knowledge
//! - **Synchronous** - Blocking send/receive bounded by the configured timeouts
//! - **Simple** - One socket, one remote endpoint, no connection pooling
//!
//! # Constants
//!
//! - [`DEFAULT_PORT`] - Default Modbus port (502)
//! - [`DEFAULT_CONNECT_TIMEOUT`] - Default TCP connect timeout (5 seconds)
//! - [`DEFAULT_TIMEOUT`] - Default read timeout (2 seconds)
//! - [`MAX_PACKET_SIZE`] - Receive buffer for one UDP datagram (2048 bytes)
//!
//! # Example
//!
//! ```no_run
//! use modbus_master::{SocketTransport, TcpConfig, TcpTransport};
//! use std::time::Duration;
//!
//! let config = TcpConfig::new("192.168.1.10")
//!     .with_read_timeout(Duration::from_millis(500));
//! let mut transport = TcpTransport::new(config);
//! transport.connect().unwrap();
//! ```

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default Modbus TCP/UDP port.
pub const DEFAULT_PORT: u16 = 502;

/// Default timeout for establishing a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for socket reads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum UDP datagram accepted as one reply.
pub const MAX_PACKET_SIZE: usize = 2048;

/// Remote endpoint and timeouts of a socket transport.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TcpConfig {
    /// Remote host name or IP address.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Connect timeout (TCP only).
    pub connect_timeout: Duration,
    /// Read timeout.
    pub read_timeout: Duration,
}

impl TcpConfig {
    /// Creates a configuration for `host` with default port and timeouts.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::TcpConfig;
    ///
    /// let config = TcpConfig::new("10.0.0.5").with_port(1502);
    /// assert_eq!(config.endpoint(), "10.0.0.5:1502");
    /// ```
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Sets the remote port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns `host:port`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no address found for {}", self.endpoint()),
            ));
        }
        Ok(addrs)
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Byte transport used by the MBAP framer.
pub trait SocketTransport {
    /// Protocol name reported by the framer, e.g. `"Modbus TCP"`.
    fn protocol_name(&self) -> &'static str;

    /// Remote endpoint configuration.
    fn config(&self) -> &TcpConfig;

    /// Mutable endpoint configuration; changes apply on the next connect.
    fn config_mut(&mut self) -> &mut TcpConfig;

    /// Opens the socket.
    fn connect(&mut self) -> io::Result<()>;

    /// Closes the socket.
    fn disconnect(&mut self) -> io::Result<()>;

    /// Returns whether the socket is open.
    fn is_connected(&self) -> bool;

    /// Discards any bytes received but not yet read.
    fn clear_input(&mut self) -> io::Result<()>;

    /// Sends `data` completely.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receives exactly `len` bytes.
    fn receive(&mut self, len: usize) -> io::Result<Vec<u8>>;
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket is not connected")
}

/// Modbus TCP transport over a [`TcpStream`].
pub struct TcpTransport {
    config: TcpConfig,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Creates a disconnected transport.
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(not_connected)
    }
}

impl SocketTransport for TcpTransport {
    fn protocol_name(&self) -> &'static str {
        "Modbus TCP"
    }

    fn config(&self) -> &TcpConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut TcpConfig {
        &mut self.config
    }

    fn connect(&mut self) -> io::Result<()> {
        let mut last_err = None;
        for addr in self.config.resolve()? {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.config.read_timeout))?;
                    stream.set_write_timeout(Some(self.config.read_timeout))?;
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(not_connected))
    }

    fn disconnect(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(stream) => match stream.shutdown(Shutdown::Both) {
                Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
                _ => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let stream = self.stream()?;
        stream.set_nonblocking(true)?;
        let mut scratch = [0u8; 256];
        let drained = loop {
            match stream.read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        stream.set_nonblocking(false)?;
        drained
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream()?.write_all(data)
    }

    fn receive(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.stream()?.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("endpoint", &self.config.endpoint())
            .field("local_addr", &self.stream.as_ref().and_then(|s| s.local_addr().ok()))
            .finish()
    }
}

/// Modbus UDP transport.
///
/// One datagram is received after each send and buffered; reads are served
/// from that buffer. Asking for more bytes than the datagram holds fails
/// with [`io::ErrorKind::TimedOut`].
pub struct UdpTransport {
    config: TcpConfig,
    socket: Option<UdpSocket>,
    datagram: Vec<u8>,
    awaiting_reply: bool,
}

impl UdpTransport {
    /// Creates a disconnected transport.
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            socket: None,
            datagram: Vec::new(),
            awaiting_reply: false,
        }
    }

    fn socket(&self) -> io::Result<&UdpSocket> {
        self.socket.as_ref().ok_or_else(not_connected)
    }

    fn fetch_datagram(&mut self) -> io::Result<()> {
        let mut buffer = vec![0u8; MAX_PACKET_SIZE];
        let size = self.socket()?.recv(&mut buffer)?;
        buffer.truncate(size);
        self.datagram = buffer;
        self.awaiting_reply = false;
        Ok(())
    }
}

impl SocketTransport for UdpTransport {
    fn protocol_name(&self) -> &'static str {
        "Modbus UDP"
    }

    fn config(&self) -> &TcpConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut TcpConfig {
        &mut self.config
    }

    fn connect(&mut self) -> io::Result<()> {
        let remote = self.config.resolve()?[0];
        let local = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)?;
        socket.connect(remote)?;
        socket.set_read_timeout(Some(self.config.read_timeout))?;
        socket.set_write_timeout(Some(self.config.read_timeout))?;
        self.socket = Some(socket);
        self.datagram.clear();
        self.awaiting_reply = false;
        Ok(())
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.socket = None;
        self.datagram.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.datagram.clear();
        let socket = self.socket()?;
        socket.set_nonblocking(true)?;
        let mut scratch = [0u8; MAX_PACKET_SIZE];
        let drained = loop {
            match socket.recv(&mut scratch) {
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                // A previous send to a closed port may surface here
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => continue,
                Err(e) => break Err(e),
            }
        };
        socket.set_nonblocking(false)?;
        drained
    }

    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let sent = self.socket()?.send(data)?;
        if sent != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("datagram truncated: sent {} of {} bytes", sent, data.len()),
            ));
        }
        self.datagram.clear();
        self.awaiting_reply = true;
        Ok(())
    }

    fn receive(&mut self, len: usize) -> io::Result<Vec<u8>> {
        if self.awaiting_reply {
            self.fetch_datagram()?;
        }
        if self.datagram.len() < len {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!(
                    "datagram holds {} bytes, {} requested",
                    self.datagram.len(),
                    len
                ),
            ));
        }
        Ok(self.datagram.drain(..len).collect())
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("endpoint", &self.config.endpoint())
            .field("local_addr", &self.socket.as_ref().and_then(|s| s.local_addr().ok()))
            .field("buffered", &self.datagram.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_PORT, 502);
        assert_eq!(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs(5));
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(2));
    }

    #[test]
    fn test_config_defaults() {
        let config = TcpConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 502);
        assert_eq!(config.endpoint(), "localhost:502");
    }

    #[test]
    fn test_config_builder() {
        let config = TcpConfig::new("10.0.0.5")
            .with_port(1502)
            .with_connect_timeout(Duration::from_secs(1))
            .with_read_timeout(Duration::from_millis(250));
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 1502);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_tcp_not_connected() {
        let mut transport = TcpTransport::new(TcpConfig::default());
        assert!(!transport.is_connected());
        let err = transport.send(&[0x00]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(transport.disconnect().is_ok());
    }

    #[test]
    fn test_tcp_loopback_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 3];
            stream.read_exact(&mut request).unwrap();
            // Reply in two segments
            stream.write_all(&request[..1]).unwrap();
            stream.write_all(&request[1..]).unwrap();
        });

        let config = TcpConfig::new("127.0.0.1")
            .with_port(port)
            .with_read_timeout(Duration::from_secs(1));
        let mut transport = TcpTransport::new(config);
        transport.connect().unwrap();
        assert!(transport.is_connected());

        transport.clear_input().unwrap();
        transport.send(&[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(transport.receive(2).unwrap(), vec![0x01, 0x02]);
        assert_eq!(transport.receive(1).unwrap(), vec![0x03]);

        server.join().unwrap();
        transport.disconnect().unwrap();
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_udp_buffers_one_datagram() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 16];
            let (len, peer) = server.recv_from(&mut buf).unwrap();
            server.send_to(&buf[..len], peer).unwrap();
        });

        let config = TcpConfig::new("127.0.0.1")
            .with_port(port)
            .with_read_timeout(Duration::from_secs(1));
        let mut transport = UdpTransport::new(config);
        transport.connect().unwrap();

        transport.send(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert_eq!(transport.receive(3).unwrap(), vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(transport.receive(1).unwrap(), vec![0xDD]);

        let err = transport.receive(1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        handle.join().unwrap();
    }

    #[test]
    fn test_transport_debug() {
        let transport = UdpTransport::new(TcpConfig::new("127.0.0.1"));
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("UdpTransport"));
        assert!(debug_str.contains("127.0.0.1:502"));
        assert_eq!(transport.protocol_name(), "Modbus UDP");
    }
}
