//! Modbus TCP and UDP master.
//!
//! [`TcpIpProtocol`] prefixes every PDU with an MBAP header and checks the
//! reply header against the request before decoding the PDU. The same
//! framer runs over a stream ([`TcpProtocol`]) or datagrams
//! ([`UdpProtocol`]).
//!
//! # Example
//!
//! ```no_run
//! use modbus_master::{MasterProtocol, TcpConfig, TcpProtocol, TransactionContext};
//!
//! let mut tcp = TcpProtocol::new(TcpConfig::new("192.168.1.10"));
//! tcp.open()?;
//!
//! let ctx = TransactionContext::new(1).with_transaction_id(7);
//! tcp.preset_single_register(ctx, 0, 42)?;
//! let values = tcp.read_holding_registers(ctx.with_transaction_id(8), 0, 10)?;
//! # Ok::<(), modbus_master::ModbusError>(())
//! ```

use std::fmt;

use tracing::{trace, warn};

use crate::command::{
    check_point_count, Command, MaskWriteRegisterCommand, ReadRegistersCommand,
    WriteMultipleRegistersCommand, WriteSingleRegisterCommand, MAX_READ_REGISTERS,
    MAX_WRITE_REGISTERS,
};
use crate::context::TransactionContext;
use crate::error::{ModbusError, Result};
use crate::header::{MbapHeader, MBAP_HEADER_SIZE};
use crate::protocol::MasterProtocol;
use crate::response::ReplyPdu;
use crate::transport::{SocketTransport, TcpConfig, TcpTransport, UdpTransport};
use crate::utils::format_frame;

/// Modbus master framing requests with an MBAP header.
pub struct TcpIpProtocol<S: SocketTransport> {
    transport: S,
}

/// Modbus TCP master.
pub type TcpProtocol = TcpIpProtocol<TcpTransport>;

/// Modbus UDP master.
pub type UdpProtocol = TcpIpProtocol<UdpTransport>;

impl TcpIpProtocol<TcpTransport> {
    /// Creates a disconnected Modbus TCP master.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{MasterProtocol, TcpConfig, TcpProtocol};
    ///
    /// let tcp = TcpProtocol::new(TcpConfig::new("plc.local"));
    /// assert_eq!(tcp.protocol_name(), "Modbus TCP");
    /// assert_eq!(tcp.protocol_params(), "plc.local:502");
    /// ```
    pub fn new(config: TcpConfig) -> Self {
        Self::with_transport(TcpTransport::new(config))
    }
}

impl TcpIpProtocol<UdpTransport> {
    /// Creates a disconnected Modbus UDP master.
    pub fn new(config: TcpConfig) -> Self {
        Self::with_transport(UdpTransport::new(config))
    }
}

impl<S: SocketTransport> TcpIpProtocol<S> {
    /// Creates a master over an existing transport.
    pub fn with_transport(transport: S) -> Self {
        Self { transport }
    }

    /// Returns the transport.
    pub fn transport(&self) -> &S {
        &self.transport
    }

    /// Remote host.
    pub fn host(&self) -> &str {
        &self.transport.config().host
    }

    /// Remote port.
    pub fn port(&self) -> u16 {
        self.transport.config().port
    }

    /// Changes the remote host.
    ///
    /// # Errors
    ///
    /// Returns `ModbusError::ConnectionState` while connected.
    pub fn set_host(&mut self, host: impl Into<String>) -> Result<()> {
        if self.transport.is_connected() {
            return Err(ModbusError::connection_state("unable to change host"));
        }
        self.transport.config_mut().host = host.into();
        Ok(())
    }

    /// Changes the remote port.
    ///
    /// # Errors
    ///
    /// Returns `ModbusError::ConnectionState` while connected.
    pub fn set_port(&mut self, port: u16) -> Result<()> {
        if self.transport.is_connected() {
            return Err(ModbusError::connection_state("unable to change port"));
        }
        self.transport.config_mut().port = port;
        Ok(())
    }

    /// Sends `cmd` in one ADU and decodes the reply.
    fn execute<C: Command>(&mut self, ctx: TransactionContext, cmd: &C) -> Result<C::Output> {
        if !self.transport.is_connected() {
            return Err(ModbusError::connection_state(format!(
                "not connected to {}",
                self.transport.config().endpoint()
            )));
        }

        let pdu = cmd.to_pdu();
        let header = MbapHeader::for_request(ctx, pdu.len());
        let mut adu = Vec::with_capacity(MBAP_HEADER_SIZE + pdu.len());
        adu.extend_from_slice(&header.to_bytes());
        adu.extend_from_slice(&pdu);

        self.transport
            .clear_input()
            .map_err(|e| ModbusError::read_failed(ctx, e))?;
        trace!(
            protocol = self.transport.protocol_name(),
            transaction_id = ctx.transaction_id,
            frame = %format_frame(&adu),
            "MBAP TX"
        );
        self.transport
            .send(&adu)
            .map_err(|e| ModbusError::write_failed(ctx, e))?;

        let raw_header = self
            .transport
            .receive(MBAP_HEADER_SIZE)
            .map_err(|e| ModbusError::read_failed(ctx, e))?;
        let reply_header = MbapHeader::from_bytes(ctx, &raw_header)?;
        header.check_reply(ctx, &reply_header)?;

        let raw_pdu = self
            .transport
            .receive(reply_header.pdu_len())
            .map_err(|e| ModbusError::read_failed(ctx, e))?;
        trace!(
            protocol = self.transport.protocol_name(),
            transaction_id = ctx.transaction_id,
            frame = %format_frame(&[raw_header.as_slice(), raw_pdu.as_slice()].concat()),
            "MBAP RX"
        );

        let reply = ReplyPdu::from_bytes(ctx, &raw_pdu)?;
        reply.check_function(cmd.function_code())?;
        cmd.decode_reply(&reply)
    }
}

impl<S: SocketTransport> MasterProtocol for TcpIpProtocol<S> {
    fn protocol_name(&self) -> &'static str {
        self.transport.protocol_name()
    }

    fn protocol_params(&self) -> String {
        self.transport.config().endpoint()
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    fn open_transport(&mut self) -> Result<()> {
        self.transport
            .connect()
            .map_err(|source| ModbusError::TransportOpen { source })
    }

    fn close_transport(&mut self) -> Result<()> {
        self.transport
            .disconnect()
            .map_err(|e| ModbusError::connection_state(format!("failed to disconnect: {}", e)))
    }

    fn read_holding_registers(
        &mut self,
        ctx: TransactionContext,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        check_point_count(ctx, count as usize, MAX_READ_REGISTERS as usize)?;
        self.execute(ctx, &ReadRegistersCommand::holding(start, count)?)
    }

    fn read_input_registers(
        &mut self,
        ctx: TransactionContext,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        check_point_count(ctx, count as usize, MAX_READ_REGISTERS as usize)?;
        self.execute(ctx, &ReadRegistersCommand::input(start, count)?)
    }

    fn preset_single_register(
        &mut self,
        ctx: TransactionContext,
        addr: u16,
        value: u16,
    ) -> Result<()> {
        self.execute(ctx, &WriteSingleRegisterCommand::new(addr, value))
    }

    fn preset_multiple_registers(
        &mut self,
        ctx: TransactionContext,
        start: u16,
        values: &[u16],
    ) -> Result<()> {
        // Only the one-byte byte count bounds the request here
        check_point_count(ctx, values.len(), MAX_WRITE_REGISTERS)?;
        self.execute(ctx, &WriteMultipleRegistersCommand::new(start, values)?)
    }

    fn mask_write_4x_register(
        &mut self,
        ctx: TransactionContext,
        addr: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> Result<()> {
        self.execute(ctx, &MaskWriteRegisterCommand::new(addr, and_mask, or_mask))
    }
}

impl<S: SocketTransport> Drop for TcpIpProtocol<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(
                endpoint = %self.transport.config().endpoint(),
                error = %e,
                "failed to close socket on drop"
            );
        }
    }
}

impl<S: SocketTransport> fmt::Debug for TcpIpProtocol<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpIpProtocol")
            .field("protocol", &self.transport.protocol_name())
            .field("endpoint", &self.transport.config().endpoint())
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;
    use crate::exception::ExceptionCode;
    use std::io::{Read, Write};
    use std::net::{TcpListener, UdpSocket};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    /// Accepts one connection and answers each request with the next reply.
    fn spawn_tcp_slave(replies: Vec<Vec<u8>>) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut requests = Vec::new();
            for reply in replies {
                let mut header = [0u8; MBAP_HEADER_SIZE];
                stream.read_exact(&mut header).unwrap();
                let len = u16::from_be_bytes([header[4], header[5]]) as usize;
                let mut pdu = vec![0u8; len - 1];
                stream.read_exact(&mut pdu).unwrap();
                requests.push([header.as_slice(), pdu.as_slice()].concat());
                stream.write_all(&reply).unwrap();
            }
            requests
        });
        (port, handle)
    }

    fn config(port: u16) -> TcpConfig {
        TcpConfig::new("127.0.0.1")
            .with_port(port)
            .with_read_timeout(Duration::from_secs(2))
    }

    fn connected_tcp(replies: Vec<Vec<u8>>) -> (TcpProtocol, JoinHandle<Vec<Vec<u8>>>) {
        let (port, handle) = spawn_tcp_slave(replies);
        let mut tcp = TcpProtocol::new(config(port));
        tcp.open().unwrap();
        (tcp, handle)
    }

    fn ctx(tid: u16) -> TransactionContext {
        TransactionContext::new(1).with_transaction_id(tid)
    }

    #[test]
    fn test_preset_single_register_frame() {
        let reply = hex::decode("00070000000601060000002a").unwrap();
        let (mut tcp, handle) = connected_tcp(vec![reply.clone()]);

        tcp.preset_single_register(ctx(7), 0, 42).unwrap();

        let requests = handle.join().unwrap();
        assert_eq!(requests[0], reply);
    }

    #[test]
    fn test_read_holding_registers() {
        let reply = vec![
            0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0x00, 0x2A, 0x12, 0x34,
        ];
        let (mut tcp, handle) = connected_tcp(vec![reply]);

        assert_eq!(
            tcp.read_holding_registers(ctx(1), 0x0010, 2).unwrap(),
            vec![42, 0x1234]
        );

        let requests = handle.join().unwrap();
        assert_eq!(
            requests[0],
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x10, 0x00, 0x02]
        );
    }

    #[test]
    fn test_transaction_id_mismatch() {
        let reply = vec![0x00, 0x08, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x00, 0x00, 0x2A];
        let (mut tcp, handle) = connected_tcp(vec![reply]);

        let err = tcp.preset_single_register(ctx(7), 0, 42).unwrap_err();
        assert_eq!(
            err.frame_error(),
            Some(&FrameError::HeaderMismatch {
                field: "transaction identifier",
                expected: 7,
                received: 8
            })
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_exception_reply() {
        let reply = vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02];
        let (mut tcp, handle) = connected_tcp(vec![reply]);

        let err = tcp.read_holding_registers(ctx(3), 0x0100, 1).unwrap_err();
        assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalDataAddress));
        assert!(!err.is_transport());
        handle.join().unwrap();
    }

    #[test]
    fn test_exception_reply_for_other_function() {
        let reply = vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x03, 0x01, 0x84, 0x02];
        let (mut tcp, handle) = connected_tcp(vec![reply]);

        let err = tcp.read_holding_registers(ctx(3), 0, 1).unwrap_err();
        assert!(matches!(
            err,
            ModbusError::StandardException {
                code: ExceptionCode::IllegalDataAddress,
                ..
            }
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_byte_count_mismatch() {
        let reply = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x04, 0x00, 0x2A, 0x00];
        let (mut tcp, handle) = connected_tcp(vec![reply]);

        let err = tcp.read_holding_registers(ctx(1), 0, 2).unwrap_err();
        assert!(matches!(
            err.frame_error(),
            Some(FrameError::LengthMismatch {
                what: "byte count",
                ..
            })
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_empty_pdu() {
        let reply = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01];
        let (mut tcp, handle) = connected_tcp(vec![reply]);

        let err = tcp.preset_single_register(ctx(1), 0, 1).unwrap_err();
        assert!(matches!(
            err.frame_error(),
            Some(FrameError::ReplyTooShort { .. })
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_multiple_write_beyond_rtu_limit() {
        let reply = vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x10, 0x00, 0x00, 0x00, 0x7D];
        let (mut tcp, handle) = connected_tcp(vec![reply]);

        tcp.preset_multiple_registers(ctx(2), 0, &[0xAAAA; 125]).unwrap();
        assert!(matches!(
            tcp.preset_multiple_registers(ctx(2), 0, &[0; 128]),
            Err(ModbusError::TooManyPoints { max: 127, .. })
        ));

        let requests = handle.join().unwrap();
        assert_eq!(requests[0].len(), MBAP_HEADER_SIZE + 6 + 250);
    }

    #[test]
    fn test_mask_write() {
        let reply = vec![
            0x00, 0x04, 0x00, 0x00, 0x00, 0x08, 0x01, 0x16, 0x00, 0x04, 0x00, 0xF2, 0x00, 0x25,
        ];
        let (mut tcp, handle) = connected_tcp(vec![reply.clone()]);

        tcp.mask_write_4x_register(ctx(4), 4, 0x00F2, 0x0025).unwrap();
        assert_eq!(handle.join().unwrap()[0], reply);
    }

    #[test]
    fn test_not_connected() {
        let mut tcp = TcpProtocol::new(TcpConfig::default());
        assert!(!tcp.is_connected());
        assert!(matches!(
            tcp.read_holding_registers(ctx(1), 0, 1),
            Err(ModbusError::ConnectionState { .. })
        ));
    }

    #[test]
    fn test_host_port_locked_while_connected() {
        let (mut tcp, handle) = connected_tcp(vec![]);

        let err = tcp.set_host("10.0.0.1").unwrap_err();
        assert_eq!(err.to_string(), "unable to change host");
        let err = tcp.set_port(1502).unwrap_err();
        assert_eq!(err.to_string(), "unable to change port");

        tcp.close().unwrap();
        tcp.set_host("10.0.0.1").unwrap();
        tcp.set_port(1502).unwrap();
        assert_eq!(tcp.protocol_params(), "10.0.0.1:1502");
        assert_eq!(tcp.host(), "10.0.0.1");
        assert_eq!(tcp.port(), 1502);
        handle.join().unwrap();
    }

    #[test]
    fn test_open_close_idempotent() {
        let (mut tcp, handle) = connected_tcp(vec![]);
        tcp.open().unwrap();
        assert!(tcp.is_connected());
        tcp.close().unwrap();
        tcp.close().unwrap();
        assert!(!tcp.is_connected());
        handle.join().unwrap();
    }

    #[test]
    fn test_open_failure() {
        // Bind then drop to get a port with no listener
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut tcp = TcpProtocol::new(config(port).with_connect_timeout(Duration::from_millis(500)));
        let err = tcp.open().unwrap_err();
        assert!(matches!(err, ModbusError::TransportOpen { .. }));
        assert!(err.is_transport());
    }

    #[test]
    fn test_udp_read_holding_registers() {
        let slave = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = slave.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 260];
            let (len, peer) = slave.recv_from(&mut buf).unwrap();
            let reply = [0x00, 0x09, 0x00, 0x00, 0x00, 0x05, 0x01, 0x04, 0x02, 0x00, 0x2A];
            slave.send_to(&reply, peer).unwrap();
            buf[..len].to_vec()
        });

        let mut udp = UdpProtocol::new(config(port));
        assert_eq!(udp.protocol_name(), "Modbus UDP");
        udp.open().unwrap();
        assert_eq!(udp.read_input_registers(ctx(9), 0, 1).unwrap(), vec![42]);

        let request = handle.join().unwrap();
        assert_eq!(
            request,
            vec![0x00, 0x09, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_udp_short_datagram_times_out() {
        let slave = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = slave.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 260];
            let (_, peer) = slave.recv_from(&mut buf).unwrap();
            // Header announces 5 PDU bytes, only 2 follow
            let reply = [0x00, 0x09, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x04];
            slave.send_to(&reply, peer).unwrap();
        });

        let mut udp = UdpProtocol::new(config(port));
        udp.open().unwrap();
        let err = udp.read_holding_registers(ctx(9), 0, 2).unwrap_err();
        assert!(matches!(err, ModbusError::TransportTimedOut { .. }));
        handle.join().unwrap();
    }

    #[test]
    fn test_debug() {
        let tcp = TcpProtocol::new(TcpConfig::new("127.0.0.1"));
        let debug_str = format!("{:?}", tcp);
        assert!(debug_str.contains("Modbus TCP"));
        assert!(debug_str.contains("127.0.0.1:502"));
    }
}
