//! Modbus RTU master over a serial line.
//!
//! This module provides [`RtuProtocol`], which frames requests as
//! `[address][function][data...][crc lo][crc hi]` and validates the replies.
//!
//! # Overview
//!
//! Every request goes through a retry loop of `retry_count + 1` attempts.
//! Each attempt:
//! - purges stale input and writes the frame
//! - optionally discards the local echo of the frame (`cancel_tx_echo`)
//! - receives the reply byte by byte, shortening the expected length to 5
//!   bytes as soon as the function byte carries the exception flag
//! - checks the CRC, the slave address and the function code
//!
//! Transport failures and corrupted frames are retried; a slave exception
//! is an answer and ends the loop. Only the error of the final attempt is
//! returned.
//!
//! # Example
//!
//! ```no_run
//! use modbus_master::{MasterProtocol, RtuProtocol, SerialConfig, TransactionContext};
//!
//! let mut rtu = RtuProtocol::new("/dev/ttyUSB0", SerialConfig::new(19200)).with_retry_count(2);
//! rtu.open()?;
//!
//! let ctx = TransactionContext::new(17);
//! let values = rtu.read_holding_registers(ctx, 0x006B, 3)?;
//! rtu.preset_single_register(ctx, 0x0001, 0x0003)?;
//! # Ok::<(), modbus_master::ModbusError>(())
//! ```

use std::fmt;

use tracing::{trace, warn};

use crate::command::{
    check_point_count, Command, MaskWriteRegisterCommand, ReadRegistersCommand,
    WriteMultipleRegistersCommand, WriteSingleRegisterCommand, MAX_READ_REGISTERS,
    MAX_RTU_WRITE_REGISTERS,
};
use crate::context::TransactionContext;
use crate::crc::{append_crc, CrcAccumulator};
use crate::error::{FrameError, ModbusError, Result};
use crate::function::{FunctionCode, EXCEPTION_FLAG};
use crate::protocol::MasterProtocol;
use crate::response::ReplyPdu;
use crate::serial::{DataBits, Parity, SerialConfig, SerialPortTransport, SerialTransport, StopBits};
use crate::utils::format_frame;

/// Default number of retries after a failed attempt.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Length of an RTU exception reply: address, function, code and CRC.
pub const EXCEPTION_FRAME_LEN: usize = 5;

/// Address, function code and CRC around the data of an RTU frame.
const RTU_OVERHEAD: usize = 4;

/// Direction of a frame reported to the flow handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowDirection {
    /// Frame sent to the slave.
    Tx,
    /// Frame received from the slave.
    Rx,
}

/// Observer called with every raw frame sent or received.
pub type FlowHandler = Box<dyn FnMut(FlowDirection, &[u8]) + Send>;

/// Modbus RTU master.
///
/// Generic over the [`SerialTransport`] so that tests and alternative
/// drivers can stand in for the serial port.
///
/// Failed attempts are retried when [`ModbusError::is_retryable`] holds:
/// transport failures and corrupted or mismatched frames. This is wider than
/// retrying transport failures alone, yet narrower than retrying every
/// failure, since slave exceptions and parameter errors end the request at
/// once.
pub struct RtuProtocol<T: SerialTransport = SerialPortTransport> {
    transport: T,
    retry_count: u32,
    cancel_tx_echo: bool,
    flow_handler: Option<FlowHandler>,
}

impl RtuProtocol<SerialPortTransport> {
    /// Creates a closed RTU master on the serial device `port_name`.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{MasterProtocol, RtuProtocol, SerialConfig};
    ///
    /// let rtu = RtuProtocol::new("/dev/ttyUSB0", SerialConfig::default());
    /// assert_eq!(rtu.protocol_name(), "Modbus RTU");
    /// assert_eq!(rtu.protocol_params(), "/dev/ttyUSB0:115200,N,8,1");
    /// assert_eq!(rtu.retry_count(), 3);
    /// ```
    pub fn new(port_name: impl Into<String>, config: SerialConfig) -> Self {
        Self::with_transport(SerialPortTransport::new(port_name, config))
    }
}

impl<T: SerialTransport> RtuProtocol<T> {
    /// Creates an RTU master over an existing transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            retry_count: DEFAULT_RETRY_COUNT,
            cancel_tx_echo: false,
            flow_handler: None,
        }
    }

    /// Sets the number of retries after a failed attempt.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Discards the echo of each transmitted frame, for half-duplex
    /// adapters that loop back their own output.
    pub fn with_cancel_tx_echo(mut self, cancel_tx_echo: bool) -> Self {
        self.cancel_tx_echo = cancel_tx_echo;
        self
    }

    /// Number of retries after a failed attempt.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether the transmit echo is discarded.
    pub fn cancel_tx_echo(&self) -> bool {
        self.cancel_tx_echo
    }

    /// Enables or disables discarding the transmit echo.
    pub fn set_cancel_tx_echo(&mut self, cancel_tx_echo: bool) {
        self.cancel_tx_echo = cancel_tx_echo;
    }

    /// Installs a flow handler and returns the one it replaces.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{FlowDirection, RtuProtocol, SerialConfig};
    ///
    /// let mut rtu = RtuProtocol::new("COM3", SerialConfig::default());
    /// let previous = rtu.set_flow_handler(Some(Box::new(|dir: FlowDirection, frame: &[u8]| {
    ///     println!("{:?} {:02X?}", dir, frame);
    /// })));
    /// assert!(previous.is_none());
    /// ```
    pub fn set_flow_handler(&mut self, handler: Option<FlowHandler>) -> Option<FlowHandler> {
        std::mem::replace(&mut self.flow_handler, handler)
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Serial device path.
    pub fn port_name(&self) -> &str {
        self.transport.port_name()
    }

    /// Changes the serial device path.
    ///
    /// # Errors
    ///
    /// Returns `ModbusError::ConnectionState` while the port is open.
    pub fn set_port_name(&mut self, name: &str) -> Result<()> {
        if self.transport.is_open() {
            return Err(ModbusError::connection_state(
                "unable to change the serial port while it is open",
            ));
        }
        self.transport.set_port_name(name);
        Ok(())
    }

    /// Current serial line settings.
    pub fn serial_config(&self) -> &SerialConfig {
        self.transport.config()
    }

    /// Applies new serial line settings.
    ///
    /// Applied immediately when the port is open, stored for the next open
    /// otherwise. The current settings are kept if the new ones are rejected.
    ///
    /// # Errors
    ///
    /// Returns `ModbusError::InvalidConfig` if the settings are invalid or
    /// the device refuses them.
    pub fn set_serial_config(&mut self, config: SerialConfig) -> Result<()> {
        config.validate()?;
        self.transport
            .configure(&config)
            .map_err(|e| ModbusError::invalid_config(format!("{} rejected: {}", config, e)))
    }

    /// Changes the baud rate.
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        let config = SerialConfig {
            baud_rate,
            ..*self.serial_config()
        };
        self.set_serial_config(config)
    }

    /// Changes the parity.
    pub fn set_parity(&mut self, parity: Parity) -> Result<()> {
        let config = self.serial_config().with_parity(parity);
        self.set_serial_config(config)
    }

    /// Changes the data bits.
    pub fn set_data_bits(&mut self, data_bits: DataBits) -> Result<()> {
        let config = self.serial_config().with_data_bits(data_bits);
        self.set_serial_config(config)
    }

    /// Changes the stop bits.
    pub fn set_stop_bits(&mut self, stop_bits: StopBits) -> Result<()> {
        let config = self.serial_config().with_stop_bits(stop_bits);
        self.set_serial_config(config)
    }

    fn emit(&mut self, direction: FlowDirection, frame: &[u8]) {
        if let Some(handler) = self.flow_handler.as_mut() {
            handler(direction, frame);
        }
    }

    /// Frames `cmd`, runs the retry loop and decodes the reply.
    fn execute<C: Command>(&mut self, ctx: TransactionContext, cmd: &C) -> Result<C::Output> {
        if !self.transport.is_open() {
            return Err(ModbusError::connection_state("serial port is not open"));
        }

        let pdu = cmd.to_pdu();
        let mut tx = Vec::with_capacity(RTU_OVERHEAD + pdu.len());
        tx.push(ctx.slave_addr);
        tx.extend_from_slice(&pdu);
        append_crc(&mut tx);

        let expected_len = RTU_OVERHEAD + cmd.reply_data_len();
        let rx = self.exchange(ctx, cmd.function_code(), &tx, expected_len)?;

        let reply = ReplyPdu::from_bytes(ctx, &rx[1..rx.len() - 2])?;
        cmd.decode_reply(&reply)
    }

    fn exchange(
        &mut self,
        ctx: TransactionContext,
        function: FunctionCode,
        tx: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            match self.attempt(ctx, function, tx, expected_len) {
                Ok(rx) => return Ok(rx),
                Err(e) if attempt < self.retry_count && e.is_retryable() => {
                    attempt += 1;
                    warn!(
                        port = self.transport.port_name(),
                        slave = ctx.slave_addr,
                        attempt,
                        retries = self.retry_count,
                        error = %e,
                        "retrying Modbus RTU request"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn attempt(
        &mut self,
        ctx: TransactionContext,
        function: FunctionCode,
        tx: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>> {
        self.transport
            .purge_input()
            .map_err(|e| ModbusError::read_failed(ctx, e))?;

        trace!(port = self.transport.port_name(), frame = %format_frame(tx), "RTU TX");
        self.emit(FlowDirection::Tx, tx);
        self.transport
            .write_bytes(tx)
            .map_err(|e| ModbusError::write_failed(ctx, e))?;

        if self.cancel_tx_echo {
            for _ in 0..tx.len() {
                self.read_byte(ctx)?;
            }
        }

        let mut crc = CrcAccumulator::new();
        let mut rx = Vec::with_capacity(expected_len);
        let mut expected = expected_len;
        while rx.len() < expected {
            let byte = self.read_byte(ctx)?;
            crc.push(byte);
            if rx.len() == 1 && byte & EXCEPTION_FLAG != 0 {
                expected = EXCEPTION_FRAME_LEN;
            }
            rx.push(byte);
        }

        trace!(port = self.transport.port_name(), frame = %format_frame(&rx), "RTU RX");
        self.emit(FlowDirection::Rx, &rx);

        if crc.value() != 0 {
            return Err(ModbusError::frame(ctx, FrameError::BadCrc));
        }
        if rx[0] != ctx.slave_addr {
            return Err(ModbusError::frame(
                ctx,
                FrameError::SlaveAddressMismatch {
                    expected: ctx.slave_addr,
                    received: rx[0],
                },
            ));
        }
        ReplyPdu::from_bytes(ctx, &rx[1..rx.len() - 2])?.check_function(function)?;

        Ok(rx)
    }

    fn read_byte(&mut self, ctx: TransactionContext) -> Result<u8> {
        let bytes = self
            .transport
            .read_bytes(1)
            .map_err(|e| ModbusError::read_failed(ctx, e))?;
        bytes
            .first()
            .copied()
            .ok_or(ModbusError::TransportTimedOut { context: ctx })
    }
}

impl<T: SerialTransport> MasterProtocol for RtuProtocol<T> {
    fn protocol_name(&self) -> &'static str {
        "Modbus RTU"
    }

    fn protocol_params(&self) -> String {
        format!("{}:{}", self.transport.port_name(), self.transport.config())
    }

    fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    fn open_transport(&mut self) -> Result<()> {
        self.transport.config().validate()?;
        self.transport
            .open()
            .map_err(|source| ModbusError::TransportOpen { source })
    }

    fn close_transport(&mut self) -> Result<()> {
        self.transport
            .close()
            .map_err(|e| ModbusError::connection_state(format!("failed to close serial port: {}", e)))
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
        check_point_count(ctx, values.len(), MAX_RTU_WRITE_REGISTERS)?;
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

impl<T: SerialTransport> Drop for RtuProtocol<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(port = self.transport.port_name(), error = %e, "failed to close serial port on drop");
        }
    }
}

impl<T: SerialTransport> fmt::Debug for RtuProtocol<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RtuProtocol")
            .field("params", &self.protocol_params())
            .field("open", &self.transport.is_open())
            .field("retry_count", &self.retry_count)
            .field("cancel_tx_echo", &self.cancel_tx_echo)
            .field("flow_handler", &self.flow_handler.is_some())
            .finish()
    }
}
