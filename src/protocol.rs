//! The protocol-independent master interface.
//!
//! [`MasterProtocol`] is implemented by [`RtuProtocol`](crate::RtuProtocol),
//! [`TcpIpProtocol`](crate::TcpIpProtocol) and
//! [`DummyProtocol`](crate::DummyProtocol). Application code written against
//! the trait works over any of them, including as `Box<dyn MasterProtocol>`.
//!
//! # Example
//!
//! ```
//! use modbus_master::{DummyProtocol, MasterProtocol, TransactionContext};
//!
//! fn poll(master: &mut dyn MasterProtocol) -> modbus_master::Result<Vec<u16>> {
//!     master.open()?;
//!     master.read_holding_registers(TransactionContext::new(1), 0, 4)
//! }
//!
//! let mut dummy = DummyProtocol::new();
//! assert_eq!(poll(&mut dummy).unwrap(), vec![0; 4]);
//! ```

use tracing::debug;

use crate::context::TransactionContext;
use crate::error::{ModbusError, Result};
use crate::function::FunctionCode;

/// Common interface of every Modbus master protocol.
///
/// Implementors provide the transport hooks and the register operations;
/// the lifecycle and the operations this engine does not implement are
/// provided.
pub trait MasterProtocol {
    /// Short protocol name, e.g. `"Modbus RTU"`.
    fn protocol_name(&self) -> &'static str;

    /// Transport parameters, e.g. `"/dev/ttyUSB0:115200,N,8,1"` or `"host:502"`.
    fn protocol_params(&self) -> String;

    /// Returns whether the transport is open.
    fn is_connected(&self) -> bool;

    /// Opens the underlying transport.
    fn open_transport(&mut self) -> Result<()>;

    /// Closes the underlying transport.
    fn close_transport(&mut self) -> Result<()>;

    /// Opens the protocol. Does nothing when already open.
    fn open(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        debug!(
            protocol = self.protocol_name(),
            params = %self.protocol_params(),
            "opening Modbus master"
        );
        self.open_transport()
    }

    /// Closes the protocol. Does nothing when already closed.
    fn close(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        debug!(
            protocol = self.protocol_name(),
            params = %self.protocol_params(),
            "closing Modbus master"
        );
        self.close_transport()
    }

    /// Reads `count` holding registers starting at `start` (function 0x03).
    fn read_holding_registers(
        &mut self,
        ctx: TransactionContext,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>>;

    /// Reads `count` input registers starting at `start` (function 0x04).
    fn read_input_registers(
        &mut self,
        ctx: TransactionContext,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>>;

    /// Writes one holding register (function 0x06).
    fn preset_single_register(&mut self, ctx: TransactionContext, addr: u16, value: u16)
        -> Result<()>;

    /// Writes consecutive holding registers starting at `start` (function 0x10).
    fn preset_multiple_registers(
        &mut self,
        ctx: TransactionContext,
        start: u16,
        values: &[u16],
    ) -> Result<()>;

    /// Modifies one holding register through AND/OR masks (function 0x16).
    fn mask_write_4x_register(
        &mut self,
        ctx: TransactionContext,
        addr: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> Result<()>;

    /// Function 0x01. Not implemented.
    fn read_coil_status(
        &mut self,
        _ctx: TransactionContext,
        _start: u16,
        _count: u16,
    ) -> Result<Vec<bool>> {
        Err(ModbusError::not_implemented(FunctionCode::ReadCoilStatus))
    }

    /// Function 0x02. Not implemented.
    fn read_input_status(
        &mut self,
        _ctx: TransactionContext,
        _start: u16,
        _count: u16,
    ) -> Result<Vec<bool>> {
        Err(ModbusError::not_implemented(FunctionCode::ReadInputStatus))
    }

    /// Function 0x05. Not implemented.
    fn force_single_coil(&mut self, _ctx: TransactionContext, _addr: u16, _value: bool) -> Result<()> {
        Err(ModbusError::not_implemented(FunctionCode::ForceSingleCoil))
    }

    /// Function 0x0F. Not implemented.
    fn force_multiple_coils(
        &mut self,
        _ctx: TransactionContext,
        _start: u16,
        _values: &[bool],
    ) -> Result<()> {
        Err(ModbusError::not_implemented(FunctionCode::ForceMultipleCoils))
    }

    /// Function 0x07. Not implemented.
    fn read_exception_status(&mut self, _ctx: TransactionContext) -> Result<u8> {
        Err(ModbusError::not_implemented(FunctionCode::ReadExceptionStatus))
    }

    /// Function 0x08. Not implemented.
    fn diagnostics(
        &mut self,
        _ctx: TransactionContext,
        _sub_function: u16,
        _data: u16,
    ) -> Result<u16> {
        Err(ModbusError::not_implemented(FunctionCode::Diagnostics))
    }

    /// Function 0x11. Not implemented.
    fn report_slave(&mut self, _ctx: TransactionContext) -> Result<Vec<u8>> {
        Err(ModbusError::not_implemented(FunctionCode::ReportSlave))
    }

    /// Function 0x17. Not implemented.
    fn read_write_4x_registers(
        &mut self,
        _ctx: TransactionContext,
        _read_start: u16,
        _read_count: u16,
        _write_start: u16,
        _values: &[u16],
    ) -> Result<Vec<u16>> {
        Err(ModbusError::not_implemented(FunctionCode::ReadWrite4XRegisters))
    }

    /// Function 0x18. Not implemented.
    fn read_fifo_queue(&mut self, _ctx: TransactionContext, _fifo_addr: u16) -> Result<Vec<u16>> {
        Err(ModbusError::not_implemented(FunctionCode::ReadFifoQueue))
    }
}
