//! In-memory protocol for tests and offline use.

use crate::context::TransactionContext;
use crate::error::Result;
use crate::protocol::MasterProtocol;

/// A protocol without a transport.
///
/// Tracks its open/closed state and accepts every register operation:
/// reads return zeroed registers, writes are discarded.
///
/// # Example
///
/// ```
/// use modbus_master::{DummyProtocol, MasterProtocol, TransactionContext};
///
/// let mut dummy = DummyProtocol::new();
/// dummy.open().unwrap();
/// dummy.open().unwrap();
/// assert_eq!(dummy.open_count(), 1);
/// assert_eq!(dummy.protocol_name(), "Dummy Modbus");
/// ```
#[derive(Debug, Default)]
pub struct DummyProtocol {
    connected: bool,
    opens: usize,
    closes: usize,
}

impl DummyProtocol {
    /// Creates a closed dummy protocol.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transport-level opens so far.
    pub fn open_count(&self) -> usize {
        self.opens
    }

    /// Number of transport-level closes so far.
    pub fn close_count(&self) -> usize {
        self.closes
    }
}

impl MasterProtocol for DummyProtocol {
    fn protocol_name(&self) -> &'static str {
        "Dummy Modbus"
    }

    fn protocol_params(&self) -> String {
        String::new()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn open_transport(&mut self) -> Result<()> {
        self.connected = true;
        self.opens += 1;
        Ok(())
    }

    fn close_transport(&mut self) -> Result<()> {
        self.connected = false;
        self.closes += 1;
        Ok(())
    }

    fn read_holding_registers(
        &mut self,
        _ctx: TransactionContext,
        _start: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        Ok(vec![0; count as usize])
    }

    fn read_input_registers(
        &mut self,
        _ctx: TransactionContext,
        _start: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        Ok(vec![0; count as usize])
    }

    fn preset_single_register(
        &mut self,
        _ctx: TransactionContext,
        _addr: u16,
        _value: u16,
    ) -> Result<()> {
        Ok(())
    }

    fn preset_multiple_registers(
        &mut self,
        _ctx: TransactionContext,
        _start: u16,
        _values: &[u16],
    ) -> Result<()> {
        Ok(())
    }

    fn mask_write_4x_register(
        &mut self,
        _ctx: TransactionContext,
        _addr: u16,
        _and_mask: u16,
        _or_mask: u16,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModbusError;
    use crate::function::FunctionCode;

    #[test]
    fn test_open_close_idempotent() {
        let mut dummy = DummyProtocol::new();
        assert!(!dummy.is_connected());

        dummy.open().unwrap();
        dummy.open().unwrap();
        assert!(dummy.is_connected());
        assert_eq!(dummy.open_count(), 1);

        dummy.close().unwrap();
        dummy.close().unwrap();
        assert!(!dummy.is_connected());
        assert_eq!(dummy.close_count(), 1);
    }

    #[test]
    fn test_close_without_open() {
        let mut dummy = DummyProtocol::new();
        dummy.close().unwrap();
        assert_eq!(dummy.close_count(), 0);
    }

    #[test]
    fn test_register_operations() {
        let ctx = TransactionContext::new(1);
        let mut dummy = DummyProtocol::new();
        assert_eq!(dummy.read_holding_registers(ctx, 0, 3).unwrap(), vec![0, 0, 0]);
        assert!(dummy.preset_single_register(ctx, 0, 1).is_ok());
        assert!(dummy.preset_multiple_registers(ctx, 0, &[1, 2]).is_ok());
        assert!(dummy.mask_write_4x_register(ctx, 0, 0xFF00, 0x0012).is_ok());
    }

    #[test]
    fn test_unimplemented_operations() {
        let ctx = TransactionContext::new(1);
        let mut dummy = DummyProtocol::new();

        let cases = [
            (dummy.read_coil_status(ctx, 0, 1).unwrap_err(), FunctionCode::ReadCoilStatus),
            (dummy.read_input_status(ctx, 0, 1).unwrap_err(), FunctionCode::ReadInputStatus),
            (dummy.force_single_coil(ctx, 0, true).unwrap_err(), FunctionCode::ForceSingleCoil),
            (
                dummy.force_multiple_coils(ctx, 0, &[true]).unwrap_err(),
                FunctionCode::ForceMultipleCoils,
            ),
            (dummy.read_exception_status(ctx).unwrap_err(), FunctionCode::ReadExceptionStatus),
            (dummy.diagnostics(ctx, 0, 0).unwrap_err(), FunctionCode::Diagnostics),
            (dummy.report_slave(ctx).unwrap_err(), FunctionCode::ReportSlave),
            (
                dummy.read_write_4x_registers(ctx, 0, 1, 0, &[1]).unwrap_err(),
                FunctionCode::ReadWrite4XRegisters,
            ),
            (dummy.read_fifo_queue(ctx, 0).unwrap_err(), FunctionCode::ReadFifoQueue),
        ];

        for (err, expected) in cases {
            match err {
                ModbusError::FunctionNotImplemented { function } => assert_eq!(function, expected),
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
