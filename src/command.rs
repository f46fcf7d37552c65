//! Request PDU structures and serialization.
//!
//! Each command knows its function code, how to serialize its data
//! big-endian, how long a normal reply is and how to decode it. The framers
//! wrap the PDU in their own envelope (RTU address and CRC, or MBAP header).
//!
//! # Command Types
//!
//! - [`ReadRegistersCommand`] - Read holding (0x03) or input (0x04) registers
//! - [`WriteSingleRegisterCommand`] - Preset one holding register (0x06)
//! - [`WriteMultipleRegistersCommand`] - Preset consecutive holding registers (0x10)
//! - [`MaskWriteRegisterCommand`] - AND/OR mask write of one holding register (0x16)
//!
//! # Example
//!
//! ```
//! use modbus_master::{Command, ReadRegistersCommand};
//!
//! let cmd = ReadRegistersCommand::holding(0x006B, 3).unwrap();
//! assert_eq!(cmd.to_pdu(), vec![0x03, 0x00, 0x6B, 0x00, 0x03]);
//! ```
//!
//! # Constants
//!
//! - [`MAX_READ_REGISTERS`] - Registers per read (125)
//! - [`MAX_RTU_WRITE_REGISTERS`] - Registers per RTU multiple write (123)
//! - [`MAX_WRITE_REGISTERS`] - Registers whose byte count still fits in one byte (127)

use crate::context::TransactionContext;
use crate::error::{ModbusError, Result};
use crate::function::FunctionCode;
use crate::response::ReplyPdu;

/// Maximum number of registers in one read request.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum number of registers in one RTU multiple write request.
pub const MAX_RTU_WRITE_REGISTERS: usize = 123;

/// Maximum number of registers whose byte count can be encoded in a
/// multiple write request.
pub const MAX_WRITE_REGISTERS: usize = 127;

/// Appends `value` big-endian.
pub(crate) fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Checks a point count against a framer limit.
///
/// Zero fails with `InvalidParameter`, anything above `max` with
/// `TooManyPoints`.
pub(crate) fn check_point_count(context: TransactionContext, count: usize, max: usize) -> Result<()> {
    if count == 0 {
        return Err(ModbusError::invalid_parameter(
            "count",
            "must be greater than 0",
        ));
    }
    if count > max {
        return Err(ModbusError::TooManyPoints {
            context,
            count,
            max,
        });
    }
    Ok(())
}

/// A request that can be framed and whose reply can be decoded.
pub trait Command {
    /// Value produced by a successful reply.
    type Output;

    /// Function code of the request.
    fn function_code(&self) -> FunctionCode;

    /// Appends the request data (everything after the function code).
    fn encode_data(&self, buf: &mut Vec<u8>);

    /// Number of data bytes after the function code in a normal reply.
    fn reply_data_len(&self) -> usize;

    /// Decodes a reply whose function code has already been checked.
    fn decode_reply(&self, reply: &ReplyPdu<'_>) -> Result<Self::Output>;

    /// Serializes the complete PDU: function code followed by data.
    fn to_pdu(&self) -> Vec<u8> {
        let mut pdu = vec![self.function_code().code()];
        self.encode_data(&mut pdu);
        pdu
    }
}

/// Command for reading holding or input registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRegistersCommand {
    function: FunctionCode,
    start: u16,
    count: u16,
}

impl ReadRegistersCommand {
    /// Creates a read of holding registers (function 0x03).
    ///
    /// # Errors
    ///
    /// Returns an error if count is 0 or exceeds [`MAX_READ_REGISTERS`].
    pub fn holding(start: u16, count: u16) -> Result<Self> {
        Self::new(FunctionCode::ReadHoldingRegisters, start, count)
    }

    /// Creates a read of input registers (function 0x04).
    ///
    /// # Errors
    ///
    /// Returns an error if count is 0 or exceeds [`MAX_READ_REGISTERS`].
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{Command, FunctionCode, ReadRegistersCommand};
    ///
    /// let cmd = ReadRegistersCommand::input(8, 1).unwrap();
    /// assert_eq!(cmd.function_code(), FunctionCode::ReadInputRegisters);
    /// assert!(ReadRegistersCommand::input(8, 0).is_err());
    /// ```
    pub fn input(start: u16, count: u16) -> Result<Self> {
        Self::new(FunctionCode::ReadInputRegisters, start, count)
    }

    fn new(function: FunctionCode, start: u16, count: u16) -> Result<Self> {
        if count == 0 {
            return Err(ModbusError::invalid_parameter(
                "count",
                "must be greater than 0",
            ));
        }
        if count > MAX_READ_REGISTERS {
            return Err(ModbusError::invalid_parameter(
                "count",
                format!("must not exceed {}", MAX_READ_REGISTERS),
            ));
        }
        Ok(Self {
            function,
            start,
            count,
        })
    }

    /// Starting register address.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Number of registers requested.
    pub fn count(&self) -> u16 {
        self.count
    }
}

impl Command for ReadRegistersCommand {
    type Output = Vec<u16>;

    fn function_code(&self) -> FunctionCode {
        self.function
    }

    fn encode_data(&self, buf: &mut Vec<u8>) {
        put_u16(buf, self.start);
        put_u16(buf, self.count);
    }

    fn reply_data_len(&self) -> usize {
        1 + 2 * self.count as usize
    }

    fn decode_reply(&self, reply: &ReplyPdu<'_>) -> Result<Vec<u16>> {
        reply.to_registers(self.count)
    }
}

/// Command for presetting one holding register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleRegisterCommand {
    address: u16,
    value: u16,
}

impl WriteSingleRegisterCommand {
    /// Creates a new single register write.
    pub fn new(address: u16, value: u16) -> Self {
        Self { address, value }
    }
}

impl Command for WriteSingleRegisterCommand {
    type Output = ();

    fn function_code(&self) -> FunctionCode {
        FunctionCode::PresetSingleRegister
    }

    fn encode_data(&self, buf: &mut Vec<u8>) {
        put_u16(buf, self.address);
        put_u16(buf, self.value);
    }

    fn reply_data_len(&self) -> usize {
        4
    }

    fn decode_reply(&self, reply: &ReplyPdu<'_>) -> Result<()> {
        reply.check_echo(&[("address", self.address), ("value", self.value)])
    }
}

/// Command for presetting consecutive holding registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMultipleRegistersCommand {
    start: u16,
    values: Vec<u16>,
}

impl WriteMultipleRegistersCommand {
    /// Creates a new multiple register write.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is empty or longer than
    /// [`MAX_WRITE_REGISTERS`]. Framers may apply a lower limit.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{Command, WriteMultipleRegistersCommand};
    ///
    /// let cmd = WriteMultipleRegistersCommand::new(1, &[0x000A, 0x0102]).unwrap();
    /// assert_eq!(
    ///     cmd.to_pdu(),
    ///     vec![0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
    /// );
    /// ```
    pub fn new(start: u16, values: &[u16]) -> Result<Self> {
        if values.is_empty() {
            return Err(ModbusError::invalid_parameter("values", "must not be empty"));
        }
        if values.len() > MAX_WRITE_REGISTERS {
            return Err(ModbusError::invalid_parameter(
                "values",
                format!("must not exceed {} registers", MAX_WRITE_REGISTERS),
            ));
        }
        Ok(Self {
            start,
            values: values.to_vec(),
        })
    }

    /// Number of registers written.
    pub fn count(&self) -> u16 {
        self.values.len() as u16
    }
}

impl Command for WriteMultipleRegistersCommand {
    type Output = ();

    fn function_code(&self) -> FunctionCode {
        FunctionCode::PresetMultipleRegisters
    }

    fn encode_data(&self, buf: &mut Vec<u8>) {
        buf.reserve(5 + self.values.len() * 2);
        put_u16(buf, self.start);
        put_u16(buf, self.count());
        buf.push((self.values.len() * 2) as u8);
        for value in &self.values {
            put_u16(buf, *value);
        }
    }

    fn reply_data_len(&self) -> usize {
        4
    }

    fn decode_reply(&self, reply: &ReplyPdu<'_>) -> Result<()> {
        reply.check_echo(&[("start address", self.start), ("point count", self.count())])
    }
}

/// Command for a mask write of one holding register.
///
/// The slave computes `(current & and_mask) | (or_mask & !and_mask)`; see
/// [`apply_mask_write`](crate::utils::apply_mask_write).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskWriteRegisterCommand {
    address: u16,
    and_mask: u16,
    or_mask: u16,
}

impl MaskWriteRegisterCommand {
    /// Creates a new mask write.
    pub fn new(address: u16, and_mask: u16, or_mask: u16) -> Self {
        Self {
            address,
            and_mask,
            or_mask,
        }
    }
}

impl Command for MaskWriteRegisterCommand {
    type Output = ();

    fn function_code(&self) -> FunctionCode {
        FunctionCode::MaskWrite4XRegister
    }

    fn encode_data(&self, buf: &mut Vec<u8>) {
        put_u16(buf, self.address);
        put_u16(buf, self.and_mask);
        put_u16(buf, self.or_mask);
    }

    fn reply_data_len(&self) -> usize {
        6
    }

    fn decode_reply(&self, reply: &ReplyPdu<'_>) -> Result<()> {
        reply.check_echo(&[
            ("address", self.address),
            ("and mask", self.and_mask),
            ("or mask", self.or_mask),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    fn reply(bytes: &[u8]) -> ReplyPdu<'_> {
        ReplyPdu::from_bytes(TransactionContext::new(1), bytes).unwrap()
    }

    #[test]
    fn test_read_holding_serialization() {
        let cmd = ReadRegistersCommand::holding(0x006B, 3).unwrap();
        assert_eq!(cmd.to_pdu(), hex::decode("03006b0003").unwrap());
        assert_eq!(cmd.reply_data_len(), 7);
    }

    #[test]
    fn test_read_input_serialization() {
        let cmd = ReadRegistersCommand::input(0x0008, 1).unwrap();
        assert_eq!(cmd.to_pdu(), vec![0x04, 0x00, 0x08, 0x00, 0x01]);
        assert_eq!(cmd.start(), 8);
        assert_eq!(cmd.count(), 1);
    }

    #[test]
    fn test_read_invalid_count() {
        assert!(ReadRegistersCommand::holding(0, 0).is_err());
        assert!(ReadRegistersCommand::holding(0, 126).is_err());
        assert!(ReadRegistersCommand::holding(0, 125).is_ok());
    }

    #[test]
    fn test_read_decode() {
        let cmd = ReadRegistersCommand::holding(0, 1).unwrap();
        assert_eq!(cmd.decode_reply(&reply(&[0x03, 0x02, 0x00, 0x2A])).unwrap(), vec![42]);
    }

    #[test]
    fn test_write_single_serialization() {
        let cmd = WriteSingleRegisterCommand::new(0x0001, 0x0003);
        assert_eq!(cmd.to_pdu(), vec![0x06, 0x00, 0x01, 0x00, 0x03]);
        assert_eq!(cmd.reply_data_len(), 4);
    }

    #[test]
    fn test_write_single_echo_mismatch() {
        let cmd = WriteSingleRegisterCommand::new(0x0001, 0x0003);
        assert!(cmd.decode_reply(&reply(&[0x06, 0x00, 0x01, 0x00, 0x03])).is_ok());

        let err = cmd
            .decode_reply(&reply(&[0x06, 0x00, 0x01, 0x00, 0x04]))
            .unwrap_err();
        assert!(matches!(
            err.frame_error(),
            Some(FrameError::FieldMismatch { field: "value", .. })
        ));
    }

    #[test]
    fn test_write_multiple_serialization() {
        let cmd = WriteMultipleRegistersCommand::new(0x0001, &[0x000A, 0x0102]).unwrap();
        assert_eq!(cmd.to_pdu(), hex::decode("100001000204000a0102").unwrap());
        assert_eq!(cmd.count(), 2);
    }

    #[test]
    fn test_write_multiple_invalid_values() {
        assert!(WriteMultipleRegistersCommand::new(0, &[]).is_err());
        assert!(WriteMultipleRegistersCommand::new(0, &[0; 128]).is_err());

        let cmd = WriteMultipleRegistersCommand::new(0, &[0; 127]).unwrap();
        let pdu = cmd.to_pdu();
        assert_eq!(pdu[5], 254);
        assert_eq!(pdu.len(), 6 + 254);
    }

    #[test]
    fn test_write_multiple_echo_mismatch() {
        let cmd = WriteMultipleRegistersCommand::new(0x0001, &[1, 2]).unwrap();
        let err = cmd
            .decode_reply(&reply(&[0x10, 0x00, 0x01, 0x00, 0x03]))
            .unwrap_err();
        assert!(matches!(
            err.frame_error(),
            Some(FrameError::FieldMismatch {
                field: "point count",
                expected: 2,
                received: 3
            })
        ));
    }

    #[test]
    fn test_mask_write_serialization() {
        let cmd = MaskWriteRegisterCommand::new(0x0004, 0x00F2, 0x0025);
        assert_eq!(cmd.to_pdu(), hex::decode("16000400f20025").unwrap());
        assert_eq!(cmd.reply_data_len(), 6);
        assert!(cmd
            .decode_reply(&reply(&hex::decode("16000400f20025").unwrap()))
            .is_ok());
    }

    #[test]
    fn test_check_point_count() {
        let ctx = TransactionContext::new(1);
        assert!(check_point_count(ctx, 123, MAX_RTU_WRITE_REGISTERS).is_ok());
        assert!(matches!(
            check_point_count(ctx, 124, MAX_RTU_WRITE_REGISTERS),
            Err(ModbusError::TooManyPoints {
                count: 124,
                max: 123,
                ..
            })
        ));
        assert!(matches!(
            check_point_count(ctx, 0, MAX_RTU_WRITE_REGISTERS),
            Err(ModbusError::InvalidParameter { .. })
        ));
    }
}
