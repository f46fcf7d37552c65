//! Reply PDU validation and decoding.
//!
//! Both framers strip their transport envelope (RTU address and CRC, or the
//! MBAP header) and hand the remaining PDU to [`ReplyPdu`]:
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | Function | 1 byte | Echoed function code, high bit set on exception |
//! | Data | Variable | Operation specific data, or the exception code |
//!
//! # Example
//!
//! ```
//! use modbus_master::{FunctionCode, ReplyPdu, TransactionContext};
//!
//! let ctx = TransactionContext::new(1);
//! let bytes = [0x03, 0x04, 0x12, 0x34, 0x56, 0x78];
//!
//! let reply = ReplyPdu::from_bytes(ctx, &bytes).unwrap();
//! reply.check_function(FunctionCode::ReadHoldingRegisters).unwrap();
//! assert_eq!(reply.to_registers(2).unwrap(), vec![0x1234, 0x5678]);
//! ```

use crate::context::TransactionContext;
use crate::error::{FrameError, ModbusError, Result};
use crate::function::{FunctionCode, EXCEPTION_FLAG};

/// Minimum reply PDU size: function code plus one data or exception byte.
pub const MIN_REPLY_PDU_SIZE: usize = 2;

/// Reads a big-endian `u16` at `offset`.
pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Borrowed view of a reply PDU.
#[derive(Debug, Clone, Copy)]
pub struct ReplyPdu<'a> {
    context: TransactionContext,
    function: u8,
    data: &'a [u8],
}

impl<'a> ReplyPdu<'a> {
    /// Wraps raw PDU bytes received for the request described by `context`.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::ReplyTooShort` if fewer than
    /// [`MIN_REPLY_PDU_SIZE`] bytes are available.
    pub fn from_bytes(context: TransactionContext, pdu: &'a [u8]) -> Result<Self> {
        if pdu.len() < MIN_REPLY_PDU_SIZE {
            return Err(ModbusError::frame(
                context,
                FrameError::ReplyTooShort { len: pdu.len() },
            ));
        }
        Ok(Self {
            context,
            function: pdu[0],
            data: &pdu[1..],
        })
    }

    /// Raw function code byte.
    pub fn function(&self) -> u8 {
        self.function
    }

    /// Data following the function code.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns whether the slave answered with an exception.
    pub fn is_exception(&self) -> bool {
        self.function & EXCEPTION_FLAG != 0
    }

    /// Checks the reply against the requested function.
    ///
    /// A function code with the exception flag set is decoded into
    /// [`ModbusError::StandardException`] or
    /// [`ModbusError::UnknownException`] from the next byte, whatever its low
    /// bits. Any other function code fails with
    /// `FrameError::FunctionCodeMismatch`.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{ExceptionCode, FunctionCode, ReplyPdu, TransactionContext};
    ///
    /// let reply = ReplyPdu::from_bytes(TransactionContext::new(1), &[0x83, 0x02]).unwrap();
    /// let err = reply.check_function(FunctionCode::ReadHoldingRegisters).unwrap_err();
    /// assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalDataAddress));
    /// ```
    pub fn check_function(&self, expected: FunctionCode) -> Result<()> {
        if self.function == expected.code() {
            return Ok(());
        }
        if self.is_exception() {
            return Err(ModbusError::from_exception(self.context, self.data[0]));
        }
        Err(ModbusError::frame(
            self.context,
            FrameError::FunctionCodeMismatch {
                expected: expected.code(),
                received: self.function,
            },
        ))
    }

    /// Decodes a register read reply: byte count followed by big-endian values.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::LengthMismatch` if the byte count disagrees with
    /// the data received, is odd, or does not describe `count` registers.
    pub fn to_registers(&self, count: u16) -> Result<Vec<u16>> {
        let byte_count = self.data[0] as usize;
        let payload = &self.data[1..];

        if byte_count != payload.len() {
            return Err(self.length_mismatch("byte count", payload.len(), byte_count));
        }
        if byte_count % 2 != 0 || byte_count / 2 != count as usize {
            return Err(self.length_mismatch("register count", count as usize * 2, byte_count));
        }

        Ok(payload
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect())
    }

    /// Checks that the reply echoes `expected` as consecutive big-endian fields.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::ReplyTooShort` if the reply cannot hold every field,
    /// or `FrameError::FieldMismatch` naming the first field that differs.
    pub fn check_echo(&self, expected: &[(&'static str, u16)]) -> Result<()> {
        if self.data.len() < expected.len() * 2 {
            return Err(ModbusError::frame(
                self.context,
                FrameError::ReplyTooShort {
                    len: self.data.len() + 1,
                },
            ));
        }

        for (idx, (field, value)) in expected.iter().enumerate() {
            let received = read_u16(self.data, idx * 2).unwrap_or_default();
            if received != *value {
                return Err(ModbusError::frame(
                    self.context,
                    FrameError::FieldMismatch {
                        field,
                        expected: *value,
                        received,
                    },
                ));
            }
        }
        Ok(())
    }

    fn length_mismatch(&self, what: &'static str, expected: usize, received: usize) -> ModbusError {
        ModbusError::frame(
            self.context,
            FrameError::LengthMismatch {
                what,
                expected,
                received,
            },
        )
    }
}
