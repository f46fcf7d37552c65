//! MBAP header used by Modbus TCP and UDP.
//!
//! # MBAP Header Structure
//!
//! The MBAP header is a 7-byte structure that precedes every PDU on TCP/UDP:
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0-1 | Transaction ID | Echoed by the slave, big-endian |
//! | 2-3 | Protocol ID | Always 0 for Modbus |
//! | 4-5 | Length | Number of following bytes (unit id + PDU) |
//! | 6 | Unit ID | Slave address |
//!
//! # Example
//!
//! ```
//! use modbus_master::{MbapHeader, TransactionContext};
//!
//! let ctx = TransactionContext::new(1).with_transaction_id(7);
//! let header = MbapHeader::for_request(ctx, 5);
//! assert_eq!(header.to_bytes(), [0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01]);
//! ```

use crate::context::TransactionContext;
use crate::error::{FrameError, ModbusError, Result};

/// MBAP header size in bytes.
pub const MBAP_HEADER_SIZE: usize = 7;

/// Protocol identifier for Modbus.
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// MBAP header (7 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Transaction identifier.
    pub transaction_id: u16,
    /// Protocol identifier (0 for Modbus).
    pub protocol_id: u16,
    /// Byte count of the unit identifier plus the PDU.
    pub length: u16,
    /// Unit identifier (slave address).
    pub unit_id: u8,
}

impl MbapHeader {
    /// Creates the header for a request PDU of `pdu_len` bytes.
    pub fn for_request(context: TransactionContext, pdu_len: usize) -> Self {
        Self {
            transaction_id: context.transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            length: (pdu_len + 1) as u16,
            unit_id: context.slave_addr,
        }
    }

    /// Serializes the header to bytes.
    pub fn to_bytes(self) -> [u8; MBAP_HEADER_SIZE] {
        let [tid_hi, tid_lo] = self.transaction_id.to_be_bytes();
        let [pid_hi, pid_lo] = self.protocol_id.to_be_bytes();
        let [len_hi, len_lo] = self.length.to_be_bytes();
        [tid_hi, tid_lo, pid_hi, pid_lo, len_hi, len_lo, self.unit_id]
    }

    /// Parses a header received for the request described by `context`.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::ReplyTooShort` if the slice is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{MbapHeader, TransactionContext};
    ///
    /// let bytes = [0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01];
    /// let header = MbapHeader::from_bytes(TransactionContext::new(1), &bytes).unwrap();
    /// assert_eq!(header.transaction_id, 7);
    /// assert_eq!(header.pdu_len(), 5);
    /// ```
    pub fn from_bytes(context: TransactionContext, data: &[u8]) -> Result<Self> {
        if data.len() < MBAP_HEADER_SIZE {
            return Err(ModbusError::frame(
                context,
                FrameError::ReplyTooShort { len: data.len() },
            ));
        }

        Ok(Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            protocol_id: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
            unit_id: data[6],
        })
    }

    /// Number of PDU bytes following the header.
    pub fn pdu_len(self) -> usize {
        (self.length as usize).saturating_sub(1)
    }

    /// Checks a reply header against this request header.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::HeaderMismatch` naming the first field that
    /// differs, or `FrameError::ReplyTooShort` if the reply announces no PDU.
    pub fn check_reply(self, context: TransactionContext, reply: &MbapHeader) -> Result<()> {
        let fields = [
            ("transaction identifier", self.transaction_id, reply.transaction_id),
            ("protocol identifier", self.protocol_id, reply.protocol_id),
            ("unit identifier", self.unit_id as u16, reply.unit_id as u16),
        ];
        for (field, expected, received) in fields {
            if expected != received {
                return Err(ModbusError::frame(
                    context,
                    FrameError::HeaderMismatch {
                        field,
                        expected,
                        received,
                    },
                ));
            }
        }

        if reply.length == 0 {
            return Err(ModbusError::frame(
                context,
                FrameError::ReplyTooShort {
                    len: MBAP_HEADER_SIZE,
                },
            ));
        }
        Ok(())
    }
}
