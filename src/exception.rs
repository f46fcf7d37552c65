//! Standard Modbus exception codes and their catalog text.
//!
//! A slave that cannot serve a request answers with the function code's high
//! bit set and a one-byte exception code. The eight codes defined by the
//! Modbus application protocol are modelled by [`ExceptionCode`]; each one
//! carries a short [`text`](ExceptionCode::text) and a long
//! [`description`](ExceptionCode::description).
//!
//! # Example
//!
//! ```
//! use modbus_master::ExceptionCode;
//!
//! let code = ExceptionCode::from_u8(0x02).unwrap();
//! assert_eq!(code, ExceptionCode::IllegalDataAddress);
//! assert_eq!(code.text(), "Illegal Data Address");
//!
//! // Values outside 1..=8 are not standard exceptions
//! assert!(ExceptionCode::from_u8(0x0B).is_none());
//! ```

use std::fmt;

/// Exception codes defined by the Modbus application protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExceptionCode {
    /// The function code is not an allowable action for the slave.
    IllegalFunction = 0x01,
    /// The data address is not an allowable address for the slave.
    IllegalDataAddress = 0x02,
    /// A value in the query data field is not allowable for the slave.
    IllegalDataValue = 0x03,
    /// An unrecoverable error occurred while performing the action.
    SlaveDeviceFailure = 0x04,
    /// The request was accepted but needs a long time to complete.
    Acknowledge = 0x05,
    /// The slave is busy with a long-duration command.
    SlaveDeviceBusy = 0x06,
    /// The slave cannot perform the program function.
    NegativeAcknowledge = 0x07,
    /// Parity error detected in extended memory.
    MemoryParityError = 0x08,
}

impl ExceptionCode {
    /// All standard exception codes in wire order.
    pub const ALL: [ExceptionCode; 8] = [
        Self::IllegalFunction,
        Self::IllegalDataAddress,
        Self::IllegalDataValue,
        Self::SlaveDeviceFailure,
        Self::Acknowledge,
        Self::SlaveDeviceBusy,
        Self::NegativeAcknowledge,
        Self::MemoryParityError,
    ];

    /// Maps a wire value to a standard exception code.
    ///
    /// Returns `None` for values outside `1..=8`.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::IllegalFunction),
            0x02 => Some(Self::IllegalDataAddress),
            0x03 => Some(Self::IllegalDataValue),
            0x04 => Some(Self::SlaveDeviceFailure),
            0x05 => Some(Self::Acknowledge),
            0x06 => Some(Self::SlaveDeviceBusy),
            0x07 => Some(Self::NegativeAcknowledge),
            0x08 => Some(Self::MemoryParityError),
            _ => None,
        }
    }

    /// Returns the wire value of this code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns the short catalog text.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::ExceptionCode;
    ///
    /// assert_eq!(ExceptionCode::SlaveDeviceBusy.text(), "Slave Device Busy");
    /// ```
    pub fn text(self) -> &'static str {
        match self {
            Self::IllegalFunction => "Illegal Function",
            Self::IllegalDataAddress => "Illegal Data Address",
            Self::IllegalDataValue => "Illegal Data Value",
            Self::SlaveDeviceFailure => "Slave Device Failure",
            Self::Acknowledge => "Acknowledge",
            Self::SlaveDeviceBusy => "Slave Device Busy",
            Self::NegativeAcknowledge => "Negative Acknowledge",
            Self::MemoryParityError => "Memory Parity Error",
        }
    }

    /// Returns the long catalog description.
    pub fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => {
                "The function code received in the query is not an allowable action \
                 for the slave. If a Poll Program Complete command was issued, this \
                 code indicates that no program function preceded it."
            }
            Self::IllegalDataAddress => {
                "The data address received in the query is not an allowable address \
                 for the slave."
            }
            Self::IllegalDataValue => {
                "A value contained in the query data field is not an allowable value \
                 for the slave."
            }
            Self::SlaveDeviceFailure => {
                "An unrecoverable error occurred while the slave was attempting to \
                 perform the requested action."
            }
            Self::Acknowledge => {
                "The slave has accepted the request and is processing it, but a long \
                 duration of time will be required to do so. This response is returned \
                 to prevent a timeout error from occurring in the master. The master \
                 can next issue a Poll Program Complete message to determine if \
                 processing is completed."
            }
            Self::SlaveDeviceBusy => {
                "The slave is engaged in processing a long-duration program command. \
                 The master should retransmit the message later when the slave is free."
            }
            Self::NegativeAcknowledge => {
                "The slave cannot perform the program function received in the query. \
                 This code is returned for an unsuccessful programming request using \
                 function code 13 or 14 decimal. The master should request diagnostic \
                 or error information from the slave."
            }
            Self::MemoryParityError => {
                "The slave attempted to read extended memory, but detected a parity \
                 error in the memory. The master can retry the request, but service \
                 may be required on the slave device."
            }
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_covers_all_standard_codes() {
        for (idx, code) in ExceptionCode::ALL.iter().enumerate() {
            let wire = (idx + 1) as u8;
            assert_eq!(ExceptionCode::from_u8(wire), Some(*code));
            assert_eq!(code.code(), wire);
        }
    }

    #[test]
    fn test_from_u8_rejects_unknown() {
        assert!(ExceptionCode::from_u8(0x00).is_none());
        assert!(ExceptionCode::from_u8(0x09).is_none());
        assert!(ExceptionCode::from_u8(0xFF).is_none());
    }

    #[test]
    fn test_catalog_text() {
        assert_eq!(ExceptionCode::IllegalFunction.text(), "Illegal Function");
        assert_eq!(ExceptionCode::MemoryParityError.text(), "Memory Parity Error");
        assert_eq!(
            ExceptionCode::NegativeAcknowledge.to_string(),
            "Negative Acknowledge"
        );
    }

    #[test]
    fn test_catalog_description() {
        assert_eq!(
            ExceptionCode::IllegalDataAddress.description(),
            "The data address received in the query is not an allowable address for the slave."
        );
        assert!(ExceptionCode::NegativeAcknowledge
            .description()
            .contains("function code 13 or 14 decimal"));
        for code in ExceptionCode::ALL {
            assert!(!code.description().contains("  "));
        }
    }
}
