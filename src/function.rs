//! Modbus function codes.
//!
//! All 24 public function codes are recognised. This engine implements the
//! register subset:
//!
//! | Code | Function | Implemented |
//! |------|----------|:-----------:|
//! | 0x03 | Read Holding Registers | ✓ |
//! | 0x04 | Read Input Registers | ✓ |
//! | 0x06 | Preset Single Register | ✓ |
//! | 0x10 | Preset Multiple Registers | ✓ |
//! | 0x16 | Mask Write 4X Register | ✓ |
//!
//! Every other code is valid on the wire but calling the matching operation
//! fails with [`ModbusError::FunctionNotImplemented`](crate::ModbusError::FunctionNotImplemented).

use std::fmt;

/// Bit set in the function code of an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Modbus function codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum FunctionCode {
    ReadCoilStatus = 1,
    ReadInputStatus = 2,
    ReadHoldingRegisters = 3,
    ReadInputRegisters = 4,
    ForceSingleCoil = 5,
    PresetSingleRegister = 6,
    ReadExceptionStatus = 7,
    Diagnostics = 8,
    Program484 = 9,
    Poll484 = 10,
    FetchCommEventCtr = 11,
    FetchCommEventLog = 12,
    ProgramController = 13,
    PollController = 14,
    ForceMultipleCoils = 15,
    PresetMultipleRegisters = 16,
    ReportSlave = 17,
    Program884M84 = 18,
    ResetCommLink = 19,
    ReadGeneralReference = 20,
    WriteGeneralReference = 21,
    MaskWrite4XRegister = 22,
    ReadWrite4XRegisters = 23,
    ReadFifoQueue = 24,
}

impl FunctionCode {
    /// Maps a wire value to a function code.
    ///
    /// The exception flag must be stripped by the caller; values outside
    /// `1..=24` return `None`.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::FunctionCode;
    ///
    /// assert_eq!(FunctionCode::from_u8(0x10), Some(FunctionCode::PresetMultipleRegisters));
    /// assert_eq!(FunctionCode::from_u8(0x83), None);
    /// ```
    pub fn from_u8(value: u8) -> Option<Self> {
        use FunctionCode::*;
        let code = match value {
            1 => ReadCoilStatus,
            2 => ReadInputStatus,
            3 => ReadHoldingRegisters,
            4 => ReadInputRegisters,
            5 => ForceSingleCoil,
            6 => PresetSingleRegister,
            7 => ReadExceptionStatus,
            8 => Diagnostics,
            9 => Program484,
            10 => Poll484,
            11 => FetchCommEventCtr,
            12 => FetchCommEventLog,
            13 => ProgramController,
            14 => PollController,
            15 => ForceMultipleCoils,
            16 => PresetMultipleRegisters,
            17 => ReportSlave,
            18 => Program884M84,
            19 => ResetCommLink,
            20 => ReadGeneralReference,
            21 => WriteGeneralReference,
            22 => MaskWrite4XRegister,
            23 => ReadWrite4XRegisters,
            24 => ReadFifoQueue,
            _ => return None,
        };
        Some(code)
    }

    /// Returns the wire value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns whether this engine implements the function.
    pub fn is_implemented(self) -> bool {
        matches!(
            self,
            Self::ReadHoldingRegisters
                | Self::ReadInputRegisters
                | Self::PresetSingleRegister
                | Self::PresetMultipleRegisters
                | Self::MaskWrite4XRegister
        )
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, self.code())
    }
}
