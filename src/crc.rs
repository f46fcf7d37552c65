//! CRC-16/MODBUS for RTU frames.
//!
//! Reflected polynomial 0xA001, initial value 0xFFFF, no final XOR. The CRC
//! is appended low byte first, so running the CRC over a complete frame
//! (payload followed by its CRC) yields zero.
//!
//! # Example
//!
//! ```
//! use modbus_master::crc::{append_crc, crc16, frame_crc_ok};
//!
//! assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);
//!
//! let mut frame = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
//! append_crc(&mut frame);
//! assert_eq!(&frame[6..], &[0x84, 0x0A]);
//! assert!(frame_crc_ok(&frame));
//! ```

use ::crc::{Crc, Digest, CRC_16_MODBUS};

static CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Computes the CRC-16/MODBUS of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Appends the CRC of `frame` to it, low byte first.
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// Returns whether a frame that ends with its CRC checks out.
pub fn frame_crc_ok(frame: &[u8]) -> bool {
    crc16(frame) == 0
}

/// Incremental CRC used while a frame is received byte by byte.
pub struct CrcAccumulator {
    digest: Digest<'static, u16>,
}

impl CrcAccumulator {
    /// Starts a new accumulation.
    pub fn new() -> Self {
        Self {
            digest: CRC_MODBUS.digest(),
        }
    }

    /// Feeds one received byte.
    pub fn push(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// Returns the CRC over every byte pushed so far.
    pub fn value(&self) -> u16 {
        self.digest.clone().finalize()
    }
}

impl Default for CrcAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CrcAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrcAccumulator")
            .field("value", &format_args!("0x{:04X}", self.value()))
            .finish()
    }
}
