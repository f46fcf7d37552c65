//! Helpers for register values and frame diagnostics.
//!
//! # Example
//!
//! ```
//! use modbus_master::utils::{apply_mask_write, get_bit, set_bit};
//!
//! let status: u16 = 0b0000_0000_0001_0010;
//! assert!(get_bit(status, 1));
//! assert_eq!(set_bit(status, 0, true), 0b0000_0000_0001_0011);
//!
//! // Result of a mask write on the slave
//! assert_eq!(apply_mask_write(0x0012, 0x00F2, 0x0025), 0x0017);
//! ```

use std::fmt::Write;

/// Formats raw frame bytes as space separated hex, e.g. `"01 03 02 00 2A"`.
///
/// Used for frame-level trace logging.
///
/// # Example
///
/// ```
/// use modbus_master::utils::format_frame;
///
/// assert_eq!(format_frame(&[0x01, 0x83, 0x02]), "01 83 02");
/// assert_eq!(format_frame(&[]), "");
/// ```
pub fn format_frame(frame: &[u8]) -> String {
    let mut out = String::with_capacity(frame.len() * 3);
    for (idx, byte) in frame.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

/// Returns the value a slave stores after a mask write (function 0x16).
///
/// Bits set in `and_mask` keep their current value, the others are taken
/// from `or_mask`.
pub fn apply_mask_write(current: u16, and_mask: u16, or_mask: u16) -> u16 {
    (current & and_mask) | (or_mask & !and_mask)
}

/// Gets a single bit (0 is the LSB) of a register.
#[inline]
pub fn get_bit(value: u16, bit: u8) -> bool {
    (value & (1 << bit)) != 0
}

/// Sets or clears a single bit of a register.
#[inline]
pub fn set_bit(value: u16, bit: u8, state: bool) -> u16 {
    if state {
        value | (1 << bit)
    } else {
        value & !(1 << bit)
    }
}

/// Masks that make a mask write touch only `bit`.
///
/// Returns `(and_mask, or_mask)` for
/// [`MasterProtocol::mask_write_4x_register`](crate::MasterProtocol::mask_write_4x_register).
///
/// # Example
///
/// ```
/// use modbus_master::utils::{apply_mask_write, bit_write_masks};
///
/// let (and_mask, or_mask) = bit_write_masks(3, true);
/// assert_eq!(apply_mask_write(0x0000, and_mask, or_mask), 0x0008);
/// assert_eq!(apply_mask_write(0xFFF7, and_mask, or_mask), 0xFFFF);
/// ```
pub fn bit_write_masks(bit: u8, state: bool) -> (u16, u16) {
    let and_mask = !(1u16 << bit);
    let or_mask = if state { 1u16 << bit } else { 0 };
    (and_mask, or_mask)
}

/// Expands a register into its 16 bits, LSB first.
pub fn register_to_bits(value: u16) -> [bool; 16] {
    let mut bits = [false; 16];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = get_bit(value, i as u8);
    }
    bits
}

/// Packs 16 bits, LSB first, into a register.
pub fn bits_to_register(bits: &[bool; 16]) -> u16 {
    bits.iter()
        .enumerate()
        .fold(0, |acc, (i, &bit)| set_bit(acc, i as u8, bit))
}
