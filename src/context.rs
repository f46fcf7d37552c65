//! Per-request addressing.

use std::fmt;

/// Addressing information for a single request.
///
/// The slave address selects the remote device (the MBAP unit identifier on
/// TCP/UDP). The transaction identifier is only meaningful on TCP/UDP, where
/// it correlates a reply with its request; RTU ignores it.
///
/// # Example
///
/// ```
/// use modbus_master::TransactionContext;
///
/// let rtu = TransactionContext::new(17);
/// assert_eq!(rtu.transaction_id, 0);
///
/// let tcp = TransactionContext::new(1).with_transaction_id(7);
/// assert_eq!(tcp.slave_addr, 1);
/// assert_eq!(tcp.transaction_id, 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransactionContext {
    /// Target slave (unit) address.
    pub slave_addr: u8,
    /// MBAP transaction identifier.
    pub transaction_id: u16,
}

impl TransactionContext {
    /// Creates a context for `slave_addr` with transaction id 0.
    pub fn new(slave_addr: u8) -> Self {
        Self {
            slave_addr,
            transaction_id: 0,
        }
    }

    /// Sets the transaction identifier.
    pub fn with_transaction_id(mut self, transaction_id: u16) -> Self {
        self.transaction_id = transaction_id;
        self
    }
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slave {}, transaction {}",
            self.slave_addr, self.transaction_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = TransactionContext::new(5);
        assert_eq!(ctx.slave_addr, 5);
        assert_eq!(ctx.transaction_id, 0);
        assert_eq!(TransactionContext::default(), TransactionContext::new(0));
    }

    #[test]
    fn test_context_display() {
        let ctx = TransactionContext::new(1).with_transaction_id(7);
        assert_eq!(ctx.to_string(), "slave 1, transaction 7");
    }
}
