//! Scoped protocol sessions.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::error::Result;
use crate::protocol::MasterProtocol;

/// Opens a protocol for the lifetime of a scope.
///
/// The protocol is opened by [`Session::new`] and closed when the guard is
/// dropped, on every exit path. Close failures on drop are logged and
/// otherwise ignored; call [`Session::close`] to observe them.
///
/// # Example
///
/// ```
/// use modbus_master::{DummyProtocol, MasterProtocol, Session, TransactionContext};
///
/// let mut dummy = DummyProtocol::new();
/// {
///     let mut session = Session::new(&mut dummy).unwrap();
///     session.preset_single_register(TransactionContext::new(1), 0, 42).unwrap();
/// }
/// assert!(!dummy.is_connected());
/// ```
pub struct Session<'a, P: MasterProtocol + ?Sized> {
    protocol: &'a mut P,
}

impl<'a, P: MasterProtocol + ?Sized> Session<'a, P> {
    /// Opens `protocol` and returns the guard.
    ///
    /// # Errors
    ///
    /// Returns the error raised while opening the transport.
    pub fn new(protocol: &'a mut P) -> Result<Self> {
        protocol.open()?;
        Ok(Self { protocol })
    }

    /// Closes the protocol now, reporting any failure.
    pub fn close(self) -> Result<()> {
        // Drop still runs afterwards and finds the protocol closed
        self.protocol.close()
    }
}

impl<P: MasterProtocol + ?Sized> Deref for Session<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.protocol
    }
}

impl<P: MasterProtocol + ?Sized> DerefMut for Session<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.protocol
    }
}

impl<P: MasterProtocol + ?Sized> Drop for Session<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.protocol.close() {
            warn!(
                protocol = self.protocol.protocol_name(),
                error = %e,
                "failed to close Modbus session"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransactionContext;
    use crate::dummy::DummyProtocol;
    use crate::error::ModbusError;

    #[test]
    fn test_session_opens_and_closes() {
        let mut dummy = DummyProtocol::new();
        {
            let session = Session::new(&mut dummy).unwrap();
            assert!(session.is_connected());
        }
        assert!(!dummy.is_connected());
        assert_eq!(dummy.open_count(), 1);
        assert_eq!(dummy.close_count(), 1);
    }

    #[test]
    fn test_session_closes_on_error_path() {
        fn failing(protocol: &mut DummyProtocol) -> Result<()> {
            let mut session = Session::new(protocol)?;
            session.read_coil_status(TransactionContext::new(1), 0, 1)?;
            Ok(())
        }

        let mut dummy = DummyProtocol::new();
        assert!(matches!(
            failing(&mut dummy),
            Err(ModbusError::FunctionNotImplemented { .. })
        ));
        assert!(!dummy.is_connected());
    }

    #[test]
    fn test_session_explicit_close() {
        let mut dummy = DummyProtocol::new();
        let session = Session::new(&mut dummy).unwrap();
        session.close().unwrap();
        assert_eq!(dummy.close_count(), 1);
    }

    #[test]
    fn test_session_over_trait_object() {
        let mut dummy = DummyProtocol::new();
        let protocol: &mut dyn MasterProtocol = &mut dummy;
        let mut session = Session::new(protocol).unwrap();
        assert_eq!(
            session
                .read_input_registers(TransactionContext::new(1), 0, 2)
                .unwrap(),
            vec![0, 0]
        );
    }
}
