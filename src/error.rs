//! Error types for the Modbus master engine.
//!
//! Every failure surfaces as a [`ModbusError`]. Transport failures (open,
//! read, write, timeout) are kept apart from protocol failures (framing,
//! slave exceptions) so that callers can apply their own retry policy; see
//! [`ModbusError::is_transport`].

use std::io;
use thiserror::Error;

use crate::context::TransactionContext;
use crate::exception::ExceptionCode;
use crate::function::FunctionCode;

/// Result type alias for Modbus operations.
pub type Result<T> = std::result::Result<T, ModbusError>;

/// Reasons a received frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// CRC-16 over the received RTU frame did not check out.
    #[error("bad CRC (RX)")]
    BadCrc,

    /// The reply came from a different slave.
    #[error("slave address mismatch: expected {expected}, received {received}")]
    SlaveAddressMismatch {
        /// Address the request was sent to.
        expected: u8,
        /// Address found in the reply.
        received: u8,
    },

    /// The reply function code differs from the request.
    #[error("function code mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    FunctionCodeMismatch {
        /// Function code of the request.
        expected: u8,
        /// Function code found in the reply.
        received: u8,
    },

    /// A length or byte count field disagrees with the data received.
    #[error("{what} mismatch: expected {expected}, received {received}")]
    LengthMismatch {
        /// Which length was checked.
        what: &'static str,
        /// Expected value.
        expected: usize,
        /// Value found in the reply.
        received: usize,
    },

    /// A field echoed by the slave differs from the value sent.
    #[error("{field} mismatch: sent 0x{expected:04X}, echoed 0x{received:04X}")]
    FieldMismatch {
        /// Name of the echoed field.
        field: &'static str,
        /// Value sent in the request.
        expected: u16,
        /// Value echoed in the reply.
        received: u16,
    },

    /// An MBAP header field of the reply does not match the request.
    #[error("invalid MBAP {field}: expected {expected}, received {received}")]
    HeaderMismatch {
        /// Name of the header field.
        field: &'static str,
        /// Value from the request header.
        expected: u16,
        /// Value from the reply header.
        received: u16,
    },

    /// The reply does not contain enough bytes to be decoded.
    #[error("reply is too short ({len} bytes)")]
    ReplyTooShort {
        /// Number of bytes available.
        len: usize,
    },
}

/// Errors that can occur during Modbus communication.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// The transport could not be opened or connected.
    #[error("failed to open transport: {source}")]
    TransportOpen {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading from the transport failed.
    #[error("transport read failed ({context}): {source}")]
    TransportRead {
        /// Request being served.
        context: TransactionContext,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing to the transport failed.
    #[error("transport write failed ({context}): {source}")]
    TransportWrite {
        /// Request being served.
        context: TransactionContext,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The transport did not deliver the expected bytes in time.
    #[error("timeout error ({context})")]
    TransportTimedOut {
        /// Request being served.
        context: TransactionContext,
    },

    /// The reply failed framing validation.
    #[error("invalid reply ({context}): {reason}")]
    Frame {
        /// Request being served.
        context: TransactionContext,
        /// What was wrong with the reply.
        reason: FrameError,
    },

    /// The slave answered with one of the standard exception codes.
    #[error("{code} ({context})")]
    StandardException {
        /// Request being served.
        context: TransactionContext,
        /// Decoded exception code.
        code: ExceptionCode,
    },

    /// The slave answered with a non-standard exception code.
    #[error("unknown Modbus exception code 0x{raw_code:02X} ({context})")]
    UnknownException {
        /// Request being served.
        context: TransactionContext,
        /// Raw exception byte.
        raw_code: u8,
    },

    /// The operation exists in Modbus but is not implemented by this engine.
    #[error("function code {:02X}h not implemented", .function.code())]
    FunctionNotImplemented {
        /// Function that was requested.
        function: FunctionCode,
    },

    /// The operation requires a different connection state.
    #[error("{reason}")]
    ConnectionState {
        /// Description of the state violation.
        reason: String,
    },

    /// More registers were requested than fit in one frame.
    #[error("too many points have been requested: {count} (max {max}) ({context})")]
    TooManyPoints {
        /// Request being served.
        context: TransactionContext,
        /// Requested number of points.
        count: usize,
        /// Maximum accepted by the framer.
        max: usize,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// A transport configuration was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the rejected setting.
        reason: String,
    },
}

impl ModbusError {
    /// Creates a new `Frame` error.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{FrameError, ModbusError, TransactionContext};
    ///
    /// let err = ModbusError::frame(TransactionContext::new(1), FrameError::BadCrc);
    /// assert_eq!(err.to_string(), "invalid reply (slave 1, transaction 0): bad CRC (RX)");
    /// ```
    pub fn frame(context: TransactionContext, reason: FrameError) -> Self {
        Self::Frame { context, reason }
    }

    /// Maps a wire exception byte to the matching error variant.
    ///
    /// Standard codes become [`StandardException`](Self::StandardException),
    /// anything else becomes [`UnknownException`](Self::UnknownException).
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::{ExceptionCode, ModbusError, TransactionContext};
    ///
    /// let err = ModbusError::from_exception(TransactionContext::new(1), 0x02);
    /// assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalDataAddress));
    /// ```
    pub fn from_exception(context: TransactionContext, raw_code: u8) -> Self {
        match ExceptionCode::from_u8(raw_code) {
            Some(code) => Self::StandardException { context, code },
            None => Self::UnknownException { context, raw_code },
        }
    }

    /// Creates a new `FunctionNotImplemented` error.
    pub fn not_implemented(function: FunctionCode) -> Self {
        Self::FunctionNotImplemented { function }
    }

    /// Creates a new `ConnectionState` error.
    pub fn connection_state(reason: impl Into<String>) -> Self {
        Self::ConnectionState {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_master::ModbusError;
    ///
    /// let err = ModbusError::invalid_parameter("count", "must be greater than 0");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Classifies an I/O error raised while reading.
    ///
    /// Timeouts become [`TransportTimedOut`](Self::TransportTimedOut), every
    /// other kind becomes [`TransportRead`](Self::TransportRead).
    pub fn read_failed(context: TransactionContext, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Self::TransportTimedOut { context }
            }
            _ => Self::TransportRead { context, source },
        }
    }

    /// Wraps an I/O error raised while writing.
    pub fn write_failed(context: TransactionContext, source: io::Error) -> Self {
        Self::TransportWrite { context, source }
    }

    /// Returns whether the error was raised at the transport boundary.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportOpen { .. }
                | Self::TransportRead { .. }
                | Self::TransportWrite { .. }
                | Self::TransportTimedOut { .. }
        )
    }

    /// Returns whether an RTU attempt failing with this error may be retried.
    ///
    /// Transport failures and corrupted frames are retryable; a decoded slave
    /// exception is a definitive answer and is not.
    pub fn is_retryable(&self) -> bool {
        self.is_transport() || matches!(self, Self::Frame { .. })
    }

    /// Returns the request context carried by the error, if any.
    pub fn context(&self) -> Option<TransactionContext> {
        match self {
            Self::TransportRead { context, .. }
            | Self::TransportWrite { context, .. }
            | Self::TransportTimedOut { context }
            | Self::Frame { context, .. }
            | Self::StandardException { context, .. }
            | Self::UnknownException { context, .. }
            | Self::TooManyPoints { context, .. } => Some(*context),
            _ => None,
        }
    }

    /// Returns the standard exception code, if the slave answered with one.
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            Self::StandardException { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the frame rejection reason, if any.
    pub fn frame_error(&self) -> Option<&FrameError> {
        match self {
            Self::Frame { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
