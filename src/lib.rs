//! # Modbus Master Library
//!
//! A Rust library implementing the master (client) side of Modbus over a
//! serial line (RTU) and over IP (TCP and UDP with the MBAP header).
//!
//! This is a **protocol-only** library: no polling, schedulers or register
//! maps. Each call performs one request/reply exchange; the RTU framer adds
//! a bounded retry loop, everything else is left to the application.
//!
//! ## Features
//!
//! - **One interface** - [`MasterProtocol`] is implemented by the RTU, TCP,
//!   UDP and dummy protocols and is object safe
//! - **Typed failures** - transport errors, framing errors and slave
//!   exceptions are distinct variants of [`ModbusError`]
//! - **Static dispatch** - framers are generic over their transport, so
//!   tests and custom drivers plug in without boxing
//! - **No panics** - all errors returned as `Result<T, ModbusError>`
//! - **Observable** - frames are logged through `tracing` and RTU traffic
//!   can be tapped with a flow handler
//!
//! ## Quick Start
//!
//! ```no_run
//! use modbus_master::{MasterProtocol, RtuProtocol, SerialConfig, TransactionContext};
//!
//! fn main() -> modbus_master::Result<()> {
//!     let mut rtu = RtuProtocol::new("/dev/ttyUSB0", SerialConfig::new(19200));
//!     rtu.open()?;
//!
//!     let ctx = TransactionContext::new(17);
//!     let values = rtu.read_holding_registers(ctx, 0x006B, 3)?;
//!     println!("40108-40110: {:?}", values);
//!
//!     rtu.preset_multiple_registers(ctx, 0x0001, &[0x000A, 0x0102])?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Functions
//!
//! | Code | Operation | Method |
//! |------|-----------|--------|
//! | 0x03 | Read Holding Registers | [`MasterProtocol::read_holding_registers`] |
//! | 0x04 | Read Input Registers | [`MasterProtocol::read_input_registers`] |
//! | 0x06 | Preset Single Register | [`MasterProtocol::preset_single_register`] |
//! | 0x10 | Preset Multiple Registers | [`MasterProtocol::preset_multiple_registers`] |
//! | 0x16 | Mask Write 4X Register | [`MasterProtocol::mask_write_4x_register`] |
//!
//! The remaining public function codes are part of the interface and fail
//! with [`ModbusError::FunctionNotImplemented`].
//!
//! ## Sessions
//!
//! [`Session`] opens a protocol and closes it on every exit path:
//!
//! ```no_run
//! use modbus_master::{MasterProtocol, Session, TcpConfig, TcpProtocol, TransactionContext};
//!
//! let mut tcp = TcpProtocol::new(TcpConfig::new("192.168.1.10"));
//! let mut session = Session::new(&mut tcp)?;
//! session.mask_write_4x_register(TransactionContext::new(1), 4, 0x00F2, 0x0025)?;
//! # Ok::<(), modbus_master::ModbusError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use modbus_master::{ExceptionCode, MasterProtocol, ModbusError, TcpConfig, TcpProtocol, TransactionContext};
//!
//! let mut tcp = TcpProtocol::new(TcpConfig::new("192.168.1.10"));
//! tcp.open()?;
//!
//! match tcp.read_input_registers(TransactionContext::new(1), 0, 10) {
//!     Ok(data) => println!("Data: {:?}", data),
//!     Err(ModbusError::StandardException { code: ExceptionCode::IllegalDataAddress, .. }) => {
//!         println!("register range not mapped on the slave");
//!     }
//!     Err(e) if e.is_transport() => println!("link problem: {}", e),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), ModbusError>(())
//! ```
//!
//! ## Utility Functions
//!
//! The [`utils`] module provides register bit helpers and frame formatting;
//! the [`crc`] module exposes the CRC-16/MODBUS used by RTU frames.
//!
//! ```
//! use modbus_master::utils::{apply_mask_write, format_frame};
//!
//! assert_eq!(apply_mask_write(0x0012, 0x00F2, 0x0025), 0x0017);
//! assert_eq!(format_frame(&[0x01, 0x03]), "01 03");
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod command;
mod context;
pub mod crc;
mod dummy;
mod error;
mod exception;
mod function;
mod header;
mod ports;
mod protocol;
mod response;
mod rtu;
mod serial;
mod session;
mod tcp;
mod transport;
pub mod utils;

// Public re-exports
pub use command::{
    Command, MaskWriteRegisterCommand, ReadRegistersCommand, WriteMultipleRegistersCommand,
    WriteSingleRegisterCommand, MAX_READ_REGISTERS, MAX_RTU_WRITE_REGISTERS, MAX_WRITE_REGISTERS,
};
pub use context::TransactionContext;
pub use dummy::DummyProtocol;
pub use error::{FrameError, ModbusError, Result};
pub use exception::ExceptionCode;
pub use function::{FunctionCode, EXCEPTION_FLAG};
pub use header::{MbapHeader, MBAP_HEADER_SIZE, MODBUS_PROTOCOL_ID};
pub use ports::{PortInfo, SerialPortEnumerator};
pub use protocol::MasterProtocol;
pub use response::{ReplyPdu, MIN_REPLY_PDU_SIZE};
pub use rtu::{FlowDirection, FlowHandler, RtuProtocol, DEFAULT_RETRY_COUNT, EXCEPTION_FRAME_LEN};
pub use serial::{
    DataBits, Parity, SerialConfig, SerialPortTransport, SerialTransport, StopBits,
    DEFAULT_BAUD_RATE, DEFAULT_SERIAL_TIMEOUT,
};
pub use session::Session;
pub use tcp::{TcpIpProtocol, TcpProtocol, UdpProtocol};
pub use transport::{
    SocketTransport, TcpConfig, TcpTransport, UdpTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT,
    DEFAULT_TIMEOUT, MAX_PACKET_SIZE,
};
