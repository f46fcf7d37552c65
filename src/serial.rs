//! Serial line settings and the serial transport used by the RTU framer.
//!
//! [`SerialTransport`] is the byte-level seam between
//! [`RtuProtocol`](crate::RtuProtocol) and the hardware. The production
//! implementation, [`SerialPortTransport`], sits on the `serialport` crate.
//!
//! # Example
//!
//! ```no_run
//! use modbus_master::{Parity, SerialConfig, SerialPortTransport, SerialTransport};
//!
//! let config = SerialConfig::new(19200).with_parity(Parity::Even);
//! let mut port = SerialPortTransport::new("/dev/ttyUSB0", config);
//! port.open().unwrap();
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, SerialPort};
use tracing::warn;

use crate::error::{ModbusError, Result};

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout of a serial transport.
pub const DEFAULT_SERIAL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

impl Parity {
    /// Single-letter form used in line descriptions (`N`, `O`, `E`).
    pub fn as_char(self) -> char {
        match self {
            Self::None => 'N',
            Self::Odd => 'O',
            Self::Even => 'E',
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataBits {
    /// 5 bits.
    Five,
    /// 6 bits.
    Six,
    /// 7 bits.
    Seven,
    /// 8 bits.
    #[default]
    Eight,
}

impl DataBits {
    /// Number of bits.
    pub fn bits(self) -> u8 {
        match self {
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopBits {
    /// One stop bit.
    #[default]
    One,
    /// Two stop bits.
    Two,
}

impl StopBits {
    /// Number of stop bits.
    pub fn bits(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Serial line settings.
///
/// Defaults to 115200 baud, 8 data bits, no parity, one stop bit.
///
/// # Example
///
/// ```
/// use modbus_master::{DataBits, Parity, SerialConfig, StopBits};
///
/// let config = SerialConfig::new(9600)
///     .with_parity(Parity::Even)
///     .with_stop_bits(StopBits::Two);
/// assert_eq!(config.to_string(), "9600,E,8,2");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerialConfig {
    /// Baud rate.
    pub baud_rate: u32,
    /// Data bits.
    pub data_bits: DataBits,
    /// Parity.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Read timeout for one [`SerialTransport::read_bytes`] call.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Creates settings with the given baud rate and N,8,1 framing.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Sets the data bits.
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Sets the parity.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Sets the stop bits.
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Sets the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the settings before they are applied.
    ///
    /// # Errors
    ///
    /// Returns `ModbusError::InvalidConfig` for a zero baud rate or timeout.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(ModbusError::invalid_config("baud rate must be greater than 0"));
        }
        if self.timeout.is_zero() {
            return Err(ModbusError::invalid_config("timeout must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: DEFAULT_SERIAL_TIMEOUT,
        }
    }
}

impl fmt::Display for SerialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.baud_rate,
            self.parity.as_char(),
            self.data_bits.bits(),
            self.stop_bits.bits()
        )
    }
}

/// Byte transport used by the RTU framer.
pub trait SerialTransport {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    fn port_name(&self) -> &str;

    /// Changes the device path; only valid while closed.
    fn set_port_name(&mut self, name: &str);

    /// Current line settings.
    fn config(&self) -> &SerialConfig;

    /// Applies line settings.
    ///
    /// Applied to the device immediately when open, stored otherwise. The
    /// stored settings only change once the device accepted them.
    fn configure(&mut self, config: &SerialConfig) -> io::Result<()>;

    /// Opens the device.
    fn open(&mut self) -> io::Result<()>;

    /// Closes the device.
    fn close(&mut self) -> io::Result<()>;

    /// Returns whether the device is open.
    fn is_open(&self) -> bool;

    /// Writes all of `data`.
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Reads up to `max` bytes.
    ///
    /// A timeout yields a short (possibly empty) read rather than an error.
    fn read_bytes(&mut self, max: usize) -> io::Result<Vec<u8>>;

    /// Discards unread input.
    fn purge_input(&mut self) -> io::Result<()>;

    /// Blocks until pending output has been transmitted.
    fn flush_output(&mut self) -> io::Result<()>;

    /// Number of bytes waiting to be read.
    fn bytes_available(&self) -> io::Result<usize>;
}

fn to_io(err: serialport::Error) -> io::Error {
    err.into()
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial port is not open")
}

fn sp_data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn sp_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn sp_stop_bits(bits: StopBits) -> serialport::StopBits {
    match bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}

/// Applies every line setting of `config` to an open port.
fn apply_line_settings(port: &mut dyn SerialPort, config: &SerialConfig) -> serialport::Result<()> {
    port.set_baud_rate(config.baud_rate)?;
    port.set_data_bits(sp_data_bits(config.data_bits))?;
    port.set_parity(sp_parity(config.parity))?;
    port.set_stop_bits(sp_stop_bits(config.stop_bits))?;
    port.set_timeout(config.timeout)
}

/// [`SerialTransport`] backed by the `serialport` crate.
pub struct SerialPortTransport {
    port_name: String,
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortTransport {
    /// Creates a closed transport for `port_name`.
    pub fn new(port_name: impl Into<String>, config: SerialConfig) -> Self {
        Self {
            port_name: port_name.into(),
            config,
            port: None,
        }
    }

    /// Wraps a port that is already open with the settings in `config`.
    pub fn from_port(
        port_name: impl Into<String>,
        config: SerialConfig,
        port: Box<dyn SerialPort>,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            config,
            port: Some(port),
        }
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(not_open)
    }
}

impl SerialTransport for SerialPortTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn set_port_name(&mut self, name: &str) {
        self.port_name = name.to_string();
    }

    fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn configure(&mut self, config: &SerialConfig) -> io::Result<()> {
        if let Some(port) = self.port.as_mut() {
            if let Err(e) = apply_line_settings(&mut **port, config) {
                // Settings applied before the failure must not outlive it
                if let Err(restore) = apply_line_settings(&mut **port, &self.config) {
                    warn!(
                        port = %self.port_name,
                        settings = %self.config,
                        error = %restore,
                        "failed to restore serial line settings"
                    );
                }
                return Err(to_io(e));
            }
        }
        self.config = *config;
        Ok(())
    }

    fn open(&mut self) -> io::Result<()> {
        let port = serialport::new(&self.port_name, self.config.baud_rate)
            .data_bits(sp_data_bits(self.config.data_bits))
            .parity(sp_parity(self.config.parity))
            .stop_bits(sp_stop_bits(self.config.stop_bits))
            .flow_control(serialport::FlowControl::None)
            .timeout(self.config.timeout)
            .open()
            .map_err(to_io)?;
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.port = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.port()?.write_all(data)
    }

    fn read_bytes(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        match self.port()?.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn purge_input(&mut self) -> io::Result<()> {
        self.port()?.clear(ClearBuffer::Input).map_err(to_io)
    }

    fn flush_output(&mut self) -> io::Result<()> {
        self.port()?.flush()
    }

    fn bytes_available(&self) -> io::Result<usize> {
        let port = self.port.as_ref().ok_or_else(not_open)?;
        Ok(port.bytes_to_read().map_err(to_io)? as usize)
    }
}

impl fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPortTransport")
            .field("port_name", &self.port_name)
            .field("config", &self.config.to_string())
            .field("open", &self.port.is_some())
            .finish()
    }
}
