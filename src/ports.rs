//! Serial device enumeration.

use std::io;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use serialport::SerialPortType;

/// A serial device present on the system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortInfo {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub name: String,
    /// Human readable description.
    pub description: String,
}

impl PortInfo {
    fn from_serialport(info: serialport::SerialPortInfo) -> Self {
        let description = match info.port_type {
            SerialPortType::UsbPort(usb) => match (usb.manufacturer, usb.product) {
                (Some(manufacturer), Some(product)) => format!("{} {}", manufacturer, product),
                (None, Some(product)) => product,
                (Some(manufacturer), None) => format!("{} USB serial", manufacturer),
                (None, None) => format!("USB serial {:04x}:{:04x}", usb.vid, usb.pid),
            },
            SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
            SerialPortType::PciPort => "PCI serial".to_string(),
            SerialPortType::Unknown => "Serial port".to_string(),
        };
        Self {
            name: info.port_name,
            description,
        }
    }
}

/// Lists the serial devices of the system.
///
/// Every call to [`iter`](Self::iter) queries the operating system again,
/// so the enumeration can be restarted to pick up hot-plugged devices.
///
/// # Example
///
/// ```no_run
/// use modbus_master::SerialPortEnumerator;
///
/// for port in SerialPortEnumerator::new().iter().unwrap() {
///     println!("{} - {}", port.name, port.description);
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortEnumerator;

impl SerialPortEnumerator {
    /// Creates an enumerator.
    pub fn new() -> Self {
        Self
    }

    /// Queries the system and iterates over the devices found.
    ///
    /// # Errors
    ///
    /// Returns the I/O error reported by the platform enumeration.
    pub fn iter(&self) -> io::Result<impl Iterator<Item = PortInfo>> {
        let ports = serialport::available_ports().map_err(io::Error::from)?;
        Ok(ports
            .into_iter()
            // On macOS only the calling-unit devices are usable for outgoing lines
            .filter(|p| !cfg!(target_os = "macos") || !p.port_name.starts_with("/dev/tty."))
            .map(PortInfo::from_serialport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::{SerialPortInfo, UsbPortInfo};

    #[test]
    fn test_usb_description() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x0403,
                pid: 0x6001,
                serial_number: None,
                manufacturer: Some("FTDI".to_string()),
                product: Some("FT232R".to_string()),
            }),
        };
        let port = PortInfo::from_serialport(info);
        assert_eq!(port.name, "/dev/ttyUSB0");
        assert_eq!(port.description, "FTDI FT232R");
    }

    #[test]
    fn test_unknown_description() {
        let info = SerialPortInfo {
            port_name: "COM1".to_string(),
            port_type: SerialPortType::Unknown,
        };
        assert_eq!(PortInfo::from_serialport(info).description, "Serial port");
    }
}
