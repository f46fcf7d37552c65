//! Example: Reading and writing registers over a serial line
//!
//! Run with: cargo run --example rtu_read -- /dev/ttyUSB0
//!
//! This example demonstrates:
//! - Listing the serial ports of the machine
//! - Configuring an RTU master
//! - Reading holding registers and writing them back
//! - Tapping raw frames with a flow handler

use modbus_master::utils::format_frame;
use modbus_master::{
    FlowDirection, MasterProtocol, Parity, RtuProtocol, SerialConfig, SerialPortEnumerator,
    Session, TransactionContext,
};

fn main() -> modbus_master::Result<()> {
    // =========================================================================
    // Available ports
    // =========================================================================

    println!("=== Serial Ports ===\n");
    match SerialPortEnumerator::new().iter() {
        Ok(ports) => {
            for port in ports {
                println!("{:<20} {}", port.name, port.description);
            }
        }
        Err(e) => println!("port enumeration failed: {}", e),
    }

    // =========================================================================
    // Configure the master
    // =========================================================================

    let port = std::env::args().nth(1).unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let config = SerialConfig::new(19200).with_parity(Parity::Even);
    let mut rtu = RtuProtocol::new(port, config).with_retry_count(2);

    rtu.set_flow_handler(Some(Box::new(|dir: FlowDirection, frame: &[u8]| {
        println!("{:?}: {}", dir, format_frame(frame));
    })));

    println!("\n{} on {}\n", rtu.protocol_name(), rtu.protocol_params());

    // =========================================================================
    // Read and write
    // =========================================================================

    let ctx = TransactionContext::new(17);
    let mut session = Session::new(&mut rtu)?;

    let values = session.read_holding_registers(ctx, 0x006B, 3)?;
    println!("40108-40110: {:?}", values);

    session.preset_single_register(ctx, 0x006B, values[0].wrapping_add(1))?;
    session.mask_write_4x_register(ctx, 0x006C, 0x00F2, 0x0025)?;

    let values = session.read_holding_registers(ctx, 0x006B, 3)?;
    println!("40108-40110: {:?}", values);

    session.close()
}
