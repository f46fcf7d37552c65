//! Example: Writing registers over Modbus TCP
//!
//! Run with: cargo run --example tcp_write -- 192.168.1.10
//!
//! This example demonstrates:
//! - Configuring a TCP master
//! - Block writes and mask writes
//! - Handling slave exceptions

use std::time::Duration;

use modbus_master::utils::bit_write_masks;
use modbus_master::{
    ExceptionCode, MasterProtocol, ModbusError, TcpConfig, TcpProtocol, TransactionContext,
};

fn main() -> modbus_master::Result<()> {
    let host = std::env::args().nth(1).unwrap_or_else(|| "localhost".to_string());
    let config = TcpConfig::new(host).with_read_timeout(Duration::from_millis(500));
    let mut tcp = TcpProtocol::new(config);
    tcp.open()?;

    println!("{} on {}\n", tcp.protocol_name(), tcp.protocol_params());

    // =========================================================================
    // Block write
    // =========================================================================

    let ctx = TransactionContext::new(1).with_transaction_id(1);
    tcp.preset_multiple_registers(ctx, 100, &[10, 20, 30, 40])?;
    println!("wrote 4 registers at 100");

    // =========================================================================
    // Setting a single bit
    // =========================================================================

    let (and_mask, or_mask) = bit_write_masks(3, true);
    let ctx = ctx.with_transaction_id(2);
    tcp.mask_write_4x_register(ctx, 104, and_mask, or_mask)?;
    println!("set bit 3 of register 104");

    // =========================================================================
    // Exceptions
    // =========================================================================

    let ctx = ctx.with_transaction_id(3);
    match tcp.read_holding_registers(ctx, 0xFFF0, 100) {
        Ok(values) => println!("read {} registers", values.len()),
        Err(ModbusError::StandardException { code: ExceptionCode::IllegalDataAddress, .. }) => {
            println!("slave rejected the address range")
        }
        Err(e) => println!("read failed: {}", e),
    }

    tcp.close()
}
