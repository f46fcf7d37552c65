use criterion::{black_box, criterion_group, criterion_main, Criterion};

use modbus_master::crc::{append_crc, crc16};
use modbus_master::{
    Command, MbapHeader, ReadRegistersCommand, ReplyPdu, TransactionContext,
    WriteMultipleRegistersCommand,
};

fn bench_crc(c: &mut Criterion) {
    let frame: Vec<u8> = (0..=255u8).collect();
    c.bench_function("crc16 256 bytes", |b| b.iter(|| crc16(black_box(&frame))));
}

fn bench_rtu_frame(c: &mut Criterion) {
    let values = vec![0x1234u16; 123];
    c.bench_function("rtu frame preset 123 registers", |b| {
        b.iter(|| {
            let cmd = WriteMultipleRegistersCommand::new(0, black_box(&values)).unwrap();
            let mut frame = vec![1u8];
            frame.extend_from_slice(&cmd.to_pdu());
            append_crc(&mut frame);
            frame
        })
    });
}

fn bench_mbap_frame(c: &mut Criterion) {
    let ctx = TransactionContext::new(1).with_transaction_id(7);
    c.bench_function("mbap frame read 125 registers", |b| {
        b.iter(|| {
            let pdu = ReadRegistersCommand::holding(0, 125).unwrap().to_pdu();
            let mut adu = MbapHeader::for_request(black_box(ctx), pdu.len()).to_bytes().to_vec();
            adu.extend_from_slice(&pdu);
            adu
        })
    });
}

fn bench_decode_registers(c: &mut Criterion) {
    let ctx = TransactionContext::new(1);
    let mut pdu = vec![0x03, 250];
    pdu.extend(std::iter::repeat(0xAB).take(250));
    c.bench_function("decode 125 registers", |b| {
        b.iter(|| {
            ReplyPdu::from_bytes(ctx, black_box(&pdu))
                .and_then(|reply| reply.to_registers(125))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_crc,
    bench_rtu_frame,
    bench_mbap_frame,
    bench_decode_registers
);
criterion_main!(benches);
