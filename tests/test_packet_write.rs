mod common;
use common::*;
use sofar_bridge::prelude::*;
use sofar_bridge::sofar::checksum::crc16_modbus;

#[test]
fn hyd_write_matches_capture() {
    let frame = ProprietaryWrite::new(0x0800, 1);
    let bytes = frame.bytes();

    assert_eq!(bytes.len(), ProprietaryWrite::LEN);
    assert_eq!(
        sofar::to_hex(&bytes),
        "881310080000010001005509c40a5a0014012c012cffffffff00000000000000000000000000000000c664"
    );
}

#[test]
fn modbus_write_matches_capture() {
    let bytes = ModbusWrite::new(0x0800, 1).bytes();
    assert_eq!(bytes, vec![0x01, 0x10, 0x08, 0x00, 0x00, 0x01, 0x02, 0x00, 0x01, 0xee, 0x50]);
}

#[test]
fn crc_byte_order_differs_between_frames() {
    // read frame: crc low byte first
    let read = ReadQuery::new(Factory::serial(), 0x0400, 0x33).unwrap();
    let r = read.bytes();
    let crc = crc16_modbus(&read.business_field());
    assert_eq!(crc, 0x3e05);
    assert_eq!(&r[32..34], &[0x05, 0x3e]);

    // HYD write: crc over everything after the header, high byte first
    let w = ProprietaryWrite::new(0x0800, 1).bytes();
    let crc = crc16_modbus(&w[2..41]);
    assert_eq!(&w[41..43], &crc.to_be_bytes());
    assert_ne!(&w[41..43], &crc.to_le_bytes());

    // plain modbus write: low byte first again
    let m = ModbusWrite::new(0x0800, 1).bytes();
    let crc = crc16_modbus(&m[..9]);
    assert_eq!(&m[9..11], &crc.to_le_bytes());
}

#[test]
fn hyd_write_carries_register_and_value_big_endian() {
    let w = ProprietaryWrite::new(0x1234, 0xabcd).bytes();
    assert_eq!(&w[..3], &[0x88, 0x13, 0x10]);
    assert_eq!(&w[3..5], &[0x12, 0x34]);
    assert_eq!(&w[5..7], &[0x00, 0x01]);
    assert_eq!(&w[7..9], &[0xab, 0xcd]);
}

#[test]
fn write_frames_dispatch() {
    let frames: Vec<Frame> = vec![
        ProprietaryWrite::new(0x104D, 80).into(),
        ModbusWrite::new(0x104D, 80).into(),
    ];
    let lens: Vec<usize> = frames.iter().map(|f| f.bytes().len()).collect();
    assert_eq!(lens, vec![43, 11]);
    assert_eq!(frames[0].describe(), "HYD write 0x104D = 80");
}
