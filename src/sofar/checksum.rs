/// CRC-16/MODBUS (reflected 0xA001, init 0xFFFF).
pub fn crc16_modbus(data: &[u8]) -> u16 {
    crc16::State::<crc16::MODBUS>::calculate(data)
}

/// Byte sum modulo 256, as carried in the outer read frame.
pub fn additive_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
