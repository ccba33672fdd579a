pub mod checksum;
pub mod inverter;
pub mod packet;
pub mod response;

/// Lowercase hex rendering of wire bytes for debug logs.
pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}
