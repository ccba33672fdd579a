use crate::prelude::*;
use crate::sofar::checksum::crc16_modbus;
use crate::sofar::packet::FunctionCode;

use nom::{
    number::complete::{be_u16, be_u8, le_u16},
    sequence::tuple,
    IResult,
};

/// Register values start 28 bytes (56 hex digits) into a read response.
pub const PAYLOAD_OFFSET: usize = 28;
pub const REGISTER_WIDTH: usize = 2;

/// How many register slots to take out of a read response.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SlotBound {
    /// `count + 1` slots. The deployed reader has always taken one slot past
    /// the requested count, and existing dashboards see that register.
    #[default]
    Inclusive,
    /// Exactly the requested `count`.
    Requested,
}

impl SlotBound {
    pub fn slots(&self, count: u16) -> usize {
        match self {
            SlotBound::Inclusive => usize::from(count) + 1,
            SlotBound::Requested => usize::from(count),
        }
    }
}

/// Turns a read response into a table of `start + i -> value`.
///
/// Never fails. Slots the response is too short to hold fully are left out,
/// as are slots whose address would run past 0xFFFF.
pub fn parse_read_response(data: &[u8], start: u16, count: u16, bound: SlotBound) -> RegisterTable {
    let mut table = RegisterTable::new();
    let slots = bound.slots(count);

    let payload = data.get(PAYLOAD_OFFSET..).unwrap_or_default();

    for (i, raw) in payload.chunks_exact(REGISTER_WIDTH).take(slots).enumerate() {
        let address = match u16::try_from(usize::from(start) + i) {
            Ok(a) => a,
            Err(_) => break,
        };
        let value = u16::from_be_bytes([raw[0], raw[1]]);
        trace!("register {}: {:#06x}", RegisterAddress(address), value);
        table.insert(address, value);
    }

    if table.len() < slots {
        debug!(
            "response of {} bytes held {} of {} slots from {}",
            data.len(),
            table.len(),
            slots,
            RegisterAddress(start)
        );
    }

    table
}

/// Echo of a Modbus write-multiple request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteAck {
    pub slave: u8,
    pub register: u16,
    pub quantity: u16,
}

impl WriteAck {
    pub const LEN: usize = 8;
}

fn write_ack_fields(input: &[u8]) -> IResult<&[u8], (u8, u8, u16, u16, u16)> {
    tuple((be_u8, be_u8, be_u16, be_u16, le_u16))(input)
}

pub fn parse_write_ack(data: &[u8]) -> Result<WriteAck, DecodeError> {
    if data.len() < WriteAck::LEN {
        return Err(DecodeError::TooShort {
            got: data.len(),
            need: WriteAck::LEN,
        });
    }
    if data.len() > WriteAck::LEN {
        return Err(DecodeError::Length {
            got: data.len(),
            expected: WriteAck::LEN,
        });
    }

    let (_, (slave, function, register, quantity, crc)) =
        write_ack_fields(data).map_err(|_| DecodeError::TooShort {
            got: data.len(),
            need: WriteAck::LEN,
        })?;

    match FunctionCode::try_from(function) {
        Ok(FunctionCode::WriteMultiple) => {}
        _ => return Err(DecodeError::Function(function)),
    }

    let computed = crc16_modbus(&data[..WriteAck::LEN - 2]);
    if computed != crc {
        return Err(DecodeError::Crc { got: crc, computed });
    }

    Ok(WriteAck {
        slave,
        register,
        quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(values: &[u16]) -> Vec<u8> {
        let mut r = vec![0xaa; PAYLOAD_OFFSET];
        for v in values {
            r.extend_from_slice(&v.to_be_bytes());
        }
        r
    }

    #[test]
    fn empty_input_is_empty_table() {
        assert!(parse_read_response(&[], 0x400, 10, SlotBound::Inclusive).is_empty());
        assert!(parse_read_response(&[0; 20], 0x400, 10, SlotBound::Inclusive).is_empty());
    }

    #[test]
    fn requested_bound_takes_count_slots() {
        let data = response(&[1, 2, 3, 4]);
        let table = parse_read_response(&data, 0x0580, 3, SlotBound::Requested);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0x0582), Some(3));
        assert_eq!(table.get(0x0583), None);
    }

    #[test]
    fn inclusive_bound_takes_one_extra_slot() {
        let data = response(&[1, 2, 3, 4]);
        let table = parse_read_response(&data, 0x0580, 3, SlotBound::Inclusive);
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(0x0583), Some(4));
    }

    #[test]
    fn half_register_is_not_decoded() {
        let mut data = response(&[0x1234]);
        data.push(0x56);
        let table = parse_read_response(&data, 0x0400, 2, SlotBound::Requested);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0x0400), Some(0x1234));
        assert!(!table.contains(0x0401));
    }

    #[test]
    fn stops_at_top_of_address_space() {
        let data = response(&[7, 8, 9]);
        let table = parse_read_response(&data, 0xffff, 1, SlotBound::Inclusive);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0xffff), Some(7));
    }

    #[test]
    fn write_ack_roundtrip() {
        let data = [0x01, 0x10, 0x08, 0x00, 0x00, 0x01, 0x03, 0xa9];
        assert_eq!(
            parse_write_ack(&data),
            Ok(WriteAck {
                slave: 1,
                register: 0x0800,
                quantity: 1
            })
        );
    }

    #[test]
    fn write_ack_errors() {
        assert_eq!(
            parse_write_ack(&[0x01, 0x10]),
            Err(DecodeError::TooShort { got: 2, need: 8 })
        );
        assert_eq!(
            parse_write_ack(&[0; 9]),
            Err(DecodeError::Length {
                got: 9,
                expected: 8
            })
        );
        assert_eq!(
            parse_write_ack(&[0x01, 0x10, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00]),
            Err(DecodeError::Crc {
                got: 0x0000,
                computed: 0xa903
            })
        );
        assert_eq!(
            parse_write_ack(&[0x01, 0x90, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00]),
            Err(DecodeError::Function(0x90))
        );
        // a known code, but not the one a write echoes
        assert_eq!(
            parse_write_ack(&[0x01, 0x03, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00]),
            Err(DecodeError::Function(0x03))
        );
    }
}
