use crate::prelude::*;
use crate::sofar::checksum::{additive_checksum, crc16_modbus};

use enum_dispatch::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};

// {{{ FunctionCode
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FunctionCode {
    ReadHolding = 0x03,
    WriteMultiple = 0x10,
}
// }}}

#[enum_dispatch]
pub trait FrameCommon {
    /// The exact bytes to put on the wire.
    fn bytes(&self) -> Vec<u8>;

    /// Short human description for logs.
    fn describe(&self) -> String;
}

#[enum_dispatch(FrameCommon)]
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Frame {
    ReadQuery(ReadQuery),
    ProprietaryWrite(ProprietaryWrite),
    ModbusWrite(ModbusWrite),
}

/////////////
//
// READ QUERY
//
/////////////

/// Only obtainable through `new`/`for_range`, so `count` is never zero and
/// the range never runs past 0xFFFF.
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct ReadQuery {
    serial: Serial,
    start: u16,
    count: u16,
}

impl ReadQuery {
    pub const LEN: usize = 36;

    const START: u8 = 0xa5;
    const LENGTH: [u8; 2] = [0x17, 0x00];
    const CONTROL_CODE: [u8; 2] = [0x10, 0x45];
    const EMPTY_SERIAL: [u8; 2] = [0x00, 0x00];
    const DATA_FIELD: [u8; 15] = [0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    const END: u8 = 0x15;

    pub fn new(serial: Serial, start: u16, count: u16) -> Result<Self, ProtocolPreconditionError> {
        if count == 0 {
            return Err(ProtocolPreconditionError::ZeroCount);
        }
        if u32::from(start) + u32::from(count) - 1 > u32::from(u16::MAX) {
            return Err(ProtocolPreconditionError::AddressOverflow { start, count });
        }

        Ok(Self {
            serial,
            start,
            count,
        })
    }

    /// Query covering `start..=end`.
    pub fn for_range(serial: Serial, start: u16, end: u16) -> Result<Self, ProtocolPreconditionError> {
        if end < start {
            return Err(ProtocolPreconditionError::InvertedRange { start, end });
        }
        // end - start + 1 <= 0x10000, which only overflows u16 for 0..=0xFFFF
        let count = u16::try_from(u32::from(end) - u32::from(start) + 1)
            .map_err(|_| ProtocolPreconditionError::AddressOverflow { start, count: u16::MAX })?;

        Self::new(serial, start, count)
    }

    pub fn serial(&self) -> Serial {
        self.serial
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn count(&self) -> u16 {
        self.count
    }

    /// Last register covered.
    pub fn end(&self) -> u16 {
        self.start.saturating_add(self.count.saturating_sub(1))
    }

    /// Function code, start register and register count.
    pub fn business_field(&self) -> [u8; 6] {
        let mut r = [0; 6];
        r[0] = 0;
        r[1] = FunctionCode::ReadHolding.into();
        r[2..4].copy_from_slice(&self.start.to_be_bytes());
        r[4..6].copy_from_slice(&self.count.to_be_bytes());
        r
    }
}

impl FrameCommon for ReadQuery {
    fn bytes(&self) -> Vec<u8> {
        let business = self.business_field();
        let crc = crc16_modbus(&business);

        let mut r = Vec::with_capacity(Self::LEN);
        r.push(Self::START);
        r.extend_from_slice(&Self::LENGTH);
        r.extend_from_slice(&Self::CONTROL_CODE);
        r.extend_from_slice(&Self::EMPTY_SERIAL);
        r.extend_from_slice(&self.serial.wire_bytes());
        r.extend_from_slice(&Self::DATA_FIELD);
        r.extend_from_slice(&business);
        // low byte first here, unlike the HYD write frame
        r.extend_from_slice(&crc.to_le_bytes());

        // covers everything after the start marker, CRC included
        let checksum = additive_checksum(&r[1..]);
        r.push(checksum);
        r.push(Self::END);

        r
    }

    fn describe(&self) -> String {
        format!(
            "read {} x{} ({}..={})",
            RegisterAddress(self.start),
            self.count,
            RegisterAddress(self.start),
            RegisterAddress(self.end())
        )
    }
}

/////////////
//
// PROPRIETARY (HYD) WRITE
//
/////////////

#[derive(Eq, PartialEq, Clone, Debug)]
pub struct ProprietaryWrite {
    pub register: u16,
    pub value: u16,
}

impl ProprietaryWrite {
    pub const LEN: usize = 43;

    const HEADER: [u8; 2] = [0x88, 0x13];
    const COUNT: [u8; 2] = [0x00, 0x01];

    // device defaults the HYD firmware expects after the value
    const TRAILER: [u8; 32] = [
        0x00, 0x55, 0x09, 0xc4, 0x0a, 0x5a, 0x00, 0x14, 0x01, 0x2c, 0x01, 0x2c, 0xff, 0xff, 0xff,
        0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ];

    pub fn new(register: u16, value: u16) -> Self {
        Self { register, value }
    }
}

impl FrameCommon for ProprietaryWrite {
    fn bytes(&self) -> Vec<u8> {
        let mut r = Vec::with_capacity(Self::LEN);
        r.extend_from_slice(&Self::HEADER);
        r.push(FunctionCode::WriteMultiple.into());
        r.extend_from_slice(&self.register.to_be_bytes());
        r.extend_from_slice(&Self::COUNT);
        r.extend_from_slice(&self.value.to_be_bytes());
        r.extend_from_slice(&Self::TRAILER);

        // crc excludes the two header bytes and goes out high byte first
        let crc = crc16_modbus(&r[Self::HEADER.len()..]);
        r.extend_from_slice(&crc.to_be_bytes());

        r
    }

    fn describe(&self) -> String {
        format!("HYD write {} = {}", RegisterAddress(self.register), self.value)
    }
}

/////////////
//
// MODBUS RTU WRITE
//
/////////////

#[derive(Eq, PartialEq, Clone, Debug)]
pub struct ModbusWrite {
    pub slave: u8,
    pub register: u16,
    pub value: u16,
}

impl ModbusWrite {
    pub const LEN: usize = 11;
    pub const DEFAULT_SLAVE: u8 = 0x01;
    /// Registers written per frame, echoed back in the acknowledgement.
    pub const QUANTITY: u16 = 1;

    pub fn new(register: u16, value: u16) -> Self {
        Self {
            slave: Self::DEFAULT_SLAVE,
            register,
            value,
        }
    }
}

impl FrameCommon for ModbusWrite {
    fn bytes(&self) -> Vec<u8> {
        let mut r = Vec::with_capacity(Self::LEN);
        r.push(self.slave);
        r.push(FunctionCode::WriteMultiple.into());
        r.extend_from_slice(&self.register.to_be_bytes());
        r.extend_from_slice(&Self::QUANTITY.to_be_bytes());
        r.push(2); // byte count
        r.extend_from_slice(&self.value.to_be_bytes());

        let crc = crc16_modbus(&r);
        r.extend_from_slice(&crc.to_le_bytes());

        r
    }

    fn describe(&self) -> String {
        format!(
            "modbus write {} = {} (slave {})",
            RegisterAddress(self.register),
            self.value,
            self.slave
        )
    }
}
