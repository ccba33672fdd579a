use crate::prelude::*;

use num_enum::FromPrimitive;
use serde::{Serialize, Serializer};
use serde_with::{serde_as, DisplayFromStr};

pub const STATUS_REGISTER: u16 = 0x0404;

/// `raw * scale`, with two's complement applied first when `signed`.
pub fn scaled(table: &RegisterTable, address: u16, scale: f64, signed: bool) -> Option<f64> {
    let raw = table.get(address)?;
    let raw = if signed { f64::from(raw as i16) } else { f64::from(raw) };
    Some(raw * scale)
}

/// Two consecutive registers read as one unsigned 32-bit value, high word first.
pub fn scaled32(table: &RegisterTable, high: u16, low: u16, scale: f64) -> Option<f64> {
    let high = table.get(high)?;
    let low = table.get(low)?;
    let raw = (u32::from(high) << 16) | u32::from(low);
    Some(f64::from(raw) * scale)
}

pub fn reading(table: &RegisterTable, address: u16, scale: f64, signed: bool) -> ScaledReading {
    ScaledReading {
        value: scaled(table, address, scale, signed),
        scale,
        signed,
    }
}

// ScaledReading {{{
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaledReading {
    pub value: Option<f64>,
    pub scale: f64,
    pub signed: bool,
}

impl ScaledReading {
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Value rounded to `places` decimals.
    pub fn rounded(&self, places: i32) -> Option<f64> {
        self.value.map(|v| round(v, places))
    }
}

// only the number goes out; scale and signedness are how it was made
impl Serialize for ScaledReading {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value.serialize(serializer)
    }
} // }}}

pub fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// StatusCode {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum StatusCode {
    Waiting = 0,
    Checking = 1,
    Normal = 2,
    Fault = 3,
    PermanentFault = 4,
    Updating = 5,
    EpsCheck = 6,
    EpsMode = 7,
    SelfTest = 8,
    Idle = 9,
    #[num_enum(catch_all)]
    Unknown(u16),
}

impl StatusCode {
    pub fn label(&self) -> &'static str {
        match self {
            StatusCode::Waiting => "Waiting",
            StatusCode::Checking => "Checking",
            StatusCode::Normal => "Normal",
            StatusCode::Fault => "Fault",
            StatusCode::PermanentFault => "Permanent Fault",
            StatusCode::Updating => "Updating",
            StatusCode::EpsCheck => "EPS Check",
            StatusCode::EpsMode => "EPS Mode",
            StatusCode::SelfTest => "Self Test",
            StatusCode::Idle => "Idle",
            StatusCode::Unknown(_) => "Unknown",
        }
    }

    pub fn raw(&self) -> u16 {
        match self {
            StatusCode::Waiting => 0,
            StatusCode::Checking => 1,
            StatusCode::Normal => 2,
            StatusCode::Fault => 3,
            StatusCode::PermanentFault => 4,
            StatusCode::Updating => 5,
            StatusCode::EpsCheck => 6,
            StatusCode::EpsMode => 7,
            StatusCode::SelfTest => 8,
            StatusCode::Idle => 9,
            StatusCode::Unknown(raw) => *raw,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Unknown(raw) => write!(f, "Unknown ({})", raw),
            other => write!(f, "{}", other.label()),
        }
    }
}

impl Serialize for StatusCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
} // }}}

pub fn status(table: &RegisterTable) -> Option<StatusCode> {
    table.get(STATUS_REGISTER).map(StatusCode::from_primitive)
}

// Faults {{{
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FaultEntry {
    #[serde_as(as = "DisplayFromStr")]
    pub register: RegisterAddress,
    pub code: u16,
    pub description: &'static str,
}

impl std::fmt::Display for FaultEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} bit {})", self.description, self.register, self.code)
    }
}

type FaultMap = &'static [(u16, &'static str)];

/// Fault bitmask registers in the order they are reported, each with its
/// bit codes in ascending order.
pub const FAULT_REGISTERS: [(u16, FaultMap); 2] = [
    (
        0x0405,
        &[
            (1, "ID01 Grid Over Voltage Protection"),
            (2, "ID02 Grid Under Voltage Protection"),
            (4, "ID03 Grid Over Frequency Protection"),
            (8, "ID04 Grid Under Frequency Protection"),
            (16, "ID05 Leakage current fault"),
            (32, "ID06 High penetration error"),
            (64, "ID07 Low penetration error"),
            (128, "ID08 Islanding error"),
            (256, "ID09 Grid voltage transient overvoltage 1"),
            (512, "ID10 Grid voltage transient overvoltage 2"),
            (1024, "ID11 Grid line voltage error"),
            (2048, "ID12 Inverter voltage error"),
            (4096, "ID13 Anti-backflow overload"),
        ],
    ),
    (
        0x0406,
        &[
            (1, "ID17 Grid current sampling error"),
            (2, "ID18 Grid current DC component sampling error (AC side)"),
            (4, "ID19 Grid voltage sampling error (DC side)"),
            (8, "ID20 Grid voltage sampling error (AC side)"),
            (16, "ID21 Leakage current sampling error (DC side)"),
            (32, "ID22 Leakage current sampling error (AC side)"),
            (64, "ID23 Load voltage DC component sampling error"),
            (128, "ID24 DC input current sampling error"),
            (256, "ID25 DC component sampling error of grid current"),
            (512, "ID26 DC input branch current sampling error"),
            (4096, "ID29 Leakage current consistency error"),
            (8192, "ID30 Grid voltage consistency error"),
            (16384, "ID31 DCI consistency error"),
        ],
    ),
];

/// Every known fault bit set in the table. Bits without a description are
/// ignored, as is a fault register missing from the table.
pub fn faults(table: &RegisterTable) -> Vec<FaultEntry> {
    let mut r = Vec::new();

    for (register, map) in FAULT_REGISTERS.iter() {
        let raw = match table.get(*register) {
            Some(raw) => raw,
            None => continue,
        };
        for (code, description) in map.iter() {
            if raw & code != 0 {
                r.push(FaultEntry {
                    register: RegisterAddress(*register),
                    code: *code,
                    description: *description,
                });
            }
        }
    }

    r
} // }}}
