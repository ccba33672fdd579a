pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};

pub use std::str::FromStr;

pub use crate::config::{self, Config};
pub use crate::error::{DecodeError, ProtocolPreconditionError, TransportError};
pub use crate::interpreter::{FaultEntry, ScaledReading, StatusCode};
pub use crate::options::Options;
pub use crate::readings::Readings;
pub use crate::register::{RegisterAddress, RegisterTable};
pub use crate::sofar::{
    self,
    inverter::{Serial, TcpTransport, Transport},
    packet::{Frame, FrameCommon, ModbusWrite, ProprietaryWrite, ReadQuery},
    response::SlotBound,
};
