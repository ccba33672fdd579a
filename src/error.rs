use std::time::Duration;

/// Failures talking to the logger stick. These are environmental and the
/// coordinator recovers from them by skipping the affected range.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("could not connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no answer from {addr} within {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
    #[error("could not send request to {addr}")]
    Send {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read response from {addr}")]
    Receive {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{addr} closed the connection without answering")]
    Empty { addr: String },
}

/// A response that cannot be decoded into what was asked for.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("response too short: got {got} bytes, need {need}")]
    TooShort { got: usize, need: usize },
    #[error("unexpected response length {got}, expected {expected}")]
    Length { got: usize, expected: usize },
    #[error("crc mismatch: frame carries {got:#06x}, computed {computed:#06x}")]
    Crc { got: u16, computed: u16 },
    #[error("unexpected function code {0:#04x}")]
    Function(u8),
}

/// A request that can never be put on the wire. Always a caller bug.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ProtocolPreconditionError {
    #[error("register count must be at least 1")]
    ZeroCount,
    #[error("range end {end:#06x} is before start {start:#06x}")]
    InvertedRange { start: u16, end: u16 },
    #[error("{count} registers from {start:#06x} run past 0xFFFF")]
    AddressOverflow { start: u16, count: u16 },
    #[error("serial number {0} does not fit in 32 bits")]
    SerialOutOfRange(u64),
    #[error("malformed serial number {0:?}")]
    MalformedSerial(String),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Precondition(#[from] ProtocolPreconditionError),
}
