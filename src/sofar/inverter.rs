use crate::prelude::*;

use {
    async_trait::async_trait,
    bytes::{Bytes, BytesMut},
    serde::{Deserialize, Serialize, Serializer},
    std::time::Duration,
    tokio::io::{AsyncReadExt, AsyncWriteExt},
};

// the stick never answers with more than this in one go
const MAX_RESPONSE_SIZE: usize = 1024;

// Serial {{{
/// Serial number of the logger stick, as printed on its label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u64")]
pub struct Serial(u32);

impl Serial {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// The four bytes the read frame carries: the serial's hex digit pairs
    /// in reverse order, i.e. little-endian.
    pub fn wire_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl TryFrom<u64> for Serial {
    type Error = ProtocolPreconditionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ProtocolPreconditionError::SerialOutOfRange(value))
    }
}

impl std::str::FromStr for Serial {
    type Err = ProtocolPreconditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        let value =
            parsed.map_err(|_| ProtocolPreconditionError::MalformedSerial(s.to_string()))?;
        Self::try_from(value)
    }
}

impl Serialize for Serial {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#010x})", self.0, self.0)
    }
} // }}}

// Transport {{{
/// One request/response transaction with the inverter. The codec never
/// looks behind this.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`, waits `settle` (writes need a moment before the stick
    /// answers), and returns whatever the first read yields.
    async fn exchange(&self, request: &[u8], settle: Duration) -> Result<Bytes, TransportError>;
}

/// Opens a fresh TCP connection for every exchange and closes it afterwards.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
        }
    }

    pub fn from_config(inverter: &config::Inverter) -> Self {
        Self::new(
            inverter.host(),
            inverter.port(),
            Duration::from_secs(inverter.read_timeout()),
        )
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn transact(&self, request: &[u8], settle: Duration) -> Result<Bytes, TransportError> {
        let addr = self.addr();

        let mut stream = tokio::net::TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;
        debug!("connected to {}", addr);

        stream
            .write_all(request)
            .await
            .map_err(|source| TransportError::Send {
                addr: addr.clone(),
                source,
            })?;
        debug!("{}: TX {}", addr, sofar::to_hex(request));

        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let mut buf = BytesMut::with_capacity(MAX_RESPONSE_SIZE);
        let len = stream
            .read_buf(&mut buf)
            .await
            .map_err(|source| TransportError::Receive {
                addr: addr.clone(),
                source,
            })?;

        if len == 0 {
            return Err(TransportError::Empty { addr });
        }
        debug!("{}: RX {}", addr, sofar::to_hex(&buf));

        Ok(buf.freeze())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(&self, request: &[u8], settle: Duration) -> Result<Bytes, TransportError> {
        match tokio::time::timeout(self.timeout, self.transact(request, settle)).await {
            Ok(r) => r,
            Err(_) => Err(TransportError::Timeout {
                addr: self.addr(),
                timeout: self.timeout,
            }),
        }
    }
} // }}}
