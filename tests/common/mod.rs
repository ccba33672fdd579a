#![allow(dead_code)]

use sofar_bridge::prelude::*;
use sofar_bridge::sofar::checksum::{additive_checksum, crc16_modbus};

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub enum Reply {
    Bytes(Vec<u8>),
    Timeout,
    Empty,
}

/// Answers each exchange with the next queued reply and remembers what was sent.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(Vec<u8>, Duration)>>,
}

impl MockTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(Vec<u8>, Duration)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(&self, request: &[u8], settle: Duration) -> Result<Bytes, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.to_vec(), settle));

        let addr = "mock:8899".to_string();
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Bytes(b)) => Ok(Bytes::from(b)),
            Some(Reply::Timeout) => Err(TransportError::Timeout {
                addr,
                timeout: Duration::from_secs(15),
            }),
            Some(Reply::Empty) | None => Err(TransportError::Empty { addr }),
        }
    }
}

pub struct Factory();
impl Factory {
    pub fn serial() -> Serial {
        Serial::new(1234567890)
    }

    pub fn config(extra: &str) -> Config {
        let yaml = format!(
            "
inverters:
  - name: test
    host: localhost
    serial: 1234567890
{}",
            extra
        );
        Config::from_yaml(&yaml).unwrap()
    }

    pub fn inverter() -> config::Inverter {
        Self::config("").inverters[0].clone()
    }

    /// Inverter polling only the given ranges.
    pub fn inverter_with_ranges(ranges: &[(u16, u16)], strict: bool) -> config::Inverter {
        let ranges: Vec<String> = ranges
            .iter()
            .map(|(s, e)| format!("      - [{}, {}]", s, e))
            .collect();
        let extra = format!(
            "    strict_register_count: {}\n    register_ranges:\n{}\n",
            strict,
            ranges.join("\n")
        );
        Self::config(&extra).inverters[0].clone()
    }

    /// A read response as the stick sends it: 25 bytes of envelope, then a
    /// Modbus read reply (slave, function, byte count, values, crc), then
    /// checksum and end marker.
    pub fn read_response(values: &[u16]) -> Vec<u8> {
        let mut modbus = vec![0x01, 0x03, (values.len() * 2) as u8];
        for v in values {
            modbus.extend_from_slice(&v.to_be_bytes());
        }
        let crc = crc16_modbus(&modbus);
        modbus.extend_from_slice(&crc.to_le_bytes());

        let mut r = vec![0xa5];
        r.extend_from_slice(&((14 + modbus.len()) as u16).to_le_bytes());
        r.extend_from_slice(&[0x10, 0x15, 0x00, 0x00]);
        r.extend_from_slice(&Self::serial().wire_bytes());
        r.extend_from_slice(&[0x02, 0x01]);
        r.extend_from_slice(&[0; 12]);
        r.extend_from_slice(&modbus);

        let checksum = additive_checksum(&r[1..]);
        r.push(checksum);
        r.push(0x15);
        r
    }

    /// Same, cut off after `len` bytes.
    pub fn truncated_response(values: &[u16], len: usize) -> Vec<u8> {
        let mut r = Self::read_response(values);
        r.truncate(len);
        r
    }
}
