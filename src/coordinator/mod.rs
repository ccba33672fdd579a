use crate::prelude::*;

pub mod commands;

use commands::{read_hold::ReadHold, set_hold::SetHold, write_modbus::WriteModbus};
use crate::error::Error;
use crate::sofar::response::WriteAck;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    pub ranges_requested: u64,
    pub ranges_failed: u64,
    pub registers_received: u64,
}

impl PollStats {
    pub fn print_summary(&self, name: &str) {
        debug!("Poll statistics for {}:", name);
        debug!("  Ranges requested: {}", self.ranges_requested);
        debug!("  Ranges failed: {}", self.ranges_failed);
        debug!("  Registers received: {}", self.registers_received);
    }
}

/// Drives one inverter: polls its register ranges in order and carries out
/// single reads and writes. One transaction at a time.
pub struct Coordinator<'a, T: Transport> {
    inverter: &'a config::Inverter,
    transport: T,
    stats: PollStats,
}

impl<'a, T: Transport> Coordinator<'a, T> {
    pub fn new(inverter: &'a config::Inverter, transport: T) -> Self {
        Self {
            inverter,
            transport,
            stats: PollStats::default(),
        }
    }

    pub fn inverter(&self) -> &config::Inverter {
        self.inverter
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// Reads every configured range and merges the results, later ranges
    /// overwriting earlier ones where they overlap. A range the stick does
    /// not answer is logged and skipped; only an impossible range fails the
    /// whole poll, before anything is sent.
    pub async fn poll(&mut self) -> Result<RegisterTable> {
        let reads = self
            .inverter
            .ranges()
            .into_iter()
            .map(|(start, end)| ReadHold::for_range(&self.transport, self.inverter, start, end))
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = RegisterTable::new();

        for read in &reads {
            self.stats.ranges_requested += 1;

            match read.run().await {
                Ok(values) => {
                    self.stats.registers_received += values.len() as u64;
                    table.merge(values);
                }
                Err(err) => {
                    self.stats.ranges_failed += 1;
                    warn!(
                        "[{}] {} failed: {}",
                        self.inverter.name(),
                        read.query().describe(),
                        err
                    );
                }
            }
        }

        debug!(
            "[{}] poll complete, {} registers",
            self.inverter.name(),
            table.len()
        );

        Ok(table)
    }

    /// Unlike `poll`, a transport failure here is the caller's to handle.
    pub async fn read_hold(&self, register: u16, count: u16) -> Result<RegisterTable, Error> {
        let read = ReadHold::new(&self.transport, self.inverter, register, count)?;
        Ok(read.run().await?)
    }

    pub async fn set_hold(&self, register: u16, value: u16) -> Result<()> {
        SetHold::new(&self.transport, self.inverter, register, value)
            .run()
            .await?;

        Ok(())
    }

    pub async fn write_modbus(&self, register: u16, value: u16) -> Result<WriteAck> {
        WriteModbus::new(&self.transport, self.inverter, register, value)
            .run()
            .await
    }
}
