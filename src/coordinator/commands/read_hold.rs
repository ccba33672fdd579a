use crate::prelude::*;
use crate::sofar::response::parse_read_response;

use std::time::Duration;

pub struct ReadHold<'a, T: Transport> {
    transport: &'a T,
    query: ReadQuery,
    bound: SlotBound,
}

impl<'a, T: Transport> ReadHold<'a, T> {
    pub fn new(
        transport: &'a T,
        inverter: &config::Inverter,
        register: u16,
        count: u16,
    ) -> Result<Self, ProtocolPreconditionError> {
        Ok(Self {
            transport,
            query: ReadQuery::new(inverter.serial(), register, count)?,
            bound: inverter.slot_bound(),
        })
    }

    /// Reads `start..=end`.
    pub fn for_range(
        transport: &'a T,
        inverter: &config::Inverter,
        start: u16,
        end: u16,
    ) -> Result<Self, ProtocolPreconditionError> {
        Ok(Self {
            transport,
            query: ReadQuery::for_range(inverter.serial(), start, end)?,
            bound: inverter.slot_bound(),
        })
    }

    pub fn query(&self) -> &ReadQuery {
        &self.query
    }

    pub async fn run(&self) -> Result<RegisterTable, TransportError> {
        debug!("{}", self.query.describe());

        let reply = self
            .transport
            .exchange(&self.query.bytes(), Duration::ZERO)
            .await?;

        let table = parse_read_response(&reply, self.query.start(), self.query.count(), self.bound);
        debug!(
            "{} registers decoded from {}",
            table.len(),
            RegisterAddress(self.query.start())
        );

        Ok(table)
    }
}
