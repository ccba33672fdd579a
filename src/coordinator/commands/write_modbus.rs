use crate::prelude::*;
use crate::sofar::response::{parse_write_ack, WriteAck};

pub struct WriteModbus<'a, T: Transport> {
    transport: &'a T,
    inverter: &'a config::Inverter,
    frame: ModbusWrite,
}

impl<'a, T: Transport> WriteModbus<'a, T> {
    pub fn new(transport: &'a T, inverter: &'a config::Inverter, register: u16, value: u16) -> Self {
        Self {
            transport,
            inverter,
            frame: ModbusWrite::new(register, value),
        }
    }

    /// Confirmed only by an 8-byte write-multiple echo naming our register.
    pub async fn run(&self) -> Result<WriteAck> {
        info!("[{}] {}", self.inverter.name(), self.frame.describe());

        let reply = self
            .transport
            .exchange(&self.frame.bytes(), self.inverter.write_settle())
            .await?;

        let ack = parse_write_ack(&reply).map_err(|err| {
            anyhow!(
                "write to {} not confirmed: {}",
                RegisterAddress(self.frame.register),
                err
            )
        })?;

        if ack.register != self.frame.register {
            bail!(
                "write to {} acknowledged for {}",
                RegisterAddress(self.frame.register),
                RegisterAddress(ack.register)
            );
        }
        if ack.quantity != ModbusWrite::QUANTITY {
            bail!(
                "write to {} acknowledged {} registers, expected {}",
                RegisterAddress(self.frame.register),
                ack.quantity,
                ModbusWrite::QUANTITY
            );
        }

        info!("write confirmed for register {}", RegisterAddress(ack.register));
        Ok(ack)
    }
}
