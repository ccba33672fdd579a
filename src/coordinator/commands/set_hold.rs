use crate::prelude::*;

use bytes::Bytes;

/// Single register write using the HYD frame. The stick gives no structured
/// acknowledgement for these; any reply at all counts as delivered.
pub struct SetHold<'a, T: Transport> {
    transport: &'a T,
    inverter: &'a config::Inverter,
    frame: ProprietaryWrite,
}

impl<'a, T: Transport> SetHold<'a, T> {
    pub fn new(transport: &'a T, inverter: &'a config::Inverter, register: u16, value: u16) -> Self {
        Self {
            transport,
            inverter,
            frame: ProprietaryWrite::new(register, value),
        }
    }

    pub async fn run(&self) -> Result<Bytes> {
        info!("[{}] {}", self.inverter.name(), self.frame.describe());

        let reply = self
            .transport
            .exchange(&self.frame.bytes(), self.inverter.write_settle())
            .await
            .map_err(|err| {
                anyhow!(
                    "failed to write register {}: {}",
                    RegisterAddress(self.frame.register),
                    err
                )
            })?;

        Ok(reply)
    }
}
