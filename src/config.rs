use crate::prelude::*;
use crate::readings::DEFAULT_RANGES;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub inverters: Vec<Inverter>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,

    /// Metric name used by the Prometheus output
    #[serde(default = "Config::default_metrics_prefix")]
    pub metrics_prefix: String,

    /// Optional path to append raw register tables to, one JSON object per line
    pub datalog_file: Option<String>,
}

// Inverter {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Inverter {
    #[serde(default = "Config::default_inverter_name")]
    pub name: String,

    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub host: String,
    #[serde(default = "Config::default_port")]
    pub port: u16,

    // accept both `1234567890` and `"0x499602D2"`
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub serial: Serial,

    pub read_timeout: Option<u64>,
    pub write_settle_ms: Option<u64>,
    pub strict_register_count: Option<bool>,
    pub register_ranges: Option<Vec<(u16, u16)>>,
}

impl Inverter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn serial(&self) -> Serial {
        self.serial
    }

    pub fn read_timeout(&self) -> u64 {
        self.read_timeout.unwrap_or(15)
    }

    pub fn write_settle(&self) -> Duration {
        Duration::from_millis(self.write_settle_ms.unwrap_or(500))
    }

    pub fn strict_register_count(&self) -> bool {
        self.strict_register_count == Some(true)
    }

    pub fn slot_bound(&self) -> SlotBound {
        if self.strict_register_count() {
            SlotBound::Requested
        } else {
            SlotBound::Inclusive
        }
    }

    /// Inclusive `(start, end)` pairs to poll, in order.
    pub fn ranges(&self) -> Vec<(u16, u16)> {
        match &self.register_ranges {
            Some(r) => r.clone(),
            None => DEFAULT_RANGES.to_vec(),
        }
    }
} // }}}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config is read before logging is set up, so its summary is logged
    /// separately once it is.
    pub fn log_details(&self) {
        info!("Configuration loaded successfully:");
        info!(
            "  Inverters: {} configured, {} enabled",
            self.inverters.len(),
            self.inverters.iter().filter(|i| i.enabled).count()
        );
        for inv in &self.inverters {
            info!("    Inverter {}:", inv.name);
            info!("      Enabled: {}", inv.enabled);
            info!("      Address: {}:{}", inv.host, inv.port);
            info!("      Serial: {}", inv.serial);
            info!("      Read Timeout: {}s", inv.read_timeout());
            info!("      Write Settle: {}ms", inv.write_settle().as_millis());
            info!("      Register Slots: {:?}", inv.slot_bound());
            info!("      Ranges: {}", inv.ranges().len());
        }
        info!("  Metrics Prefix: {}", self.metrics_prefix);
        info!(
            "  Datalog File: {}",
            self.datalog_file.as_deref().unwrap_or("disabled")
        );
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        if self.inverters.is_empty() {
            bail!("no inverters configured");
        }

        let mut names = HashSet::new();
        for inv in &self.inverters {
            if !names.insert(inv.name.as_str()) {
                bail!("inverter name {} is used more than once", inv.name);
            }
            // becomes part of the metric name when several inverters are polled
            if inv.name.is_empty()
                || !inv
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                bail!(
                    "inverter name {:?} may only contain letters, digits and underscores",
                    inv.name
                );
            }

            if inv.enabled {
                if inv.host.is_empty() {
                    bail!("inverter {}: host cannot be empty", inv.name);
                }
                if inv.port == 0 {
                    bail!("inverter {}: port must be between 1 and 65535", inv.name);
                }
                if inv.read_timeout() == 0 {
                    bail!("inverter {}: read_timeout cannot be 0", inv.name);
                }
            }

            for (start, end) in inv.ranges() {
                if end < start {
                    bail!(
                        "inverter {}: register range {}-{} ends before it starts",
                        inv.name,
                        RegisterAddress(start),
                        RegisterAddress(end)
                    );
                }
            }
        }

        Ok(())
    }

    pub fn enabled_inverters(&self) -> Vec<&Inverter> {
        self.inverters.iter().filter(|i| i.enabled()).collect()
    }

    pub fn inverter_with_name(&self, name: &str) -> Option<&Inverter> {
        self.inverters.iter().find(|i| i.name() == name)
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    pub fn metrics_prefix(&self) -> &str {
        &self.metrics_prefix
    }

    pub fn datalog_file(&self) -> Option<&str> {
        self.datalog_file.as_deref()
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_inverter_name() -> String {
        "inverter".to_string()
    }

    fn default_port() -> u16 {
        8899
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_metrics_prefix() -> String {
        "sofar".to_string()
    }
}
