use crate::prelude::*;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Appends each poll's raw register table to a file, one JSON object per line.
#[derive(Debug, Clone)]
pub struct DatalogWriter {
    file: Arc<Mutex<std::fs::File>>,
    path: String,
    values_written: Arc<Mutex<u64>>,
}

impl DatalogWriter {
    pub fn new(path: &str) -> Result<Self> {
        info!("Opening datalog file at {}", path);

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| anyhow!("failed to open datalog file {}: {}", path, err))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
                .map_err(|err| anyhow!("failed to set permissions on {}: {}", path, err))?;
        }

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_string(),
            values_written: Arc::new(Mutex::new(0)),
        })
    }

    pub fn write_table(&self, inverter: &config::Inverter, table: &RegisterTable) -> Result<()> {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        let mut raw_data = serde_json::Map::new();
        for (register, value) in table.iter() {
            raw_data.insert(
                register.to_string(),
                serde_json::Value::String(format!("0x{:04X}", value)),
            );
        }

        let line = serde_json::json!({
            "utc_timestamp": timestamp,
            "inverter": inverter.name(),
            "serial": inverter.serial().to_string(),
            "raw_data": raw_data,
        });

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("failed to lock datalog file"))?;
        writeln!(file, "{}", serde_json::to_string(&line)?)
            .and_then(|_| file.flush())
            .map_err(|err| anyhow!("failed to write datalog file {}: {}", self.path, err))?;

        let mut values_written = self
            .values_written
            .lock()
            .map_err(|_| anyhow!("failed to lock values counter"))?;
        *values_written += table.len() as u64;
        debug!("Total values stored in datalog file: {}", *values_written);

        Ok(())
    }

    pub fn values_written(&self) -> u64 {
        self.values_written.lock().map(|v| *v).unwrap_or(0)
    }
}
