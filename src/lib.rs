pub mod config; // YAML configuration
pub mod coordinator; // polling and single register commands
pub mod datalog_writer; // raw register tables to JSON lines
pub mod error;
pub mod interpreter; // register values to physical quantities
pub mod options; // command line
pub mod prelude;
pub mod prometheus;
pub mod readings; // the register map
pub mod register;
pub mod report; // text output
pub mod sofar; // wire protocol

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use coordinator::Coordinator;
use datalog_writer::DatalogWriter;
use options::{Command, Format};
use std::io::Write;

/// Sets up `env_logger` with the bridge's line format. `RUST_LOG` overrides
/// `default_level`; `verbose` forces debug regardless.
pub fn init_logging(default_level: &str, verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }

    let r = builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(e) = r {
        warn!("logging already initialised: {}", e);
    }
}

pub async fn app(options: Options) -> Result<()> {
    let config = Config::new(options.config_file.clone())?;

    init_logging(config.loglevel(), options.verbose);
    info!(
        "sofar-bridge {} starting with config file: {}",
        CARGO_PKG_VERSION, options.config_file
    );
    config.log_details();

    match options.command {
        Command::Monitor { format } => {
            let inverters = select_inverters(&config, options.inverter.as_deref())?;
            monitor(&config, &inverters, format).await
        }
        Command::Read { register, count } => {
            let inverter = select_inverter(&config, options.inverter.as_deref())?;
            read(inverter, register, count).await
        }
        Command::Write { register, value } => {
            let inverter = select_inverter(&config, options.inverter.as_deref())?;
            let coordinator = Coordinator::new(inverter, TcpTransport::from_config(inverter));

            println!("Writing value {} to register {}...", value, RegisterAddress(register));
            coordinator.set_hold(register, value).await?;
            println!(
                "Write command sent. Please verify the change by reading register {}",
                RegisterAddress(register)
            );
            Ok(())
        }
        Command::WriteModbus { register, value } => {
            let inverter = select_inverter(&config, options.inverter.as_deref())?;
            let coordinator = Coordinator::new(inverter, TcpTransport::from_config(inverter));

            println!("Writing value {} to register {}...", value, RegisterAddress(register));
            let ack = coordinator.write_modbus(register, value).await?;
            println!("Write confirmed for register {}", RegisterAddress(ack.register));
            Ok(())
        }
    }
}

/// The named inverter, or every enabled one.
pub fn select_inverters<'a>(config: &'a Config, name: Option<&str>) -> Result<Vec<&'a config::Inverter>> {
    match name {
        Some(name) => match config.inverter_with_name(name) {
            Some(inverter) => Ok(vec![inverter]),
            None => bail!("no inverter named {} in config", name),
        },
        None => {
            let inverters = config.enabled_inverters();
            if inverters.is_empty() {
                bail!("no enabled inverters in config");
            }
            Ok(inverters)
        }
    }
}

/// The named inverter, or the first enabled one.
pub fn select_inverter<'a>(config: &'a Config, name: Option<&str>) -> Result<&'a config::Inverter> {
    select_inverters(config, name)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no inverter selected"))
}

async fn monitor(config: &Config, inverters: &[&config::Inverter], format: Format) -> Result<()> {
    let datalog = match config.datalog_file() {
        Some(path) => Some(DatalogWriter::new(path)?),
        None => None,
    };

    let mut empty = Vec::new();

    for inverter in inverters {
        let mut coordinator = Coordinator::new(inverter, TcpTransport::from_config(inverter));
        let table = coordinator.poll().await?;
        coordinator.stats().print_summary(inverter.name());

        if table.is_empty() {
            println!("No data received from inverter");
            empty.push(inverter.name());
            continue;
        }

        if let Some(writer) = &datalog {
            if let Err(err) = writer.write_table(inverter, &table) {
                warn!("datalog: {}", err);
            }
        }

        let readings = Readings::decode(&table);
        if inverters.len() > 1 && format == Format::Text {
            println!("\n##### {} #####", inverter.name());
        }
        match format {
            Format::Text => print!("{}", report::Report(&readings)),
            Format::Json => println!("{}", serde_json::to_string_pretty(&readings)?),
            Format::Prometheus => {
                // one metric name per inverter when several are polled
                let prefix = if inverters.len() > 1 {
                    format!("{}_{}", config.metrics_prefix(), inverter.name())
                } else {
                    config.metrics_prefix().to_string()
                };
                println!("{}", prometheus::render(&prefix, &readings));
            }
        }
    }

    if !empty.is_empty() {
        bail!("no data received from {}", empty.join(", "));
    }

    Ok(())
}

async fn read(inverter: &config::Inverter, register: u16, count: u16) -> Result<()> {
    let coordinator = Coordinator::new(inverter, TcpTransport::from_config(inverter));
    let table = coordinator.read_hold(register, count).await?;

    let requested = u32::from(register)..u32::from(register) + u32::from(count);
    let mut printed = 0;
    for (address, value) in table.iter() {
        if requested.contains(&u32::from(address.value())) {
            println!("Register {} value: {} (0x{:04x})", address, value, value);
            printed += 1;
        }
    }

    if printed == 0 {
        bail!("failed to read {} from inverter", RegisterAddress(register));
    }

    Ok(())
}
