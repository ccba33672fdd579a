use crate::register::parse_u16;

use clap::{Parser, Subcommand, ValueEnum};

/// Sofar Bridge - poll and control Sofar HYD inverters through their LSW logger stick
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Log frames and raw responses
    #[clap(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Inverter to talk to, by name. Defaults to the first enabled one
    /// (all enabled ones for monitor)
    #[clap(short = 'i', long = "inverter")]
    pub inverter: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll every configured register range and print the readings
    Monitor {
        #[clap(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Read raw holding registers
    Read {
        #[clap(short, long, value_parser = parse_u16)]
        register: u16,
        #[clap(short = 'n', long, default_value_t = 1, value_parser = parse_u16)]
        count: u16,
    },
    /// Write one register with the HYD frame
    Write {
        #[clap(short, long, value_parser = parse_u16)]
        register: u16,
        #[clap(long, value_parser = parse_u16)]
        value: u16,
    },
    /// Write one register with a plain Modbus RTU frame
    WriteModbus {
        #[clap(short, long, value_parser = parse_u16)]
        register: u16,
        #[clap(long, value_parser = parse_u16)]
        value: u16,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Prometheus,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
