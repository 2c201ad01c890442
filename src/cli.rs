use std::{path::PathBuf, sync::OnceLock};

use clap::{Parser, ValueEnum};

/// Stream Docker container events, enriched with the container they refer to.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the config file.
    #[arg(short, long, default_value = "dockwatch.toml")]
    pub config: PathBuf,
    /// Daemon socket. Overrides the config file.
    #[arg(short, long)]
    pub socket: Option<PathBuf>,
    /// Replay events since this unix timestamp. Overrides the config file.
    #[arg(long)]
    pub since: Option<i64>,
    /// How each event is printed.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}
