use std::{num::NonZeroUsize, path::Path, path::PathBuf};

use dockwatch::daemon::DEFAULT_SOCKET_PATH;
use dockwatch::watcher::{DEFAULT_CAPACITY, DEFAULT_SINCE};

use crate::cli::Args;

fn default_socket() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_since() -> i64 {
    DEFAULT_SINCE
}

fn default_capacity() -> NonZeroUsize {
    DEFAULT_CAPACITY
}

#[derive(Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockwatchConfig {
    /// Daemon socket to connect to.
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
    /// Unix timestamp the event stream starts from.
    #[serde(default = "default_since")]
    pub since: i64,
    /// Events buffered between the watcher and the printer.
    #[serde(default = "default_capacity")]
    pub capacity: NonZeroUsize,
}

impl Default for DockwatchConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            since: default_since(),
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DockwatchConfig {
    fn try_init_from_string(val: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(val)?)
    }

    /// Read the config file at `path`. A missing file means defaults.
    pub fn try_init(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(config) => Self::try_init_from_string(&config),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {path:?}, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Command line flags take precedence over the file.
    pub fn apply_args(mut self, args: &Args) -> Self {
        if let Some(socket) = &args.socket {
            self.socket = socket.clone();
        }
        if let Some(since) = args.since {
            self.since = since;
        }
        self
    }
}
