use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tally_log::LogConfig;
use tally_metrics::CollectorConfig;

/// Indicates config related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to open or read the file.
    #[error("could not read config file {}", path.display())]
    CouldNotRead {
        /// The path that failed to load.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to parse the file contents.
    #[error("invalid yaml in config file {}", path.display())]
    BadYaml {
        /// The path that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Controls the UDP listener.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// The host the listener binds to. Defaults to `0.0.0.0`.
    pub host: String,

    /// The port the listener binds to. Defaults to `8125`.
    pub port: u16,
}

impl ListenerConfig {
    /// Returns the bind address as a `(host, port)` pair.
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8125,
        }
    }
}

/// Controls the console flush consumer.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Render every snapshot to stdout. Defaults to `false`.
    pub enabled: bool,
}

/// Controls the built-in sample traffic generator.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Send a small stream of example metrics to the own listener. Defaults to `false`.
    ///
    /// Useful to exercise a freshly configured instance without a real submitter.
    pub enabled: bool,
}

/// Static configuration of a Tally instance.
///
/// Every field has a default, so an empty file (or no file at all) yields a usable
/// configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Aggregation engine settings.
    pub collector: CollectorConfig,

    /// UDP listener settings.
    pub listener: ListenerConfig,

    /// Console consumer settings.
    pub console: ConsoleConfig,

    /// Sample traffic generator settings.
    pub sampler: SamplerConfig,

    /// Logging settings.
    pub logging: LogConfig,
}

impl Config {
    /// Loads the configuration from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::CouldNotRead {
            path: path.to_owned(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::BadYaml {
            path: path.to_owned(),
            source,
        })
    }

    /// Serializes the configuration into a YAML string.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
