pub mod conf_serde;

use std::{
    net::Ipv4Addr,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use network_types::{esp::ESP_PROTO, ip::IpProto};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::runtime::{
    cli::Cli,
    conf::conf_serde::{duration, level},
};

/// Prefix of environment variables that override configuration keys. Nested
/// keys are separated by a double underscore, e.g.
/// `ESP_CODEC_DECODERS__ESP__ENABLED=true`.
pub const ENV_PREFIX: &str = "ESP_CODEC_";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConf {
    /// Enable the metrics server.
    pub enabled: bool,
    /// The network address the metrics server will listen on.
    pub listen_address: String,
    /// The port the metrics server will listen on.
    pub port: u16,
}

impl Default for MetricsConf {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 10250,
        }
    }
}

/// ESP decoder settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EspConf {
    /// When off, every ESP layer is rejected untouched and nothing is counted.
    pub enabled: bool,
}

/// Protocols whose payload is handed to later inspection without parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TerminalConf {
    pub protocols: Vec<u8>,
}

impl Default for TerminalConf {
    fn default() -> Self {
        let protocols = [
            IpProto::Icmp,
            IpProto::Ipv4,
            IpProto::Tcp,
            IpProto::Udp,
            IpProto::Ipv6,
            IpProto::Gre,
            IpProto::Ipv6Icmp,
            IpProto::Sctp,
        ];
        Self {
            protocols: protocols.into_iter().map(|p| p as u8).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecodersConf {
    pub esp: EspConf,
    pub terminal: TerminalConf,
}

/// Application configuration.
///
/// Layered lowest to highest: built-in defaults, the YAML file, `ESP_CODEC_*`
/// environment variables, then command-line flags.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Conf {
    /// Path the configuration was loaded from, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(with = "level")]
    pub log_level: Level,

    /// Number of decode workers, each owning its own codec instances.
    /// - Default: 2
    pub worker_count: usize,

    /// Capacity of each worker's packet channel.
    /// - Default: 1024
    pub packet_channel_capacity: usize,

    /// How often worker peg lanes are folded into the published totals.
    /// - Default: 10s
    #[serde(with = "duration")]
    pub stats_interval: Duration,

    /// Protocol id of the first layer of every input packet.
    /// - Default: 50 (ESP)
    pub start_protocol: u16,

    /// Upper bound on layers decoded per packet.
    /// - Default: 8
    pub max_layers: usize,

    #[serde(default)]
    pub decoders: DecodersConf,

    #[serde(default)]
    pub metrics: MetricsConf,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            config_path: None,
            log_level: Level::INFO,
            worker_count: defaults::worker_count(),
            packet_channel_capacity: defaults::packet_channel_capacity(),
            stats_interval: defaults::stats_interval(),
            start_protocol: ESP_PROTO,
            max_layers: defaults::max_layers(),
            decoders: DecodersConf::default(),
            metrics: MetricsConf::default(),
        }
    }
}

mod defaults {
    use std::time::Duration;

    pub fn worker_count() -> usize {
        2
    }

    pub fn packet_channel_capacity() -> usize {
        1024
    }

    pub fn stats_interval() -> Duration {
        Duration::from_secs(10)
    }

    pub fn max_layers() -> usize {
        8
    }
}

impl Conf {
    /// Loads the configuration for `cli` and hands the CLI back.
    ///
    /// # Errors
    ///
    /// * `ConfError::NoConfigFile` - the given config path does not exist.
    /// * `ConfError::InvalidConfigPath` - the config path is not a file.
    /// * `ConfError::InvalidExtension` - the config file is not YAML.
    /// * `ConfError::Extraction` - a layer holds a value of the wrong type.
    /// * `ConfError::Invalid` - a value is out of range.
    pub fn new(cli: Cli) -> Result<(Self, Cli), ConfError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Conf::default()));

        if let Some(config_path) = &cli.config {
            validate_config_path(config_path)?;
            figment = figment.merge(Yaml::file(config_path));
        }

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(&cli));

        let mut conf: Conf = figment.extract()?;
        conf.validate()?;

        conf.config_path = cli.config.clone();
        Ok((conf, cli))
    }

    fn validate(&self) -> Result<(), ConfError> {
        if self.worker_count == 0 {
            return Err(ConfError::Invalid {
                key: "worker_count",
                reason: "at least one worker is required",
            });
        }
        if self.packet_channel_capacity == 0 {
            return Err(ConfError::Invalid {
                key: "packet_channel_capacity",
                reason: "channel capacity must be positive",
            });
        }
        if self.max_layers == 0 {
            return Err(ConfError::Invalid {
                key: "max_layers",
                reason: "at least one layer must be decodable",
            });
        }
        if self.stats_interval.is_zero() {
            return Err(ConfError::Invalid {
                key: "stats_interval",
                reason: "interval must be non-zero",
            });
        }
        Ok(())
    }
}

/// Checks that `path` is an existing file with a YAML extension.
fn validate_config_path(path: &Path) -> Result<(), ConfError> {
    if !path.is_file() {
        if path.exists() {
            return Err(ConfError::InvalidConfigPath(
                path.to_string_lossy().into_owned(),
            ));
        }
        return Err(ConfError::NoConfigFile(path.to_path_buf()));
    }

    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => Ok(()),
        Some(ext) => Err(ConfError::InvalidExtension(ext.to_string())),
        None => Err(ConfError::InvalidExtension("none".to_string())),
    }
}

#[derive(Debug, Error)]
pub enum ConfError {
    #[error("config file {} does not exist", .0.display())]
    NoConfigFile(PathBuf),

    /// The path exists but is not a file (e.g., it's a directory).
    #[error("path '{0}' is not a valid file")]
    InvalidConfigPath(String),

    #[error("invalid file extension '.{0}', expected 'yaml' or 'yml'")]
    InvalidExtension(String),

    #[error("configuration error: {0}")]
    Extraction(#[source] Box<figment::Error>),

    #[error("invalid value for '{key}': {reason}")]
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}

impl From<figment::Error> for ConfError {
    fn from(e: figment::Error) -> Self {
        ConfError::Extraction(Box::new(e))
    }
}
