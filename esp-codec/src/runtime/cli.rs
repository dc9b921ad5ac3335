use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::runtime::conf::conf_serde::level;

/// Decode hex-encoded ESP packets and report how each one was classified.
///
/// Fields that are not skipped by serde are merged on top of the loaded
/// configuration, so a flag given here always wins.
#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Set the path to the configuration file (e.g., "esp-codec.yaml").
    #[arg(short, long, value_name = "FILE", env = "ESP_CODEC_CONFIG_PATH")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Set the application's log level (e.g., "debug", "warn").
    #[arg(short, long, value_name = "LEVEL", env = "ESP_CODEC_LOG_LEVEL")]
    #[serde(
        with = "level::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub log_level: Option<Level>,

    /// File with one hex-encoded packet per line, or "-" for stdin.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "ESP_CODEC_INPUT",
        default_value = "-"
    )]
    #[serde(skip)]
    pub input: PathBuf,

    /// Number of decode workers.
    #[arg(short, long, value_name = "N", env = "ESP_CODEC_WORKER_COUNT")]
    #[serde(
        rename = "worker_count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub workers: Option<usize>,

    /// Keep serving metrics after the input is exhausted, until Ctrl-C.
    #[arg(long)]
    #[serde(skip)]
    pub linger: bool,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser as _;
    use figment::Jail;
    use tracing::Level;

    use super::Cli;

    #[test]
    fn parses_long_flags() {
        Jail::expect_with(|jail| {
            jail.set_env("ESP_CODEC_CONFIG_PATH", "/tmp/esp-codec.yaml");
            jail.set_env("ESP_CODEC_LOG_LEVEL", "debug");

            let cli = Cli::parse_from([
                "esp-codec",
                "--config",
                "/path/to/conf.yaml",
                "--log-level",
                "warn",
                "--input",
                "packets.hex",
                "--workers",
                "4",
                "--linger",
            ]);
            assert_eq!(cli.config, Some(PathBuf::from("/path/to/conf.yaml")));
            assert_eq!(cli.log_level, Some(Level::WARN));
            assert_eq!(cli.input, PathBuf::from("packets.hex"));
            assert_eq!(cli.workers, Some(4));
            assert!(cli.linger);

            Ok(())
        });
    }

    #[test]
    fn parses_from_env_when_no_args() {
        Jail::expect_with(|jail| {
            jail.set_env("ESP_CODEC_CONFIG_PATH", "/tmp/esp-codec.yaml");
            jail.set_env("ESP_CODEC_LOG_LEVEL", "debug");
            jail.set_env("ESP_CODEC_WORKER_COUNT", "3");

            let cli = Cli::parse_from(["esp-codec"]);
            assert_eq!(cli.config, Some(PathBuf::from("/tmp/esp-codec.yaml")));
            assert_eq!(cli.log_level, Some(Level::DEBUG));
            assert_eq!(cli.workers, Some(3));

            Ok(())
        });
    }

    #[test]
    fn defaults_read_stdin_and_leave_conf_alone() {
        Jail::expect_with(|_| {
            let cli = Cli::parse_from(["esp-codec"]);
            assert_eq!(cli.input, PathBuf::from("-"));
            assert_eq!(cli.log_level, None);
            assert_eq!(cli.workers, None);
            assert!(!cli.linger);

            Ok(())
        });
    }
}
