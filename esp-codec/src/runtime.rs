use clap::Parser;

use crate::runtime::{
    cli::Cli,
    conf::{Conf, ConfError},
};

pub mod cli;
pub mod conf;
pub mod logging;
pub mod pipeline;

pub struct Runtime {
    pub cli: Cli,
    pub conf: Conf,
}

impl Runtime {
    pub fn new() -> Result<Self, ConfError> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self, ConfError> {
        let (conf, cli) = Conf::new(cli)?;
        Ok(Runtime { cli, conf })
    }
}
