use std::path::Path;

use anyhow::Context;
use pico_args::Arguments;

use crate::{utils::logging, Config};

/// Options every binary accepts
#[derive(Debug, Default)]
pub struct Common {
    /// Prints the usage menu
    pub help: bool,

    /// Path to a YAML config file
    pub config: Option<String>,
}

impl Common {
    /// Pull the shared options out of the argument list
    pub fn parse(pargs: &mut Arguments) -> Result<Self, pico_args::Error> {
        Ok(Self {
            help: pargs.contains(["-h", "--help"]),
            config: pargs.opt_value_from_str(["-c", "--config"])?,
        })
    }

    /// Load the config file (or defaults) and start logging with its level and file
    pub fn init(&self) -> anyhow::Result<Config> {
        let config = Config::load_or_default(self.config.as_deref())?;

        logging::init(
            config.log_level.as_deref(),
            config.log_file.as_deref().map(Path::new),
        )
        .with_context(|| {
            format!(
                "Unable to open log file {}",
                config.log_file.as_deref().unwrap_or_default()
            )
        })?;

        Ok(config)
    }
}

/// Map a missing positional argument to a readable error
pub fn required(name: &str, err: pico_args::Error) -> anyhow::Error {
    match err {
        pico_args::Error::MissingArgument => anyhow!("Missing required argument: {}", name),
        _ => anyhow!("{}", err),
    }
}
