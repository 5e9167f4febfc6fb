use std::{env, path::PathBuf};

use clap::Parser;
use reqwest::Url;

use crate::prelude::*;

const DEFAULT_CONFIG_FILE_NAME: &str = "nzem_config.yaml";

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Configuration file, `nzem_config.yaml` next to the executable by default.
    #[clap(long = "config", env = "NZEM_CONFIG")]
    config: Option<PathBuf>,

    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub heartbeat_url: Option<Url>,
}

impl Args {
    pub fn config_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config {
            return Ok(path.clone());
        }
        let executable = env::current_exe().context("failed to locate the executable")?;
        let directory = executable.parent().context("the executable has no parent directory")?;
        Ok(directory.join(DEFAULT_CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_ok() -> Result {
        let args = Args::try_parse_from(["nzem-mqtt", "--config", "/etc/nzem.yaml"])?;
        assert_eq!(args.config_path()?, PathBuf::from("/etc/nzem.yaml"));
        Ok(())
    }

    #[test]
    fn default_config_next_to_executable_ok() -> Result {
        let args = Args { config: None, heartbeat_url: None };
        let path = args.config_path()?;
        assert!(path.ends_with(DEFAULT_CONFIG_FILE_NAME));
        assert_eq!(path.parent(), env::current_exe()?.parent());
        Ok(())
    }
}
