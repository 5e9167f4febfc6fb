//! YAML configuration file.

use std::{fs, path::Path, time::Duration};

use reqwest::Url;
use serde::Deserialize;

use crate::{
    api::{emi, mqtt::Broker},
    prelude::*,
};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub emi: EmiConfig,
    pub mqtt: MqttConfig,
}

impl Config {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        info!("reading the configuration…");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        Self::parse(&contents).with_context(|| format!("`{}` is malformed", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct EmiConfig {
    pub api_key: String,

    /// Grid exit point code to filter by.
    pub gxp: String,

    #[serde(default = "EmiConfig::default_endpoint")]
    pub endpoint: String,

    #[serde(default = "EmiConfig::default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl EmiConfig {
    fn default_endpoint() -> String {
        emi::DEFAULT_ENDPOINT.to_owned()
    }

    const fn default_timeout_seconds() -> u64 {
        10
    }

    pub fn endpoint(&self) -> Result<Url> {
        Url::parse(&self.endpoint).with_context(|| format!("`{}` is an invalid URL", self.endpoint))
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct MqttConfig {
    pub broker_address: String,
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Pause between the poll cycles.
    pub wait_seconds: u64,

    #[serde(default)]
    pub run_verbose: bool,

    #[serde(default = "MqttConfig::default_client_id")]
    pub client_id: String,

    #[serde(default = "MqttConfig::default_keep_alive_seconds")]
    pub keep_alive_seconds: u64,

    /// Overrides the local host name in the topics.
    #[serde(default)]
    pub hostname: Option<String>,
}

impl MqttConfig {
    fn default_client_id() -> String {
        "nzem_publisher".to_owned()
    }

    const fn default_keep_alive_seconds() -> u64 {
        60
    }

    pub const fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_seconds)
    }

    pub fn broker(&self) -> Broker {
        Broker::builder()
            .address(&self.broker_address)
            .port(self.port)
            .client_id(&self.client_id)
            .maybe_username(self.username.clone())
            .maybe_password(self.password.clone())
            .keep_alive(Duration::from_secs(self.keep_alive_seconds))
            .build()
    }
}
