//! Configuration management for RAX FTP Client
//!
//! Settings come from an optional TOML file with environment overrides
//! (`RAX_FTP_CLIENT_<KEY>`); every key has a default.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::transfer::DataMode;

/// Client configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Server to open on startup, if any
    pub default_host: Option<String>,

    /// Control port used when `open` gives none
    pub default_port: u16,

    /// Data connection mode for new sessions
    pub data_mode: DataMode,

    /// Address announced with PORT (defaults to the control socket's address)
    pub active_bind_address: Option<String>,

    /// Listening port for active mode, 0 for any free port
    pub active_port: u16,

    /// How long active mode waits for the server to connect back
    pub accept_timeout_secs: u64,

    /// Control connection connect timeout
    pub connect_timeout_secs: u64,

    /// Control connection read timeout; unset blocks indefinitely
    pub control_timeout_secs: Option<u64>,

    /// Chunk size for data transfers
    pub buffer_size: usize,

    /// Send `OPTS UTF8 ON` right after connecting
    pub send_utf8_opts: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_host: None,
            default_port: 21,
            data_mode: DataMode::Passive,
            active_bind_address: None,
            active_port: 0,
            accept_timeout_secs: 5,
            connect_timeout_secs: 10,
            control_timeout_secs: None,
            buffer_size: 4096,
            send_utf8_opts: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from config/client.toml or client.toml with
    /// environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/client").required(false))
            .add_source(File::with_name("client").required(false))
            .add_source(Environment::with_prefix("RAX_FTP_CLIENT").try_parsing(true))
            .build()?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self, ConfigError> {
        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_port == 0 {
            return Err(ConfigError::Message("default_port cannot be 0".into()));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if self.accept_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "accept_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.control_timeout_secs == Some(0) {
            return Err(ConfigError::Message(
                "control_timeout_secs must be greater than 0 when set".into(),
            ));
        }

        if let Some(address) = &self.active_bind_address {
            if address.parse::<Ipv4Addr>().is_err() {
                return Err(ConfigError::Message(format!(
                    "active_bind_address must be an IPv4 address, got {address}"
                )));
            }
        }

        Ok(())
    }

    /// Get the active mode address as Ipv4Addr
    pub fn active_ip(&self) -> Option<Ipv4Addr> {
        self.active_bind_address
            .as_deref()
            .and_then(|address| address.parse().ok())
    }

    /// Get accept timeout as Duration
    pub fn accept_timeout(&self) -> Duration {
        Duration::from_secs(self.accept_timeout_secs)
    }

    /// Get connect timeout as Duration; 0 disables it
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    /// Get control read timeout as Duration
    pub fn control_timeout(&self) -> Option<Duration> {
        self.control_timeout_secs.map(Duration::from_secs)
    }
}
