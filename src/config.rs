//! Startup configuration read from the environment

use std::path::PathBuf;

use thiserror::Error;

use crate::relay::delivery::DEFAULT_API_BASE;
use crate::relay::resolver::DEFAULT_RELAY_DOMAIN;

pub const DEFAULT_HOSTNAME: &str = "discord-smtpd.local";
pub const DEFAULT_TOKENS_PATH: &str = "discord.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SMTP_PORT is not set")]
    MissingPort,

    #[error("SMTP_PORT must be a port number, got {0:?}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub hostname: String,
    pub tokens_path: PathBuf,
    pub relay_domain: String,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = var("SMTP_PORT").ok_or(ConfigError::MissingPort)?;
        let port = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;

        Ok(Self {
            port,
            hostname: var("SMTP_HOSTNAME").unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
            tokens_path: var("DISCORD_TOKENS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKENS_PATH)),
            relay_domain: var("RELAY_DOMAIN").unwrap_or_else(|| DEFAULT_RELAY_DOMAIN.to_string()),
            api_base: var("DISCORD_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }

    /// Listen on every interface
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
