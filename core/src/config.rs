//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain data that can come from serde (a config file
//! owned by the host application) or from `TUTUKA_*` environment variables.
//! `validate` runs at client construction so a bad endpoint or empty
//! credential fails fast rather than on the first call.

use std::fmt;
use std::net::Ipv6Addr;

use reqwest::Url;
use serde::Deserialize;

use crate::error::ClientError;

/// Issuer endpoint and terminal credentials.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub terminal_id: String,
    /// HMAC key for call checksums. Never logged.
    pub terminal_secret: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl ClientConfig {
    pub fn new(
        terminal_id: impl Into<String>,
        terminal_secret: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Self {
        Self {
            terminal_id: terminal_id.into(),
            terminal_secret: terminal_secret.into(),
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    /// Read the configuration from `TUTUKA_TERMINAL_ID`,
    /// `TUTUKA_TERMINAL_SECRET`, `TUTUKA_HOST`, `TUTUKA_PORT` and
    /// `TUTUKA_PATH`. All five are required.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let var = |key: &str| {
            lookup(key).ok_or_else(|| ClientError::Configuration(format!("{key} is not set")))
        };
        let port = var("TUTUKA_PORT")?;
        let port = port
            .trim()
            .parse()
            .map_err(|e| ClientError::Configuration(format!("TUTUKA_PORT {port:?}: {e}")))?;
        let config = Self {
            terminal_id: var("TUTUKA_TERMINAL_ID")?,
            terminal_secret: var("TUTUKA_TERMINAL_SECRET")?,
            host: var("TUTUKA_HOST")?,
            port,
            path: var("TUTUKA_PATH")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let require = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(ClientError::Configuration(format!("{field} must not be empty")))
            } else {
                Ok(())
            }
        };
        require("terminal_id", &self.terminal_id)?;
        require("terminal_secret", &self.terminal_secret)?;
        require("host", &self.host)?;
        if self.host.contains('/') || self.host.contains(char::is_whitespace) {
            return Err(ClientError::Configuration(format!(
                "host {:?} must be a bare hostname",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(ClientError::Configuration("port must be non-zero".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(ClientError::Configuration(format!(
                "path {:?} must start with '/'",
                self.path
            )));
        }

        let url = self.endpoint_url();
        let parsed = Url::parse(&url)
            .map_err(|e| ClientError::Configuration(format!("endpoint {url:?}: {e}")))?;
        // Userinfo such as `user@issuer` parses but is not a bare host.
        if parsed.port_or_known_default() != Some(self.port) || !parsed.username().is_empty() {
            return Err(ClientError::Configuration(format!(
                "host {:?} must be a bare hostname",
                self.host
            )));
        }
        Ok(())
    }

    /// Full endpoint URL, e.g. `http://issuer.example:8080/xmlrpc`.
    /// IPv6 literals are bracketed.
    pub fn endpoint_url(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("http://[{}]:{}{}", self.host, self.port, self.path)
        } else {
            format!("http://{}:{}{}", self.host, self.port, self.path)
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("terminal_id", &self.terminal_id)
            .field("terminal_secret", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .finish()
    }
}
