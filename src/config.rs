//! Configuration: an optional TOML file, overridden by command-line flags.
//!
//! ```toml
//! host = "bot.example.com"
//! secure = true
//! key = "session-key"
//! log_filter = "voice_remote=debug"
//! request_timeout_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoint::{Endpoint, SessionKey};
use crate::error::RemoteError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_LOG_FILTER: &str = "voice_remote=info";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Resolved settings for one run of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server authority, e.g. `bot.example.com` or `127.0.0.1:8080`.
    pub host: String,
    /// Use `wss`/`https`. Turn off for local servers without TLS.
    pub secure: bool,
    /// Session key; usually passed on the command line instead.
    pub key: Option<String>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            secure: true,
            key: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub insecure: bool,
    pub key: Option<String>,
}

impl Config {
    /// Read a config file. Missing keys fall back to the defaults.
    pub fn from_file(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path).map_err(|source| RemoteError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| RemoteError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `path` if given, otherwise start from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, RemoteError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Layer command-line values over this config.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if overrides.insecure {
            self.secure = false;
        }
        if overrides.key.is_some() {
            self.key = overrides.key;
        }
        self
    }

    pub fn endpoint(&self) -> Result<Endpoint, RemoteError> {
        Endpoint::new(self.host.clone(), self.secure)
    }

    /// # Errors
    /// `MissingField("key")` when no key was configured anywhere.
    pub fn session_key(&self) -> Result<SessionKey, RemoteError> {
        let key = self.key.clone().ok_or(RemoteError::MissingField("key"))?;
        SessionKey::new(key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
