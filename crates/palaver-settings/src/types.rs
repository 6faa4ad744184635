//! Settings type definitions.
//!
//! Every section implements [`Default`] with production values and is marked
//! `#[serde(default)]`, so a partial JSON file only needs the keys it changes.

use std::path::{Path, PathBuf};

use palaver_core::AdmissionPolicy;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the Palaver server.
///
/// Loaded from `~/.palaver/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "chat": { "admission_policy": "friends" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PalaverSettings {
    /// Network and connection settings.
    pub server: ServerSettings,
    /// Chat behaviour.
    pub chat: ChatSettings,
    /// SQLite location.
    pub database: DatabaseSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl PalaverSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue("server.host must not be empty".into()));
        }
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.max_connections must be at least 1".into(),
            ));
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.send_queue_capacity must be at least 1".into(),
            ));
        }
        if self.server.heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "server.heartbeat_interval_secs must be at least 1".into(),
            ));
        }
        if self.server.heartbeat_timeout_secs < self.server.heartbeat_interval_secs {
            return Err(SettingsError::InvalidValue(
                "server.heartbeat_timeout_secs must not be shorter than the interval".into(),
            ));
        }
        if self.chat.history_limit == 0 {
            return Err(SettingsError::InvalidValue(
                "chat.history_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Server network and runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP/WebSocket port. `0` picks an ephemeral port.
    pub port: u16,
    /// Maximum concurrent WebSocket connections; excess upgrades get 503.
    pub max_connections: usize,
    /// Interval between server pings.
    pub heartbeat_interval_secs: u64,
    /// A connection silent for longer than this is closed.
    pub heartbeat_timeout_secs: u64,
    /// Largest accepted WebSocket frame, in bytes.
    pub max_message_size: usize,
    /// Capacity of each connection's outbound queue.
    pub send_queue_capacity: usize,
    /// How long shutdown waits for connection tasks to finish.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_connections: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Chat behaviour settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Number of messages returned by the history endpoint.
    pub history_limit: usize,
    /// Who may open a connection into a room.
    pub admission_policy: AdmissionPolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: 50,
            admission_policy: AdmissionPolicy::default(),
        }
    }
}

/// Database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file. Relative paths resolve against `~/.palaver`;
    /// `:memory:` opens a private in-memory database.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "palaver.db".to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Whether the configured path names an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    /// Absolute database location, resolving relative paths against `base`.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() || self.is_in_memory() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of the compact format.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
