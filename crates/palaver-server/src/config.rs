//! Runtime configuration for the server, distilled from [`PalaverSettings`].

use std::time::Duration;

use palaver_core::AdmissionPolicy;
use palaver_settings::PalaverSettings;

/// Configuration for the Palaver server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Interval between server pings.
    pub heartbeat_interval: Duration,
    /// Close a connection after this long without any inbound frame.
    pub heartbeat_timeout: Duration,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue capacity per connection.
    pub send_queue_capacity: usize,
    /// How long shutdown waits for the server task.
    pub shutdown_timeout: Duration,
    /// Who may join a room.
    pub admission_policy: AdmissionPolicy,
    /// Messages returned by the history endpoint.
    pub history_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1024,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            shutdown_timeout: Duration::from_secs(5),
            admission_policy: AdmissionPolicy::default(),
            history_limit: 50,
        }
    }
}

impl From<&PalaverSettings> for ServerConfig {
    fn from(settings: &PalaverSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            max_connections: settings.server.max_connections,
            heartbeat_interval: Duration::from_secs(settings.server.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(settings.server.heartbeat_timeout_secs),
            max_message_size: settings.server.max_message_size,
            send_queue_capacity: settings.server.send_queue_capacity,
            shutdown_timeout: Duration::from_secs(settings.server.shutdown_timeout_secs),
            admission_policy: settings.chat.admission_policy,
            history_limit: settings.chat.history_limit,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_ephemeral_localhost() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn from_settings() {
        let mut settings = PalaverSettings::default();
        settings.server.port = 9100;
        settings.server.heartbeat_interval_secs = 10;
        settings.chat.admission_policy = AdmissionPolicy::Friends;
        settings.chat.history_limit = 20;

        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(cfg.admission_policy, AdmissionPolicy::Friends);
        assert_eq!(cfg.history_limit, 20);
        assert_eq!(cfg.max_connections, settings.server.max_connections);
    }
}
