use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Protocol constants — bumping PROTOCOL_VERSION is a breaking wire change.
pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Hard cap on a single inbound control frame. Control messages are tiny;
/// anything larger is a protocol violation.
pub const MAX_PAYLOAD_BYTES: usize = 8 * 1024;

/// Top-level config (liveboard.toml + LIVEBOARD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveboardConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

impl Default for LiveboardConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            limits: LimitsConfig::default(),
            retention: RetentionConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Per-session resource guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent topic subscriptions per session.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions: usize,
    /// Bounded outbound queue depth per session. A session whose queue
    /// fills is evicted as a slow consumer rather than stalling fan-out.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_subscriptions: default_max_subscriptions(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

/// Per-topic event log retention window.
///
/// An event is dropped only once it exceeds BOTH bounds: outside the
/// newest `min_events` AND at least `min_seconds` old.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_events")]
    pub min_events: usize,
    #[serde(default = "default_retention_seconds")]
    pub min_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            min_events: default_retention_events(),
            min_seconds: default_retention_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Cadence of server heartbeat frames. Keeps idle connections alive
    /// through proxies and lets clients detect a dead link.
    #[serde(default = "default_heartbeat_secs")]
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_secs(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_max_subscriptions() -> usize {
    64
}
fn default_outbound_queue() -> usize {
    256
}
fn default_retention_events() -> usize {
    128
}
fn default_retention_seconds() -> u64 {
    30
}
fn default_heartbeat_secs() -> u64 {
    30
}

impl LiveboardConfig {
    /// Load config from a TOML file with LIVEBOARD_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ./liveboard.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("liveboard.toml");

        let config: LiveboardConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("LIVEBOARD_").split("_"))
            .extract()
            .map_err(|e| crate::error::LiveboardError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = LiveboardConfig::default();
        assert_eq!(cfg.gateway.port, DEFAULT_PORT);
        assert_eq!(cfg.limits.max_subscriptions, 64);
        assert!(cfg.limits.outbound_queue > 0);
        assert!(cfg.retention.min_events > 0);
    }
}
