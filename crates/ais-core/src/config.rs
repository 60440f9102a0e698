//! Configuration parsing for the AIS ingestion worker.
//!
//! All settings come from a single JSON config file. Every section is
//! optional; omitted fields take the defaults shown below.
//!
//! # Example config
//!
//! ```json
//! {
//!   "stream": {
//!     "url": "wss://stream.aisstream.io/v0/stream",
//!     "api_key_env": "AIS_API_KEY",
//!     "bounding_boxes": [[[34.0, 16.0], [50.0, 32.0]]],
//!     "message_types": ["PositionReport", "ShipStaticData"],
//!     "reconnect_backoff_ms": 5000,
//!     "connect_timeout_ms": 15000
//!   },
//!   "batch": { "flush_interval_ms": 10000, "max_pending_vessels": 50 },
//!   "gate": { "min_update_interval_secs": 30, "forced_refresh_secs": 300 },
//!   "registry": { "sqlite_path": "/var/lib/ais/vessels.db" },
//!   "logging": { "log_dir": "/var/log/ais" }
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::AisError;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stream: StreamConfig,
    pub batch: BatchConfig,
    pub gate: GateConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

/// A `[[lon_min, lat_min], [lon_max, lat_max]]` corner pair.
pub type BoundingBox = [[f64; 2]; 2];

/// Upstream feed subscription settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// WebSocket endpoint of the feed.
    pub url: String,
    /// Credential given inline. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the credential.
    pub api_key_env: String,
    pub bounding_boxes: Vec<BoundingBox>,
    /// Message types requested from the feed.
    pub message_types: Vec<String>,
    /// Fixed wait between reconnect attempts.
    pub reconnect_backoff_ms: u64,
    /// Upper bound on the WebSocket upgrade before the attempt counts as failed.
    pub connect_timeout_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: "wss://stream.aisstream.io/v0/stream".into(),
            api_key: None,
            api_key_env: "AIS_API_KEY".into(),
            bounding_boxes: vec![[[34.0, 16.0], [50.0, 32.0]]],
            message_types: vec!["PositionReport".into(), "ShipStaticData".into()],
            reconnect_backoff_ms: 5_000,
            connect_timeout_ms: 15_000,
        }
    }
}

impl StreamConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Resolve the feed credential from the config or the process environment.
    pub fn resolve_api_key(&self) -> Result<String, AisError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolve the credential using `lookup` for environment access.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String, AisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        lookup(&self.api_key_env)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AisError::Config(format!(
                    "no feed credential: set stream.api_key or the {} environment variable",
                    self.api_key_env
                ))
            })
    }
}

/// Aggregation window and worker hand-off settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// A flush is due once this much time has passed since the last one.
    pub flush_interval_ms: u64,
    /// A flush is due once this many distinct vessels are pending.
    pub max_pending_vessels: usize,
    /// Capacity of the queue between the receive loop and the registry worker.
    pub max_queued_batches: usize,
    /// How often an idle pipeline re-checks whether a flush is due.
    pub tick_interval_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { flush_interval_ms: 10_000, max_pending_vessels: 50, max_queued_batches: 16, tick_interval_ms: 1_000 }
    }
}

impl BatchConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Change-gate thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum spacing between accepted writes for one vessel.
    pub min_update_interval_secs: u64,
    /// A write is forced once this much time has passed since the last one.
    pub forced_refresh_secs: u64,
    /// Latitude or longitude movement, in degrees, that bypasses the window.
    pub position_delta_deg: f64,
    /// Hard ceiling on remembered vessels.
    pub rate_limit_capacity: usize,
    /// Vessels kept when the ceiling is exceeded.
    pub rate_limit_retain: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_update_interval_secs: 30,
            forced_refresh_secs: 300,
            position_delta_deg: 0.001,
            rate_limit_capacity: 10_000,
            rate_limit_retain: 5_000,
        }
    }
}

/// Registry backend selection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// SQLite database file. `None` keeps the registry in memory.
    pub sqlite_path: Option<String>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files.
    pub log_dir: Option<String>,
    /// Log file prefix.
    pub module_name: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_dir: None, module_name: "ais-runner".into(), json: false }
    }
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), AisError> {
        url::Url::parse(&self.stream.url)
            .map_err(|e| AisError::Config(format!("invalid stream url '{}': {e}", self.stream.url)))?;
        if self.stream.bounding_boxes.is_empty() {
            return Err(AisError::Config("stream.bounding_boxes must not be empty".into()));
        }
        if self.stream.connect_timeout_ms == 0 {
            return Err(AisError::Config("stream.connect_timeout_ms must be > 0".into()));
        }
        if self.batch.max_pending_vessels == 0 {
            return Err(AisError::Config("batch.max_pending_vessels must be > 0".into()));
        }
        if self.batch.max_queued_batches == 0 {
            return Err(AisError::Config("batch.max_queued_batches must be > 0".into()));
        }
        if self.gate.rate_limit_retain > self.gate.rate_limit_capacity {
            return Err(AisError::Config(format!(
                "gate.rate_limit_retain ({}) exceeds gate.rate_limit_capacity ({})",
                self.gate.rate_limit_retain, self.gate.rate_limit_capacity
            )));
        }
        Ok(())
    }
}

/// Load, parse and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.stream.reconnect_backoff(), Duration::from_secs(5));
        assert_eq!(cfg.stream.connect_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.stream.message_types, vec!["PositionReport", "ShipStaticData"]);
        assert_eq!(cfg.batch.max_pending_vessels, 50);
        assert_eq!(cfg.batch.flush_interval(), Duration::from_secs(10));
        assert_eq!(cfg.gate.min_update_interval_secs, 30);
        assert_eq!(cfg.gate.rate_limit_capacity, 10_000);
        assert!(cfg.registry.sqlite_path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"gate": {"forced_refresh_secs": 120}, "batch": {"max_pending_vessels": 5}}"#)
                .unwrap();
        assert_eq!(cfg.gate.forced_refresh_secs, 120);
        assert_eq!(cfg.gate.min_update_interval_secs, 30);
        assert_eq!(cfg.batch.max_pending_vessels, 5);
        assert_eq!(cfg.batch.flush_interval_ms, 10_000);
    }

    #[test]
    fn inline_key_wins_over_env() {
        let stream = StreamConfig { api_key: Some(" inline ".into()), ..Default::default() };
        let key = stream.resolve_api_key_with(|_| Some("from-env".into())).unwrap();
        assert_eq!(key, "inline");
    }

    #[test]
    fn env_key_used_when_inline_missing() {
        let stream = StreamConfig { api_key_env: "MY_KEY".into(), ..Default::default() };
        let key = stream
            .resolve_api_key_with(|name| (name == "MY_KEY").then(|| "secret".to_string()))
            .unwrap();
        assert_eq!(key, "secret");
    }

    #[test]
    fn missing_key_is_config_error() {
        let stream = StreamConfig { api_key: Some("   ".into()), ..Default::default() };
        let err = stream.resolve_api_key_with(|_| None).unwrap_err();
        assert!(matches!(err, AisError::Config(_)));
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut cfg = AppConfig::default();
        cfg.gate.rate_limit_retain = cfg.gate.rate_limit_capacity + 1;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.stream.bounding_boxes.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.stream.url = "not a url".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.stream.connect_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }
}
