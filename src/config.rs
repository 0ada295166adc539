use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let mut value = value.trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key.trim(), value));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub presses: PressConfig,
    pub events: EventStreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host or IP address of the deCONZ gateway
    pub host: String,
    pub port: u16,
    /// Pre-provisioned API key; otherwise taken from storage or the link button
    pub api_key: Option<String>,
}

impl GatewayConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn websocket_url(&self, websocket_port: u16) -> String {
        format!("ws://{}:{}", self.host, websocket_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressConfig {
    /// Directory of per-model button descriptor files
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStreamConfig {
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    /// Consecutive reconnect failures before the stream is reported as degraded
    pub failure_alert: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                host: String::new(),
                port: 80,
                api_key: None,
            },
            storage: StorageConfig {
                path: default_storage_path(),
            },
            presses: PressConfig {
                directory: PathBuf::from("./devices"),
            },
            events: EventStreamConfig {
                reconnect_initial_ms: 1_000,
                reconnect_max_ms: 60_000,
                failure_alert: 5,
            },
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("deconz-bridge"))
        .unwrap_or_else(|| PathBuf::from("./"))
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("DECONZ_IP") {
            config.gateway.host = host;
        }
        if let Some(port) = lookup("DECONZ_PORT")
            && let Ok(p) = port.parse()
        {
            config.gateway.port = p;
        }
        if let Some(key) = lookup("DECONZ_API_KEY")
            && !key.is_empty()
        {
            config.gateway.api_key = Some(key);
        }
        if let Some(path) = lookup("STORAGE_PATH") {
            config.storage.path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("DEVICES_DIR") {
            config.presses.directory = PathBuf::from(dir);
        }

        // Event stream reconnect policy
        if let Some(ms) = lookup("EVENTS_RECONNECT_INITIAL_MS")
            && let Ok(v) = ms.parse()
        {
            config.events.reconnect_initial_ms = v;
        }
        if let Some(ms) = lookup("EVENTS_RECONNECT_MAX_MS")
            && let Ok(v) = ms.parse()
        {
            config.events.reconnect_max_ms = v;
        }
        if let Some(n) = lookup("EVENTS_FAILURE_ALERT")
            && let Ok(v) = n.parse()
        {
            config.events.failure_alert = v;
        }

        config
    }

    /// Check that everything needed to reach the gateway is present.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.host.is_empty() {
            return Err(BridgeError::MissingConfig(
                "DECONZ_IP (address of the deCONZ gateway)".to_string(),
            ));
        }
        if self.events.reconnect_initial_ms == 0
            || self.events.reconnect_max_ms < self.events.reconnect_initial_ms
        {
            return Err(BridgeError::MissingConfig(
                "EVENTS_RECONNECT_MAX_MS must be >= EVENTS_RECONNECT_INITIAL_MS > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.gateway.port, 80);
        assert!(config.gateway.api_key.is_none());
        assert_eq!(config.presses.directory, PathBuf::from("./devices"));
        assert_eq!(config.events.reconnect_initial_ms, 1_000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DECONZ_IP", "10.0.0.5"),
            ("DECONZ_PORT", "8080"),
            ("DECONZ_API_KEY", "ABCDEF"),
            ("DEVICES_DIR", "/etc/deconz/devices"),
            ("EVENTS_RECONNECT_MAX_MS", "30000"),
        ]));
        assert_eq!(config.gateway.base_url(), "http://10.0.0.5:8080");
        assert_eq!(config.gateway.websocket_url(443), "ws://10.0.0.5:443");
        assert_eq!(config.gateway.api_key.as_deref(), Some("ABCDEF"));
        assert_eq!(
            config.presses.directory,
            PathBuf::from("/etc/deconz/devices")
        );
        assert_eq!(config.events.reconnect_max_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparsable_port_keeps_default() {
        let config = Config::from_lookup(lookup_from(&[
            ("DECONZ_IP", "gateway.local"),
            ("DECONZ_PORT", "eighty"),
            ("DECONZ_API_KEY", ""),
        ]));
        assert_eq!(config.gateway.port, 80);
        assert!(config.gateway.api_key.is_none());
    }

    #[test]
    fn test_invalid_backoff_is_rejected() {
        let config = Config::from_lookup(lookup_from(&[
            ("DECONZ_IP", "gateway.local"),
            ("EVENTS_RECONNECT_INITIAL_MS", "5000"),
            ("EVENTS_RECONNECT_MAX_MS", "1000"),
        ]));
        assert!(matches!(
            config.validate(),
            Err(BridgeError::MissingConfig(_))
        ));
    }

    #[test]
    fn test_parse_dotenv_strips_quotes_and_comments() {
        let pairs = parse_dotenv("# comment\nDECONZ_IP = 10.0.0.2\nNAME=\"My Bridge\"\n\nBROKEN\n");
        assert_eq!(pairs, vec![("DECONZ_IP", "10.0.0.2"), ("NAME", "My Bridge")]);
    }
}
