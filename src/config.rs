use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::{BridgeConfig, SettleStrategy, DEFAULT_EXPECTED_HOST};
use crate::error::Result;
use crate::extractor::ExtractorConfig;
use crate::providers::gemini::DEFAULT_MODEL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: Option<String>,
    pub settings_path: PathBuf,
    pub selectors_path: Option<PathBuf>,
    /// Site the bridge is allowed to talk to. Empty accepts any host.
    pub expected_host: String,
    pub probe_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_api_base: None,
            settings_path: default_settings_path(),
            selectors_path: None,
            expected_host: DEFAULT_EXPECTED_HOST.to_string(),
            probe_timeout_ms: 1000,
            settle_timeout_ms: 1500,
            request_timeout_secs: 30,
        }
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reachout")
        .join("settings.json")
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring {}={:?}, not a number", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_api_base: std::env::var("GEMINI_API_BASE").ok(),
            settings_path: std::env::var("REACHOUT_SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            selectors_path: std::env::var("REACHOUT_SELECTORS").ok().map(PathBuf::from),
            expected_host: std::env::var("REACHOUT_EXPECTED_HOST")
                .map(|host| host.trim().to_lowercase())
                .unwrap_or(defaults.expected_host),
            probe_timeout_ms: env_u64("REACHOUT_PROBE_TIMEOUT_MS", defaults.probe_timeout_ms),
            settle_timeout_ms: env_u64("REACHOUT_SETTLE_TIMEOUT_MS", defaults.settle_timeout_ms),
            request_timeout_secs: env_u64(
                "REACHOUT_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        let base = BridgeConfig::default();
        let initial = match base.settle {
            SettleStrategy::Handshake { initial, .. } => initial,
            SettleStrategy::FixedDelay(delay) => delay,
        };
        BridgeConfig {
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            settle: SettleStrategy::Handshake {
                initial,
                max_wait: Duration::from_millis(self.settle_timeout_ms),
            },
            expected_host: self.expected_host.clone(),
            ..base
        }
    }

    /// Built-in selectors, or the ones from `REACHOUT_SELECTORS` when set.
    pub fn extractor_config(&self) -> Result<ExtractorConfig> {
        match &self.selectors_path {
            Some(path) => ExtractorConfig::from_path(path),
            None => Ok(ExtractorConfig::default()),
        }
    }
}
