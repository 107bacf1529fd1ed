use config::{Config as ConfigLoader, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::Error;

/// Message the hosted provider returns when it refuses to serve the client's region
pub const PROVIDER_BLOCKED_MESSAGE: &str =
    "EthQuery - RPC Error - This service is not available in your country";

/// Environment variable naming the directory that holds `lifecycle.{toml,json,yaml}`
pub const CONFIG_DIR_ENV: &str = "WALLET_LIFECYCLE_CONFIG_DIR";

/// Prefix for per-field environment overrides, e.g. `WALLET_LIFECYCLE_NORMAL_POLL_INTERVAL_MS`
pub const ENV_PREFIX: &str = "WALLET_LIFECYCLE";

/// Timing and behaviour knobs for the lifecycle controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Foreground transaction-history poll interval (default: 15 seconds)
    pub normal_poll_interval_ms: u64,
    /// Background transaction-history poll interval (default: 30 seconds)
    pub background_poll_interval_ms: u64,
    /// Delay before the provider check and connectivity listener (default: 1 second)
    pub mount_delay_ms: u64,
    /// How long a forced view reload stays active after a locale change (default: 1 second)
    pub reload_debounce_ms: u64,
    /// Auto-lock timeout used until settings say otherwise (default: 30 seconds)
    pub default_lock_time_ms: u64,
    /// Locale the view tree was first rendered with
    pub initial_locale: String,
    /// Exact RPC error message that marks the provider as blocked
    pub provider_blocked_message: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            normal_poll_interval_ms: 15_000,
            background_poll_interval_ms: 30_000,
            mount_delay_ms: 1_000,
            reload_debounce_ms: 1_000,
            default_lock_time_ms: 30_000,
            initial_locale: "en".to_string(),
            provider_blocked_message: PROVIDER_BLOCKED_MESSAGE.to_string(),
        }
    }
}

impl LifecycleConfig {
    /// Load from `$WALLET_LIFECYCLE_CONFIG_DIR/lifecycle` (or `config/lifecycle`),
    /// layered with `WALLET_LIFECYCLE_*` environment overrides.
    ///
    /// A missing file is not an error: defaults fill every absent field.
    pub fn load() -> Result<Self, Error> {
        let config_dir = env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".to_string());
        Self::load_from_dir(Path::new(&config_dir))
    }

    /// Load from `<dir>/lifecycle` plus environment overrides
    pub fn load_from_dir(dir: &Path) -> Result<Self, Error> {
        let base = dir.join("lifecycle");
        let base = base
            .to_str()
            .ok_or_else(|| Error::Config(format!("Non UTF-8 config path: {:?}", base)))?;

        let settings = ConfigLoader::builder()
            .add_source(File::with_name(base).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: LifecycleConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler cannot honour
    pub fn validate(&self) -> Result<(), Error> {
        if self.normal_poll_interval_ms == 0 {
            return Err(Error::Config(
                "normal_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.background_poll_interval_ms == 0 {
            return Err(Error::Config(
                "background_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.provider_blocked_message.is_empty() {
            return Err(Error::Config(
                "provider_blocked_message must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn normal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.normal_poll_interval_ms)
    }

    pub fn background_poll_interval(&self) -> Duration {
        Duration::from_millis(self.background_poll_interval_ms)
    }

    pub fn mount_delay(&self) -> Duration {
        Duration::from_millis(self.mount_delay_ms)
    }

    pub fn reload_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms)
    }
}
