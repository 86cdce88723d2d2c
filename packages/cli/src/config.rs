use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{ApiAppConfig, SessionAppConfig, WebhookAppConfig};

/// Runner configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CliAppConfig {
    #[serde(default)]
    pub api: ApiAppConfig,
    #[serde(default)]
    pub webhook: WebhookAppConfig,
    #[serde(default)]
    pub session: SessionAppConfig,
}

impl CliAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("NPS_CONFIG").unwrap_or_else(|_| "config/config".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("api.base_url", "http://localhost:3000/api")?
            .set_default("api.timeout_secs", 30_i64)?
            .set_default("webhook.timeout_ms", 15_000_i64)?
            .set_default("webhook.max_attempts", 3_i64)?
            .set_default("webhook.max_total_attempts", 5_i64)?
            .set_default("webhook.base_delay_ms", 2_000_i64)?
            .set_default("session.countdown_start", 10_i64)?
            .set_default("session.tick_ms", 1_000_i64)?
            .set_default("session.locale", "en")?
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("NPS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
