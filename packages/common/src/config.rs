use serde::Deserialize;

use crate::locale::Locale;

/// Storage API connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiAppConfig {
    /// Base URL of the REST API. Default: "http://localhost:3000/api".
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Bearer token sent with every storage request.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds. Default: 30.
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".into()
}
fn default_api_timeout_secs() -> u64 {
    30
}

impl Default for ApiAppConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_key: None,
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

/// Outbound webhook delivery settings.
#[derive(Debug, Deserialize, Clone)]
pub struct WebhookAppConfig {
    /// Per-attempt timeout in milliseconds. Default: 15000.
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
    /// Attempts in one automatic run, first try included. Default: 3.
    #[serde(default = "default_webhook_max_attempts")]
    pub max_attempts: u8,
    /// Hard ceiling of attempts per response, manual retries included. Default: 5.
    #[serde(default = "default_webhook_max_total_attempts")]
    pub max_total_attempts: u8,
    /// Retry delay unit; attempt `n` waits `base * (n + 1)`. Default: 2000.
    #[serde(default = "default_webhook_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Origin reported to receivers, used in cross-origin hints. Default: none.
    #[serde(default)]
    pub origin: Option<String>,
}

fn default_webhook_timeout_ms() -> u64 {
    15_000
}
fn default_webhook_max_attempts() -> u8 {
    3
}
fn default_webhook_max_total_attempts() -> u8 {
    5
}
fn default_webhook_base_delay_ms() -> u64 {
    2_000
}

impl Default for WebhookAppConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_webhook_timeout_ms(),
            max_attempts: default_webhook_max_attempts(),
            max_total_attempts: default_webhook_max_total_attempts(),
            base_delay_ms: default_webhook_base_delay_ms(),
            origin: None,
        }
    }
}

/// Survey session behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionAppConfig {
    /// Countdown start value in ticks. Default: 10.
    #[serde(default = "default_countdown_start")]
    pub countdown_start: u8,
    /// Tick period in milliseconds. Default: 1000.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Language for respondent-facing text. Default: "en".
    #[serde(default)]
    pub locale: Locale,
}

fn default_countdown_start() -> u8 {
    10
}
fn default_tick_ms() -> u64 {
    1_000
}

impl Default for SessionAppConfig {
    fn default() -> Self {
        Self {
            countdown_start: default_countdown_start(),
            tick_ms: default_tick_ms(),
            locale: Locale::default(),
        }
    }
}
