use std::time::Duration;

use common::config::WebhookAppConfig;
use common::retry::retry_delay;
use common::{AttemptLedger, AutomationConfig, FailureKind, Response, WebhookAttempt};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::payload::build_payload;
use crate::error::Result;

/// Timing and budget for webhook delivery.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Upper bound for one HTTP attempt.
    pub timeout: Duration,
    /// Attempts in one automatic run, first try included.
    pub max_attempts: u8,
    /// Ceiling per response across automatic and manual runs.
    pub max_total_attempts: u8,
    pub base_delay_ms: u64,
    /// Calling origin, quoted in cross-origin hints.
    pub origin: Option<String>,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from(&WebhookAppConfig::default())
    }
}

impl From<&WebhookAppConfig> for DispatchPolicy {
    fn from(config: &WebhookAppConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_attempts: config.max_attempts.max(1),
            max_total_attempts: config.max_total_attempts.max(config.max_attempts.max(1)),
            base_delay_ms: config.base_delay_ms,
            origin: config.origin.clone(),
        }
    }
}

/// A request ready to send: validated URL, final headers and body.
#[derive(Debug, Clone)]
pub struct PreparedWebhook {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Parse `raw` as an absolute http(s) URL.
pub fn parse_webhook_url(raw: &str) -> std::result::Result<Url, FailureKind> {
    let invalid = || FailureKind::InvalidUrl {
        url: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

/// Validate the configuration and build the request for `response`.
///
/// Every error returned here is a configuration problem and is fatal.
pub fn prepare(
    config: &AutomationConfig,
    response: &Response,
) -> std::result::Result<PreparedWebhook, FailureKind> {
    let url = parse_webhook_url(config.webhook_url.as_deref().unwrap_or_default())?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &config.webhook_headers {
        let invalid = || FailureKind::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }

    let body = build_payload(config.webhook_payload.as_deref(), response)?;

    Ok(PreparedWebhook { url, headers, body })
}

/// Whether a run may schedule retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Initial run after submission: up to `max_attempts` with backoff.
    Automatic,
    /// User-triggered from the error banner: exactly one attempt.
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Delivered { attempt: u8 },
    Failed { kind: FailureKind, retry_available: bool },
    /// The ceiling was already reached; nothing was sent.
    Exhausted,
    /// The session moved on while the run was pending.
    Cancelled,
}

/// Outcome of a run plus the ledger handed back to its owner.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub ledger: AttemptLedger,
}

/// Delivers responses to a campaign's webhook endpoint.
pub struct WebhookDispatcher {
    client: Client,
    policy: DispatchPolicy,
}

impl WebhookDispatcher {
    pub fn new(policy: DispatchPolicy) -> Result<Self> {
        let client = Client::builder().timeout(policy.timeout).build()?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Fresh ledger sized to this dispatcher's ceiling.
    pub fn new_ledger(&self) -> AttemptLedger {
        AttemptLedger::new(self.policy.max_total_attempts)
    }

    /// Send one attempt. Only recoverable kinds are returned.
    pub async fn send_once(&self, prepared: &PreparedWebhook) -> std::result::Result<(), FailureKind> {
        let body = serde_json::to_vec(&prepared.body).unwrap_or_default();
        let result = self
            .client
            .post(prepared.url.clone())
            .headers(prepared.headers.clone())
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                let status = response.status();
                Err(FailureKind::HttpStatus {
                    status: status.as_u16(),
                    text: status.canonical_reason().unwrap_or_default().to_string(),
                })
            }
            Err(e) if e.is_timeout() => Err(FailureKind::Timeout),
            Err(e) => Err(FailureKind::Cors {
                detail: e.to_string(),
            }),
        }
    }

    /// Deliver `response`, recording every attempt in `ledger`.
    ///
    /// Recoverable failures are retried after `base * (attempt + 1)` while
    /// the run and the ledger both have budget left. Cancelling `cancel`
    /// abandons the run at the next await point.
    pub async fn run(
        &self,
        config: &AutomationConfig,
        response: &Response,
        mut ledger: AttemptLedger,
        mode: RunMode,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        if !ledger.can_attempt() {
            warn!(
                response_id = %response.id,
                ceiling = ledger.ceiling(),
                "Webhook attempt ceiling reached, not sending"
            );
            return DispatchReport {
                outcome: DispatchOutcome::Exhausted,
                ledger,
            };
        }

        let prepared = match prepare(config, response) {
            Ok(prepared) => prepared,
            Err(kind) => {
                error!(response_id = %response.id, error = %kind, "Webhook configuration error");
                ledger.record(WebhookAttempt::failed(
                    ledger.next_attempt(),
                    kind.outcome(),
                    kind.label(),
                ));
                let retry_available = ledger.can_attempt();
                return DispatchReport {
                    outcome: DispatchOutcome::Failed {
                        kind,
                        retry_available,
                    },
                    ledger,
                };
            }
        };

        let run_limit = match mode {
            RunMode::Automatic => self.policy.max_attempts,
            RunMode::Manual => 1,
        };
        let mut run_attempts = 0u8;

        loop {
            let attempt = ledger.next_attempt();
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(response_id = %response.id, attempt, "Webhook delivery cancelled");
                    return DispatchReport { outcome: DispatchOutcome::Cancelled, ledger };
                }
                result = self.send_once(&prepared) => result,
            };
            run_attempts += 1;

            let kind = match result {
                Ok(()) => {
                    ledger.record(WebhookAttempt::succeeded(attempt));
                    info!(response_id = %response.id, attempt, url = %prepared.url, "Webhook delivered");
                    return DispatchReport {
                        outcome: DispatchOutcome::Delivered { attempt },
                        ledger,
                    };
                }
                Err(kind) => kind,
            };

            ledger.record(WebhookAttempt::failed(attempt, kind.outcome(), kind.label()));

            if kind.is_fatal() || run_attempts >= run_limit || !ledger.can_attempt() {
                error!(
                    response_id = %response.id,
                    attempt,
                    error = %kind,
                    "Webhook delivery failed"
                );
                let retry_available = ledger.can_attempt();
                return DispatchReport {
                    outcome: DispatchOutcome::Failed {
                        kind,
                        retry_available,
                    },
                    ledger,
                };
            }

            let delay = retry_delay(attempt, self.policy.base_delay_ms);
            warn!(
                response_id = %response.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %kind,
                "Retrying webhook delivery"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(response_id = %response.id, attempt, "Webhook retry cancelled");
                    return DispatchReport { outcome: DispatchOutcome::Cancelled, ledger };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
