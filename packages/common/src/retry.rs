use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result classification of a single delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    /// Transient failure; another attempt may succeed.
    RecoverableFailure,
    /// Configuration problem; repeating the attempt cannot help.
    FatalFailure,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RecoverableFailure => "recoverable_failure",
            Self::FatalFailure => "fatal_failure",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a webhook delivery failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// `webhookUrl` is not an absolute http(s) URL.
    InvalidUrl { url: String },
    /// Custom payload is not a JSON object after token substitution.
    InvalidPayload { detail: String },
    /// A custom header name or value cannot be sent.
    InvalidHeader { name: String },
    /// No answer within the attempt timeout.
    Timeout,
    /// The receiver answered with a non-2xx status.
    HttpStatus { status: u16, text: String },
    /// The request failed before any response arrived. In a browser this is
    /// what a cross-origin rejection looks like.
    Cors { detail: String },
}

impl FailureKind {
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            Self::InvalidUrl { .. } | Self::InvalidPayload { .. } | Self::InvalidHeader { .. } => {
                AttemptOutcome::FatalFailure
            }
            Self::Timeout | Self::HttpStatus { .. } | Self::Cors { .. } => {
                AttemptOutcome::RecoverableFailure
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.outcome() == AttemptOutcome::FatalFailure
    }

    /// Short classification recorded on attempts and logs.
    pub fn label(&self) -> String {
        match self {
            Self::InvalidUrl { .. } => "Invalid URL".into(),
            Self::InvalidPayload { .. } => "Invalid payload".into(),
            Self::InvalidHeader { .. } => "Invalid header".into(),
            Self::Timeout => "Timeout".into(),
            Self::HttpStatus { status, text } if text.is_empty() => format!("HTTP {status}"),
            Self::HttpStatus { status, text } => format!("HTTP {status}: {text}"),
            Self::Cors { .. } => "CORS".into(),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url } => write!(f, "Invalid URL: {url}"),
            Self::InvalidPayload { detail } => write!(f, "Invalid payload: {detail}"),
            Self::InvalidHeader { name } => write!(f, "Invalid header: {name}"),
            Self::Cors { detail } => write!(f, "CORS: {detail}"),
            other => f.write_str(&other.label()),
        }
    }
}

/// A single webhook attempt record. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookAttempt {
    /// 0-based attempt index for the response.
    pub attempt: u8,
    pub outcome: AttemptOutcome,
    /// Error classification, `None` on success.
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl WebhookAttempt {
    pub fn succeeded(attempt: u8) -> Self {
        Self {
            attempt,
            outcome: AttemptOutcome::Success,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(attempt: u8, outcome: AttemptOutcome, error: impl Into<String>) -> Self {
        Self {
            attempt,
            outcome,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Attempt history of one response, bounded by a hard ceiling.
///
/// The ceiling covers automatic and manual attempts together.
#[derive(Debug, Clone)]
pub struct AttemptLedger {
    history: Vec<WebhookAttempt>,
    ceiling: u8,
}

impl AttemptLedger {
    pub fn new(ceiling: u8) -> Self {
        Self {
            history: Vec::new(),
            ceiling,
        }
    }

    /// Index the next attempt will use.
    ///
    /// Fatal records never reached the network and do not consume budget.
    pub fn next_attempt(&self) -> u8 {
        self.history
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::FatalFailure)
            .count() as u8
    }

    /// Whether the ceiling still allows another attempt.
    pub fn can_attempt(&self) -> bool {
        self.next_attempt() < self.ceiling
    }

    pub fn record(&mut self, attempt: WebhookAttempt) {
        self.history.push(attempt);
    }

    pub fn history(&self) -> &[WebhookAttempt] {
        &self.history
    }

    pub fn last(&self) -> Option<&WebhookAttempt> {
        self.history.last()
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Delay before retrying after the attempt at `attempt` failed.
///
/// Linear: `base_ms * (attempt + 1)`, so 2s then 4s with the default base.
pub fn retry_delay(attempt: u8, base_ms: u64) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(attempt as u64 + 1))
}
