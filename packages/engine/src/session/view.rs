use common::{FailureKind, FormAnswers, Response, WebhookAttempt};
use serde::Serialize;

/// Where the respondent is in the submit flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Filling in the form.
    Editing,
    /// Waiting for the store to accept the response.
    Submitting,
    /// First webhook run after submission; the countdown has not started.
    DispatchingWebhook,
    /// Countdown running; returns to a blank form at zero.
    Counting,
    /// Countdown running; leaves for `url` at zero.
    Redirecting { url: String },
    /// Navigation happened. Terminal.
    Redirected { url: String },
    /// Respondent closed the page. Terminal.
    Closed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redirected { .. } | Self::Closed)
    }

    pub fn is_counting(&self) -> bool {
        matches!(self, Self::Counting | Self::Redirecting { .. })
    }
}

/// Webhook sub-state, independent of the countdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookStatus {
    /// Nothing to deliver, or the session was reset.
    Idle,
    InFlight { attempt: u8 },
    Delivered,
    Failed,
}

/// Dismissable warning shown after a webhook failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub kind: FailureKind,
    /// Localized text, always stating that the response was saved.
    pub message: String,
    /// Whether the "try again" control is enabled.
    pub retry_available: bool,
}

/// Snapshot of everything the survey page renders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionView {
    pub phase: Phase,
    pub answers: FormAnswers,
    pub countdown: u8,
    pub countdown_start: u8,
    pub webhook: WebhookStatus,
    pub banner: Option<ErrorBanner>,
    pub validation_error: Option<String>,
    pub save_error: Option<String>,
    /// Shown once the response is saved.
    pub success_message: Option<String>,
    pub response: Option<Response>,
    pub attempts: Vec<WebhookAttempt>,
}

impl SessionView {
    pub fn new(countdown_start: u8) -> Self {
        Self {
            phase: Phase::Editing,
            answers: FormAnswers::new(),
            countdown: countdown_start,
            countdown_start,
            webhook: WebhookStatus::Idle,
            banner: None,
            validation_error: None,
            save_error: None,
            success_message: None,
            response: None,
            attempts: Vec::new(),
        }
    }

    /// Fraction of the countdown remaining, for the circular indicator.
    pub fn progress(&self) -> f32 {
        if self.countdown_start == 0 {
            return 0.0;
        }
        f32::from(self.countdown) / f32::from(self.countdown_start)
    }

    /// Back to a blank form, keeping only the countdown configuration.
    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.countdown_start);
    }
}
