use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// What happens after a response has been saved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationAction {
    /// Show the countdown, then return to a blank form.
    ReturnOnly,
    /// Show the countdown, then navigate to the redirect URL.
    RedirectOnly,
    /// Deliver the webhook, then return to a blank form.
    WebhookReturn,
    /// Deliver the webhook, then navigate to the redirect URL.
    WebhookRedirect,
}

impl AutomationAction {
    /// Returns true if a webhook must be attempted before the rest of the action.
    pub fn dispatches_webhook(&self) -> bool {
        matches!(self, Self::WebhookReturn | Self::WebhookRedirect)
    }

    /// Returns true if the action ends by leaving the survey page.
    pub fn redirects(&self) -> bool {
        matches!(self, Self::RedirectOnly | Self::WebhookRedirect)
    }

    /// All possible action values.
    pub const ALL: &'static [AutomationAction] = &[
        Self::ReturnOnly,
        Self::RedirectOnly,
        Self::WebhookReturn,
        Self::WebhookRedirect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReturnOnly => "return_only",
            Self::RedirectOnly => "redirect_only",
            Self::WebhookReturn => "webhook_return",
            Self::WebhookRedirect => "webhook_redirect",
        }
    }
}

impl fmt::Display for AutomationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for AutomationAction {
    fn default() -> Self {
        Self::ReturnOnly
    }
}

/// Error when parsing an invalid action string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActionError {
    invalid: String,
}

impl fmt::Display for ParseActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid automation action '{}'. Valid values: {}",
            self.invalid,
            AutomationAction::ALL
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseActionError {}

impl FromStr for AutomationAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "return_only" => Ok(Self::ReturnOnly),
            "redirect_only" => Ok(Self::RedirectOnly),
            "webhook_return" => Ok(Self::WebhookReturn),
            "webhook_redirect" => Ok(Self::WebhookRedirect),
            _ => Err(ParseActionError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// Post-submit behaviour configured on a campaign.
///
/// Webhook fields are only meaningful for `webhook_*` actions and the redirect
/// URL only for `*_redirect` actions; the engine ignores them otherwise.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub action: AutomationAction,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub webhook_headers: HashMap<String, String>,
    /// Optional JSON template with `{{token}}` placeholders.
    #[serde(default)]
    pub webhook_payload: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub success_message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A configuration problem found by [`AutomationConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigIssue {
    MissingWebhookUrl,
    InvalidWebhookUrl(String),
    MissingRedirectUrl,
    InvalidRedirectUrl(String),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingWebhookUrl => f.write_str("webhook action selected but webhookUrl is empty"),
            Self::InvalidWebhookUrl(url) => write!(f, "webhookUrl is not an absolute URL: {url}"),
            Self::MissingRedirectUrl => {
                f.write_str("redirect action selected but redirectUrl is empty")
            }
            Self::InvalidRedirectUrl(url) => write!(f, "redirectUrl is not an absolute URL: {url}"),
        }
    }
}

impl AutomationConfig {
    /// The action that actually runs. Disabled automation always returns to the form.
    pub fn effective_action(&self) -> AutomationAction {
        if self.enabled {
            self.action
        } else {
            AutomationAction::ReturnOnly
        }
    }

    /// Redirect target with surrounding whitespace removed, if any is set.
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Checks the fields the effective action depends on.
    ///
    /// Only a shallow scheme check is done here; the dispatcher performs the
    /// authoritative URL parse before sending.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let action = self.effective_action();
        let mut issues = Vec::new();

        if action.dispatches_webhook() {
            match self.webhook_url.as_deref().map(str::trim) {
                None | Some("") => issues.push(ConfigIssue::MissingWebhookUrl),
                Some(url) if !looks_absolute(url) => {
                    issues.push(ConfigIssue::InvalidWebhookUrl(url.to_string()))
                }
                Some(_) => {}
            }
        }

        if action.redirects() {
            match self.redirect_target() {
                None => issues.push(ConfigIssue::MissingRedirectUrl),
                Some(url) if !looks_absolute(url) => {
                    issues.push(ConfigIssue::InvalidRedirectUrl(url.to_string()))
                }
                Some(_) => {}
            }
        }

        issues
    }
}

fn looks_absolute(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !url.contains(char::is_whitespace)
}
