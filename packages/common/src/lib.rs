pub mod automation;
pub mod campaign;
pub mod config;
pub mod locale;
pub mod response;
pub mod retry;

pub use automation::{AutomationAction, AutomationConfig, ConfigIssue};
pub use campaign::{Campaign, CampaignForm, FieldKind, FormField, Situation};
pub use locale::{Locale, Messages};
pub use response::{FormAnswers, Response, ResponseDefaults, ResponseReceipt};
pub use retry::{AttemptLedger, AttemptOutcome, FailureKind, WebhookAttempt};
