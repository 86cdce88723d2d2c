pub mod dispatcher;
pub mod payload;

pub use dispatcher::{
    DispatchOutcome, DispatchPolicy, DispatchReport, PreparedWebhook, RunMode, WebhookDispatcher,
    parse_webhook_url, prepare,
};
pub use payload::{TEMPLATE_TOKENS, build_payload, default_payload, render_template};
