pub mod context;
pub mod controller;
pub mod navigator;
pub mod timer;
pub mod view;

pub use context::{SessionContext, SessionTiming};
pub use controller::{SessionHandle, SessionServices, SurveySession};
pub use navigator::{Navigator, RecordingNavigator};
pub use timer::TimerGuard;
pub use view::{ErrorBanner, Phase, SessionView, WebhookStatus};
