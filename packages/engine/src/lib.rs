pub mod error;
pub mod recorder;
pub mod session;
pub mod store;
pub mod webhook;

pub use error::{EngineError, Result};
pub use recorder::{RecordError, ResponseRecorder, ValidationError};
pub use session::{
    ErrorBanner, Navigator, Phase, RecordingNavigator, SessionContext, SessionHandle,
    SessionServices, SessionTiming, SessionView, SurveySession, WebhookStatus,
};
pub use store::{MemoryResponseStore, ResponseStore, RestResponseStore, StoreError};
pub use webhook::{DispatchOutcome, DispatchPolicy, DispatchReport, RunMode, WebhookDispatcher};
