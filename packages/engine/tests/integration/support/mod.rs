use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde_json::Value;

use common::{
    AutomationAction, AutomationConfig, Campaign, CampaignForm, FieldKind, FormField, Locale,
    Situation,
};
use engine::{
    DispatchPolicy, MemoryResponseStore, RecordingNavigator, SessionContext, SessionHandle,
    SessionServices, SessionTiming, SessionView, SurveySession, WebhookDispatcher,
};

pub const CAMPAIGN_ID: &str = "campaign-1";
pub const ORIGIN: &str = "https://survey.example.com";

/// How the test endpoint answers one request.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Ok,
    Status(u16),
    /// Sleep before answering 200, long enough to trip the client timeout.
    Hang(Duration),
}

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub headers: HeaderMap,
    pub body: Value,
    /// Value of the probe at the moment the request arrived.
    pub probe: Option<usize>,
}

type Probe = Box<dyn Fn() -> usize + Send + Sync>;

struct ReceiverState {
    scripted: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    requests: Mutex<Vec<ReceivedRequest>>,
    probe: Option<Probe>,
}

/// Local HTTP endpoint standing in for a campaign's webhook.
pub struct WebhookReceiver {
    pub url: String,
    state: Arc<ReceiverState>,
}

impl WebhookReceiver {
    pub async fn start(fallback: Reply) -> Self {
        Self::spawn(Vec::new(), fallback, None).await
    }

    /// Answer with `scripted` in order, then `fallback` for every later request.
    pub async fn scripted(scripted: Vec<Reply>, fallback: Reply) -> Self {
        Self::spawn(scripted, fallback, None).await
    }

    pub async fn with_probe(fallback: Reply, probe: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        Self::spawn(Vec::new(), fallback, Some(Box::new(probe))).await
    }

    async fn spawn(scripted: Vec<Reply>, fallback: Reply, probe: Option<Probe>) -> Self {
        let state = Arc::new(ReceiverState {
            scripted: Mutex::new(scripted.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
            probe,
        });

        let app = Router::new()
            .route("/hook", post(receive))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind webhook receiver");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/hook"),
            state,
        }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

async fn receive(
    State(state): State<Arc<ReceiverState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let reply = state
        .scripted
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(state.fallback);

    state.requests.lock().unwrap().push(ReceivedRequest {
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        probe: state.probe.as_ref().map(|probe| probe()),
    });

    match reply {
        Reply::Ok => StatusCode::OK,
        Reply::Status(code) => StatusCode::from_u16(code).unwrap(),
        Reply::Hang(delay) => {
            tokio::time::sleep(delay).await;
            StatusCode::OK
        }
    }
}

pub fn form() -> CampaignForm {
    CampaignForm {
        fields: vec![
            FormField {
                id: "score".into(),
                kind: FieldKind::Nps,
                label: "How likely are you to recommend us?".into(),
                required: true,
                options: Vec::new(),
            },
            FormField {
                id: "feedback".into(),
                kind: FieldKind::Textarea,
                label: "Anything else?".into(),
                required: false,
                options: Vec::new(),
            },
        ],
    }
}

pub fn situations() -> Vec<Situation> {
    vec![
        Situation {
            id: "sit-store".into(),
            name: "In store".into(),
            is_default: false,
        },
        Situation {
            id: "sit-online".into(),
            name: "Online".into(),
            is_default: true,
        },
    ]
}

pub fn campaign(automation: Option<AutomationConfig>) -> Campaign {
    Campaign {
        id: CAMPAIGN_ID.into(),
        name: "Checkout survey".into(),
        source_id: Some("src-web".into()),
        group_id: Some("grp-retail".into()),
        automation,
    }
}

pub fn automation(action: AutomationAction) -> AutomationConfig {
    AutomationConfig {
        enabled: true,
        action,
        ..Default::default()
    }
}

pub fn webhook(action: AutomationAction, url: &str) -> AutomationConfig {
    AutomationConfig {
        webhook_url: Some(url.into()),
        redirect_url: Some("https://example.com/thanks".into()),
        ..automation(action)
    }
}

/// Short timeouts and delays so retry paths finish in well under a second.
pub fn fast_policy() -> DispatchPolicy {
    DispatchPolicy {
        timeout: Duration::from_millis(250),
        max_attempts: 3,
        max_total_attempts: 5,
        base_delay_ms: 20,
        origin: Some(ORIGIN.into()),
    }
}

pub fn timing(tick_ms: u64) -> SessionTiming {
    SessionTiming {
        countdown_start: 10,
        tick: Duration::from_millis(tick_ms),
    }
}

/// Ticks slow enough that a test can observe the countdown at its start.
pub fn slow_timing() -> SessionTiming {
    timing(60_000)
}

pub fn fast_timing() -> SessionTiming {
    timing(5)
}

pub struct Harness {
    pub store: Arc<MemoryResponseStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub session: SessionHandle,
}

impl Harness {
    pub fn start(automation: Option<AutomationConfig>, timing: SessionTiming) -> Self {
        let store = Arc::new(
            MemoryResponseStore::new()
                .with_campaign(campaign(automation.clone()), form())
                .with_situations(situations()),
        );
        Self::start_with_store(store, automation, timing)
    }

    pub fn start_with_store(
        store: Arc<MemoryResponseStore>,
        automation: Option<AutomationConfig>,
        timing: SessionTiming,
    ) -> Self {
        let navigator = Arc::new(RecordingNavigator::new());
        let context = SessionContext {
            campaign: campaign(automation),
            form: form(),
            situations: situations(),
            locale: Locale::En,
        };
        let services = SessionServices {
            store: store.clone(),
            dispatcher: Arc::new(WebhookDispatcher::new(fast_policy()).unwrap()),
            navigator: navigator.clone(),
        };

        Self {
            store,
            navigator,
            session: SurveySession::spawn(context, services, timing),
        }
    }

    /// Fill in the form and submit it.
    pub async fn submit_score(&self, score: u8, feedback: Option<&str>) {
        self.session
            .set_answer("score", Value::from(score))
            .await
            .unwrap();
        if let Some(feedback) = feedback {
            self.session
                .set_answer("feedback", Value::from(feedback))
                .await
                .unwrap();
        }
        self.session.submit().await.unwrap();
    }

    pub async fn wait_until(&self, predicate: impl FnMut(&SessionView) -> bool) -> SessionView {
        tokio::time::timeout(Duration::from_secs(10), self.session.wait_until(predicate))
            .await
            .expect("Timed out waiting for session state")
            .unwrap()
    }
}
