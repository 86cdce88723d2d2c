use std::ops::ControlFlow;
use std::sync::Arc;

use common::{AttemptLedger, AutomationConfig, FailureKind, Messages, Response};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::context::{SessionContext, SessionTiming};
use super::navigator::Navigator;
use super::timer::{self, TimerGuard};
use super::view::{ErrorBanner, Phase, SessionView, WebhookStatus};
use crate::error::{EngineError, Result};
use crate::recorder::{ResponseRecorder, build_response};
use crate::store::ResponseStore;
use crate::webhook::{DispatchOutcome, DispatchReport, RunMode, WebhookDispatcher};

const CHANNEL_CAPACITY: usize = 64;

/// Respondent actions.
#[derive(Debug)]
enum Command {
    SetAnswer { field_id: String, value: Value },
    Submit,
    RespondAgain,
    Close,
    RetryWebhook,
    DismissBanner,
}

/// Callbacks from timers and webhook runs, tagged with the generation that
/// scheduled them.
#[derive(Debug)]
enum Event {
    Tick { generation: u64 },
    DispatchFinished { generation: u64, report: DispatchReport },
}

/// Collaborators a session talks to.
#[derive(Clone)]
pub struct SessionServices {
    pub store: Arc<dyn ResponseStore>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub navigator: Arc<dyn Navigator>,
}

/// The response currently being automated.
struct Submission {
    response: Response,
    /// `None` while a webhook run owns the ledger.
    ledger: Option<AttemptLedger>,
}

/// Entry point for a survey page's post-submit flow.
pub struct SurveySession;

impl SurveySession {
    /// Start the session actor. Dropping every handle ends the session.
    pub fn spawn(
        context: SessionContext,
        services: SessionServices,
        timing: SessionTiming,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (publisher, view_rx) = watch::channel(SessionView::new(timing.countdown_start));

        let actor = SessionActor {
            automation: context.automation(),
            messages: context.locale.messages(),
            context,
            recorder: ResponseRecorder::new(services.store),
            dispatcher: services.dispatcher,
            navigator: services.navigator,
            timing,
            view: SessionView::new(timing.countdown_start),
            publisher,
            events: event_tx,
            generation: 0,
            cancel: CancellationToken::new(),
            ticker: None,
            submission: None,
        };

        let task = tokio::spawn(actor.run(command_rx, event_rx));

        SessionHandle {
            commands: command_tx,
            view: view_rx,
            task,
        }
    }
}

/// Handle used by the page to drive a session and observe its state.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::SessionClosed)
    }

    pub async fn set_answer(&self, field_id: impl Into<String>, value: Value) -> Result<()> {
        self.send(Command::SetAnswer {
            field_id: field_id.into(),
            value,
        })
        .await
    }

    pub async fn submit(&self) -> Result<()> {
        self.send(Command::Submit).await
    }

    /// Start over with a blank form. Never re-sends the previous response.
    pub async fn respond_again(&self) -> Result<()> {
        self.send(Command::RespondAgain).await
    }

    /// End the session. Terminal.
    pub async fn close(&self) -> Result<()> {
        self.send(Command::Close).await
    }

    /// Manual webhook retry from the error banner.
    pub async fn retry_webhook(&self) -> Result<()> {
        self.send(Command::RetryWebhook).await
    }

    pub async fn dismiss_banner(&self) -> Result<()> {
        self.send(Command::DismissBanner).await
    }

    /// Latest published state.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_until<F>(&self, predicate: F) -> Result<SessionView>
    where
        F: FnMut(&SessionView) -> bool,
    {
        let mut rx = self.view.clone();
        let view = rx
            .wait_for(predicate)
            .await
            .map_err(|_| EngineError::SessionClosed)?
            .clone();
        Ok(view)
    }

    /// Wait for the actor to stop, e.g. after [`SessionHandle::close`].
    pub async fn join(self) {
        let SessionHandle { commands, task, .. } = self;
        drop(commands);
        let _ = task.await;
    }
}

struct SessionActor {
    context: SessionContext,
    automation: AutomationConfig,
    messages: Messages,
    recorder: ResponseRecorder,
    dispatcher: Arc<WebhookDispatcher>,
    navigator: Arc<dyn Navigator>,
    timing: SessionTiming,
    view: SessionView,
    publisher: watch::Sender<SessionView>,
    events: mpsc::Sender<Event>,
    /// Bumped on every submission and reset; older callbacks are dropped.
    generation: u64,
    /// Cancels timers and webhook runs of the current generation.
    cancel: CancellationToken,
    ticker: Option<TimerGuard>,
    submission: Option<Submission>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::Receiver<Event>,
    ) {
        debug!(campaign_id = %self.context.campaign.id, "Survey session started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).await.is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!("Survey page went away, stopping session");
                        break;
                    }
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
            self.publish();
        }

        commands.close();
        self.ticker = None;
        self.cancel.cancel();
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.view.clone());
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        if self.view.phase.is_terminal() {
            debug!(?command, phase = ?self.view.phase, "Ignoring command after flow ended");
            return match command {
                Command::Close => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            };
        }

        match command {
            Command::SetAnswer { field_id, value } => self.set_answer(field_id, value),
            Command::Submit => self.submit().await,
            Command::RespondAgain => self.respond_again(),
            Command::RetryWebhook => self.retry_webhook(),
            Command::DismissBanner => self.view.banner = None,
            Command::Close => {
                info!(campaign_id = %self.context.campaign.id, "Survey closed");
                self.ticker = None;
                self.cancel.cancel();
                self.view.phase = Phase::Closed;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick { generation } => self.tick(generation),
            Event::DispatchFinished { generation, report } => {
                self.finish_dispatch(generation, report)
            }
        }
    }

    fn set_answer(&mut self, field_id: String, value: Value) {
        if self.view.phase != Phase::Editing {
            debug!(field_id, "Ignoring answer outside editing");
            return;
        }
        self.view.validation_error = None;
        self.view.answers.insert(field_id, value);
    }

    async fn submit(&mut self) {
        if self.view.phase != Phase::Editing {
            debug!(phase = ?self.view.phase, "Ignoring submit outside editing");
            return;
        }

        let draft = match build_response(
            &self.context.campaign,
            &self.context.form,
            &self.context.situations,
            &self.view.answers,
        ) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(campaign_id = %self.context.campaign.id, error = %e, "Submission rejected");
                self.view.validation_error = Some(self.messages.score_required().to_string());
                return;
            }
        };

        self.view.validation_error = None;
        self.view.save_error = None;
        self.view.phase = Phase::Submitting;
        self.publish();

        let response = match self.recorder.persist(draft).await {
            Ok(response) => response,
            Err(_) => {
                self.view.phase = Phase::Editing;
                self.view.save_error = Some(self.messages.save_failed().to_string());
                return;
            }
        };

        self.next_generation();
        self.view.response = Some(response.clone());
        self.view.success_message = Some(
            self.automation
                .success_message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.messages.thank_you().to_string()),
        );
        self.submission = Some(Submission {
            response,
            ledger: Some(self.dispatcher.new_ledger()),
        });

        let action = self.automation.effective_action();
        info!(
            campaign_id = %self.context.campaign.id,
            action = %action,
            "Running post-submit automation"
        );

        if action.dispatches_webhook() {
            self.view.phase = Phase::DispatchingWebhook;
            self.start_dispatch(RunMode::Automatic);
        } else {
            self.resolve();
        }
    }

    fn next_generation(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation += 1;
    }

    /// Hand the ledger to a background run. Returns false if one is already in flight.
    fn start_dispatch(&mut self, mode: RunMode) -> bool {
        let Some(submission) = self.submission.as_mut() else {
            return false;
        };
        let Some(ledger) = submission.ledger.take() else {
            debug!("Webhook run already in flight");
            return false;
        };

        self.view.webhook = WebhookStatus::InFlight {
            attempt: ledger.next_attempt(),
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let automation = self.automation.clone();
        let response = submission.response.clone();
        let events = self.events.clone();
        let cancel = self.cancel.child_token();
        let generation = self.generation;

        tokio::spawn(async move {
            let report = dispatcher
                .run(&automation, &response, ledger, mode, &cancel)
                .await;
            let _ = events
                .send(Event::DispatchFinished { generation, report })
                .await;
        });
        true
    }

    fn finish_dispatch(&mut self, generation: u64, report: DispatchReport) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Dropping stale webhook result");
            return;
        }
        let Some(submission) = self.submission.as_mut() else {
            return;
        };

        self.view.attempts = report.ledger.history().to_vec();
        submission.ledger = Some(report.ledger);

        match report.outcome {
            DispatchOutcome::Delivered { .. } => {
                self.view.webhook = WebhookStatus::Delivered;
                self.view.banner = None;
            }
            DispatchOutcome::Failed {
                kind,
                retry_available,
            } => {
                self.view.webhook = WebhookStatus::Failed;
                self.view.banner = Some(ErrorBanner {
                    message: self.banner_message(&kind),
                    kind,
                    retry_available,
                });
            }
            DispatchOutcome::Exhausted => {
                self.view.webhook = WebhookStatus::Failed;
                if let Some(banner) = self.view.banner.as_mut() {
                    banner.retry_available = false;
                }
            }
            DispatchOutcome::Cancelled => {}
        }

        if self.view.phase == Phase::DispatchingWebhook {
            self.resolve();
        }
    }

    fn banner_message(&self, kind: &FailureKind) -> String {
        let detail = self
            .messages
            .webhook_failed(kind, self.dispatcher.policy().origin.as_deref());
        match self
            .automation
            .error_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
        {
            Some(custom) => format!("{custom} {detail}"),
            None => detail,
        }
    }

    /// Enter the return or redirect half of the action.
    fn resolve(&mut self) {
        let action = self.automation.effective_action();
        self.view.phase = if action.redirects() {
            match self.automation.redirect_target() {
                Some(url) => Phase::Redirecting {
                    url: url.to_string(),
                },
                None => {
                    warn!(
                        campaign_id = %self.context.campaign.id,
                        "Redirect configured without redirectUrl, returning to form instead"
                    );
                    Phase::Counting
                }
            }
        } else {
            Phase::Counting
        };
        self.start_countdown();
    }

    fn start_countdown(&mut self) {
        self.view.countdown = self.timing.countdown_start;
        if self.timing.countdown_start == 0 {
            self.finish_countdown();
            return;
        }

        let generation = self.generation;
        self.ticker = Some(timer::every(
            self.timing.tick,
            self.events.clone(),
            &self.cancel,
            move || Event::Tick { generation },
        ));
    }

    fn tick(&mut self, generation: u64) {
        if generation != self.generation || !self.view.phase.is_counting() {
            return;
        }
        self.view.countdown = self.view.countdown.saturating_sub(1);
        if self.view.countdown == 0 {
            self.finish_countdown();
        }
    }

    fn finish_countdown(&mut self) {
        self.ticker = None;
        match self.view.phase.clone() {
            Phase::Redirecting { url } => {
                self.cancel.cancel();
                self.navigator.navigate(&url);
                self.view.phase = Phase::Redirected { url };
            }
            Phase::Counting => {
                info!(campaign_id = %self.context.campaign.id, "Countdown finished, returning to form");
                self.reset();
            }
            _ => {}
        }
    }

    fn respond_again(&mut self) {
        if self.submission.is_none() {
            debug!("Nothing submitted yet, ignoring respond again");
            return;
        }
        info!(campaign_id = %self.context.campaign.id, "Respondent starting a new response");
        self.reset();
    }

    fn reset(&mut self) {
        self.ticker = None;
        self.submission = None;
        self.next_generation();
        self.view.reset();
    }

    fn retry_webhook(&mut self) {
        if !self.automation.effective_action().dispatches_webhook() {
            return;
        }
        let Some(banner) = self.view.banner.as_ref() else {
            debug!("No webhook failure to retry");
            return;
        };
        if !banner.retry_available {
            warn!(campaign_id = %self.context.campaign.id, "Webhook retry requested after attempt ceiling");
            return;
        }
        if self.start_dispatch(RunMode::Manual) {
            info!(campaign_id = %self.context.campaign.id, "Manual webhook retry");
        }
    }
}
