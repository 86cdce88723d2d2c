mod config;
mod fixture;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use common::{CampaignForm, FormAnswers, Locale};
use engine::recorder::build_response;
use engine::webhook::{build_payload, prepare};
use engine::{
    DispatchPolicy, Phase, RecordingNavigator, ResponseStore, RestResponseStore, SessionContext,
    SessionServices, SessionTiming, SessionView, SurveySession, WebhookDispatcher, WebhookStatus,
};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::CliAppConfig;
use crate::fixture::Fixture;

#[derive(Parser)]
#[command(name = "nps-automation", version, about = "Run NPS survey submissions and their post-submit automation")]
struct Cli {
    /// Serve campaigns from a TOML fixture instead of the REST API.
    #[arg(long, global = true, env = "NPS_FIXTURE")]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit one response and run the campaign's automation
    Submit(SubmitArgs),
    /// Print the webhook request a response would produce, without sending it
    Preview(AnswerArgs),
    /// Validate a campaign's automation settings
    Check {
        #[arg(long)]
        campaign: String,
    },
}

#[derive(Args)]
struct AnswerArgs {
    #[arg(long)]
    campaign: String,
    /// NPS score, 0-10.
    #[arg(long)]
    score: Option<String>,
    #[arg(long)]
    feedback: Option<String>,
    /// Extra answers as `field=value`. Repeatable.
    #[arg(long = "answer", value_parser = parse_answer)]
    answers: Vec<(String, String)>,
}

#[derive(Args)]
struct SubmitArgs {
    #[command(flatten)]
    answers: AnswerArgs,
    /// Respondent language. Defaults to `session.locale`.
    #[arg(long)]
    locale: Option<Locale>,
    /// Stay until the countdown ends instead of exiting once automation settles.
    #[arg(long)]
    follow: bool,
}

fn parse_answer(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got '{raw}'")),
    }
}

impl AnswerArgs {
    fn form_answers(&self, form: &CampaignForm) -> FormAnswers {
        let mut answers: FormAnswers = self
            .answers
            .iter()
            .map(|(field, value)| (field.clone(), Value::String(value.clone())))
            .collect();
        if let Some(score) = &self.score {
            answers.insert(form.nps_field_id().to_string(), Value::String(score.clone()));
        }
        if let Some(feedback) = &self.feedback {
            let field = form
                .feedback_field_id()
                .unwrap_or(common::campaign::LEGACY_FEEDBACK_FIELD_ID);
            answers.insert(field.to_string(), Value::String(feedback.clone()));
        }
        answers
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = CliAppConfig::load().context("Failed to load config")?;
    let store = open_store(cli.fixture.as_deref(), &config)?;

    match cli.command {
        Command::Submit(args) => submit(store, &config, args).await,
        Command::Preview(args) => preview(store.as_ref(), &args).await,
        Command::Check { campaign } => check(store.as_ref(), &campaign).await,
    }
}

fn open_store(
    fixture: Option<&std::path::Path>,
    config: &CliAppConfig,
) -> anyhow::Result<Arc<dyn ResponseStore>> {
    match fixture {
        Some(path) => {
            info!(path = %path.display(), "Using fixture store");
            Ok(Arc::new(Fixture::load(path)?.into_store()))
        }
        None => {
            info!(base_url = %config.api.base_url, "Using REST store");
            let store = RestResponseStore::new(&config.api).context("Failed to create API client")?;
            Ok(Arc::new(store))
        }
    }
}

/// Post-submit work is done once the webhook is no longer in flight and the
/// countdown has begun, or the submission was refused.
fn settled(view: &SessionView) -> bool {
    if view.validation_error.is_some() || view.save_error.is_some() {
        return true;
    }
    (view.phase.is_counting() || view.phase.is_terminal())
        && !matches!(view.webhook, WebhookStatus::InFlight { .. })
}

async fn submit(
    store: Arc<dyn ResponseStore>,
    config: &CliAppConfig,
    args: SubmitArgs,
) -> anyhow::Result<()> {
    let locale = args.locale.unwrap_or(config.session.locale);
    let context = SessionContext::load(store.as_ref(), &args.answers.campaign, locale)
        .await
        .context("Failed to load campaign")?;
    let answers = args.answers.form_answers(&context.form);

    let dispatcher = WebhookDispatcher::new(DispatchPolicy::from(&config.webhook))
        .context("Failed to create webhook client")?;
    let navigator = Arc::new(RecordingNavigator::new());
    let services = SessionServices {
        store,
        dispatcher: Arc::new(dispatcher),
        navigator: navigator.clone(),
    };
    let session = SurveySession::spawn(context, services, SessionTiming::from(&config.session));

    for (field, value) in answers {
        session.set_answer(field, value).await?;
    }
    session.submit().await?;

    let view = session.wait_until(settled).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);

    if let Some(error) = view.validation_error.as_deref().or(view.save_error.as_deref()) {
        session.close().await?;
        session.join().await;
        bail!("{error}");
    }
    if let Some(banner) = &view.banner {
        warn!(kind = %banner.kind, retry_available = banner.retry_available, "{}", banner.message);
    }

    if args.follow {
        let view = session
            .wait_until(|v| v.phase.is_terminal() || (v.phase == Phase::Editing && v.response.is_none()))
            .await?;
        match &view.phase {
            Phase::Redirected { url } => info!(url = %url, "Respondent redirected"),
            _ => info!("Form reset for the next respondent"),
        }
    }

    session.close().await?;
    session.join().await;
    info!(visited = ?navigator.visited(), "Session finished");
    Ok(())
}

async fn preview(store: &dyn ResponseStore, args: &AnswerArgs) -> anyhow::Result<()> {
    let campaign = store.get_campaign(&args.campaign).await?;
    let form = store.get_campaign_form(&args.campaign).await?;
    let situations = store.get_situations().await?;

    let response = build_response(&campaign, &form, &situations, &args.form_answers(&form))?;
    let automation = campaign.automation();

    if !automation.effective_action().dispatches_webhook() {
        warn!(action = %automation.effective_action(), "Campaign does not send webhooks");
        let body = build_payload(automation.webhook_payload.as_deref(), &response)
            .map_err(|kind| anyhow!("{kind}"))?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let prepared = prepare(&automation, &response).map_err(|kind| anyhow!("{kind}"))?;
    println!("POST {}", prepared.url);
    for (name, value) in &prepared.headers {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&prepared.body)?);
    Ok(())
}

async fn check(store: &dyn ResponseStore, campaign_id: &str) -> anyhow::Result<()> {
    let campaign = store.get_campaign(campaign_id).await?;
    let automation = campaign.automation();
    let issues = automation.validate();

    println!(
        "{} ({}): {}",
        campaign.name,
        campaign.id,
        automation.effective_action()
    );
    for issue in &issues {
        println!("  - {issue}");
    }

    if !issues.is_empty() {
        bail!("{} automation issue(s) in campaign {}", issues.len(), campaign.id);
    }
    println!("  ok");
    Ok(())
}
