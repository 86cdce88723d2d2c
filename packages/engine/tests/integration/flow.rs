use std::time::Duration;

use common::AutomationAction;
use engine::{EngineError, Phase, WebhookStatus};
use serde_json::json;

use crate::support::{Harness, automation, fast_timing, slow_timing, timing};

#[tokio::test]
async fn disabled_automation_persists_and_counts_down_for_every_score() {
    for score in 0..=10u8 {
        let mut config = automation(AutomationAction::WebhookRedirect);
        config.enabled = false;
        config.webhook_url = Some("http://127.0.0.1:1/never".into());
        let harness = Harness::start(Some(config), slow_timing());

        harness.submit_score(score, None).await;
        let view = harness.wait_until(|v| v.phase == Phase::Counting).await;

        assert_eq!(view.countdown, 10, "score {score}");
        assert_eq!(view.webhook, WebhookStatus::Idle);
        assert!(view.attempts.is_empty());
        assert_eq!(harness.store.submit_calls(), 1);
        let responses = harness.store.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].nps_score, score);
    }
}

#[tokio::test]
async fn no_automation_then_close_makes_no_further_calls() {
    let harness = Harness::start(None, slow_timing());

    harness.submit_score(10, Some("Great service")).await;
    let view = harness.wait_until(|v| v.phase == Phase::Counting).await;
    assert_eq!(view.success_message.as_deref(), Some("Thank you for your feedback!"));

    let response = view.response.expect("response recorded");
    assert_eq!(response.nps_score, 10);
    assert_eq!(response.feedback.as_deref(), Some("Great service"));
    assert_eq!(response.situation_id.as_deref(), Some("sit-online"));
    assert_eq!(response.source_id.as_deref(), Some("src-web"));
    assert_eq!(response.group_id.as_deref(), Some("grp-retail"));

    harness.session.close().await.unwrap();
    harness.wait_until(|v| v.phase == Phase::Closed).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.session.view().phase, Phase::Closed);
    assert_eq!(harness.store.submit_calls(), 1);
    assert!(harness.navigator.visited().is_empty());
    assert!(matches!(
        harness.session.submit().await,
        Err(EngineError::SessionClosed)
    ));
}

#[tokio::test]
async fn redirect_only_navigates_to_exact_url() {
    let mut config = automation(AutomationAction::RedirectOnly);
    config.redirect_url = Some("https://example.com/thanks".into());
    config.webhook_url = Some("http://127.0.0.1:1/unused".into());
    let harness = Harness::start(Some(config), fast_timing());

    harness.submit_score(3, None).await;
    let view = harness
        .wait_until(|v| matches!(v.phase, Phase::Redirected { .. }))
        .await;

    assert_eq!(
        view.phase,
        Phase::Redirected {
            url: "https://example.com/thanks".into()
        }
    );
    assert_eq!(harness.navigator.visited(), vec!["https://example.com/thanks"]);
    assert_eq!(harness.store.responses().len(), 1);
    assert_eq!(harness.store.responses()[0].nps_score, 3);
    assert_eq!(view.webhook, WebhookStatus::Idle);
    assert!(view.attempts.is_empty());
}

#[tokio::test]
async fn redirect_without_url_falls_back_to_return() {
    let harness = Harness::start(Some(automation(AutomationAction::RedirectOnly)), timing(50));

    harness.submit_score(8, None).await;
    harness.wait_until(|v| v.phase == Phase::Counting).await;
    let view = harness
        .wait_until(|v| v.phase == Phase::Editing && v.response.is_none())
        .await;

    assert!(view.answers.is_empty());
    assert!(harness.navigator.visited().is_empty());
}

#[tokio::test]
async fn redirecting_shows_countdown_before_leaving() {
    let mut config = automation(AutomationAction::RedirectOnly);
    config.redirect_url = Some("  https://example.com/thanks  ".into());
    let harness = Harness::start(Some(config), slow_timing());

    harness.submit_score(9, None).await;
    let view = harness
        .wait_until(|v| matches!(v.phase, Phase::Redirecting { .. }))
        .await;

    assert_eq!(
        view.phase,
        Phase::Redirecting {
            url: "https://example.com/thanks".into()
        }
    );
    assert_eq!(view.countdown, 10);
    assert_eq!(view.progress(), 1.0);
    assert!(harness.navigator.visited().is_empty());
}

#[tokio::test]
async fn countdown_returns_to_blank_form() {
    let harness = Harness::start(None, timing(50));

    harness.submit_score(7, Some("ok")).await;
    harness.wait_until(|v| v.phase == Phase::Counting).await;
    let view = harness
        .wait_until(|v| v.phase == Phase::Editing && v.response.is_none())
        .await;

    assert!(view.answers.is_empty());
    assert_eq!(view.countdown, 10);
    assert_eq!(harness.store.responses().len(), 1);

    // A second response goes through the same flow.
    harness.submit_score(2, None).await;
    harness
        .wait_until(|v| v.response.as_ref().is_some_and(|r| r.nps_score == 2))
        .await;
    assert_eq!(harness.store.responses().len(), 2);
}

#[tokio::test]
async fn respond_again_resets_without_resending() {
    let harness = Harness::start(None, slow_timing());

    harness.submit_score(5, Some("meh")).await;
    harness.wait_until(|v| v.phase == Phase::Counting).await;

    harness.session.respond_again().await.unwrap();
    let view = harness
        .wait_until(|v| v.phase == Phase::Editing && v.response.is_none())
        .await;

    assert!(view.answers.is_empty());
    assert_eq!(view.countdown, 10);
    assert!(view.banner.is_none());
    assert!(view.success_message.is_none());

    // Pressing it again on a blank form changes nothing.
    harness.session.respond_again().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.session.view().phase, Phase::Editing);
    assert_eq!(harness.store.submit_calls(), 1);
}

#[tokio::test]
async fn missing_score_blocks_submission() {
    let harness = Harness::start(None, slow_timing());

    harness
        .session
        .set_answer("feedback", json!("no score given"))
        .await
        .unwrap();
    harness.session.submit().await.unwrap();
    let view = harness.wait_until(|v| v.validation_error.is_some()).await;

    assert_eq!(view.phase, Phase::Editing);
    assert_eq!(view.answers["feedback"], json!("no score given"));
    assert_eq!(harness.store.submit_calls(), 0);

    // Out-of-range scores are rejected the same way.
    harness.session.set_answer("score", json!(11)).await.unwrap();
    harness.session.submit().await.unwrap();
    let view = harness.wait_until(|v| v.validation_error.is_some()).await;
    assert_eq!(view.phase, Phase::Editing);
    assert_eq!(harness.store.submit_calls(), 0);

    harness.session.set_answer("score", json!("4")).await.unwrap();
    let view = harness.wait_until(|v| v.validation_error.is_none()).await;
    assert_eq!(view.answers["score"], json!("4"));
    harness.session.submit().await.unwrap();
    harness.wait_until(|v| v.phase == Phase::Counting).await;
    assert_eq!(harness.store.responses()[0].nps_score, 4);
}

#[tokio::test]
async fn save_failure_keeps_form_and_skips_automation() {
    let mut config = automation(AutomationAction::RedirectOnly);
    config.redirect_url = Some("https://example.com/thanks".into());
    let harness = Harness::start(Some(config), slow_timing());
    harness.store.fail_next_submits(1);

    harness.submit_score(6, Some("keep me")).await;
    let view = harness.wait_until(|v| v.save_error.is_some()).await;

    assert_eq!(view.phase, Phase::Editing);
    assert_eq!(view.answers["feedback"], json!("keep me"));
    assert!(view.response.is_none());
    assert!(harness.store.responses().is_empty());
    assert!(harness.navigator.visited().is_empty());

    harness.session.submit().await.unwrap();
    let view = harness
        .wait_until(|v| matches!(v.phase, Phase::Redirecting { .. }))
        .await;
    assert!(view.save_error.is_none());
    assert_eq!(harness.store.submit_calls(), 2);
    assert_eq!(harness.store.responses().len(), 1);
}

#[tokio::test]
async fn custom_success_message_replaces_default() {
    let mut config = automation(AutomationAction::ReturnOnly);
    config.success_message = Some("Obrigado!".into());
    let harness = Harness::start(Some(config), slow_timing());

    harness.submit_score(10, None).await;
    let view = harness.wait_until(|v| v.phase == Phase::Counting).await;

    assert_eq!(view.success_message.as_deref(), Some("Obrigado!"));
}
