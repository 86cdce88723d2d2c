use std::sync::Arc;

use common::campaign::default_situation;
use common::{Campaign, CampaignForm, FormAnswers, Response, ResponseDefaults, Situation};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::store::{ResponseStore, StoreError};

/// Client-side validation failures. No network call is made when these occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("NPS score is required")]
    MissingScore,

    #[error("NPS score must be an integer between 0 and 10, got {0}")]
    InvalidScore(String),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to save response: {0}")]
    Persistence(#[from] StoreError),
}

/// Parse a raw answer into an NPS score.
///
/// Accepts JSON integers and numeric strings; blank input counts as missing.
pub fn parse_nps_score(value: Option<&Value>) -> Result<u8, ValidationError> {
    let score = match value {
        None | Some(Value::Null) => return Err(ValidationError::MissingScore),
        Some(Value::String(s)) if s.trim().is_empty() => return Err(ValidationError::MissingScore),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        Some(_) => None,
    };

    match score {
        Some(score @ 0..=10) => Ok(score as u8),
        _ => Err(ValidationError::InvalidScore(
            value.map(Value::to_string).unwrap_or_default(),
        )),
    }
}

fn answer_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Build an unsaved response from form state and campaign defaults.
pub fn build_response(
    campaign: &Campaign,
    form: &CampaignForm,
    situations: &[Situation],
    answers: &FormAnswers,
) -> Result<Response, ValidationError> {
    let nps_score = parse_nps_score(answers.get(form.nps_field_id()))?;
    let feedback = form
        .feedback_field_id()
        .and_then(|id| answer_text(answers.get(id)));

    let form_responses: FormAnswers = answers
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect();

    let defaults = ResponseDefaults {
        source_id: campaign.source_id.clone(),
        situation_id: default_situation(situations).map(|s| s.id.clone()),
        group_id: campaign.group_id.clone(),
    };

    Ok(Response::draft(
        campaign.id.clone(),
        nps_score,
        feedback,
        form_responses,
        defaults,
    ))
}

/// Packages answers into a [`Response`] and persists it before any automation runs.
#[derive(Clone)]
pub struct ResponseRecorder {
    store: Arc<dyn ResponseStore>,
}

impl ResponseRecorder {
    pub fn new(store: Arc<dyn ResponseStore>) -> Self {
        Self { store }
    }

    /// Persist a built response. Exactly one store call; failures are not retried.
    pub async fn persist(&self, draft: Response) -> Result<Response, StoreError> {
        match self.store.submit_response(&draft).await {
            Ok(receipt) => {
                let response = draft.persisted(receipt);
                info!(
                    response_id = %response.id,
                    campaign_id = %response.campaign_id,
                    nps_score = response.nps_score,
                    "Response saved"
                );
                Ok(response)
            }
            Err(e) => {
                error!(campaign_id = %draft.campaign_id, error = %e, "Failed to save response");
                Err(e)
            }
        }
    }

    /// Validate, build and persist in one step.
    pub async fn record(
        &self,
        campaign: &Campaign,
        form: &CampaignForm,
        situations: &[Situation],
        answers: &FormAnswers,
    ) -> Result<Response, RecordError> {
        let draft = build_response(campaign, form, situations, answers)?;
        Ok(self.persist(draft).await?)
    }
}
