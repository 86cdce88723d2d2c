use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw form state: field id -> answer as entered.
pub type FormAnswers = BTreeMap<String, serde_json::Value>;

/// One respondent's submission.
///
/// Built once at submit time and never mutated after the store accepts it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub campaign_id: String,
    /// Score between 0 and 10 inclusive.
    pub nps_score: u8,
    pub feedback: Option<String>,
    pub source_id: Option<String>,
    pub situation_id: Option<String>,
    pub group_id: Option<String>,
    pub form_responses: FormAnswers,
    pub created_at: DateTime<Utc>,
}

/// What the store returns after persisting a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseReceipt {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Classification defaults resolved from the campaign and situation list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponseDefaults {
    pub source_id: Option<String>,
    pub situation_id: Option<String>,
    pub group_id: Option<String>,
}

impl Response {
    /// Create an unsaved response with a client-generated id.
    pub fn draft(
        campaign_id: impl Into<String>,
        nps_score: u8,
        feedback: Option<String>,
        form_responses: FormAnswers,
        defaults: ResponseDefaults,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            campaign_id: campaign_id.into(),
            nps_score,
            feedback,
            source_id: defaults.source_id,
            situation_id: defaults.situation_id,
            group_id: defaults.group_id,
            form_responses,
            created_at: Utc::now(),
        }
    }

    /// Adopt the identity assigned by the store.
    pub fn persisted(self, receipt: ResponseReceipt) -> Self {
        Self {
            id: receipt.id,
            created_at: receipt.created_at,
            ..self
        }
    }
}
