use serde::{Deserialize, Serialize};

use crate::automation::AutomationConfig;

/// A configured survey instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    /// Default source assigned to responses of this campaign.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Default group assigned to responses of this campaign.
    #[serde(default)]
    pub group_id: Option<String>,
    /// `None` behaves exactly like a disabled automation.
    #[serde(default)]
    pub automation: Option<AutomationConfig>,
}

impl Campaign {
    /// Automation in effect for this campaign, with absent config treated as disabled.
    pub fn automation(&self) -> AutomationConfig {
        self.automation.clone().unwrap_or_default()
    }
}

/// Kind of a question on the survey form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Nps,
    Text,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Email,
    Phone,
}

impl FieldKind {
    /// Free-text kinds that may carry the legacy feedback answer.
    pub fn is_free_text(&self) -> bool {
        matches!(self, Self::Text | Self::Textarea)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Ordered field list of a campaign's survey form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignForm {
    #[serde(default)]
    pub fields: Vec<FormField>,
}

/// Field id used for the score when a form declares no NPS field.
pub const DEFAULT_NPS_FIELD_ID: &str = "nps";

/// Field id of the legacy single feedback question.
pub const LEGACY_FEEDBACK_FIELD_ID: &str = "feedback";

impl CampaignForm {
    /// Id of the field holding the NPS score.
    pub fn nps_field_id(&self) -> &str {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::Nps)
            .map(|f| f.id.as_str())
            .unwrap_or(DEFAULT_NPS_FIELD_ID)
    }

    /// Id of the field whose answer populates `Response::feedback`.
    ///
    /// A field literally named `feedback` wins; otherwise the first
    /// free-text question is used.
    pub fn feedback_field_id(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.id == LEGACY_FEEDBACK_FIELD_ID)
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|f| f.kind.is_free_text())
            })
            .map(|f| f.id.as_str())
    }
}

/// Campaign-configured dimension a response is classified under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Situation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The situation new responses are filed under: the flagged default, else the first.
pub fn default_situation(situations: &[Situation]) -> Option<&Situation> {
    situations
        .iter()
        .find(|s| s.is_default)
        .or_else(|| situations.first())
}
