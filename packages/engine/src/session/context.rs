use std::time::Duration;

use common::config::SessionAppConfig;
use common::{AutomationConfig, Campaign, CampaignForm, Locale, Situation};
use tracing::info;

use crate::store::{ResponseStore, StoreError};

/// Everything a survey page resolves once at load time.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub campaign: Campaign,
    pub form: CampaignForm,
    pub situations: Vec<Situation>,
    pub locale: Locale,
}

impl SessionContext {
    /// Fetch campaign, form and situations from the store.
    pub async fn load(
        store: &dyn ResponseStore,
        campaign_id: &str,
        locale: Locale,
    ) -> Result<Self, StoreError> {
        let campaign = store.get_campaign(campaign_id).await?;
        let form = store.get_campaign_form(campaign_id).await?;
        let situations = store.get_situations().await?;

        info!(
            campaign_id,
            fields = form.fields.len(),
            situations = situations.len(),
            locale = %locale,
            "Survey session context loaded"
        );

        Ok(Self {
            campaign,
            form,
            situations,
            locale,
        })
    }

    pub fn automation(&self) -> AutomationConfig {
        self.campaign.automation()
    }
}

/// Countdown settings for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    pub countdown_start: u8,
    pub tick: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self::from(&SessionAppConfig::default())
    }
}

impl From<&SessionAppConfig> for SessionTiming {
    fn from(config: &SessionAppConfig) -> Self {
        Self {
            countdown_start: config.countdown_start,
            tick: Duration::from_millis(config.tick_ms.max(1)),
        }
    }
}
