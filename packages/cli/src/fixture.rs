use std::path::Path;

use anyhow::Context;
use common::{Campaign, CampaignForm, Situation};
use engine::MemoryResponseStore;
use serde::Deserialize;

/// Offline data set: campaigns with their forms, plus situations.
#[derive(Debug, Deserialize, Default)]
pub struct Fixture {
    #[serde(default)]
    pub situations: Vec<Situation>,
    #[serde(default)]
    pub campaigns: Vec<FixtureCampaign>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureCampaign {
    #[serde(flatten)]
    pub campaign: Campaign,
    #[serde(default)]
    pub form: CampaignForm,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid fixture {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn campaign(&self, id: &str) -> Option<&FixtureCampaign> {
        self.campaigns.iter().find(|c| c.campaign.id == id)
    }

    pub fn into_store(self) -> MemoryResponseStore {
        let store = MemoryResponseStore::new().with_situations(self.situations);
        for entry in self.campaigns {
            store.insert_campaign(entry.campaign, entry.form);
        }
        store
    }
}
