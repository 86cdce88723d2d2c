use async_trait::async_trait;
use common::{Campaign, CampaignForm, Response, ResponseReceipt, Situation};

use super::error::StoreError;

/// Persistence and read access owned by the surrounding application.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Persist a response and return the identity the store assigned.
    async fn submit_response(&self, response: &Response) -> Result<ResponseReceipt, StoreError>;

    async fn get_campaign(&self, campaign_id: &str) -> Result<Campaign, StoreError>;

    async fn get_campaign_form(&self, campaign_id: &str) -> Result<CampaignForm, StoreError>;

    /// Situations available for classifying responses.
    async fn get_situations(&self) -> Result<Vec<Situation>, StoreError>;
}
