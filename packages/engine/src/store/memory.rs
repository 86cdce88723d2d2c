use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{Campaign, CampaignForm, Response, ResponseReceipt, Situation};
use tracing::debug;

use super::error::StoreError;
use super::traits::ResponseStore;

/// In-process store used for offline runs and tests.
///
/// Keeps the store's receipt id equal to the client-generated id.
#[derive(Default)]
pub struct MemoryResponseStore {
    campaigns: Mutex<HashMap<String, (Campaign, CampaignForm)>>,
    situations: Mutex<Vec<Situation>>,
    responses: Mutex<Vec<Response>>,
    submit_calls: AtomicUsize,
    read_calls: AtomicUsize,
    failing_submits: AtomicUsize,
}

impl MemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_campaign(self, campaign: Campaign, form: CampaignForm) -> Self {
        self.insert_campaign(campaign, form);
        self
    }

    pub fn with_situations(self, situations: Vec<Situation>) -> Self {
        *self.situations.lock().unwrap() = situations;
        self
    }

    pub fn insert_campaign(&self, campaign: Campaign, form: CampaignForm) {
        self.campaigns
            .lock()
            .unwrap()
            .insert(campaign.id.clone(), (campaign, form));
    }

    /// Make the next `count` submissions fail with [`StoreError::Unavailable`].
    pub fn fail_next_submits(&self, count: usize) {
        self.failing_submits.store(count, Ordering::SeqCst);
    }

    /// Responses persisted so far, in submission order.
    pub fn responses(&self) -> Vec<Response> {
        self.responses.lock().unwrap().clone()
    }

    /// Number of `submit_response` calls, failed ones included.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of read calls (campaign, form, situations).
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn submit_response(&self, response: &Response) -> Result<ResponseReceipt, StoreError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing_submits.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_submits.store(failing - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected failure".into()));
        }

        let receipt = ResponseReceipt {
            id: response.id.clone(),
            created_at: Utc::now(),
        };
        let stored = response.clone().persisted(receipt.clone());
        debug!(response_id = %stored.id, "Stored response in memory");
        self.responses.lock().unwrap().push(stored);
        Ok(receipt)
    }

    async fn get_campaign(&self, campaign_id: &str) -> Result<Campaign, StoreError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.campaigns
            .lock()
            .unwrap()
            .get(campaign_id)
            .map(|(campaign, _)| campaign.clone())
            .ok_or_else(|| StoreError::NotFound(format!("campaign {campaign_id}")))
    }

    async fn get_campaign_form(&self, campaign_id: &str) -> Result<CampaignForm, StoreError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.campaigns
            .lock()
            .unwrap()
            .get(campaign_id)
            .map(|(_, form)| form.clone())
            .ok_or_else(|| StoreError::NotFound(format!("form of campaign {campaign_id}")))
    }

    async fn get_situations(&self) -> Result<Vec<Situation>, StoreError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.situations.lock().unwrap().clone())
    }
}
