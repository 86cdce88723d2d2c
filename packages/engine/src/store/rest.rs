use std::time::Duration;

use async_trait::async_trait;
use common::config::ApiAppConfig;
use common::{Campaign, CampaignForm, Response, ResponseReceipt, Situation};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::error::StoreError;
use super::traits::ResponseStore;

/// Store backed by the application's REST API.
pub struct RestResponseStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestResponseStore {
    pub fn new(config: &ApiAppConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, StoreError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), what, "Storage API request failed");
            return Err(StoreError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ResponseStore for RestResponseStore {
    async fn submit_response(&self, response: &Response) -> Result<ResponseReceipt, StoreError> {
        debug!(response_id = %response.id, campaign_id = %response.campaign_id, "Submitting response");
        let request = self.client.post(self.url("responses")).json(response);
        self.send(request, "responses").await
    }

    async fn get_campaign(&self, campaign_id: &str) -> Result<Campaign, StoreError> {
        let request = self.client.get(self.url(&format!("campaigns/{campaign_id}")));
        self.send(request, &format!("campaign {campaign_id}")).await
    }

    async fn get_campaign_form(&self, campaign_id: &str) -> Result<CampaignForm, StoreError> {
        let request = self
            .client
            .get(self.url(&format!("campaigns/{campaign_id}/form")));
        self.send(request, &format!("form of campaign {campaign_id}"))
            .await
    }

    async fn get_situations(&self) -> Result<Vec<Situation>, StoreError> {
        let request = self.client.get(self.url("situations"));
        self.send(request, "situations").await
    }
}
