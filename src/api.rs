use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::types::{
    AccountSettings, ApiErrorResponse, Domain, Image, Linode, LinodeType, NetworkUtilization,
    NodeBalancer, Page, Volume,
};

pub const API_ROOT: &str = "https://api.linode.com/v4";

#[mockall::automock]
#[async_trait]
pub trait ApiClientTrait: Send + Sync {
    async fn list_linodes(&self) -> Result<Vec<Linode>>;
    async fn list_volumes(&self) -> Result<Vec<Volume>>;
    async fn list_nodebalancers(&self) -> Result<Vec<NodeBalancer>>;
    async fn list_domains(&self) -> Result<Vec<Domain>>;
    async fn list_images(&self) -> Result<Vec<Image>>;
    async fn list_types(&self) -> Result<Vec<LinodeType>>;
    async fn enable_backups(&self, linode_id: u64) -> Result<()>;
    async fn cancel_backups(&self, linode_id: u64) -> Result<()>;
    async fn take_snapshot(&self, linode_id: u64, label: &str) -> Result<()>;
    async fn update_backup_schedule(&self, linode_id: u64, day: &str, window: &str) -> Result<()>;
    async fn update_account_settings(&self, backups_enabled: bool) -> Result<AccountSettings>;
    async fn get_network_utilization(&self) -> Result<NetworkUtilization>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: API_ROOT.to_string(),
            token,
        }
    }

    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token,
        }
    }

    /// Reads the personal access token from the environment.
    pub fn token_from_env() -> Result<String> {
        std::env::var("LINODE_TOKEN")
            .map(|t| t.trim().to_string())
            .map_err(|_| anyhow!("LINODE_TOKEN is not set"))
    }

    /// Turns a non-2xx response into an error carrying the API's error body,
    /// so callers can recover the `errors[0].reason` message by downcasting.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(api_error) => Err(anyhow::Error::new(api_error)),
            Err(_) => Err(anyhow!("API request failed: {}", status)),
        }
    }

    /// Fetches every page of a list endpoint and returns the concatenated
    /// collection. Pages are requested one at a time, in order.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut collected = Vec::new();
        let mut page = 1;

        loop {
            let url = format!("{}{}?page={}", self.base_url, path, page);
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let page_data: Page<T> = Self::check(response).await?.json().await?;
            collected.extend(page_data.data);

            if page >= page_data.pages {
                break;
            }
            page += 1;
        }

        Ok(collected)
    }

    async fn post(&self, path: &str, body: Option<serde_json::Value>) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn put(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        Self::check(response).await
    }
}

#[async_trait]
impl ApiClientTrait for ApiClient {
    async fn list_linodes(&self) -> Result<Vec<Linode>> {
        self.get_all("/linode/instances").await
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        self.get_all("/volumes").await
    }

    async fn list_nodebalancers(&self) -> Result<Vec<NodeBalancer>> {
        self.get_all("/nodebalancers").await
    }

    async fn list_domains(&self) -> Result<Vec<Domain>> {
        self.get_all("/domains").await
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        self.get_all("/images").await
    }

    async fn list_types(&self) -> Result<Vec<LinodeType>> {
        self.get_all("/linode/types").await
    }

    async fn enable_backups(&self, linode_id: u64) -> Result<()> {
        self.post(&format!("/linode/instances/{}/backups/enable", linode_id), None)
            .await
    }

    async fn cancel_backups(&self, linode_id: u64) -> Result<()> {
        self.post(&format!("/linode/instances/{}/backups/cancel", linode_id), None)
            .await
    }

    async fn take_snapshot(&self, linode_id: u64, label: &str) -> Result<()> {
        let body = serde_json::json!({ "label": label });
        self.post(&format!("/linode/instances/{}/backups", linode_id), Some(body))
            .await
    }

    async fn update_backup_schedule(&self, linode_id: u64, day: &str, window: &str) -> Result<()> {
        let body = serde_json::json!({
            "backups": { "schedule": { "day": day, "window": window } }
        });

        self.put(&format!("/linode/instances/{}", linode_id), body)
            .await?;
        Ok(())
    }

    async fn update_account_settings(&self, backups_enabled: bool) -> Result<AccountSettings> {
        let body = serde_json::json!({ "backups_enabled": backups_enabled });

        let settings = self.put("/account/settings", body).await?.json().await?;
        Ok(settings)
    }

    async fn get_network_utilization(&self) -> Result<NetworkUtilization> {
        let url = format!("{}/account/transfer", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let utilization = Self::check(response).await?.json().await?;
        Ok(utilization)
    }
}
