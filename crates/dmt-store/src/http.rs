//! `RemoteStore` over HTTP.

use crate::error::RemoteError;
use crate::remote::{RemoteResponse, RemoteStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpRemoteStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl HttpRemoteStore {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}/{endpoint}?apiKey={}", self.base_url, urlencoding::encode(&self.api_key));
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<RemoteResponse, RemoteError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, endpoint, "Backup service request failed");
            RemoteError(format!("Network error: {e}"))
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError(format!("Failed to read response body: {e}")))?;
        debug!(endpoint, status, bytes = body.len(), "Backup service responded");

        Ok(RemoteResponse { status, body: body.to_vec() })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn backup_model(&self, model_id: &str, blob: Vec<u8>) -> Result<RemoteResponse, RemoteError> {
        let url = self.url("backupModel", &[("modelId", model_id)]);
        let request = self.client.post(url).header("content-type", "application/gzip").body(blob);
        self.send("backupModel", request).await
    }

    async fn restore_model(&self, model_id: &str) -> Result<RemoteResponse, RemoteError> {
        let url = self.url("restoreModel", &[("modelId", model_id)]);
        self.send("restoreModel", self.client.get(url)).await
    }

    async fn change_model_id(&self, old_id: &str, new_id: &str) -> Result<RemoteResponse, RemoteError> {
        let url = self.url("changeModelId", &[("oldId", old_id), ("newId", new_id)]);
        self.send("changeModelId", self.client.put(url)).await
    }
}
