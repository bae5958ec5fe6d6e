//! Shared HTTP client for the Mirrorgate gateway API.
//!
//! Provides a minimal client with generic GET/POST helpers and domain
//! methods (pointer status, pointer update, upload, file listing). The CLI
//! uses this client directly, and it implements the sync crate's
//! `RemoteAuthority` port so a reconciler can poll the gateway.

pub mod api;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mirrorgate_core::models::Pointer;
use mirrorgate_sync::RemoteAuthority;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the Mirrorgate gateway API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: MIRRORGATE_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("MIRRORGATE_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.build_url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse_json(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse_json(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse_json(response).await
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }
}

#[async_trait]
impl RemoteAuthority for ApiClient {
    async fn fetch_pointer(&self) -> Result<Option<Pointer>> {
        let status = self.image_status().await?;
        Ok(match (status.image_url, status.updated_at) {
            (Some(value), Some(updated_at)) => Some(Pointer::new(value, updated_at)),
            _ => None,
        })
    }
}
