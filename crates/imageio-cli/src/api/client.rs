//! HTTP API client for the imageio server

use crate::api::{endpoints, types::*};
use crate::error::{CliError, Result};
use imageio_common::progress::NDJSON_CONTENT_TYPE;
use reqwest::{header, redirect, Client, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// API Client Constants
// ============================================================================

/// Timeout for JSON API requests in seconds.
/// Can be overridden via IMAGEIO_API_TIMEOUT_SECS environment variable.
/// Imports and downloads are not bounded by it; they run as long as the server streams.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Connection timeout for every request in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default server URL when not specified via flag or environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// API client for the imageio server
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let timeout_secs = std::env::var("IMAGEIO_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<bool> {
        let url = endpoints::health_url(&self.base_url);

        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// List brands and categories
    pub async fn list_brands(&self) -> Result<Vec<BrandSummary>> {
        let url = endpoints::brands_url(&self.base_url);
        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        read_data(response).await
    }

    /// Create a brand or category
    pub async fn create_brand(&self, name: &str, kind: &str) -> Result<Brand> {
        let url = endpoints::brands_url(&self.base_url);
        let request = CreateBrandRequest {
            name: name.to_string(),
            kind: kind.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?;
        read_data(response).await
    }

    /// Delete a brand with its items and stored images
    pub async fn delete_brand(&self, id: i64) -> Result<DeletedBrand> {
        let url = endpoints::brand_url(&self.base_url, id);
        let response = self.client.delete(&url).timeout(self.timeout).send().await?;
        read_data(response).await
    }

    /// Upload a spreadsheet and return the NDJSON progress stream
    pub async fn start_import(&self, brand_id: i64, file: &Path) -> Result<Response> {
        if !file.is_file() {
            return Err(CliError::FileNotFound(file.display().to_string()));
        }

        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = endpoints::import_url(&self.base_url, brand_id);
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, NDJSON_CONTENT_TYPE)
            .multipart(form)
            .send()
            .await?;
        check_status(response).await
    }

    /// Start downloading a brand's image archive
    pub async fn download_archive(&self, brand_id: i64) -> Result<Response> {
        let url = endpoints::archive_url(&self.base_url, brand_id);
        check_status(self.client.get(&url).send().await?).await
    }

    /// Start downloading a brand's link spreadsheet
    pub async fn download_links(&self, brand_id: i64) -> Result<Response> {
        let url = endpoints::links_url(&self.base_url, brand_id);
        check_status(self.client.get(&url).send().await?).await
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turn an error status into [`CliError::Server`], using the error envelope when present
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(envelope) => CliError::Server {
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => CliError::api(format!("HTTP {}", status)),
    })
}

async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let api_response: ApiResponse<T> = response.json().await?;

    if !api_response.success {
        return Err(CliError::api("The server reported a failure without details"));
    }

    Ok(api_response.data)
}
