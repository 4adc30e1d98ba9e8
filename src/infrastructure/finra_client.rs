//! FINRA Daily File Client
//!
//! Downloads the pipe-delimited Reg SHO daily file for a date key from the
//! FINRA CDN. One `reqwest::Client` is held per instance so repeated
//! downloads reuse connections.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::IngestorConfig;
use crate::domain::repositories::short_volume_source::{
    FetchError, FetchResult, ShortVolumeSource,
};

/// The CDN rejects requests without a browser-like agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client for the daily short-sale volume files
pub struct FinraClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
    max_response_bytes: u64,
}

impl FinraClient {
    /// Create a client from pipeline configuration.
    pub fn new(config: &IngestorConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.source_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.fetch_timeout_secs,
            max_response_bytes: config.max_response_bytes,
        })
    }

    fn file_url(&self, date_key: &str) -> String {
        format!("{}/CNMSshvol{}.txt", self.base_url, date_key)
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl ShortVolumeSource for FinraClient {
    async fn fetch_daily(&self, date_key: &str) -> FetchResult<Option<String>> {
        let url = self.file_url(date_key);
        info!("Downloading short-sale file for {} from {}", date_key, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!("No source file for {} (404)", date_key);
            return Err(FetchError::NotFound {
                date_key: date_key.to_string(),
            });
        }

        let response = response
            .error_for_status()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if let Some(length) = response.content_length() {
            if length > self.max_response_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_response_bytes,
                });
            }
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;

        if body.len() as u64 > self.max_response_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_response_bytes,
            });
        }

        if body.trim().is_empty() {
            warn!("Empty response body for {}", date_key);
            return Ok(None);
        }

        info!("Downloaded {} bytes for {}", body.len(), date_key);
        Ok(Some(body))
    }
}
