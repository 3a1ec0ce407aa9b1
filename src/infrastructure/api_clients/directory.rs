//! Directory API client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use tracing::debug;

use super::traits::DirectoryApi;
use crate::application::errors::{ApiError, DirectoryError};
use crate::config::DirectoryConfig;
use crate::infrastructure::resilience::RetryPolicy;

/// Client for the remote directory/identity API. Every call goes through the
/// retry policy; token acquisition is a collaborator concern and the client
/// only attaches a pre-acquired bearer token.
pub struct DirectoryClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl DirectoryClient {
    /// Create a new directory client from configuration
    pub fn new(config: &DirectoryConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("postura/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            timeout,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        }
    }

    fn map_transport_error(&self, error: reqwest::Error) -> DirectoryError {
        if error.is_timeout() {
            DirectoryError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            DirectoryError::Network(error)
        }
    }

    /// Issue one attempt, classifying non-success statuses for the retry policy
    async fn request_once(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, DirectoryError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| self.map_transport_error(e));
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ApiError::Authorization {
                    status: status.as_u16(),
                }
                .into())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(ApiError::RateLimited { retry_after }.into())
            }
            _ => {
                let message = response.text().await.unwrap_or_default();
                let message: String = message.chars().take(200).collect();
                Err(ApiError::Http {
                    status: status.as_u16(),
                    message,
                }
                .into())
            }
        }
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, DirectoryError> {
        debug!("Directory GET {}", path);
        self.retry.run(|| self.request_once(path, query)).await
    }
}
