//! Traits for directory API clients

use async_trait::async_trait;

use crate::application::errors::DirectoryError;

/// Trait for read access to the remote directory/identity API. Responses are
/// raw JSON; shaping them into tenant models is the data-access layer's job.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, DirectoryError>;
}
