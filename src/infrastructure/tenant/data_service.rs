//! Cached data access over the directory API
//!
//! Every accessor goes through the persistent cache: fresh entries are served
//! from storage, stale ones trigger a background refresh, and only a true
//! miss hits the directory API synchronously.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::models::{DirectoryRole, DirectoryUser, LicenseSku, OrganizationProfile};
use crate::application::errors::ApplicationError;
use crate::infrastructure::api_clients::DirectoryApi;
use crate::infrastructure::cache::PersistentCache;

pub const TYPE_USERS: &str = "users";
pub const TYPE_LICENSES: &str = "licenses";
pub const TYPE_DIRECTORY_ROLES: &str = "directory_roles";
pub const TYPE_ORGANIZATION: &str = "organization";

/// Data-access layer used by detectors and the read API
pub struct TenantDataService {
    cache: Arc<PersistentCache>,
    api: Arc<dyn DirectoryApi>,
}

impl TenantDataService {
    pub fn new(cache: Arc<PersistentCache>, api: Arc<dyn DirectoryApi>) -> Self {
        Self { cache, api }
    }

    /// All user accounts in the tenant
    pub async fn users(&self) -> Result<Vec<DirectoryUser>, ApplicationError> {
        self.fetch_collection(TYPE_USERS, "/users").await
    }

    /// Subscribed license SKUs
    pub async fn licenses(&self) -> Result<Vec<LicenseSku>, ApplicationError> {
        self.fetch_collection(TYPE_LICENSES, "/licenses").await
    }

    /// Directory roles with their current members
    pub async fn directory_roles(&self) -> Result<Vec<DirectoryRole>, ApplicationError> {
        self.fetch_collection(TYPE_DIRECTORY_ROLES, "/directoryRoles")
            .await
    }

    /// Tenant organization profile
    pub async fn organization(&self) -> Result<OrganizationProfile, ApplicationError> {
        let api = self.api.clone();
        self.cache
            .get_or_fetch(TYPE_ORGANIZATION, "profile", move || {
                let api = api.clone();
                async move {
                    let body = api.get("/organization", &[]).await?;
                    serde_json::from_value(body).map_err(ApplicationError::Json)
                }
            })
            .await
    }

    /// Fetch a `{ "value": [...] }` collection through the cache
    async fn fetch_collection<T>(
        &self,
        entry_type: &str,
        path: &str,
    ) -> Result<Vec<T>, ApplicationError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let api = self.api.clone();
        let path = path.to_string();
        self.cache
            .get_or_fetch(entry_type, "all", move || {
                let api = api.clone();
                let path = path.clone();
                async move {
                    let body = api.get(&path, &[]).await?;
                    parse_collection(body)
                }
            })
            .await
    }
}

/// Extract the `value` array of a directory collection response
fn parse_collection<T>(body: serde_json::Value) -> Result<Vec<T>, ApplicationError>
where
    T: DeserializeOwned,
{
    let items = body
        .get("value")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    serde_json::from_value(items).map_err(ApplicationError::Json)
}
