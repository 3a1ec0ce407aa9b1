//! Shared fixtures for tenant data and detector tests

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::application::errors::{ApiError, DirectoryError};
use crate::infrastructure::api_clients::DirectoryApi;
use crate::infrastructure::cache::{CacheSettings, PersistentCache};
use crate::infrastructure::storage::{FileTableStore, TableStore};

/// Directory API stub serving canned responses and counting calls per path
pub struct StaticDirectoryApi {
    responses: HashMap<String, serde_json::Value>,
    call_counts: HashMap<String, AtomicU32>,
}

impl StaticDirectoryApi {
    pub fn new(responses: impl IntoIterator<Item = (String, serde_json::Value)>) -> Self {
        let responses: HashMap<_, _> = responses.into_iter().collect();
        let call_counts = responses
            .keys()
            .map(|path| (path.clone(), AtomicU32::new(0)))
            .collect();
        Self {
            responses,
            call_counts,
        }
    }

    pub fn calls(&self, path: &str) -> u32 {
        self.call_counts
            .get(path)
            .map(|count| count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

#[async_trait]
impl DirectoryApi for StaticDirectoryApi {
    async fn get(
        &self,
        path: &str,
        _query: &[(&str, &str)],
    ) -> Result<serde_json::Value, DirectoryError> {
        if let Some(count) = self.call_counts.get(path) {
            count.fetch_add(1, Ordering::SeqCst);
        }
        self.responses.get(path).cloned().ok_or_else(|| {
            DirectoryError::Api(ApiError::Http {
                status: 404,
                message: format!("no stub for {}", path),
            })
        })
    }
}

/// Open a file-backed cache in a fresh temp directory
pub fn open_test_cache() -> (tempfile::TempDir, PersistentCache) {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn TableStore> = Arc::new(FileTableStore::new(dir.path().to_path_buf()));
    let settings = CacheSettings {
        refresh_delay: std::time::Duration::from_millis(5),
        ..CacheSettings::default()
    };
    (dir, PersistentCache::open(store, settings))
}

pub fn users_payload() -> serde_json::Value {
    json!({
        "value": [
            {
                "id": "u1",
                "displayName": "Alex Chen",
                "userPrincipalName": "alex@contoso.example",
                "accountEnabled": true,
                "lastSignInAt": "2020-01-01T00:00:00Z"
            },
            {
                "id": "u2",
                "displayName": "Robin Patel",
                "userPrincipalName": "robin@contoso.example",
                "accountEnabled": true
            },
            {
                "id": "u3",
                "displayName": "Sam Rivera",
                "userPrincipalName": "sam@contoso.example",
                "accountEnabled": false
            }
        ]
    })
}

pub fn licenses_payload() -> serde_json::Value {
    json!({
        "value": [
            {
                "skuId": "sku-1",
                "skuPartNumber": "ENTERPRISEPACK",
                "consumedUnits": 60,
                "prepaidUnits": 100
            },
            {
                "skuId": "sku-2",
                "skuPartNumber": "FLOW_FREE",
                "consumedUnits": 10,
                "prepaidUnits": 10
            }
        ]
    })
}

pub fn roles_payload() -> serde_json::Value {
    json!({
        "value": [
            {
                "id": "r1",
                "displayName": "Global Administrator",
                "isPrivileged": true,
                "members": [
                    { "id": "u1", "displayName": "Alex Chen" },
                    { "id": "u2", "displayName": "Robin Patel" },
                    { "id": "u4", "displayName": "Jo Park" }
                ]
            },
            {
                "id": "r2",
                "displayName": "User Administrator",
                "isPrivileged": true,
                "members": [
                    { "id": "u5", "displayName": "Kim Osei" }
                ]
            },
            {
                "id": "r3",
                "displayName": "Directory Readers",
                "isPrivileged": false,
                "members": []
            }
        ]
    })
}

pub fn organization_payload() -> serde_json::Value {
    json!({
        "id": "org-1",
        "displayName": "Contoso",
        "countryLetterCode": "US",
        "createdAt": "2019-06-01T00:00:00Z"
    })
}
