//! Tenant resource models as returned by the directory API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account in the tenant directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: String,
    pub user_principal_name: String,
    pub account_enabled: bool,
    /// Absent for accounts that have never signed in.
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// A subscribed license SKU
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSku {
    pub sku_id: String,
    pub sku_part_number: String,
    pub consumed_units: u32,
    pub prepaid_units: u32,
}

impl LicenseSku {
    pub fn unassigned_units(&self) -> u32 {
        self.prepaid_units.saturating_sub(self.consumed_units)
    }
}

/// A member of a directory role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMember {
    pub id: String,
    pub display_name: String,
}

/// A directory role with its current members
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRole {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub is_privileged: bool,
    #[serde(default)]
    pub members: Vec<RoleMember>,
}

/// Tenant organization profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub country_letter_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
