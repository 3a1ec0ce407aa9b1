//! Detector for enabled accounts that have gone quiet

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

use super::traits::Detector;
use crate::application::errors::ApplicationError;
use crate::domain::{AffectedResource, Category, Finding, FindingId, Severity};
use crate::infrastructure::tenant::TenantDataService;

/// Flags enabled accounts whose last sign-in is older than the configured
/// threshold, or that have never signed in at all.
pub struct StaleAccountsDetector {
    data: Arc<TenantDataService>,
    threshold_days: i64,
}

impl StaleAccountsDetector {
    pub fn new(data: Arc<TenantDataService>, threshold_days: i64) -> Self {
        Self {
            data,
            threshold_days,
        }
    }
}

#[async_trait]
impl Detector for StaleAccountsDetector {
    fn category(&self) -> Category {
        Category::new("stale_accounts").expect("valid category")
    }

    async fn detect(&self) -> Result<Vec<Finding>, ApplicationError> {
        let users = self.data.users().await?;
        let cutoff = Utc::now() - Duration::days(self.threshold_days);

        let stale: Vec<AffectedResource> = users
            .iter()
            .filter(|user| user.account_enabled)
            .filter(|user| user.last_sign_in_at.is_none_or(|at| at < cutoff))
            .map(|user| {
                let resource = AffectedResource::new(&user.id, &user.user_principal_name);
                match user.last_sign_in_at {
                    Some(at) => resource.with_details(format!("Last sign-in {}", at.format("%Y-%m-%d"))),
                    None => resource.with_details("Never signed in"),
                }
            })
            .collect();

        if stale.is_empty() {
            return Ok(vec![]);
        }

        let finding = Finding::new(
            FindingId::new("stale_accounts:enabled")?,
            "stale_account",
            Severity::Medium,
            format!("{} enabled accounts without recent sign-in", stale.len()),
            format!(
                "Enabled accounts with no sign-in activity in the last {} days \
                 widen the attack surface without serving anyone.",
                self.threshold_days
            ),
            stale,
            "Review the listed accounts and disable or remove the unused ones",
            false,
        )?;

        Ok(vec![finding])
    }
}
