//! Detector for license SKUs with unassigned seats

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::Detector;
use crate::application::errors::ApplicationError;
use crate::domain::{AffectedResource, Category, Finding, FindingId, Severity};
use crate::infrastructure::tenant::TenantDataService;

/// Flags subscribed SKUs that carry unassigned seats. One finding per SKU,
/// keyed by the SKU part number so re-runs upsert cleanly.
pub struct UnusedLicensesDetector {
    data: Arc<TenantDataService>,
}

impl UnusedLicensesDetector {
    pub fn new(data: Arc<TenantDataService>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Detector for UnusedLicensesDetector {
    fn category(&self) -> Category {
        Category::new("unused_licenses").expect("valid category")
    }

    async fn detect(&self) -> Result<Vec<Finding>, ApplicationError> {
        let licenses = self.data.licenses().await?;

        let mut findings = Vec::new();
        for sku in licenses {
            let unassigned = sku.unassigned_units();
            if unassigned == 0 {
                continue;
            }

            findings.push(Finding::new(
                FindingId::new(format!("unused_license:{}", sku.sku_part_number))?,
                "unused_license",
                Severity::Low,
                format!("{} unassigned {} seats", unassigned, sku.sku_part_number),
                format!(
                    "{} of {} purchased {} seats are not assigned to any user.",
                    unassigned, sku.prepaid_units, sku.sku_part_number
                ),
                vec![
                    AffectedResource::new(&sku.sku_id, &sku.sku_part_number).with_details(format!(
                        "{}/{} seats assigned",
                        sku.consumed_units, sku.prepaid_units
                    )),
                ],
                "Assign the spare seats or reduce the subscription count",
                true,
            )?);
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::tenant::test_support::{StaticDirectoryApi, licenses_payload};

    #[tokio::test]
    async fn reports_one_finding_per_sku_with_spare_seats() {
        let api = Arc::new(StaticDirectoryApi::new([(
            "/licenses".to_string(),
            licenses_payload(),
        )]));
        let (_dir, cache) = crate::infrastructure::tenant::test_support::open_test_cache();
        let data = Arc::new(TenantDataService::new(Arc::new(cache), api));
        let detector = UnusedLicensesDetector::new(data);

        let findings = detector.detect().await.unwrap();
        // ENTERPRISEPACK has 40 spare seats; FLOW_FREE is fully assigned
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id.as_str(), "unused_license:ENTERPRISEPACK");
        assert!(findings[0].automatable);
    }
}
