//! Detector for oversized privileged role memberships

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::Detector;
use crate::application::errors::ApplicationError;
use crate::domain::{AffectedResource, Category, Finding, FindingId, Severity};
use crate::infrastructure::tenant::TenantDataService;

/// Flags privileged roles whose membership exceeds the configured ceiling.
pub struct AdminSprawlDetector {
    data: Arc<TenantDataService>,
    member_ceiling: usize,
}

impl AdminSprawlDetector {
    pub fn new(data: Arc<TenantDataService>, member_ceiling: usize) -> Self {
        Self {
            data,
            member_ceiling,
        }
    }
}

#[async_trait]
impl Detector for AdminSprawlDetector {
    fn category(&self) -> Category {
        Category::new("admin_sprawl").expect("valid category")
    }

    async fn detect(&self) -> Result<Vec<Finding>, ApplicationError> {
        let roles = self.data.directory_roles().await?;

        let mut findings = Vec::new();
        for role in roles.iter().filter(|role| role.is_privileged) {
            if role.members.len() <= self.member_ceiling {
                continue;
            }

            let members: Vec<AffectedResource> = role
                .members
                .iter()
                .map(|member| AffectedResource::new(&member.id, &member.display_name))
                .collect();

            findings.push(Finding::new(
                FindingId::new(format!("admin_sprawl:{}", role.id))?,
                "admin_sprawl",
                Severity::High,
                format!(
                    "{} has {} members (ceiling {})",
                    role.display_name,
                    role.members.len(),
                    self.member_ceiling
                ),
                format!(
                    "The privileged role {} is assigned to {} accounts. Every extra \
                     holder is an extra credential that can compromise the tenant.",
                    role.display_name,
                    role.members.len()
                ),
                members,
                "Remove members that do not need standing privileged access",
                false,
            )?);
        }

        Ok(findings)
    }
}
