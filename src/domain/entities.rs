//! Domain entities representing core business concepts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::value_objects::{Category, FindingId, Severity};

/// A tenant resource affected by a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AffectedResource {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AffectedResource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A single configuration problem reported by a detector. Findings are
/// immutable once returned; the orchestrator derives persisted records from
/// them without mutating the original.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Finding {
    pub id: FindingId,
    pub kind: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub affected_resources: Vec<AffectedResource>,
    pub remediation_hint: String,
    pub automatable: bool,
}

impl Finding {
    /// Create a new finding with validation
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: FindingId,
        kind: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        affected_resources: Vec<AffectedResource>,
        remediation_hint: impl Into<String>,
        automatable: bool,
    ) -> Result<Self, DomainError> {
        let kind = kind.into().trim().to_string();
        let title = title.into().trim().to_string();
        let description = description.into().trim().to_string();

        if kind.is_empty() {
            return Err(DomainError::InvalidInput {
                field: "kind".to_string(),
                message: "Finding kind cannot be empty".to_string(),
            });
        }
        if title.is_empty() {
            return Err(DomainError::InvalidInput {
                field: "title".to_string(),
                message: "Finding title cannot be empty".to_string(),
            });
        }
        if description.is_empty() {
            return Err(DomainError::InvalidInput {
                field: "description".to_string(),
                message: "Finding description cannot be empty".to_string(),
            });
        }

        Ok(Finding {
            id,
            kind,
            severity,
            title,
            description,
            affected_resources,
            remediation_hint: remediation_hint.into(),
            automatable,
        })
    }
}

/// Canonical, persisted form of a finding: the finding fields plus the
/// orchestrator-assigned category and detection timestamp. Owned exclusively
/// by the orchestrator; detectors never write these directly.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DetectionRecord {
    pub id: FindingId,
    pub kind: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub affected_resources: Vec<AffectedResource>,
    pub remediation_hint: String,
    pub automatable: bool,
    pub category: Category,
    pub detected_at: DateTime<Utc>,
}

impl DetectionRecord {
    /// Derive a record from a finding, stamping category and detection time
    pub fn from_finding(finding: Finding, category: Category, detected_at: DateTime<Utc>) -> Self {
        Self {
            id: finding.id,
            kind: finding.kind,
            severity: finding.severity,
            title: finding.title,
            description: finding.description,
            affected_resources: finding.affected_resources,
            remediation_hint: finding.remediation_hint,
            automatable: finding.automatable,
            category,
            detected_at,
        }
    }
}

/// Per-category rollup of aggregated records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategorySummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub automatable: usize,
    pub latest_detected_at: Option<DateTime<Utc>>,
}

impl CategorySummary {
    /// Fold one record into the summary
    pub fn record(&mut self, record: &DetectionRecord) {
        self.total += 1;
        match record.severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
        if record.automatable {
            self.automatable += 1;
        }
        if self
            .latest_detected_at
            .is_none_or(|latest| record.detected_at > latest)
        {
            self.latest_detected_at = Some(record.detected_at);
        }
    }
}

/// Result of one full detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration: std::time::Duration,
    pub records: Vec<DetectionRecord>,
    /// Categories whose detectors failed and contributed no findings.
    pub failed_categories: Vec<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, severity: Severity) -> Finding {
        Finding::new(
            FindingId::new(id).unwrap(),
            "stale_account",
            severity,
            "Stale account",
            "Account has not signed in recently",
            vec![AffectedResource::new("u1", "alex@contoso.example")],
            "Disable or remove the account",
            false,
        )
        .unwrap()
    }

    #[test]
    fn finding_rejects_empty_title() {
        let result = Finding::new(
            FindingId::new("f1").unwrap(),
            "stale_account",
            Severity::Low,
            "  ",
            "description",
            vec![],
            "",
            false,
        );
        assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
    }

    #[test]
    fn record_derivation_preserves_finding_fields() {
        let category = Category::new("stale_accounts").unwrap();
        let detected_at = Utc::now();
        let record =
            DetectionRecord::from_finding(finding("f1", Severity::High), category.clone(), detected_at);

        assert_eq!(record.id.as_str(), "f1");
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.category, category);
        assert_eq!(record.detected_at, detected_at);
        assert_eq!(record.affected_resources.len(), 1);
    }

    #[test]
    fn summary_counts_by_severity_and_tracks_latest() {
        let category = Category::new("stale_accounts").unwrap();
        let earlier = Utc::now() - chrono::Duration::minutes(5);
        let later = Utc::now();

        let mut summary = CategorySummary::default();
        summary.record(&DetectionRecord::from_finding(
            finding("f1", Severity::High),
            category.clone(),
            later,
        ));
        summary.record(&DetectionRecord::from_finding(
            finding("f2", Severity::Low),
            category,
            earlier,
        ));

        assert_eq!(summary.total, 2);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.latest_detected_at, Some(later));
    }
}
