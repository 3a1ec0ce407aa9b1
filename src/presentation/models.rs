//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{CategorySummary, DetectionRecord};
use crate::infrastructure::cache::CacheStats;
use crate::infrastructure::tenant::{LicenseSku, OrganizationProfile};

/// DTO for a tenant resource affected by a finding
#[derive(Serialize, ToSchema)]
pub struct AffectedResourceDto {
    /// Directory object id of the resource
    #[schema(example = "8f7a2c9e-41d2-4b7a-9f1c-2f6d1a0b3c4d")]
    pub id: String,

    /// Human-readable resource name
    #[schema(example = "alex@contoso.example")]
    pub name: String,

    /// Optional extra context for the resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// DTO for an aggregated detection record
#[derive(Serialize, ToSchema)]
pub struct DetectionRecordDto {
    /// Stable finding identifier, unique across runs
    #[schema(example = "admin_sprawl:r1")]
    pub id: String,

    /// Machine-readable kind of the finding
    #[schema(example = "admin_sprawl")]
    pub kind: String,

    /// Severity level of the finding
    #[schema(example = "high")]
    pub severity: String,

    /// Short finding title
    #[schema(example = "Global Administrator has 8 members (ceiling 5)")]
    pub title: String,

    /// Detailed finding description
    pub description: String,

    /// Resources affected by this finding
    pub affected_resources: Vec<AffectedResourceDto>,

    /// Suggested remediation
    pub remediation_hint: String,

    /// Whether the remediation can be applied automatically
    pub automatable: bool,

    /// Detector category that produced the finding
    #[schema(example = "admin_sprawl")]
    pub category: String,

    /// When the finding was detected
    pub detected_at: DateTime<Utc>,
}

impl From<DetectionRecord> for DetectionRecordDto {
    fn from(record: DetectionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            kind: record.kind,
            severity: record.severity.to_string(),
            title: record.title,
            description: record.description,
            affected_resources: record
                .affected_resources
                .into_iter()
                .map(|resource| AffectedResourceDto {
                    id: resource.id,
                    name: resource.name,
                    details: resource.details,
                })
                .collect(),
            remediation_hint: record.remediation_hint,
            automatable: record.automatable,
            category: record.category.to_string(),
            detected_at: record.detected_at,
        }
    }
}

/// Response model for a completed detection run
#[derive(Serialize, ToSchema)]
pub struct DetectionRunResponse {
    /// Unique run identifier
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub run_id: Uuid,

    /// When the run was dispatched
    pub started_at: DateTime<Utc>,

    /// Total wall-clock duration of the run
    pub duration_ms: u64,

    /// Number of aggregated records produced
    pub total: usize,

    /// Categories whose detectors failed and contributed no findings
    pub failed_categories: Vec<String>,

    /// The aggregated records, ranked by severity then recency
    pub records: Vec<DetectionRecordDto>,
}

/// Response model for record listings
#[derive(Serialize, ToSchema)]
pub struct DetectionListResponse {
    pub total: usize,
    pub records: Vec<DetectionRecordDto>,
}

/// Per-category rollup entry
#[derive(Serialize, ToSchema)]
pub struct CategorySummaryDto {
    #[schema(example = "stale_accounts")]
    pub category: String,
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub automatable: usize,
    pub latest_detected_at: Option<DateTime<Utc>>,
}

impl CategorySummaryDto {
    pub fn new(category: String, summary: &CategorySummary) -> Self {
        Self {
            category,
            total: summary.total,
            critical: summary.critical,
            high: summary.high,
            medium: summary.medium,
            low: summary.low,
            automatable: summary.automatable,
            latest_detected_at: summary.latest_detected_at,
        }
    }
}

/// Response model for the per-category summary
#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    pub categories: Vec<CategorySummaryDto>,
}

/// Cache statistics response
#[derive(Serialize, ToSchema)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    /// Hit rate over all reads, 0.0 when nothing has been read yet
    pub hit_rate: f64,
    pub background_refreshes: u64,
    pub refresh_failures: u64,
    pub dropped_refreshes: u64,
    pub swept_entries: u64,
    pub sweep_runs: u64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        let reads = stats.hits + stats.misses;
        Self {
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: if reads > 0 {
                stats.hits as f64 / reads as f64
            } else {
                0.0
            },
            background_refreshes: stats.background_refreshes,
            refresh_failures: stats.refresh_failures,
            dropped_refreshes: stats.dropped_refreshes,
            swept_entries: stats.swept_entries,
            sweep_runs: stats.sweep_runs,
        }
    }
}

/// Cache invalidation request. Omit both fields to clear everything; an
/// entry type alone clears that type; entry type plus key clears one entry.
#[derive(Deserialize, ToSchema)]
pub struct CacheInvalidationRequest {
    #[schema(example = "licenses")]
    pub entry_type: Option<String>,
    #[schema(example = "all")]
    pub key: Option<String>,
}

/// Cache invalidation response
#[derive(Serialize, ToSchema)]
pub struct CacheInvalidationResponse {
    pub message: String,
    pub entries_invalidated: u64,
}

/// Tenant organization DTO
#[derive(Serialize, ToSchema)]
pub struct OrganizationDto {
    pub id: String,
    #[schema(example = "Contoso")]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_letter_code: Option<String>,
}

impl From<OrganizationProfile> for OrganizationDto {
    fn from(profile: OrganizationProfile) -> Self {
        Self {
            id: profile.id,
            display_name: profile.display_name,
            country_letter_code: profile.country_letter_code,
        }
    }
}

/// License usage DTO
#[derive(Serialize, ToSchema)]
pub struct LicenseUsageDto {
    #[schema(example = "ENTERPRISEPACK")]
    pub sku_part_number: String,
    pub consumed_units: u32,
    pub prepaid_units: u32,
    pub unassigned_units: u32,
}

impl From<LicenseSku> for LicenseUsageDto {
    fn from(sku: LicenseSku) -> Self {
        let unassigned_units = sku.unassigned_units();
        Self {
            sku_part_number: sku.sku_part_number,
            consumed_units: sku.consumed_units,
            prepaid_units: sku.prepaid_units,
            unassigned_units,
        }
    }
}

/// Snapshot of what the tenant looks like right now
#[derive(Serialize, ToSchema)]
pub struct TenantOverviewResponse {
    pub organization: OrganizationDto,
    pub total_users: usize,
    pub enabled_users: usize,
    pub licenses: Vec<LicenseUsageDto>,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    #[schema(example = "directory_error")]
    pub error_type: String,
    pub status: u16,
}
