//! Traits for posture detectors

use async_trait::async_trait;

use crate::application::errors::ApplicationError;
use crate::domain::{Category, Finding};

/// An independent, pluggable posture check. Returning an empty vec is a
/// successful "nothing wrong here"; `Err` is reserved for unrecoverable
/// detector failure and is isolated by the orchestrator.
///
/// Finding ids must be stable across runs so aggregated records upsert
/// instead of duplicating.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Category stamped onto every record this detector produces
    fn category(&self) -> Category;

    /// Inspect tenant state and report zero or more findings
    async fn detect(&self) -> Result<Vec<Finding>, ApplicationError>;
}
