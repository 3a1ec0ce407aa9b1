//! Application services for orchestrating detection runs

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::errors::ApplicationError;
use crate::domain::{
    Category, CategorySummary, DetectionRecord, DetectionRunReport, RunPhase, rank_records,
    summarize_by_category,
};
use crate::infrastructure::detectors::DetectorRegistry;
use crate::infrastructure::storage::TableStore;

/// Storage table holding aggregated detection records
pub const DETECTIONS_TABLE: &str = "detections";

/// Service for running detectors and reading aggregated findings
#[async_trait]
pub trait DetectionService: Send + Sync {
    /// Run every registered detector concurrently and persist the aggregate.
    /// A failing detector contributes zero findings; it never aborts the run.
    async fn run_all(&self) -> Result<DetectionRunReport, ApplicationError>;

    /// All aggregated records, ranked by severity then recency. Served from a
    /// short-lived in-memory snapshot unless it has expired or `force_refresh`
    /// is set.
    async fn get_all(&self, force_refresh: bool) -> Result<Vec<DetectionRecord>, ApplicationError>;

    /// Records produced by a single detector category
    async fn get_by_category(
        &self,
        category: &Category,
    ) -> Result<Vec<DetectionRecord>, ApplicationError>;

    /// Per-category rollup, computed from the already-loaded record list
    async fn get_summary(&self) -> Result<HashMap<Category, CategorySummary>, ApplicationError>;

    /// Current phase of the run state machine
    async fn run_phase(&self) -> RunPhase;
}

struct ListSnapshot {
    loaded_at: Instant,
    records: Vec<DetectionRecord>,
}

/// Orchestrator over the detector registry and the record store
pub struct DetectionServiceImpl {
    registry: Arc<DetectorRegistry>,
    store: Arc<dyn TableStore>,
    snapshot_ttl: Duration,
    snapshot: RwLock<Option<ListSnapshot>>,
    phase: RwLock<RunPhase>,
}

impl DetectionServiceImpl {
    pub fn new(
        registry: Arc<DetectorRegistry>,
        store: Arc<dyn TableStore>,
        snapshot_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            snapshot_ttl,
            snapshot: RwLock::new(None),
            phase: RwLock::new(RunPhase::Idle),
        }
    }

    async fn set_phase(&self, phase: RunPhase) {
        *self.phase.write().await = phase;
    }

    /// Persist one record; persistence failures are logged and absorbed so an
    /// already-computed aggregate is still returned to the caller.
    async fn persist_record(&self, record: &DetectionRecord) {
        match serde_json::to_value(record) {
            Ok(row) => {
                if let Err(e) = self
                    .store
                    .upsert(DETECTIONS_TABLE, record.id.as_str(), row)
                    .await
                {
                    warn!("Failed to persist detection record {}: {}", record.id, e);
                }
            }
            Err(e) => warn!("Failed to serialize detection record {}: {}", record.id, e),
        }
    }
}

#[async_trait]
impl DetectionService for DetectionServiceImpl {
    async fn run_all(&self) -> Result<DetectionRunReport, ApplicationError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let detectors = self.registry.detectors();
        info!(
            run_id = %run_id,
            detectors = detectors.len(),
            "Starting detection run"
        );
        self.set_phase(RunPhase::Running).await;

        let mut join_set = JoinSet::new();
        for detector in detectors {
            let category = detector.category();
            join_set.spawn(async move {
                // The inner spawn isolates panics so a crashing detector is
                // reported like any other detector failure
                let outcome = match tokio::spawn(async move { detector.detect().await }).await {
                    Ok(result) => result,
                    Err(join_error) => Err(ApplicationError::Detector {
                        message: join_error.to_string(),
                    }),
                };
                (category, outcome)
            });
        }

        let mut collected: Vec<(Category, Vec<crate::domain::Finding>)> = Vec::new();
        let mut failed_categories = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((category, Ok(findings))) => {
                    debug!(
                        category = %category,
                        findings = findings.len(),
                        "Detector completed"
                    );
                    collected.push((category, findings));
                }
                Ok((category, Err(e))) => {
                    error!(
                        category = %category,
                        error = %e,
                        "Detector failed, contributing no findings"
                    );
                    failed_categories.push(category);
                }
                Err(e) => {
                    error!(error = %e, "Detector task failed to join");
                }
            }
        }

        self.set_phase(RunPhase::Aggregating).await;
        let detected_at = Utc::now();
        let mut records = Vec::new();
        for (category, findings) in collected {
            for finding in findings {
                records.push(DetectionRecord::from_finding(
                    finding,
                    category.clone(),
                    detected_at,
                ));
            }
        }

        for record in &records {
            self.persist_record(record).await;
        }
        self.set_phase(RunPhase::Persisted).await;

        // The snapshot is invalidated unconditionally; the next read
        // repopulates it lazily from storage
        *self.snapshot.write().await = None;
        self.set_phase(RunPhase::Idle).await;

        rank_records(&mut records);
        info!(
            run_id = %run_id,
            records = records.len(),
            failed = failed_categories.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Detection run completed"
        );

        Ok(DetectionRunReport {
            run_id,
            started_at,
            duration: start.elapsed(),
            records,
            failed_categories,
        })
    }

    async fn get_all(&self, force_refresh: bool) -> Result<Vec<DetectionRecord>, ApplicationError> {
        if !force_refresh {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.loaded_at.elapsed() < self.snapshot_ttl {
                    debug!("Serving detection records from snapshot");
                    return Ok(snapshot.records.clone());
                }
            }
        }

        let rows = self.store.list(DETECTIONS_TABLE).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<DetectionRecord>(row) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping undecodable detection record: {}", e),
            }
        }
        rank_records(&mut records);

        *self.snapshot.write().await = Some(ListSnapshot {
            loaded_at: Instant::now(),
            records: records.clone(),
        });

        Ok(records)
    }

    async fn get_by_category(
        &self,
        category: &Category,
    ) -> Result<Vec<DetectionRecord>, ApplicationError> {
        let records = self.get_all(false).await?;
        Ok(records
            .into_iter()
            .filter(|record| &record.category == category)
            .collect())
    }

    async fn get_summary(&self) -> Result<HashMap<Category, CategorySummary>, ApplicationError> {
        let records = self.get_all(false).await?;
        Ok(summarize_by_category(&records))
    }

    async fn run_phase(&self) -> RunPhase {
        *self.phase.read().await
    }
}
