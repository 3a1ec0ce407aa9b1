//! Detector registry keyed by category

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::Detector;
use crate::domain::Category;

/// Holds the set of registered detectors. Registration happens at wiring
/// time; the orchestrator takes the registry behind an `Arc` afterwards.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: HashMap<Category, Arc<dyn Detector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detector under its category. Re-registering a category
    /// replaces the previous detector and logs a warning.
    pub fn add(&mut self, detector: Arc<dyn Detector>) {
        let category = detector.category();
        if self.detectors.insert(category.clone(), detector).is_some() {
            warn!("Replaced previously registered detector for category {}", category);
        } else {
            debug!("Registered detector for category {}", category);
        }
    }

    /// All registered detectors, in no particular order
    pub fn detectors(&self) -> Vec<Arc<dyn Detector>> {
        self.detectors.values().cloned().collect()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.detectors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}
