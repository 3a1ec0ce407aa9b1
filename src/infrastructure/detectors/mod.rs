//! Pluggable posture detectors

pub mod admin_sprawl;
pub mod registry;
pub mod stale_accounts;
pub mod traits;
pub mod unused_licenses;

pub use admin_sprawl::AdminSprawlDetector;
pub use registry::DetectorRegistry;
pub use stale_accounts::StaleAccountsDetector;
pub use traits::Detector;
pub use unused_licenses::UnusedLicensesDetector;
