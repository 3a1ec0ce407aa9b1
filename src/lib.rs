//! Postura - a tenant configuration posture analysis API
//!
//! This crate polls a remote directory/identity API through a retrying HTTP
//! client, keeps tenant state in a durable stale-while-revalidate cache, and
//! fans out independent detector checks whose findings are aggregated,
//! persisted, and served over a small HTTP read API.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod presentation;

pub use config::Config;
pub use logging::init_tracing;
