//! HTTP controllers

pub mod cache;
pub mod detections;
pub mod health;
pub mod tenant;

pub use detections::AppState;
