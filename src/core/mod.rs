//! Core planning and download engine.

pub mod cache;
pub mod executor;
pub mod planner;
pub mod progress;
pub mod reconciler;
