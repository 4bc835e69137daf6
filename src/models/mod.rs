//! Data models.

pub mod config;
pub mod item;
pub mod session;
pub mod task;
