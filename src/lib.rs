//! Jellyfetch Library
//!
//! Plans and downloads media libraries (movies, series, seasons, episodes and
//! collections) from a Jellyfin server into a local folder layout with NFO
//! sidecars, artwork and external subtitles.

pub mod cli;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod preflight;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
