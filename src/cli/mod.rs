//! Command line interface.

pub mod args;
pub mod commands;
pub mod progress;
pub mod prompt;
