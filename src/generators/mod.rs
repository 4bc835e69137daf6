//! Name and sidecar generators.

pub mod naming;
pub mod nfo;
