//! Jellyfin server check.

use super::Check;
use crate::services::jellyfin::{JellyfinClient, JellyfinConfig};

/// The server answers its public info endpoint.
pub async fn check(server: &str) -> Check {
    let client = JellyfinClient::new(JellyfinConfig::new(server, "preflight"));
    match client.public_info().await {
        Ok(info) => Check::Passed(format!(
            "{} {}",
            info.server_name.as_deref().unwrap_or("Jellyfin"),
            info.version.as_deref().unwrap_or("unknown")
        )),
        Err(e) => Check::Failed {
            reason: format!("{} is not reachable ({})", server, e),
            hint: "Check the server URL and your network connection",
        },
    }
}
