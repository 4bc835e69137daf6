//! Saved server sessions.
//!
//! Access tokens are stored per server URL in `session.toml` next to the
//! configuration, together with a device id generated once per install.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Session store file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStore {
    /// Device id sent in the authorization header.
    pub device_id: Option<String>,
    /// Sessions keyed by server URL.
    pub servers: BTreeMap<String, ServerSession>,
}

/// Authenticated session on one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSession {
    pub user_id: String,
    pub access_token: String,
}

impl SessionStore {
    /// Default location of the session file.
    pub fn default_path() -> PathBuf {
        super::config::config_dir().join("session.toml")
    }

    /// Load the store, falling back to an empty one.
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!("Session saved to {:?}", path);
        Ok(())
    }

    /// Device id, generated on first use.
    pub fn device_id(&mut self) -> String {
        self.device_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().simple().to_string())
            .clone()
    }

    pub fn get(&self, server: &str) -> Option<&ServerSession> {
        self.servers.get(normalize_server(server))
    }

    pub fn set(&mut self, server: &str, session: ServerSession) {
        self.servers
            .insert(normalize_server(server).to_string(), session);
    }

    pub fn remove(&mut self, server: &str) -> Option<ServerSession> {
        self.servers.remove(normalize_server(server))
    }
}

fn normalize_server(server: &str) -> &str {
    server.trim_end_matches('/')
}
