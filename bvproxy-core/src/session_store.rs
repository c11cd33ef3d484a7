//! Local session token store
//!
//! A small JSON file (`{"SESSDATA": "..."}`) an operator can drop next to the
//! binary to make video requests as a logged-in user. It is re-read on every
//! call so the token can be rotated without a restart.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SessionFile {
    #[serde(rename = "SESSDATA")]
    sessdata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current token. A missing, unreadable or malformed file, or an
    /// empty token, all mean "no token".
    #[must_use]
    pub async fn load_token(&self) -> Option<String> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No session file at {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<SessionFile>(&raw) {
            Ok(file) => file.sessdata.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Ignoring malformed session file {}: {}", self.path.display(), e);
                None
            }
        }
    }
}
