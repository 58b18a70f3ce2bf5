//! Durable relation state.
//!
//! The client keeps the last master it saw in a [`RelationLinkState`].
//! Hosts that have their own stored-state facility serialize it there;
//! otherwise [`StateManager`] keeps it in a JSON file so a restarted unit
//! does not re-announce a master it already reported.
//!
//! # Example
//!
//! ```rust,no_run
//! use pgsql_interface::state::{RelationLinkState, StateManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = StateManager::new("pgsql-state.json");
//!
//!     let state = manager.load().await?.unwrap_or_default();
//!     println!("Known master: {:?}", state.master.is_some());
//!
//!     manager.save(&RelationLinkState::with_master("host=10.0.0.5")).await?;
//!     Ok(())
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

/// Stored state for one relation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationLinkState {
    /// The most recent master connection string published by the peer
    #[serde(default)]
    pub master: Option<String>,
}

impl RelationLinkState {
    pub fn with_master(master: impl Into<String>) -> Self {
        Self {
            master: Some(master.into()),
        }
    }
}

/// Persists a [`RelationLinkState`] to disk.
///
/// Writes go through a temporary file and a rename, so a crash mid-write
/// leaves the previous state intact.
pub struct StateManager {
    file_path: PathBuf,
}

impl StateManager {
    pub fn new(state_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: state_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Loads state from disk if it exists.
    ///
    /// Returns `None` if the state file doesn't exist, which means the
    /// relation has never seen a master.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file exists but cannot be read or does not
    /// contain a valid state document.
    pub async fn load(&self) -> Result<Option<RelationLinkState>> {
        if !self.file_path.exists() {
            debug!("No state file found at {:?}", self.file_path);
            return Ok(None);
        }

        match fs::read_to_string(&self.file_path).await {
            Ok(content) => match serde_json::from_str::<RelationLinkState>(&content) {
                Ok(state) => {
                    info!(has_master = state.master.is_some(), "Loaded relation state");
                    Ok(Some(state))
                }
                Err(e) => {
                    error!("Failed to parse state file: {}", e);
                    Err(Error::Serialization(e))
                }
            },
            Err(e) => {
                error!("Failed to read state file: {}", e);
                Err(Error::Io(e))
            }
        }
    }

    /// Saves state to disk atomically (temp file, fsync, rename).
    pub async fn save(&self, state: &RelationLinkState) -> Result<()> {
        debug!("Saving relation state to {:?}", self.file_path);

        let temp_path = self.file_path.with_extension("tmp");

        let json = serde_json::to_string_pretty(state)?;
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.file_path).await?;

        debug!("Relation state saved");
        Ok(())
    }

    /// Deletes the state file if it exists.
    pub async fn delete(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).await?;
            info!("Deleted state file");
        }
        Ok(())
    }
}
