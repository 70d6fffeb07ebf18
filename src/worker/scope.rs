//! Worker lifecycle state
//!
//! Tracks where one worker version is in its install → activate lifecycle,
//! plus the two platform signals the handlers emit: skip-waiting and
//! clients-claim.

use crate::error::{SwsyncError, SwsyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Lifecycle state of a worker version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }

    /// Check whether `next` may follow this state.
    ///
    /// Any state may restart with `Installing`, including the in-flight
    /// ones a killed process leaves behind.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (_, Installing)
                | (Installing, Installed | Redundant)
                | (Installed, Activating)
                | (Activating, Activated | Redundant)
                | (Activated, Redundant)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle record of the current worker version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeRecord {
    /// Identifies one install attempt
    pub id: Uuid,
    pub state: WorkerState,
    /// Promoted without waiting for old clients to close
    pub skip_waiting: bool,
    /// Open clients are controlled by this version
    pub clients_claimed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopeRecord {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: WorkerState::Parsed,
            skip_waiting: false,
            clients_claimed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, validating the transition.
    ///
    /// Entering `Installing` starts a new worker version: fresh id, cleared flags.
    pub fn apply(&mut self, next: WorkerState) -> SwsyncResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SwsyncError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        if next == WorkerState::Installing {
            *self = Self::new();
        }
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for ScopeRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// The platform side of a worker: lifecycle state and client control
#[async_trait]
pub trait WorkerScope: Send + Sync {
    /// Current lifecycle state
    async fn state(&self) -> WorkerState;

    /// Snapshot of the full record
    async fn record(&self) -> ScopeRecord;

    /// Move to a new lifecycle state
    async fn transition(&self, next: WorkerState) -> SwsyncResult<()>;

    /// Promote a waiting worker without waiting for old clients to close
    async fn skip_waiting(&self) -> SwsyncResult<()>;

    /// Take control of every open client
    async fn claim_clients(&self) -> SwsyncResult<()>;
}

/// Scope held only in memory
#[derive(Default)]
pub struct LocalScope {
    record: Mutex<ScopeRecord>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkerScope for LocalScope {
    async fn state(&self) -> WorkerState {
        self.record.lock().await.state
    }

    async fn record(&self) -> ScopeRecord {
        self.record.lock().await.clone()
    }

    async fn transition(&self, next: WorkerState) -> SwsyncResult<()> {
        self.record.lock().await.apply(next)
    }

    async fn skip_waiting(&self) -> SwsyncResult<()> {
        self.record.lock().await.skip_waiting = true;
        Ok(())
    }

    async fn claim_clients(&self) -> SwsyncResult<()> {
        self.record.lock().await.clients_claimed = true;
        Ok(())
    }
}

/// Scope saved to a JSON file after every change
pub struct PersistentScope {
    path: PathBuf,
    record: Mutex<ScopeRecord>,
}

impl PersistentScope {
    /// Load the record at `path`, starting fresh if it does not exist
    pub async fn load(path: impl Into<PathBuf>) -> SwsyncResult<Self> {
        let path = path.into();
        let record = match Self::read(&path).await? {
            Some(record) => record,
            None => {
                debug!("No worker record at {}, starting fresh", path.display());
                ScopeRecord::new()
            }
        };

        Ok(Self {
            path,
            record: Mutex::new(record),
        })
    }

    /// Read the record at `path` without taking ownership of it
    pub async fn read(path: &Path) -> SwsyncResult<Option<ScopeRecord>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| SwsyncError::io(format!("reading worker record {}", path.display()), e))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the record at `path`; returns whether one existed
    pub async fn remove(path: &Path) -> SwsyncResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SwsyncError::io(
                format!("removing worker record {}", path.display()),
                e,
            )),
        }
    }

    async fn save(&self, record: &ScopeRecord) -> SwsyncResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SwsyncError::io("creating state directory", e))?;
        }

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, content).await.map_err(|e| {
            SwsyncError::io(format!("writing worker record {}", self.path.display()), e)
        })
    }

    /// Apply `change` to the record and persist the result
    async fn update(
        &self,
        change: impl FnOnce(&mut ScopeRecord) -> SwsyncResult<()> + Send,
    ) -> SwsyncResult<()> {
        let mut record = self.record.lock().await;
        let mut next = record.clone();
        change(&mut next)?;
        next.updated_at = Utc::now();
        self.save(&next).await?;
        *record = next;
        Ok(())
    }
}

#[async_trait]
impl WorkerScope for PersistentScope {
    async fn state(&self) -> WorkerState {
        self.record.lock().await.state
    }

    async fn record(&self) -> ScopeRecord {
        self.record.lock().await.clone()
    }

    async fn transition(&self, next: WorkerState) -> SwsyncResult<()> {
        self.update(|record| record.apply(next)).await
    }

    async fn skip_waiting(&self) -> SwsyncResult<()> {
        self.update(|record| {
            record.skip_waiting = true;
            Ok(())
        })
        .await
    }

    async fn claim_clients(&self) -> SwsyncResult<()> {
        self.update(|record| {
            record.clients_claimed = true;
            Ok(())
        })
        .await
    }
}
