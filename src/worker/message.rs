//! Page-to-worker control messages

use super::ServiceWorker;
use crate::error::SwsyncResult;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Commands a page can send to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Promote a waiting worker immediately
    SkipWaiting,
    /// Fetch every resource missing from the content cache
    DownloadOffline,
}

impl ControlMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipWaiting => "skipWaiting",
            Self::DownloadOffline => "downloadOffline",
        }
    }

    /// Parse a message payload; anything unknown is `None`
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "skipWaiting" => Some(Self::SkipWaiting),
            "downloadOffline" => Some(Self::DownloadOffline),
            _ => None,
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a message did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "count")]
pub enum MessageOutcome {
    Ignored,
    SkippedWaiting,
    /// Number of resources fetched
    Hydrated(usize),
}

impl ServiceWorker {
    /// Handle a message from a page; unknown messages are ignored
    pub async fn handle_message(&self, data: &str) -> SwsyncResult<MessageOutcome> {
        match ControlMessage::parse(data) {
            Some(ControlMessage::SkipWaiting) => {
                self.ctx.scope.skip_waiting().await?;
                info!("Worker will skip waiting");
                Ok(MessageOutcome::SkippedWaiting)
            }
            Some(ControlMessage::DownloadOffline) => {
                let added = self.download_offline().await?;
                Ok(MessageOutcome::Hydrated(added))
            }
            None => {
                debug!("Ignoring message {:?}", data);
                Ok(MessageOutcome::Ignored)
            }
        }
    }
}
