//! swsync - offline cache synchronizer for statically-built web apps
//!
//! Keeps a versioned, partitioned response cache consistent with the
//! resource manifest of each deployment: stages the application shell on
//! install, evicts stale entries on activation, and serves manifest
//! resources cache-first while passing everything else through.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod journal;
pub mod manifest;
pub mod network;
pub mod storage;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{SwsyncError, SwsyncResult};
