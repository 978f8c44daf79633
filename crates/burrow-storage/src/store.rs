use async_trait::async_trait;
use burrow_core::Settings;
use bytes::Bytes;
use http::StatusCode;
use std::fmt;

use crate::{Commit, Result};

/// Repository coordinates and credential of one request.
///
/// Coordinates come from the effective per-host configuration, so the same
/// store client serves many repositories.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreTarget {
    pub store_url: String,
    pub project: String,
    pub branch: String,
    pub token: String,
}

impl From<&Settings> for StoreTarget {
    fn from(settings: &Settings) -> Self {
        Self {
            store_url: settings.store_url.trim_end_matches('/').to_string(),
            project: settings.project.as_str().to_string(),
            branch: settings.branch.clone(),
            token: settings.token.clone(),
        }
    }
}

impl fmt::Debug for StoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreTarget")
            .field("store_url", &self.store_url)
            .field("project", &self.project)
            .field("branch", &self.branch)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A version-controlled blob repository.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Reads the raw bytes stored at `path`.
    ///
    /// A non-success answer from the store is returned as
    /// [`StorageError::Status`](crate::StorageError::Status).
    async fn read_raw(&self, target: &StoreTarget, path: &str) -> Result<Bytes>;

    /// Applies every action of `commit` atomically and returns the store's
    /// success status.
    async fn commit(&self, target: &StoreTarget, commit: &Commit) -> Result<StatusCode>;
}
