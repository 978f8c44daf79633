use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use dashmap::DashMap;
use http::StatusCode;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::trace;

use crate::{Commit, Encoding, ObjectStore, Result, StorageError, StoreTarget};

/// In-memory [`ObjectStore`] for tests and local development.
///
/// Files are keyed by project, branch and path. Commits are atomic: either
/// every action applies or none does. Creating a path that already exists
/// fails with `400 Bad Request`, as GitLab does.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    files: DashMap<String, Bytes>,
    commits: Mutex<Vec<Commit>>,
    reads: AtomicUsize,
    forced_failure: AtomicU16,
}

fn file_key(target: &StoreTarget, path: &str) -> String {
    format!("{}@{}:{}", target.project, target.branch, path)
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file without going through a commit.
    pub fn insert(&self, target: &StoreTarget, path: &str, content: impl Into<Bytes>) {
        self.files.insert(file_key(target, path), content.into());
    }

    /// Content stored at `path`, if any.
    pub fn file(&self, target: &StoreTarget, path: &str) -> Option<Bytes> {
        self.files
            .get(&file_key(target, path))
            .map(|entry| entry.value().clone())
    }

    /// Number of [`read_raw`](ObjectStore::read_raw) calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Commits applied so far, oldest first.
    pub async fn commits(&self) -> Vec<Commit> {
        self.commits.lock().await.clone()
    }

    /// Makes every following operation fail with `status`, or succeed again
    /// with `None`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        let code = status.map(|s| s.as_u16()).unwrap_or(0);
        self.forced_failure.store(code, Ordering::SeqCst);
    }

    fn check_forced_failure(&self) -> Result<()> {
        match self.forced_failure.load(Ordering::SeqCst) {
            0 => Ok(()),
            code => Err(StorageError::Status(
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            )),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn read_raw(&self, target: &StoreTarget, path: &str) -> Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_forced_failure()?;
        trace!(path, "Reading file from memory store");

        self.file(target, path)
            .ok_or(StorageError::Status(StatusCode::NOT_FOUND))
    }

    async fn commit(&self, target: &StoreTarget, commit: &Commit) -> Result<StatusCode> {
        self.check_forced_failure()?;

        // Hold the log lock for the whole commit so concurrent commits apply
        // one at a time.
        let mut log = self.commits.lock().await;

        let mut staged = Vec::with_capacity(commit.actions.len());
        for action in &commit.actions {
            let key = file_key(target, &action.file_path);
            if self.files.contains_key(&key) || staged.iter().any(|(k, _)| k == &key) {
                return Err(StorageError::Status(StatusCode::BAD_REQUEST));
            }
            let content = match action.encoding {
                Some(Encoding::Base64) => STANDARD
                    .decode(&action.content)
                    .map(Bytes::from)
                    .map_err(|_| StorageError::Status(StatusCode::BAD_REQUEST))?,
                None => Bytes::from(action.content.clone()),
            };
            staged.push((key, content));
        }

        for (key, content) in staged {
            self.files.insert(key, content);
        }
        log.push(commit.clone());

        Ok(StatusCode::CREATED)
    }
}
