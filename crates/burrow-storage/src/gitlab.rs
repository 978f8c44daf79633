use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::{Commit, CommitAction, ObjectStore, Result, StorageError, StoreTarget};

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// [`ObjectStore`] backed by the GitLab repository files and commits API.
#[derive(Debug, Clone)]
pub struct GitLabStore {
    client: Client,
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    branch: &'a str,
    commit_message: &'a str,
    actions: &'a [CommitAction],
}

impl GitLabStore {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("burrow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn project_url(target: &StoreTarget) -> String {
        format!(
            "{}/projects/{}",
            target.store_url,
            urlencoding::encode(&target.project)
        )
    }

    fn raw_file_url(target: &StoreTarget, path: &str) -> String {
        format!(
            "{}/repository/files/{}/raw?ref={}",
            Self::project_url(target),
            urlencoding::encode(path),
            urlencoding::encode(&target.branch)
        )
    }

    fn commits_url(target: &StoreTarget) -> String {
        format!("{}/repository/commits", Self::project_url(target))
    }
}

#[async_trait]
impl ObjectStore for GitLabStore {
    #[instrument(skip(self, target), fields(project = %target.project))]
    async fn read_raw(&self, target: &StoreTarget, path: &str) -> Result<Bytes> {
        trace!("Reading raw file from GitLab");

        let response = self
            .client
            .get(Self::raw_file_url(target, path))
            .header(TOKEN_HEADER, &target.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "GitLab refused raw file read");
            return Err(StorageError::Status(status));
        }

        Ok(response.bytes().await?)
    }

    #[instrument(skip_all, fields(project = %target.project, actions = commit.actions.len()))]
    async fn commit(&self, target: &StoreTarget, commit: &Commit) -> Result<StatusCode> {
        let body = CommitRequest {
            branch: &target.branch,
            commit_message: &commit.message,
            actions: &commit.actions,
        };

        let response = self
            .client
            .post(Self::commits_url(target))
            .header(TOKEN_HEADER, &target.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, detail = %detail, "GitLab rejected commit");
            return Err(StorageError::Status(status));
        }

        debug!(status = %status, "Commit created");
        Ok(status)
    }
}
