//! Write path: turns uploaded payloads into one atomic object-store commit.

use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD, Engine};
use burrow_core::path::{served_path, served_path_with_filename, storage_path};
use burrow_core::{EndpointMode, Identifier, IdentifierCodec, Settings};
use burrow_storage::{Commit, CommitAction, StoreTarget};
use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{GatewayError, Result};
use crate::request::RequestContext;
use crate::state::AppState;

/// Payload of one upload entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadContent {
    /// A text form field, stored verbatim.
    Text(String),
    /// A file part or raw request body.
    Binary(Bytes),
}

/// One entry of a batch upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub content: UploadContent,
    /// Name suggested by the client, used to pick the served extension.
    pub filename: Option<String>,
}

impl UploadItem {
    pub fn text(content: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            content: UploadContent::Text(content.into()),
            filename,
        }
    }

    pub fn binary(content: impl Into<Bytes>, filename: Option<String>) -> Self {
        Self {
            content: UploadContent::Binary(content.into()),
            filename,
        }
    }
}

/// Builds the create action of `id`, or `None` when the resulting content
/// would be empty.
pub fn build_action(id: &Identifier, content: &UploadContent, mode: EndpointMode) -> Option<CommitAction> {
    let path = storage_path(id);
    match content {
        UploadContent::Text(text) if text.is_empty() => None,
        UploadContent::Text(text) => Some(CommitAction::text(path, text.clone())),
        UploadContent::Binary(bytes) if bytes.is_empty() => None,
        UploadContent::Binary(bytes) => match mode {
            EndpointMode::Base64 => {
                let text = String::from_utf8_lossy(bytes);
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| CommitAction::base64(path, trimmed))
            }
            _ => Some(CommitAction::base64(path, STANDARD.encode(bytes))),
        },
    }
}

/// Stores every non-empty entry under a fresh identifier in one commit and
/// answers with their served URLs, newline-separated, in submission order.
pub async fn handle_batch(
    state: &AppState,
    ctx: &RequestContext,
    settings: &Settings,
    mode: EndpointMode,
    items: Vec<UploadItem>,
) -> Result<Response> {
    let codec = IdentifierCodec::new(settings)?;

    let mut actions = Vec::with_capacity(items.len());
    let mut urls = Vec::with_capacity(items.len());
    for item in items {
        let id = codec.generate()?;
        let Some(action) = build_action(&id, &item.content, mode) else {
            debug!(filename = ?item.filename, "skipping empty upload entry");
            continue;
        };
        actions.push(action);
        urls.push(ctx.absolute_url(&served_path(&id, item.filename.as_deref())));
    }

    if actions.is_empty() {
        return Err(GatewayError::EmptyPayload);
    }

    let commit = Commit::new(format!("Created by {}", ctx.client_ip), actions);
    let status = state
        .store
        .commit(&StoreTarget::from(settings), &commit)
        .await?;

    info!(count = urls.len(), client_ip = %ctx.client_ip, "stored batch upload");
    Ok((status, urls.join("\n")).into_response())
}

/// Stores a single raw body. A client-chosen filename is appended to the
/// returned URL but does not affect where the object is stored.
pub async fn handle_single(
    state: &AppState,
    ctx: &RequestContext,
    settings: &Settings,
    mode: EndpointMode,
    body: Bytes,
    filename: Option<String>,
) -> Result<Response> {
    let codec = IdentifierCodec::new(settings)?;
    let id = codec.generate()?;

    let action = build_action(&id, &UploadContent::Binary(body), mode)
        .ok_or(GatewayError::EmptyPayload)?;

    let commit = Commit::new(format!("Uploaded by {}", ctx.client_ip), vec![action]);
    let status = state
        .store
        .commit(&StoreTarget::from(settings), &commit)
        .await?;

    let path = match filename.as_deref() {
        Some(name) => served_path_with_filename(&id, name),
        None => served_path(&id, None),
    };

    info!(id = %id, client_ip = %ctx.client_ip, "stored single upload");
    Ok((status, ctx.absolute_url(&path)).into_response())
}
