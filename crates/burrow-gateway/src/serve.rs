//! Read path: cache lookup, object-store fetch on miss and detached cache
//! population.

use axum::body::Body;
use axum::response::Response;
use burrow_cache::{CacheKey, CachedResponse};
use burrow_core::path::{content_headers, storage_path, ContentHeaders};
use burrow_core::{IdentifierCodec, Settings};
use burrow_storage::StoreTarget;
use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH,
    CONTENT_SECURITY_POLICY, CONTENT_TYPE, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use http::{HeaderName, HeaderValue, StatusCode};
use tracing::{debug, trace, warn};

use crate::error::{GatewayError, Result};
use crate::request::RequestContext;
use crate::state::AppState;

pub const CACHE_CONTROL_VALUE: &str = "public, max-age=31536000";
pub const CONTENT_SECURITY_POLICY_VALUE: &str =
    "default-src 'none'; img-src 'self'; style-src 'self'; script-src 'none'";

/// Serves `GET`/`HEAD` for an identifier path.
pub async fn serve(
    state: &AppState,
    ctx: &RequestContext,
    settings: &Settings,
    head_only: bool,
) -> Result<Response> {
    let codec = IdentifierCodec::new(settings)?;
    let matched = codec
        .validate(&ctx.path)
        .ok_or(GatewayError::InvalidIdentifier)?;
    let suffix = matched.suffix.as_ref();
    let content = content_headers(suffix);

    let key = cache_key(ctx, settings, &format!("/{}", matched.identifier));

    match state.cache.get(&key).await {
        Ok(Some(hit)) => {
            debug!(key = %key, status = hit.status, "serving from cache");
            return Ok(into_response(replay(hit, &content), head_only));
        }
        Ok(None) => trace!(key = %key, "cache miss"),
        Err(e) => warn!(key = %key, error = %e, "cache lookup failed, treating as miss"),
    }

    let target = StoreTarget::from(settings);
    let entry = match state
        .store
        .read_raw(&target, &storage_path(&matched.identifier))
        .await
    {
        Ok(body) => fresh(StatusCode::OK, Some(&content), body, ctx),
        Err(e) => match e.upstream_status() {
            Some(status) => {
                debug!(
                    id = %matched.identifier,
                    status = %status,
                    "store has no object, caching not found"
                );
                fresh(StatusCode::NOT_FOUND, None, Bytes::new(), ctx)
            }
            // No answer from the store: nothing is cached.
            None => return Err(GatewayError::from(e)),
        },
    };

    populate(state, key, entry.clone());
    Ok(into_response(entry, head_only))
}

/// Key of the cache entry shared by every suffix of one identifier.
pub fn cache_key(ctx: &RequestContext, settings: &Settings, canonical_path: &str) -> CacheKey {
    let vary = settings
        .cache_key_headers
        .iter()
        .map(|name| (name.as_str(), ctx.header_or_empty(name)));
    CacheKey::new(&ctx.host, canonical_path, vary)
}

fn populate(state: &AppState, key: CacheKey, entry: CachedResponse) {
    let cache = state.cache.clone();
    state.tasks.spawn(async move {
        match cache.put(&key, &entry).await {
            Ok(()) => trace!(key = %key, "cache populated"),
            Err(e) => warn!(key = %key, error = %e, "failed to populate cache"),
        }
    });
}

/// A response built from an object-store read.
fn fresh(
    status: StatusCode,
    content: Option<&ContentHeaders>,
    body: Bytes,
    ctx: &RequestContext,
) -> CachedResponse {
    let mut headers = Vec::with_capacity(12);
    if let Some(content) = content {
        push_content_headers(&mut headers, content);
    }
    headers.push((CACHE_CONTROL.to_string(), CACHE_CONTROL_VALUE.to_string()));
    headers.extend(security_headers(ctx.origin.as_deref()));
    CachedResponse::new(status.as_u16(), headers, body)
}

/// Re-negotiates the content headers of a cached success for this request's
/// suffix. Cached failures are replayed untouched.
fn replay(mut hit: CachedResponse, content: &ContentHeaders) -> CachedResponse {
    if hit.is_success() {
        hit.headers.retain(|(name, _)| {
            !name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())
                && !name.eq_ignore_ascii_case(CONTENT_DISPOSITION.as_str())
        });
        let mut negotiated = Vec::with_capacity(2);
        push_content_headers(&mut negotiated, content);
        negotiated.append(&mut hit.headers);
        hit.headers = negotiated;
    }
    hit
}

fn push_content_headers(headers: &mut Vec<(String, String)>, content: &ContentHeaders) {
    headers.push((CONTENT_TYPE.to_string(), content.content_type.clone()));
    if let Some(disposition) = &content.disposition {
        headers.push((CONTENT_DISPOSITION.to_string(), disposition.clone()));
    }
}

/// Headers attached to every served object, found or not.
pub fn security_headers(origin: Option<&str>) -> Vec<(String, String)> {
    let mut headers = vec![
        (
            STRICT_TRANSPORT_SECURITY.to_string(),
            "max-age=31536000; includeSubDomains".to_string(),
        ),
        (
            CONTENT_SECURITY_POLICY.to_string(),
            CONTENT_SECURITY_POLICY_VALUE.to_string(),
        ),
        (REFERRER_POLICY.to_string(), "no-referrer".to_string()),
        (X_CONTENT_TYPE_OPTIONS.to_string(), "nosniff".to_string()),
        (X_FRAME_OPTIONS.to_string(), "DENY".to_string()),
        (X_XSS_PROTECTION.to_string(), "1; mode=block".to_string()),
    ];
    if let Some(origin) = origin {
        headers.push((ACCESS_CONTROL_ALLOW_ORIGIN.to_string(), origin.to_string()));
    }
    headers
}

fn into_response(entry: CachedResponse, head_only: bool) -> Response {
    let status = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_length = entry.body.len();
    let body = if head_only {
        Body::empty()
    } else {
        Body::from(entry.body)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if head_only {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    }
    for (name, value) in entry.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "dropping unrepresentable header"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::Suffix;

    fn content(suffix: Option<Suffix>) -> ContentHeaders {
        content_headers(suffix.as_ref())
    }

    fn stored(status: u16, headers: &[(&str, &str)]) -> CachedResponse {
        CachedResponse::new(
            status,
            headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            Bytes::from_static(b"body"),
        )
    }

    #[test]
    fn replay_overwrites_content_type_of_success() {
        let hit = stored(
            200,
            &[("content-type", "image/png"), ("cache-control", CACHE_CONTROL_VALUE)],
        );
        let replayed = replay(hit, &content(Some(Suffix::Extension("txt".into()))));

        assert_eq!(replayed.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(replayed.header("cache-control"), Some(CACHE_CONTROL_VALUE));
        assert_eq!(replayed.header("content-disposition"), None);
    }

    #[test]
    fn replay_strips_stored_disposition_for_extension() {
        let hit = stored(
            200,
            &[
                ("content-type", "application/octet-stream"),
                ("content-disposition", "attachment; filename=\"a.bin\""),
            ],
        );
        let replayed = replay(hit, &content(Some(Suffix::Extension("png".into()))));

        assert_eq!(replayed.header("content-type"), Some("image/png"));
        assert_eq!(replayed.header("content-disposition"), None);
    }

    #[test]
    fn replay_sets_disposition_for_filename() {
        let hit = stored(200, &[("content-type", "text/plain; charset=utf-8")]);
        let replayed = replay(hit, &content(Some(Suffix::FileName("report.pdf".into()))));

        assert_eq!(replayed.header("content-type"), Some("application/octet-stream"));
        assert_eq!(
            replayed.header("content-disposition"),
            Some("attachment; filename=\"report.pdf\"")
        );
    }

    #[test]
    fn replay_leaves_cached_not_found_untouched() {
        let hit = stored(404, &[("cache-control", CACHE_CONTROL_VALUE)]);
        let replayed = replay(hit.clone(), &content(Some(Suffix::Extension("png".into()))));
        assert_eq!(replayed, hit);
    }

    #[test]
    fn cors_header_only_with_origin() {
        let without = security_headers(None);
        assert!(!without
            .iter()
            .any(|(n, _)| n == ACCESS_CONTROL_ALLOW_ORIGIN.as_str()));

        let with = security_headers(Some("https://app.example"));
        assert!(with.contains(&(
            ACCESS_CONTROL_ALLOW_ORIGIN.to_string(),
            "https://app.example".to_string()
        )));
    }

    #[tokio::test]
    async fn head_response_has_empty_body() {
        let response = into_response(stored(200, &[("content-type", "text/plain")]), true);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(response.headers()[CONTENT_LENGTH], "4");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }
}
