//! Top-level request classification.
//!
//! Reads go to the cache gateway. Everything else is routed by the first path
//! segment's endpoint mode to the upload orchestrator or the shortener proxy.

use std::borrow::Cow;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use burrow_core::{EndpointMode, Settings};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{GatewayError, Result};
use crate::request::RequestContext;
use crate::serve::serve;
use crate::state::AppState;
use crate::upload::{self, UploadItem};

/// Fallback handler for every path the router does not claim.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts);
    let settings = state.resolver.resolve(&ctx.host);
    let request = Request::from_parts(parts, body);

    trace!(method = %ctx.method, path = %ctx.path, host = %ctx.host, "dispatching");
    match route(&state, &ctx, &settings, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn route(
    state: &AppState,
    ctx: &RequestContext,
    settings: &Settings,
    request: Request,
) -> Result<Response> {
    if ctx.method == Method::GET || ctx.method == Method::HEAD {
        return serve(state, ctx, settings, ctx.method == Method::HEAD).await;
    }

    let segment = ctx.first_segment();
    let mode = match settings.endpoint_mode(segment) {
        Some(mode) => mode,
        None if settings.upload_allow_insecure => EndpointMode::Plain,
        None => return Err(GatewayError::UnknownEndpoint(segment.to_string())),
    };

    match (mode, &ctx.method) {
        (EndpointMode::Shortener, &Method::POST) => {
            let target = settings.waaai.as_ref().ok_or_else(|| {
                GatewayError::Misconfigured(format!(
                    "endpoint '{segment}' forwards to the shortener but no shortener is configured"
                ))
            })?;
            let body = read_shortener_body(request).await?;
            state.shortener.forward(target, body).await
        }
        (EndpointMode::Shortener, method) => Err(GatewayError::UnsupportedMethod(method.clone())),
        (_, &Method::POST) => {
            let items = read_upload_items(request).await?;
            upload::handle_batch(state, ctx, settings, mode, items).await
        }
        (_, &Method::PUT) => {
            let filename = put_filename(&ctx.path).map(str::to_string);
            let body = Bytes::from_request(request, &())
                .await
                .map_err(|e| rejected(e.status(), e.body_text()))?;
            upload::handle_single(state, ctx, settings, mode, body, filename).await
        }
        (_, method) => Err(GatewayError::UnsupportedMethod(method.clone())),
    }
}

/// Last non-empty segment after the endpoint prefix, kept verbatim.
///
/// Dot segments, encoded or not, name no file.
fn put_filename(path: &str) -> Option<&str> {
    let (_, rest) = path.trim_start_matches('/').split_once('/')?;
    let name = rest.rsplit('/').find(|segment| !segment.is_empty())?;
    let decoded = urlencoding::decode(name).unwrap_or(Cow::Borrowed(name));
    (!matches!(decoded.as_ref(), "." | "..")).then_some(name)
}

fn rejected(status: StatusCode, reason: String) -> GatewayError {
    GatewayError::BodyRejected { status, reason }
}

fn content_type(request: &Request) -> String {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// A field of a form body.
struct FormField {
    name: Option<String>,
    file_name: Option<String>,
    data: Bytes,
}

/// Multipart fields or url-encoded pairs, in submission order.
async fn read_form(request: Request) -> Result<Vec<FormField>> {
    let content_type = content_type(&request);

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;

        let mut fields = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?
        {
            let name = field.name().map(str::to_string);
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| rejected(e.status(), e.body_text()))?;
            fields.push(FormField {
                name,
                file_name,
                data,
            });
        }
        return Ok(fields);
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;
        return Ok(pairs
            .into_iter()
            .map(|(name, value)| FormField {
                name: Some(name),
                file_name: None,
                data: Bytes::from(value),
            })
            .collect());
    }

    Err(rejected(
        StatusCode::BAD_REQUEST,
        format!("expected a form body, got '{content_type}'"),
    ))
}

/// Upload entries of a form body.
///
/// File parts are binary and suggest their filename, falling back to the
/// field name. Text fields suggest their field name.
async fn read_upload_items(request: Request) -> Result<Vec<UploadItem>> {
    let fields = read_form(request).await?;
    Ok(fields
        .into_iter()
        .map(|field| match field.file_name {
            Some(file_name) => {
                let suggested = Some(file_name).filter(|f| !f.is_empty()).or(field.name);
                UploadItem::binary(field.data, suggested)
            }
            None => match String::from_utf8(field.data.to_vec()) {
                Ok(text) => UploadItem::text(text, field.name),
                Err(e) => UploadItem::binary(e.into_bytes(), field.name),
            },
        })
        .collect())
}

/// JSON object or form fields to forward. Any other body forwards nothing.
async fn read_shortener_body(request: Request) -> Result<Map<String, Value>> {
    let content_type = content_type(&request);

    if content_type.contains("application/json") {
        let Json(value) = Json::<Value>::from_request(request, &())
            .await
            .map_err(|e| rejected(e.status(), e.body_text()))?;
        return Ok(match value {
            Value::Object(map) => map,
            _ => Map::new(),
        });
    }

    if content_type.contains("form") {
        let fields = read_form(request).await?;
        return Ok(fields
            .into_iter()
            .filter_map(|field| {
                let value = String::from_utf8_lossy(&field.data).into_owned();
                field.name.map(|name| (name, Value::String(value)))
            })
            .collect());
    }

    Ok(Map::new())
}
