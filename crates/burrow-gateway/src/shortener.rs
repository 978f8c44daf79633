//! Delegated link shortener: requests are forwarded as JSON to an external
//! API and its answer is reduced to the short link.

use axum::response::{IntoResponse, Response};
use burrow_core::config::ShortenerSettings;
use http::header::AUTHORIZATION;
use http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::{GatewayError, Result};

#[derive(Debug, Deserialize)]
struct ShortenerReply {
    data: ShortenerData,
}

#[derive(Debug, Deserialize)]
struct ShortenerData {
    link: String,
}

/// Client of the external shortener.
#[derive(Debug, Clone, Default)]
pub struct ShortenerProxy {
    client: reqwest::Client,
}

impl ShortenerProxy {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Forwards `body` to the configured API.
    ///
    /// A `200` answer becomes the bare short link; any other status is
    /// returned with an empty body.
    #[instrument(skip_all, fields(api = %settings.api))]
    pub async fn forward(
        &self,
        settings: &ShortenerSettings,
        body: Map<String, Value>,
    ) -> Result<Response> {
        if body.is_empty() {
            return Err(GatewayError::EmptyForward);
        }

        let response = self
            .client
            .post(&settings.api)
            .header(AUTHORIZATION, format!("API-Key {}", settings.apikey))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("shortener request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = %status, "shortener declined");
            return Err(GatewayError::Upstream { status });
        }

        match response.json::<ShortenerReply>().await {
            Ok(reply) => Ok((StatusCode::OK, reply.data.link).into_response()),
            Err(e) => {
                warn!(error = %e, "shortener answer has no link");
                Err(GatewayError::Upstream {
                    status: StatusCode::BAD_GATEWAY,
                })
            }
        }
    }
}
