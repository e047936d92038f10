//! Thin HTTP forwarding endpoints for browser-hosted deployments.
//!
//! Neither endpoint touches the in-process pipeline. `/api/model` only
//! removes a cross-origin restriction on the hosted model descriptor, and
//! `/api/stylize` exposes a hosted single-shot inference fallback.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;

/// Upstream location of the hosted model descriptor.
const MODEL_DESCRIPTOR_URL: &str =
    "https://tfhub.dev/google/magenta/arbitrary-image-stylization-v1-256/2/model.json?tfjs-format=file";

/// Hosted inference endpoint used by the remote stylization path.
const REMOTE_STYLIZE_URL: &str =
    "https://api-inference.huggingface.co/models/akhaliq/RealTime-StyleTransfer";

/// Environment variable holding the bearer credential for the hosted API.
const API_KEY_VAR: &str = "HF_API_KEY";

/// Shared state for the proxy handlers.
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl ProxyState {
    /// Build the state, reading the bearer credential from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: std::env::var(API_KEY_VAR).ok(),
        }
    }
}

/// Build the proxy router. Unsupported methods on either route get a 405
/// from axum's method routing.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/model", get(forward_model_descriptor))
        .route("/api/stylize", post(forward_stylize))
        .with_state(state)
}

/// Forward the model descriptor verbatim, adding permissive CORS headers.
async fn forward_model_descriptor(State(state): State<ProxyState>) -> Response {
    let response = match state.client.get(MODEL_DESCRIPTOR_URL).send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!("model fetch error: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response();
        }
    };

    let status = upstream_status(&response);
    if !status.is_success() {
        return (status, Json(json!({ "error": "Failed to fetch model" }))).into_response();
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/json")
        .to_string();

    match response.text().await {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
            ],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("model fetch error: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct StylizeRequest {
    base64: Option<String>,
}

/// Forward a base64-encoded image to the hosted inference API and wrap the
/// result as a data URI.
async fn forward_stylize(
    State(state): State<ProxyState>,
    Json(payload): Json<StylizeRequest>,
) -> Response {
    let Some(base64_image) = payload.base64 else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing base64 image" })),
        )
            .into_response();
    };

    let mut request = state
        .client
        .post(REMOTE_STYLIZE_URL)
        .json(&json!({ "inputs": base64_image }));
    if let Some(key) = &state.api_key {
        request = request.bearer_auth(key);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => return stylize_failure(&err),
    };

    let status = upstream_status(&response);
    if !status.is_success() {
        let error = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or_else(|_| json!("upstream error"));
        return (status, Json(json!({ "error": error }))).into_response();
    }

    match response.bytes().await {
        Ok(bytes) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            (
                StatusCode::OK,
                Json(json!({ "result": format!("data:image/jpeg;base64,{encoded}") })),
            )
                .into_response()
        }
        Err(err) => stylize_failure(&err),
    }
}

fn stylize_failure(err: &reqwest::Error) -> Response {
    tracing::error!("stylization proxy error: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Stylization failed", "details": err.to_string() })),
    )
        .into_response()
}

/// reqwest and axum may pin different `http` versions, so map by code.
fn upstream_status(response: &reqwest::Response) -> StatusCode {
    StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}
