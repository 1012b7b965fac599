// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for provider webhooks and health.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use switchboard_core::{HealthStatus, PluginAdapter, Source};
use tracing::{debug, warn};

use crate::auth::webhook_signature_ok;
use crate::server::{GatewayState, WebhookEndpoint};

/// Meta subscription handshake parameters.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when every adapter is healthy, `degraded` otherwise.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub adapters: Vec<AdapterHealth>,
}

#[derive(Debug, Serialize)]
pub struct AdapterHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn source_from_path(provider: &str) -> Option<Source> {
    match provider {
        "whatsapp" => Some(Source::WhatsApp),
        "facebook" => Some(Source::Facebook),
        _ => None,
    }
}

fn endpoint<'a>(state: &'a GatewayState, provider: &str) -> Option<&'a WebhookEndpoint> {
    source_from_path(provider).and_then(|source| state.webhooks.get(&source))
}

/// POST /webhooks/{provider}
///
/// Verifies the signature, parses the payload, and routes every batch before
/// answering. Routing problems are logged, never surfaced to the provider:
/// a well-formed delivery always gets 200 so Meta does not retry it.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(endpoint) = endpoint(&state, &provider) else {
        return error(StatusCode::NOT_FOUND, format!("no webhook for {provider}"));
    };

    if !webhook_signature_ok(endpoint.app_secret.as_deref(), &headers, &body) {
        warn!(%provider, "webhook signature rejected");
        return error(StatusCode::UNAUTHORIZED, "invalid signature");
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(%provider, error = %e, "webhook body is not JSON");
            return error(StatusCode::BAD_REQUEST, "body is not valid JSON");
        }
    };

    let batches = endpoint.channel.parse_inbound(&payload);
    debug!(%provider, batches = batches.len(), "webhook received");
    for batch in &batches {
        state.router.dispatch_batch(batch).await;
    }
    (StatusCode::OK, "EVENT_RECEIVED").into_response()
}

/// GET /webhooks/{provider}
///
/// Echoes `hub.challenge` when the mode is `subscribe` and the token matches.
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Path(provider): Path<String>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let Some(endpoint) = endpoint(&state, &provider) else {
        return error(StatusCode::NOT_FOUND, format!("no webhook for {provider}"));
    };

    let token_matches = match (&endpoint.verify_token, &params.verify_token) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    };
    match (params.mode.as_deref(), token_matches, params.challenge) {
        (Some("subscribe"), true, Some(challenge)) => {
            tracing::info!(%provider, "webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!(%provider, "webhook subscription handshake rejected");
            error(StatusCode::FORBIDDEN, "verification failed")
        }
    }
}

async fn probe<A: PluginAdapter + ?Sized>(adapter: &A) -> AdapterHealth {
    let (status, detail) = match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => ("healthy", None),
        Ok(HealthStatus::Degraded(why)) => ("degraded", Some(why)),
        Ok(HealthStatus::Unhealthy(why)) => ("unhealthy", Some(why)),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    AdapterHealth {
        name: adapter.name().to_string(),
        status: status.to_string(),
        detail,
    }
}

/// GET /health
///
/// Probes the store and every enabled provider. Answers 503 if any adapter
/// is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let mut adapters = vec![probe(state.store.as_ref()).await];
    let mut endpoints: Vec<_> = state.webhooks.values().collect();
    endpoints.sort_by_key(|e| e.channel.name().to_string());
    for endpoint in endpoints {
        adapters.push(probe(endpoint.channel.as_ref()).await);
    }

    let all_healthy = adapters.iter().all(|a| a.status == "healthy");
    let any_unhealthy = adapters.iter().any(|a| a.status == "unhealthy");
    let body = HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        adapters,
    };
    let code = if any_unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(body)).into_response()
}
