// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use switchboard_core::{PluginAdapter, ProviderChannel, Source, SwitchboardError};
use switchboard_hub::RealtimeHub;
use switchboard_router::{MessageRouter, OperationDispatcher};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::ws;

/// One provider's webhook endpoint: the channel that parses its payloads and
/// the Meta app settings that guard it.
#[derive(Clone)]
pub struct WebhookEndpoint {
    pub channel: Arc<dyn ProviderChannel>,
    /// App secret for `X-Hub-Signature-256`. `None` disables the check.
    pub app_secret: Option<String>,
    /// Token expected in the subscription handshake. `None` rejects every handshake.
    pub verify_token: Option<String>,
}

impl std::fmt::Debug for WebhookEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookEndpoint")
            .field("channel", &self.channel.name())
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub hub: Arc<RealtimeHub>,
    pub router: Arc<MessageRouter>,
    pub operations: Arc<OperationDispatcher>,
    /// Enabled providers, keyed by the source named in the webhook path.
    pub webhooks: Arc<HashMap<Source, WebhookEndpoint>>,
    /// Storage adapter reported by `/health`.
    pub store: Arc<dyn PluginAdapter>,
    /// Capacity of each hub connection's outbox.
    pub connection_buffer: usize,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors `[server]` from switchboard-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway's routes over `state`:
/// - GET/POST /webhooks/{provider}
/// - GET /hub (auth during the handshake)
/// - GET /health
pub fn app(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhooks/{provider}",
            get(handlers::verify_webhook).post(handlers::post_webhook),
        )
        .route("/hub", get(ws::hub_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), SwitchboardError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SwitchboardError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SwitchboardError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_test_utils::MockProvider;

    #[test]
    fn webhook_endpoint_debug_redacts_secrets() {
        let endpoint = WebhookEndpoint {
            channel: Arc::new(MockProvider::new(Source::WhatsApp)),
            app_secret: Some("app-secret-value".into()),
            verify_token: Some("verify-me".into()),
        };
        let debug = format!("{endpoint:?}");
        assert!(debug.contains("mock-whatsapp"));
        assert!(!debug.contains("app-secret-value"));
        assert!(!debug.contains("verify-me"));
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
