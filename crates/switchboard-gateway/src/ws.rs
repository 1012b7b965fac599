// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hub WebSocket: agent connections to the real-time hub.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "AssignConversationToUser", "data": {"conversationId": "..."}}
//! {"type": "SendMessageToCustomer", "data": {"conversationId": "...", "text": "hello"}}
//! {"type": "CloseAndAnonymizeChat", "data": {"customerId": "wa_123"}}
//! ```
//!
//! Server -> Client: push events, `{"type": <name>, "data": <payload>}`.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use switchboard_core::{AgentSession, ConnectionId, SwitchboardError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::{HubQuery, credentials_from};
use crate::server::GatewayState;

/// GET /hub
///
/// Authorizes before upgrading: a rejected agent gets a plain 401 and never
/// reaches the registry.
pub async fn hub_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(query): Query<HubQuery>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(credentials) = credentials_from(&headers, &query) else {
        return (StatusCode::UNAUTHORIZED, "missing credentials").into_response();
    };
    let session = match state.hub.authorize(&credentials).await {
        Ok(session) => session,
        Err(SwitchboardError::Unauthorized(reason)) => {
            debug!(%reason, "hub connection rejected");
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
        Err(e) => {
            warn!(error = %e, "hub authorization failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "authorization unavailable").into_response();
        }
    };
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };
    upgrade.on_upgrade(move |socket| handle_socket(socket, state, session))
}

/// Drive one registered connection until the client goes away.
///
/// A writer task drains the connection's outbox into the socket; the reader
/// loop dispatches operations in arrival order. Disconnect runs however the
/// loop ends.
async fn handle_socket(socket: WebSocket, state: GatewayState, session: AgentSession) {
    let (mut sink, mut stream) = socket.split();
    let connection = ConnectionId(uuid::Uuid::new_v4().to_string());
    let (tx, mut rx) = mpsc::channel::<String>(state.connection_buffer);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    state
        .hub
        .register(connection.clone(), session.clone(), tx)
        .await;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                state
                    .operations
                    .dispatch_text(&connection, &session, text.as_str())
                    .await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // Binary is not part of the protocol; ping/pong handled by axum.
            Err(e) => {
                debug!(%connection, error = %e, "hub socket closed abnormally");
                break;
            }
        }
    }

    state.hub.disconnect(&connection);
    writer.abort();
}
