// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Switchboard helpdesk.
//!
//! Provider webhooks enter through `/webhooks/{provider}` and are routed
//! inline; agents hold a WebSocket on `/hub` for push events and operations.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{GatewayState, ServerConfig, WebhookEndpoint, app, start_server};

#[cfg(test)]
pub(crate) fn test_state(
    harness: &switchboard_test_utils::TestHarness,
    app_secret: Option<&str>,
) -> GatewayState {
    use std::sync::Arc;
    use switchboard_core::ProviderChannel;

    let webhooks = harness
        .providers
        .iter()
        .map(|channel| {
            (
                channel.source(),
                WebhookEndpoint {
                    channel: channel.clone(),
                    app_secret: app_secret.map(str::to_string),
                    verify_token: Some("verify-me".into()),
                },
            )
        })
        .collect();
    GatewayState {
        hub: harness.hub.clone(),
        router: harness.router.clone(),
        operations: harness.operations.clone(),
        webhooks: Arc::new(webhooks),
        store: harness.store.clone(),
        connection_buffer: 64,
        start_time: std::time::Instant::now(),
    }
}
