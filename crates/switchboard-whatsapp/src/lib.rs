// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API provider adapter for the Switchboard helpdesk.
//!
//! Implements [`ProviderChannel`] for WhatsApp Business: webhook payloads are
//! split per business account entry into normalized events, and agent replies
//! are sent through the Cloud API `messages` endpoint.

pub mod client;
pub mod parse;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use switchboard_config::model::{OutboundConfig, ProviderConfig};
use switchboard_core::{
    AdapterType, HealthStatus, InboundBatch, OutboundMessage, PluginAdapter, ProviderChannel,
    Source, SwitchboardError,
};
use tracing::debug;

use crate::client::CloudApiClient;

/// WhatsApp provider adapter implementing [`ProviderChannel`].
pub struct WhatsAppChannel {
    client: CloudApiClient,
}

impl WhatsAppChannel {
    pub fn new(config: &ProviderConfig, outbound: &OutboundConfig) -> Result<Self, SwitchboardError> {
        let timeout = Duration::from_secs(outbound.request_timeout_secs);
        Ok(Self {
            client: CloudApiClient::new(&config.api_base_url, timeout)?,
        })
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        // Tokens are per company; there is no shared credential to probe.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        debug!("whatsapp channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderChannel for WhatsAppChannel {
    fn source(&self) -> Source {
        Source::WhatsApp
    }

    fn parse_inbound(&self, payload: &serde_json::Value) -> Vec<InboundBatch> {
        parse::parse_payload(payload)
    }

    async fn send_outbound(&self, message: &OutboundMessage) -> Result<String, SwitchboardError> {
        self.client
            .send_text(
                &message.access_token,
                &message.routing_id,
                &message.recipient_id,
                &message.text,
            )
            .await
    }
}
