// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Facebook Messenger provider adapter for the Switchboard helpdesk.
//!
//! Implements [`ProviderChannel`] for the Messenger Platform. Besides text
//! messages, page webhooks carry delivery receipts and read watermarks, which
//! are normalized into status updates and [`Watermark`](switchboard_core::Watermark)
//! events.

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

use crate::client::SendApiClient;

/// Messenger provider adapter implementing [`ProviderChannel`].
pub struct FacebookChannel {
    client: SendApiClient,
}

impl FacebookChannel {
    pub fn new(config: &ProviderConfig, outbound: &OutboundConfig) -> Result<Self, SwitchboardError> {
        let timeout = Duration::from_secs(outbound.request_timeout_secs);
        Ok(Self {
            client: SendApiClient::new(&config.api_base_url, timeout)?,
        })
    }
}

#[async_trait]
impl PluginAdapter for FacebookChannel {
    fn name(&self) -> &str {
        "facebook"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        debug!("facebook channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderChannel for FacebookChannel {
    fn source(&self) -> Source {
        Source::Facebook
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_outbound_posts_to_me_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "recipient_id": "psid-1",
                "message_id": "m_out"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ProviderConfig {
            api_base_url: server.uri(),
            ..ProviderConfig::default()
        };
        let channel = FacebookChannel::new(&config, &OutboundConfig::default()).unwrap();
        assert_eq!(channel.source(), Source::Facebook);
        let id = channel
            .send_outbound(&OutboundMessage {
                recipient_id: "psid-1".into(),
                text: "hi".into(),
                access_token: "PAGE_TOKEN".into(),
                routing_id: "PAGE1".into(),
            })
            .await
            .unwrap();
        assert_eq!(id, "m_out");
    }

    #[test]
    fn parse_inbound_delegates_to_parser() {
        let channel =
            FacebookChannel::new(&ProviderConfig::default(), &OutboundConfig::default()).unwrap();
        let batches = channel.parse_inbound(&serde_json::json!({
            "object": "page",
            "entry": [{"id": "PAGE1", "messaging": []}]
        }));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].company_key, "PAGE1");
    }
}
