// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider channel trait for messaging platform integrations (WhatsApp, Facebook).

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::events::{InboundBatch, OutboundMessage};
use crate::traits::adapter::PluginAdapter;
use crate::types::Source;

/// Adapter translating one provider's webhooks and send API.
///
/// Parsing is pure and never fails on a malformed sub-entry: such entries are
/// logged and skipped. Sending returns the provider-assigned message id.
#[async_trait]
pub trait ProviderChannel: PluginAdapter {
    /// The provider this adapter speaks for.
    fn source(&self) -> Source;

    /// Splits a webhook payload into one batch per provider `entry`.
    fn parse_inbound(&self, payload: &serde_json::Value) -> Vec<InboundBatch>;

    /// Delivers a text reply and returns the provider message id.
    async fn send_outbound(&self, message: &OutboundMessage) -> Result<String, SwitchboardError>;
}
