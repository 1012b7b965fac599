// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider channel for deterministic testing.
//!
//! `MockProvider` parses webhooks with the real WhatsApp and Facebook parsers
//! but answers sends from a queue instead of calling the Graph API.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use switchboard_core::{
    AdapterType, HealthStatus, InboundBatch, OutboundMessage, PluginAdapter, ProviderChannel,
    Source, SwitchboardError,
};

/// A provider channel with scripted send results.
///
/// Results are popped from a FIFO queue. When the queue is empty, sends
/// succeed with `mock-<n>` ids.
pub struct MockProvider {
    source: Source,
    results: Arc<Mutex<VecDeque<Result<String, String>>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    counter: AtomicU64,
}

impl MockProvider {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            results: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            counter: AtomicU64::new(0),
        }
    }

    /// Make the next send succeed with this provider message id.
    pub async fn accept_next(&self, provider_message_id: impl Into<String>) {
        self.results
            .lock()
            .await
            .push_back(Ok(provider_message_id.into()));
    }

    /// Make the next send fail with this provider error text.
    pub async fn reject_next(&self, reason: impl Into<String>) {
        self.results.lock().await.push_back(Err(reason.into()));
    }

    /// Every message handed to this provider so far.
    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        match self.source {
            Source::WhatsApp => "mock-whatsapp",
            Source::Facebook => "mock-facebook",
        }
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
        Ok(())
    }
}

#[async_trait]
impl ProviderChannel for MockProvider {
    fn source(&self) -> Source {
        self.source
    }

    fn parse_inbound(&self, payload: &serde_json::Value) -> Vec<InboundBatch> {
        match self.source {
            Source::WhatsApp => switchboard_whatsapp::parse::parse_payload(payload),
            Source::Facebook => switchboard_facebook::parse::parse_payload(payload),
        }
    }

    async fn send_outbound(&self, message: &OutboundMessage) -> Result<String, SwitchboardError> {
        self.sent.lock().await.push(message.clone());
        match self.results.lock().await.pop_front() {
            Some(Ok(id)) => Ok(id),
            Some(Err(reason)) => Err(SwitchboardError::provider(reason)),
            None => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                Ok(format!("mock-{n}"))
            }
        }
    }
}
