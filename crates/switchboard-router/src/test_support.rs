// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fakes shared by the router's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use switchboard_config::model::StorageConfig;
use switchboard_core::{
    AdapterType, Broadcaster, ChannelSettings, ConnectionId, GroupKey, HealthStatus,
    InboundBatch, OutboundMessage, PluginAdapter, ProviderChannel, PushEvent, Source,
    SwitchboardError,
};
use switchboard_storage::SqliteStore;
use switchboard_storage::queries::directory::upsert_channel_settings;
use tempfile::TempDir;

/// Where a recorded push was addressed.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Connection(ConnectionId),
    User(String),
    Group(GroupKey),
}

/// Broadcaster that records every push instead of delivering it.
#[derive(Default)]
pub struct RecordingBroadcaster {
    pub pushes: Mutex<Vec<(Target, PushEvent)>>,
}

impl RecordingBroadcaster {
    pub fn take(&self) -> Vec<(Target, PushEvent)> {
        std::mem::take(&mut *self.pushes.lock().unwrap())
    }

    fn record(&self, target: Target, event: &PushEvent) {
        self.pushes.lock().unwrap().push((target, event.clone()));
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn send_to_connection(&self, connection: &ConnectionId, event: &PushEvent) {
        self.record(Target::Connection(connection.clone()), event);
    }

    fn send_to_user(&self, user_id: &str, event: &PushEvent) {
        self.record(Target::User(user_id.to_string()), event);
    }

    fn send_to_group(&self, group: &GroupKey, event: &PushEvent) {
        self.record(Target::Group(group.clone()), event);
    }

    fn add_to_group(&self, _connection: &ConnectionId, _group: &GroupKey) {}

    fn remove_from_group(&self, _connection: &ConnectionId, _group: &GroupKey) {}
}

/// Provider that records sends and answers with `msg123`, `msg124`, ... or a set error.
pub struct FakeProvider {
    pub source: Source,
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub fail_with: Mutex<Option<String>>,
}

impl FakeProvider {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            sent: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PluginAdapter for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 1)
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
impl ProviderChannel for FakeProvider {
    fn source(&self) -> Source {
        self.source
    }

    fn parse_inbound(&self, _payload: &serde_json::Value) -> Vec<InboundBatch> {
        Vec::new()
    }

    async fn send_outbound(&self, message: &OutboundMessage) -> Result<String, SwitchboardError> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            sent.len()
        };
        match self.fail_with.lock().unwrap().clone() {
            Some(reason) => Err(SwitchboardError::provider(reason)),
            None => Ok(format!("msg{}", 122 + count)),
        }
    }
}

/// A migrated store with company `acme` bound to WhatsApp `BID1`/`PNID1`.
pub async fn seeded_store(default_team: Option<&str>) -> (TempDir, Arc<SqliteStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(StorageConfig {
        database_path: dir.path().join("router.db").to_string_lossy().into_owned(),
        wal_mode: true,
    }));
    store.initialize().await.unwrap();
    upsert_channel_settings(
        store.database().unwrap(),
        &ChannelSettings {
            company_id: "acme".into(),
            source: Source::WhatsApp,
            company_key: "BID1".into(),
            routing_id: "PNID1".into(),
            access_token: "EAAacme".into(),
            default_team_id: default_team.map(str::to_string),
        },
    )
    .await
    .unwrap();
    (dir, store)
}
