// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full helpdesk stack over a temp SQLite
//! database: store, presence registry, broadcaster, hub, router, assignment,
//! archiver, and operation dispatcher. Hub connections are simulated with
//! [`HubClient`]s that read pushes straight from their outbox.

use std::sync::Arc;

use switchboard_config::model::StorageConfig;
use switchboard_core::{
    AgentOperation, AgentSession, Broadcaster, ChannelSettings, ConnectionId, Credentials,
    ProviderChannel, Role, Source, SwitchboardError, UserRecord,
};
use switchboard_hub::{ChannelBroadcaster, PresenceRegistry, RealtimeHub};
use switchboard_router::{
    Archiver, AssignmentEngine, MessageRouter, OperationDispatcher, StatusReconciler,
};
use switchboard_security::Pseudonymizer;
use switchboard_storage::SqliteStore;
use switchboard_storage::queries::directory::{upsert_channel_settings, upsert_user};
use tokio::sync::mpsc;

use crate::mock_provider::MockProvider;

/// Company every harness is seeded with.
pub const COMPANY: &str = "acme";
/// WhatsApp business account id bound to [`COMPANY`].
pub const WHATSAPP_ACCOUNT: &str = "BID1";
/// WhatsApp phone number id replies are sent from.
pub const WHATSAPP_PHONE: &str = "PNID1";
/// Facebook page id bound to [`COMPANY`].
pub const FACEBOOK_PAGE: &str = "PAGE1";
/// Pseudonym salt used by the harness archiver.
pub const PSEUDONYM_SALT: &str = "harness-salt";

/// Seeded users: `(user_id, display_name, role, bearer token, teams)`.
pub const USERS: [(&str, &str, Role, &str, &[&str]); 3] = [
    ("agent-1", "Ada", Role::Agent, "tok-ada", &["support"]),
    ("agent-2", "Grace", Role::Manager, "tok-grace", &[]),
    ("cust-1", "Carl", Role::Customer, "tok-carl", &[]),
];

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    whatsapp: Option<Arc<dyn ProviderChannel>>,
    default_team: Option<String>,
    buffer: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            whatsapp: None,
            default_team: None,
            buffer: 64,
        }
    }

    /// Use this channel for WhatsApp instead of a [`MockProvider`].
    pub fn with_whatsapp(mut self, channel: Arc<dyn ProviderChannel>) -> Self {
        self.whatsapp = Some(channel);
        self
    }

    /// Route new conversations of both channels to this team.
    pub fn with_default_team(mut self, team_id: impl Into<String>) -> Self {
        self.default_team = Some(team_id.into());
        self
    }

    /// Per-connection outbox capacity.
    pub fn with_connection_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Build the test harness, creating and seeding all subsystems.
    pub async fn build(self) -> Result<TestHarness, SwitchboardError> {
        let temp_dir = tempfile::TempDir::new().map_err(SwitchboardError::storage)?;
        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: temp_dir
                .path()
                .join("harness.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        }));
        store.initialize().await?;
        seed(&store, self.default_team.as_deref()).await?;

        let whatsapp_mock = Arc::new(MockProvider::new(Source::WhatsApp));
        let facebook = Arc::new(MockProvider::new(Source::Facebook));
        let whatsapp = self
            .whatsapp
            .unwrap_or_else(|| whatsapp_mock.clone() as Arc<dyn ProviderChannel>);
        let providers = vec![whatsapp, facebook.clone() as Arc<dyn ProviderChannel>];

        let registry = Arc::new(PresenceRegistry::new());
        let broadcaster = Arc::new(ChannelBroadcaster::new());
        let hub = Arc::new(RealtimeHub::new(
            registry,
            broadcaster.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let reconciler = Arc::new(StatusReconciler::new(store.clone(), broadcaster.clone()));
        let router = Arc::new(MessageRouter::new(
            store.clone(),
            store.clone(),
            broadcaster.clone(),
            reconciler.clone(),
            providers.clone(),
        ));
        let assignment = Arc::new(AssignmentEngine::new(store.clone(), broadcaster.clone()));
        let pseudonymizer = Pseudonymizer::new(PSEUDONYM_SALT)
            .map_err(|e| SwitchboardError::Config(format!("pseudonym salt: {e}")))?;
        let archiver = Arc::new(Archiver::new(store.clone(), pseudonymizer, "[REDACTED]"));
        let operations = Arc::new(OperationDispatcher::new(
            router.clone(),
            assignment.clone(),
            archiver.clone(),
            broadcaster.clone() as Arc<dyn Broadcaster>,
        ));

        Ok(TestHarness {
            store,
            hub,
            router,
            reconciler,
            assignment,
            archiver,
            operations,
            whatsapp_mock,
            facebook,
            providers,
            buffer: self.buffer,
            _temp_dir: temp_dir,
        })
    }
}

async fn seed(store: &SqliteStore, default_team: Option<&str>) -> Result<(), SwitchboardError> {
    let db = store.database()?;
    for settings in [
        ChannelSettings {
            company_id: COMPANY.into(),
            source: Source::WhatsApp,
            company_key: WHATSAPP_ACCOUNT.into(),
            routing_id: WHATSAPP_PHONE.into(),
            access_token: "EAAwhatsapp".into(),
            default_team_id: default_team.map(str::to_string),
        },
        ChannelSettings {
            company_id: COMPANY.into(),
            source: Source::Facebook,
            company_key: FACEBOOK_PAGE.into(),
            routing_id: FACEBOOK_PAGE.into(),
            access_token: "EAApage".into(),
            default_team_id: default_team.map(str::to_string),
        },
    ] {
        upsert_channel_settings(db, &settings).await?;
    }
    for (user_id, display_name, role, token, teams) in USERS {
        let user = UserRecord {
            user_id: user_id.into(),
            company_id: Some(COMPANY.into()),
            team_ids: teams.iter().map(|t| t.to_string()).collect(),
            display_name: display_name.into(),
            role,
        };
        upsert_user(db, &user, Some(token)).await?;
    }
    Ok(())
}

/// A complete test environment with mock providers and temp storage.
pub struct TestHarness {
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStore>,
    pub hub: Arc<RealtimeHub>,
    pub router: Arc<MessageRouter>,
    pub reconciler: Arc<StatusReconciler>,
    pub assignment: Arc<AssignmentEngine>,
    pub archiver: Arc<Archiver>,
    pub operations: Arc<OperationDispatcher>,
    /// WhatsApp mock; unused when the builder was given another WhatsApp channel.
    pub whatsapp_mock: Arc<MockProvider>,
    pub facebook: Arc<MockProvider>,
    /// The channels wired into the router.
    pub providers: Vec<Arc<dyn ProviderChannel>>,
    buffer: usize,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default options.
    pub async fn new() -> Result<Self, SwitchboardError> {
        Self::builder().build().await
    }

    /// Parse a webhook payload with the channel for `source` and route every batch.
    pub async fn deliver_webhook(
        &self,
        source: Source,
        payload: &serde_json::Value,
    ) -> Result<(), SwitchboardError> {
        let channel = self
            .providers
            .iter()
            .find(|p| p.source() == source)
            .ok_or_else(|| SwitchboardError::Config(format!("{source} not wired")))?;
        for batch in channel.parse_inbound(payload) {
            self.router.dispatch_batch(&batch).await;
        }
        Ok(())
    }

    /// Authorize `token` and register a simulated hub connection.
    pub async fn connect(&self, token: &str) -> Result<HubClient, SwitchboardError> {
        let session = self
            .hub
            .authorize(&Credentials {
                bearer_token: token.into(),
            })
            .await?;
        let connection = ConnectionId(uuid::Uuid::new_v4().to_string());
        let (tx, rx) = mpsc::channel(self.buffer);
        self.hub.register(connection.clone(), session.clone(), tx).await;
        Ok(HubClient {
            connection,
            session,
            rx,
        })
    }

    /// Run an operation as if `client` had sent it over its socket.
    pub async fn operate(&self, client: &HubClient, op: AgentOperation) {
        self.operations
            .dispatch(&client.connection, &client.session, op)
            .await;
    }

    pub fn disconnect(&self, client: &HubClient) {
        self.hub.disconnect(&client.connection);
    }
}

/// A registered hub connection whose pushes are read from its outbox.
pub struct HubClient {
    pub connection: ConnectionId,
    pub session: AgentSession,
    rx: mpsc::Receiver<String>,
}

impl HubClient {
    /// Every push queued so far, decoded.
    pub fn drain(&mut self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            match serde_json::from_str(&frame) {
                Ok(value) => frames.push(value),
                Err(e) => tracing::warn!(error = %e, "undecodable push frame"),
            }
        }
        frames
    }

    /// Queued pushes of one type, draining everything else.
    pub fn drain_kind(&mut self, kind: &str) -> Vec<serde_json::Value> {
        self.drain()
            .into_iter()
            .filter(|frame| frame["type"] == kind)
            .collect()
    }
}
