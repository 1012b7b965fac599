// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store and directory traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use switchboard_config::model::StorageConfig;
use switchboard_core::{
    AdapterType, ArchiveOutcome, ArchivedConversation, ChannelDirectory, ChannelSettings, Conversation,
    ConversationStore, ConversationThread, Credentials, HealthStatus, Message, MessageRef,
    MessageStatus, PluginAdapter, Principal, PrincipalResolver, Source, SwitchboardError,
    UserDirectory, UserRecord,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store and directory.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the configured path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), SwitchboardError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SwitchboardError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// The underlying database, for seeding and administrative queries.
    pub fn database(&self) -> Result<&Database, SwitchboardError> {
        self.db.get().ok_or_else(|| SwitchboardError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        let db = match self.database() {
            Ok(db) => db,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await;
        Ok(match probe {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn find_active_conversation(
        &self,
        sender_id: &str,
        company_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::find_active(self.database()?, sender_id, company_id).await
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::get_conversation(self.database()?, conversation_id).await
    }

    async fn get_thread(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationThread>, SwitchboardError> {
        queries::conversations::get_thread(self.database()?, conversation_id).await
    }

    async fn create_conversation(
        &self,
        conversation: &Conversation,
        first_message: &Message,
    ) -> Result<(), SwitchboardError> {
        queries::conversations::insert_with_first_message(
            self.database()?,
            conversation,
            first_message,
        )
        .await
    }

    async fn append_message(&self, message: &Message) -> Result<(), SwitchboardError> {
        queries::messages::insert_message(self.database()?, message).await
    }

    async fn assign_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::assign(self.database()?, conversation_id, user_id).await
    }

    async fn list_assigned(
        &self,
        company_id: &str,
        user_id: &str,
    ) -> Result<Vec<ConversationThread>, SwitchboardError> {
        queries::conversations::list_assigned(self.database()?, company_id, user_id).await
    }

    async fn list_unassigned(
        &self,
        company_id: &str,
    ) -> Result<Vec<ConversationThread>, SwitchboardError> {
        queries::conversations::list_unassigned(self.database()?, company_id).await
    }

    async fn find_message(
        &self,
        target: &MessageRef,
    ) -> Result<Option<Message>, SwitchboardError> {
        queries::messages::find_message(self.database()?, target).await
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        changed_at: DateTime<Utc>,
        error_text: Option<&str>,
    ) -> Result<(), SwitchboardError> {
        queries::messages::update_status(self.database()?, message_id, status, changed_at, error_text)
            .await
    }

    async fn set_provider_message_id(
        &self,
        message_id: &str,
        provider_message_id: &str,
    ) -> Result<(), SwitchboardError> {
        queries::messages::set_provider_message_id(self.database()?, message_id, provider_message_id)
            .await
    }

    async fn outbound_messages_until(
        &self,
        conversation_id: &str,
        until: DateTime<Utc>,
    ) -> Result<Vec<Message>, SwitchboardError> {
        queries::messages::outbound_until(self.database()?, conversation_id, until).await
    }

    async fn archive_conversation(
        &self,
        archive: &ArchivedConversation,
    ) -> Result<ArchiveOutcome, SwitchboardError> {
        queries::archive::archive_conversation(self.database()?, archive).await
    }
}

#[async_trait]
impl ChannelDirectory for SqliteStore {
    async fn find_by_company_key(
        &self,
        source: Source,
        company_key: &str,
    ) -> Result<Option<ChannelSettings>, SwitchboardError> {
        queries::directory::find_channel_by_company_key(self.database()?, source, company_key).await
    }

    async fn find_for_company(
        &self,
        company_id: &str,
        source: Source,
    ) -> Result<Option<ChannelSettings>, SwitchboardError> {
        queries::directory::find_channel_for_company(self.database()?, company_id, source).await
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, SwitchboardError> {
        queries::directory::find_user(self.database()?, user_id).await
    }
}

#[async_trait]
impl PrincipalResolver for SqliteStore {
    async fn resolve(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Principal>, SwitchboardError> {
        if credentials.bearer_token.is_empty() {
            return Ok(None);
        }
        queries::directory::find_principal_by_token(self.database()?, &credentials.bearer_token)
            .await
    }
}
