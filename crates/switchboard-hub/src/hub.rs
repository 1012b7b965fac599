// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle: authorize, register, disconnect.
//!
//! A connection moves `Connecting -> Authorized -> Registered -> Disconnected`.
//! Only [`RealtimeHub::authorize`] can reject it; everything after that is
//! best-effort and never tears the connection down.

use std::sync::Arc;

use switchboard_core::{
    AgentSession, Broadcaster, ConnectionId, ConversationStore, ConversationThread, Credentials,
    GroupKey, PrincipalResolver, PushEvent, SwitchboardError, UserDirectory,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::broadcast::ChannelBroadcaster;
use crate::presence::{PresenceRegistry, team_member};

/// Real-time hub wiring presence, push delivery, and the snapshot queries.
pub struct RealtimeHub {
    registry: Arc<PresenceRegistry>,
    broadcaster: Arc<ChannelBroadcaster>,
    principals: Arc<dyn PrincipalResolver>,
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn ConversationStore>,
}

impl RealtimeHub {
    pub fn new(
        registry: Arc<PresenceRegistry>,
        broadcaster: Arc<ChannelBroadcaster>,
        principals: Arc<dyn PrincipalResolver>,
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            principals,
            users,
            store,
        }
    }

    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<ChannelBroadcaster> {
        &self.broadcaster
    }

    /// Check credentials and build the session a connection will register with.
    ///
    /// Requires a known principal holding a staff role and a user record bound
    /// to a company. Any failure is [`SwitchboardError::Unauthorized`].
    pub async fn authorize(
        &self,
        credentials: &Credentials,
    ) -> Result<AgentSession, SwitchboardError> {
        let principal = self
            .principals
            .resolve(credentials)
            .await?
            .ok_or_else(|| SwitchboardError::Unauthorized("unknown credentials".into()))?;

        let role = principal
            .roles
            .iter()
            .copied()
            .find(|role| role.may_connect())
            .ok_or_else(|| {
                SwitchboardError::Unauthorized(format!(
                    "user {} holds no role allowed to connect",
                    principal.user_id
                ))
            })?;

        let user = self
            .users
            .find_user(&principal.user_id)
            .await?
            .ok_or_else(|| {
                SwitchboardError::Unauthorized(format!("no user record for {}", principal.user_id))
            })?;

        let company_id = user.company_id.ok_or_else(|| {
            SwitchboardError::Unauthorized(format!("user {} has no company", user.user_id))
        })?;

        Ok(AgentSession {
            user_id: user.user_id,
            company_id,
            team_ids: user.team_ids,
            display_name: user.display_name,
            role,
        })
    }

    /// Register an authorized connection and send it its initial state.
    ///
    /// Joins the company group and one group per team, pushes the assigned and
    /// pending snapshots to the connection, then announces the agent to the
    /// company. A snapshot that cannot be loaded is reported to the connection
    /// as `OperationFailed`; the registration itself stands.
    pub async fn register(
        &self,
        connection: ConnectionId,
        session: AgentSession,
        outbox: mpsc::Sender<String>,
    ) {
        self.broadcaster
            .attach(connection.clone(), &session.user_id, outbox);
        let groups = session.groups();
        self.registry.insert(connection.clone(), session.clone());
        for group in &groups {
            self.broadcaster.add_to_group(&connection, group);
        }
        info!(
            %connection,
            user_id = %session.user_id,
            company_id = %session.company_id,
            groups = groups.len(),
            "agent connected"
        );

        match self.snapshots(&session).await {
            Ok((assigned, pending)) => {
                self.broadcaster.send_to_connection(
                    &connection,
                    &PushEvent::LoadAssignedConversations(assigned),
                );
                self.broadcaster
                    .send_to_connection(&connection, &PushEvent::LoadNewConversations(pending));
            }
            Err(e) => {
                warn!(%connection, error = %e, "failed to load conversation snapshots");
                self.broadcaster.send_to_connection(
                    &connection,
                    &PushEvent::OperationFailed {
                        operation: "LoadConversations".into(),
                        message: e.to_string(),
                    },
                );
            }
        }

        self.broadcaster.send_to_group(
            &GroupKey::Company(session.company_id.clone()),
            &PushEvent::AddTeamMember(team_member(&session)),
        );
    }

    /// Remove a connection's session and group memberships. Idempotent.
    pub fn disconnect(&self, connection: &ConnectionId) {
        let session = self.registry.remove(connection);
        self.broadcaster.detach(connection);
        match session {
            Some(session) => {
                info!(%connection, user_id = %session.user_id, "agent disconnected");
                self.broadcaster.send_to_group(
                    &GroupKey::Company(session.company_id.clone()),
                    &PushEvent::RemoveTeamMember(team_member(&session)),
                );
            }
            None => debug!(%connection, "disconnect for unknown connection"),
        }
    }

    pub fn send_to_user(&self, user_id: &str, event: &PushEvent) {
        self.broadcaster.send_to_user(user_id, event);
    }

    pub fn send_to_group(&self, group: &GroupKey, event: &PushEvent) {
        self.broadcaster.send_to_group(group, event);
    }

    /// Conversations assigned to the agent, and every unassigned conversation
    /// of its company.
    async fn snapshots(
        &self,
        session: &AgentSession,
    ) -> Result<(Vec<ConversationThread>, Vec<ConversationThread>), SwitchboardError> {
        let assigned = self
            .store
            .list_assigned(&session.company_id, &session.user_id)
            .await?;
        let pending = self.store.list_unassigned(&session.company_id).await?;
        Ok((assigned, pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_config::model::StorageConfig;
    use switchboard_core::{Conversation, Message, Role, Source, UserRecord};
    use switchboard_storage::SqliteStore;
    use switchboard_storage::queries::directory::upsert_user;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Arc<SqliteStore>,
        hub: RealtimeHub,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: dir.path().join("hub.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        store.initialize().await.unwrap();
        let db = store.database().unwrap();
        for (user_id, company, role, token, teams) in [
            ("agent-1", Some("acme"), Role::Agent, "tok-agent", vec!["support"]),
            ("cust-1", Some("acme"), Role::Customer, "tok-customer", vec![]),
            ("drifter", None, Role::Agent, "tok-drifter", vec![]),
        ] {
            let user = UserRecord {
                user_id: user_id.into(),
                company_id: company.map(str::to_string),
                team_ids: teams.into_iter().map(str::to_string).collect(),
                display_name: user_id.to_uppercase(),
                role,
            };
            upsert_user(db, &user, Some(token)).await.unwrap();
        }

        let hub = RealtimeHub::new(
            Arc::new(PresenceRegistry::new()),
            Arc::new(ChannelBroadcaster::new()),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        Fixture {
            _dir: dir,
            store,
            hub,
        }
    }

    fn creds(token: &str) -> Credentials {
        Credentials {
            bearer_token: token.into(),
        }
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn authorize_accepts_staff_with_company() {
        let f = fixture().await;
        let session = f.hub.authorize(&creds("tok-agent")).await.unwrap();
        assert_eq!(session.company_id, "acme");
        assert_eq!(session.role, Role::Agent);
        assert!(session.team_ids.contains("support"));
    }

    #[tokio::test]
    async fn authorize_rejects_unknown_customer_and_companyless() {
        let f = fixture().await;
        for token in ["nope", "tok-customer", "tok-drifter"] {
            let err = f.hub.authorize(&creds(token)).await.unwrap_err();
            assert!(matches!(err, SwitchboardError::Unauthorized(_)), "{token}: {err}");
        }
        assert!(f.hub.registry().is_empty());
    }

    #[tokio::test]
    async fn register_sends_every_pending_conversation_then_roster() {
        let f = fixture().await;
        for team in [None, Some("support"), Some("billing")] {
            let conv = Conversation::open(
                format!("s-{team:?}"),
                "Cust",
                "acme",
                Source::WhatsApp,
                team.map(str::to_string),
            );
            f.store
                .create_conversation(&conv, &Message::inbound(&conv, "p", "hi"))
                .await
                .unwrap();
        }

        let session = f.hub.authorize(&creds("tok-agent")).await.unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let conn = ConnectionId("c1".into());
        f.hub.register(conn.clone(), session, tx).await;

        let frames = drain(&mut rx);
        let kinds: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            vec!["LoadAssignedConversations", "LoadNewConversations", "AddTeamMember"]
        );
        assert_eq!(
            frames[1]["data"].as_array().unwrap().len(),
            3,
            "other teams' queues included"
        );
        assert_eq!(
            f.hub.broadcaster().groups_of(&conn).len(),
            2,
            "company and support groups"
        );
    }

    #[tokio::test]
    async fn disconnect_is_symmetric_and_idempotent() {
        let f = fixture().await;
        let session = f.hub.authorize(&creds("tok-agent")).await.unwrap();

        let (watch_tx, mut watch_rx) = mpsc::channel(16);
        let watcher = ConnectionId("watcher".into());
        f.hub.register(watcher.clone(), session.clone(), watch_tx).await;

        let (tx, _rx) = mpsc::channel(16);
        let conn = ConnectionId("c2".into());
        f.hub.register(conn.clone(), session, tx).await;
        assert_eq!(f.hub.registry().len(), 2);
        drain(&mut watch_rx);

        f.hub.disconnect(&conn);
        f.hub.disconnect(&conn);

        assert!(!f.hub.registry().contains(&conn));
        assert!(f.hub.broadcaster().groups_of(&conn).is_empty());
        let frames = drain(&mut watch_rx);
        assert_eq!(frames.len(), 1, "one roster update for one real disconnect");
        assert_eq!(frames[0]["type"], "RemoveTeamMember");

        f.hub.disconnect(&watcher);
        assert!(f.hub.registry().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_connect_disconnect_leaves_no_residue() {
        let Fixture { _dir, hub, .. } = fixture().await;
        let hub = Arc::new(hub);
        let session = hub.authorize(&creds("tok-agent")).await.unwrap();

        let tasks: Vec<_> = (0..64)
            .map(|n| {
                let hub = hub.clone();
                let session = session.clone();
                tokio::spawn(async move {
                    let conn = ConnectionId(format!("conn-{n}"));
                    let (tx, _rx) = mpsc::channel(4);
                    hub.register(conn.clone(), session, tx).await;
                    tokio::task::yield_now().await;
                    hub.disconnect(&conn);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(hub.registry().is_empty());
        assert_eq!(hub.broadcaster().connection_count(), 0);
        for group in [
            GroupKey::Company("acme".into()),
            GroupKey::Team("support".into()),
        ] {
            assert!(hub.broadcaster().members(&group).is_empty(), "{group} kept members");
        }
    }
}
