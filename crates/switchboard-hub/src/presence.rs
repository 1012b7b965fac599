// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory registry of connected agent sessions.

use dashmap::DashMap;
use switchboard_core::{AgentSession, ConnectionId, TeamMember};

/// Connected agents keyed by connection id.
///
/// One instance per server process, shared by reference. An agent with
/// several connections appears once per connection.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    sessions: DashMap<ConnectionId, AgentSession>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session, replacing any previous one for the same connection.
    pub fn insert(&self, connection: ConnectionId, session: AgentSession) -> Option<AgentSession> {
        self.sessions.insert(connection, session)
    }

    /// Remove and return the session of a connection. Missing sessions yield `None`.
    pub fn remove(&self, connection: &ConnectionId) -> Option<AgentSession> {
        self.sessions.remove(connection).map(|(_, session)| session)
    }

    pub fn get(&self, connection: &ConnectionId) -> Option<AgentSession> {
        self.sessions.get(connection).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, connection: &ConnectionId) -> bool {
        self.sessions.contains_key(connection)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Distinct users currently connected for a company, sorted by user id.
    pub fn roster(&self, company_id: &str) -> Vec<TeamMember> {
        let mut members: Vec<TeamMember> = self
            .sessions
            .iter()
            .filter(|entry| entry.company_id == company_id)
            .map(|entry| team_member(entry.value()))
            .collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        members.dedup_by(|a, b| a.user_id == b.user_id);
        members
    }
}

/// Roster entry describing a session's agent.
pub fn team_member(session: &AgentSession) -> TeamMember {
    TeamMember {
        user_id: session.user_id.clone(),
        display_name: session.display_name.clone(),
        company_id: session.company_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::Role;

    fn session(user_id: &str, company_id: &str) -> AgentSession {
        AgentSession {
            user_id: user_id.into(),
            company_id: company_id.into(),
            team_ids: Default::default(),
            display_name: user_id.to_uppercase(),
            role: Role::Agent,
        }
    }

    #[test]
    fn insert_get_remove() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId("c1".into());
        assert!(registry.insert(conn.clone(), session("u1", "acme")).is_none());
        assert!(registry.contains(&conn));
        assert_eq!(registry.get(&conn).unwrap().user_id, "u1");

        assert!(registry.remove(&conn).is_some());
        assert!(registry.remove(&conn).is_none(), "second remove is a no-op");
        assert!(registry.is_empty());
    }

    #[test]
    fn roster_is_per_company_and_deduplicated() {
        let registry = PresenceRegistry::new();
        registry.insert(ConnectionId("a".into()), session("u2", "acme"));
        registry.insert(ConnectionId("b".into()), session("u1", "acme"));
        registry.insert(ConnectionId("c".into()), session("u1", "acme"));
        registry.insert(ConnectionId("d".into()), session("u9", "globex"));

        let roster = registry.roster("acme");
        let ids: Vec<&str> = roster.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(roster[0].display_name, "U1");
        assert_eq!(registry.len(), 4);
    }
}
