// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`Broadcaster`] backed by one bounded mpsc queue per connection.
//!
//! The transport (the gateway's WebSocket task) drains each queue. Pushes use
//! `try_send`: a full or closed queue drops the event instead of blocking the
//! caller.

use std::collections::HashSet;

use dashmap::DashMap;
use switchboard_core::{Broadcaster, ConnectionId, GroupKey, PushEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

struct Outbox {
    user_id: String,
    tx: mpsc::Sender<String>,
}

/// Channel-backed fan-out of encoded push events.
#[derive(Default)]
pub struct ChannelBroadcaster {
    outboxes: DashMap<ConnectionId, Outbox>,
    users: DashMap<String, HashSet<ConnectionId>>,
    groups: DashMap<GroupKey, HashSet<ConnectionId>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outgoing queue of a new connection.
    pub fn attach(&self, connection: ConnectionId, user_id: &str, tx: mpsc::Sender<String>) {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .insert(connection.clone());
        self.outboxes.insert(
            connection,
            Outbox {
                user_id: user_id.to_string(),
                tx,
            },
        );
    }

    /// Drop a connection's queue and remove it from every group. Idempotent.
    pub fn detach(&self, connection: &ConnectionId) {
        if let Some((_, outbox)) = self.outboxes.remove(connection) {
            if let Some(mut set) = self.users.get_mut(&outbox.user_id) {
                set.remove(connection);
            }
            self.users.remove_if(&outbox.user_id, |_, set| set.is_empty());
        }

        let joined: Vec<GroupKey> = self
            .groups
            .iter()
            .filter(|entry| entry.value().contains(connection))
            .map(|entry| entry.key().clone())
            .collect();
        for group in joined {
            self.remove_from_group(connection, &group);
        }
    }

    /// Current members of a group.
    pub fn members(&self, group: &GroupKey) -> Vec<ConnectionId> {
        self.groups
            .get(group)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Groups a connection currently belongs to.
    pub fn groups_of(&self, connection: &ConnectionId) -> Vec<GroupKey> {
        self.groups
            .iter()
            .filter(|entry| entry.value().contains(connection))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }

    fn deliver(&self, connection: &ConnectionId, kind: &str, frame: &str) {
        let Some(outbox) = self.outboxes.get(connection) else {
            debug!(%connection, kind, "push to unknown connection dropped");
            return;
        };
        match outbox.tx.try_send(frame.to_string()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%connection, kind, "connection queue full, push dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(%connection, kind, "connection closed, push dropped");
            }
        }
    }

    fn encode(event: &PushEvent) -> Option<String> {
        match event.to_json() {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!(kind = event.kind(), error = %e, "failed to encode push event");
                None
            }
        }
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn send_to_connection(&self, connection: &ConnectionId, event: &PushEvent) {
        if let Some(frame) = Self::encode(event) {
            self.deliver(connection, event.kind(), &frame);
        }
    }

    fn send_to_user(&self, user_id: &str, event: &PushEvent) {
        let targets: Vec<ConnectionId> = self
            .users
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        if targets.is_empty() {
            debug!(user_id, kind = event.kind(), "user not connected, push dropped");
            return;
        }
        if let Some(frame) = Self::encode(event) {
            for connection in &targets {
                self.deliver(connection, event.kind(), &frame);
            }
        }
    }

    fn send_to_group(&self, group: &GroupKey, event: &PushEvent) {
        let targets = self.members(group);
        if targets.is_empty() {
            debug!(%group, kind = event.kind(), "group empty, push dropped");
            return;
        }
        if let Some(frame) = Self::encode(event) {
            for connection in &targets {
                self.deliver(connection, event.kind(), &frame);
            }
        }
    }

    fn add_to_group(&self, connection: &ConnectionId, group: &GroupKey) {
        self.groups
            .entry(group.clone())
            .or_default()
            .insert(connection.clone());
    }

    fn remove_from_group(&self, connection: &ConnectionId, group: &GroupKey) {
        if let Some(mut set) = self.groups.get_mut(group) {
            set.remove(connection);
        }
        self.groups.remove_if(group, |_, set| set.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::TeamMember;

    fn roster_event() -> PushEvent {
        PushEvent::AddTeamMember(TeamMember {
            user_id: "u1".into(),
            display_name: "Ada".into(),
            company_id: "acme".into(),
        })
    }

    fn attach(b: &ChannelBroadcaster, id: &str, user: &str, cap: usize) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(cap);
        b.attach(ConnectionId(id.into()), user, tx);
        rx
    }

    #[test]
    fn send_to_user_reaches_every_connection() {
        let b = ChannelBroadcaster::new();
        let mut tab1 = attach(&b, "c1", "u1", 4);
        let mut tab2 = attach(&b, "c2", "u1", 4);
        let mut other = attach(&b, "c3", "u2", 4);

        b.send_to_user("u1", &roster_event());
        assert!(tab1.try_recv().unwrap().contains("AddTeamMember"));
        assert!(tab2.try_recv().is_ok());
        assert!(other.try_recv().is_err());

        // Unknown users are a silent no-op.
        b.send_to_user("nobody", &roster_event());
    }

    #[test]
    fn group_fan_out_and_membership() {
        let b = ChannelBroadcaster::new();
        let mut rx1 = attach(&b, "c1", "u1", 4);
        let mut rx2 = attach(&b, "c2", "u2", 4);
        let team = GroupKey::Team("t1".into());
        b.add_to_group(&ConnectionId("c1".into()), &team);

        b.send_to_group(&team, &roster_event());
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());

        b.remove_from_group(&ConnectionId("c1".into()), &team);
        assert!(b.members(&team).is_empty());
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let b = ChannelBroadcaster::new();
        let mut rx = attach(&b, "c1", "u1", 1);
        let conn = ConnectionId("c1".into());
        b.send_to_connection(&conn, &roster_event());
        b.send_to_connection(&conn, &roster_event());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "second push was dropped");
    }

    #[test]
    fn detach_leaves_all_groups() {
        let b = ChannelBroadcaster::new();
        let _rx = attach(&b, "c1", "u1", 4);
        let conn = ConnectionId("c1".into());
        let company = GroupKey::Company("acme".into());
        let team = GroupKey::Team("t1".into());
        b.add_to_group(&conn, &company);
        b.add_to_group(&conn, &team);
        assert_eq!(b.groups_of(&conn).len(), 2);

        b.detach(&conn);
        b.detach(&conn);
        assert!(b.groups_of(&conn).is_empty());
        assert_eq!(b.connection_count(), 0);
    }
}
