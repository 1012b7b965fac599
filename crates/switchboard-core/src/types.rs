// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Switchboard components.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of one physical real-time connection.
///
/// An agent with several tabs or devices open holds several connection ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Generate a fresh random connection id.
    pub fn generate() -> Self {
        ConnectionId(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Transport,
}

/// Messaging provider a conversation arrived through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Source {
    Facebook,
    WhatsApp,
}

/// Which side of the conversation authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Direction {
    /// Written by the customer, received from the provider.
    Inbound,
    /// Written by an agent, delivered through the provider.
    Outbound,
}

/// Delivery status of a stored message.
///
/// Outbound messages move forward through
/// `SentToProvider < Sent < Delivered < Read` and never regress. `Error`
/// can be entered from any state and is terminal. `Received` marks inbound
/// customer messages and ranks alongside `SentToProvider`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum MessageStatus {
    Received,
    SentToProvider,
    Sent,
    Delivered,
    Read,
    Error,
}

impl MessageStatus {
    /// Position in the forward delivery order, `None` for the terminal error state.
    pub fn rank(self) -> Option<u8> {
        match self {
            MessageStatus::Received | MessageStatus::SentToProvider => Some(0),
            MessageStatus::Sent => Some(1),
            MessageStatus::Delivered => Some(2),
            MessageStatus::Read => Some(3),
            MessageStatus::Error => None,
        }
    }

    /// Returns `true` once no further transition is possible.
    pub fn is_terminal(self) -> bool {
        self == MessageStatus::Error
    }

    /// Computes the status that results from applying an update to `self`.
    ///
    /// Returns `None` when the update must be ignored: the message is already
    /// in the error state, or the update does not move strictly forward.
    /// An update that carries an error always yields `Error`.
    pub fn advance(self, incoming: MessageStatus, carries_error: bool) -> Option<MessageStatus> {
        if self.is_terminal() {
            return None;
        }
        if carries_error || incoming == MessageStatus::Error {
            return Some(MessageStatus::Error);
        }
        match (self.rank(), incoming.rank()) {
            (Some(current), Some(next)) if next > current => Some(incoming),
            _ => None,
        }
    }
}

/// Agent-side roles recognised by the hub.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Role {
    Customer,
    Agent,
    Manager,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Roles allowed to open a real-time hub connection.
    pub const HUB_ROLES: [Role; 4] = [Role::Agent, Role::Manager, Role::Admin, Role::SuperAdmin];

    /// Returns `true` if this role may connect to the hub.
    pub fn may_connect(self) -> bool {
        Self::HUB_ROLES.contains(&self)
    }
}

/// Broadcast group a connection can be joined to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Every connected agent of a company.
    Company(String),
    /// Every connected member of one team.
    Team(String),
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Company(id) => write!(f, "company:{id}"),
            GroupKey::Team(id) => write!(f, "team:{id}"),
        }
    }
}

/// The ongoing thread between one customer and one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    /// Provider-side customer identifier (PSID, WhatsApp id).
    pub sender_id: String,
    pub sender_username: String,
    pub company_id: String,
    pub assigned_user_id: Option<String>,
    pub assigned_team_id: Option<String>,
    pub source: Source,
    pub is_assigned: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// A new unassigned, active conversation for a first-time sender.
    pub fn open(
        sender_id: impl Into<String>,
        sender_username: impl Into<String>,
        company_id: impl Into<String>,
        source: Source,
        team_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            sender_username: sender_username.into(),
            company_id: company_id.into(),
            assigned_user_id: None,
            assigned_team_id: team_id,
            source,
            is_assigned: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// The group that sees this conversation while it waits in the pending
    /// queue. Every staff member of the company joins it, whatever their teams.
    pub fn pending_group(&self) -> GroupKey {
        GroupKey::Company(self.company_id.clone())
    }
}

/// One stored message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Provider id: the inbound message id, or the id the provider assigned on send.
    pub provider_message_id: Option<String>,
    pub conversation_id: String,
    /// Author: the customer's sender id or the agent's user id.
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub direction: Direction,
    pub sent_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub changed_at: DateTime<Utc>,
    pub error_text: Option<String>,
}

impl Message {
    /// A customer message received from the provider.
    pub fn inbound(
        conversation: &Conversation,
        provider_message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider_message_id: Some(provider_message_id.into()),
            conversation_id: conversation.id.clone(),
            user_id: conversation.sender_id.clone(),
            username: conversation.sender_username.clone(),
            content: content.into(),
            direction: Direction::Inbound,
            sent_at: now,
            status: MessageStatus::Received,
            changed_at: now,
            error_text: None,
        }
    }

    /// An agent reply that is about to be handed to the provider.
    pub fn outbound(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider_message_id: None,
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            username: username.into(),
            content: content.into(),
            direction: Direction::Outbound,
            sent_at: now,
            status: MessageStatus::SentToProvider,
            changed_at: now,
            error_text: None,
        }
    }
}

/// A conversation together with its messages in append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationThread {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Anonymized historical copy of a closed conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedConversation {
    pub id: String,
    /// Id the conversation had while it was live.
    pub original_conversation_id: String,
    /// Stable one-way pseudonym of the customer's sender id.
    pub sender_pseudonym: String,
    pub sender_label: String,
    pub company_id: String,
    pub assigned_user_id: Option<String>,
    pub assigned_team_id: Option<String>,
    pub source: Source,
    pub created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
    pub messages: Vec<ArchivedMessage>,
}

/// Result of swapping an archive in for its live conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Archived,
    /// The live conversation no longer exists.
    Gone,
    /// The live conversation gained or lost messages since the archive was
    /// built. Nothing was written.
    Stale,
}

/// A message inside an [`ArchivedConversation`], with PII scrubbed from its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedMessage {
    pub id: String,
    pub archived_conversation_id: String,
    pub provider_message_id: Option<String>,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub direction: Direction,
    pub sent_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub changed_at: DateTime<Utc>,
}

/// In-memory presence entry for one connected agent connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub user_id: String,
    pub company_id: String,
    pub team_ids: BTreeSet<String>,
    pub display_name: String,
    pub role: Role,
}

impl AgentSession {
    /// Every broadcast group this session belongs to, company group first.
    pub fn groups(&self) -> Vec<GroupKey> {
        std::iter::once(GroupKey::Company(self.company_id.clone()))
            .chain(self.team_ids.iter().cloned().map(GroupKey::Team))
            .collect()
    }
}

/// Per-company provider binding: how to recognise its webhooks and how to reply.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub company_id: String,
    pub source: Source,
    /// Key found in inbound webhooks (Facebook page id, WhatsApp business account id).
    pub company_key: String,
    /// Id used when sending (Facebook page id, WhatsApp phone number id).
    pub routing_id: String,
    pub access_token: String,
    /// Team that new conversations on this channel are queued for.
    pub default_team_id: Option<String>,
}

impl std::fmt::Debug for ChannelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSettings")
            .field("company_id", &self.company_id)
            .field("source", &self.source)
            .field("company_key", &self.company_key)
            .field("routing_id", &self.routing_id)
            .field("access_token", &"[redacted]")
            .field("default_team_id", &self.default_team_id)
            .finish()
    }
}

/// Durable user record resolved from an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    /// `None` for users not bound to any company; they cannot connect.
    pub company_id: Option<String>,
    pub team_ids: BTreeSet<String>,
    pub display_name: String,
    pub role: Role,
}

/// Identity established from connection credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub roles: Vec<Role>,
}

/// Credentials presented when opening a hub connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_moves_forward_only() {
        use MessageStatus::*;
        assert_eq!(SentToProvider.advance(Sent, false), Some(Sent));
        assert_eq!(Sent.advance(Delivered, false), Some(Delivered));
        assert_eq!(Delivered.advance(Read, false), Some(Read));
        assert_eq!(Delivered.advance(Sent, false), None);
        assert_eq!(Read.advance(Read, false), None);
        assert_eq!(SentToProvider.advance(Read, false), Some(Read));
    }

    #[test]
    fn error_wins_and_is_terminal() {
        use MessageStatus::*;
        assert_eq!(Read.advance(Sent, true), Some(Error));
        assert_eq!(Sent.advance(Error, false), Some(Error));
        assert_eq!(Error.advance(Read, false), None);
        assert_eq!(Error.advance(Error, true), None);
    }

    #[test]
    fn received_ranks_with_sent_to_provider() {
        assert_eq!(
            MessageStatus::Received.rank(),
            MessageStatus::SentToProvider.rank()
        );
        assert_eq!(
            MessageStatus::Received.advance(MessageStatus::SentToProvider, false),
            None
        );
    }

    #[test]
    fn status_display_round_trips() {
        for status in [
            MessageStatus::Received,
            MessageStatus::SentToProvider,
            MessageStatus::Sent,
            MessageStatus::Delivered,
            MessageStatus::Read,
            MessageStatus::Error,
        ] {
            assert_eq!(MessageStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn only_staff_roles_may_connect() {
        assert!(!Role::Customer.may_connect());
        assert!(Role::Agent.may_connect());
        assert!(Role::SuperAdmin.may_connect());
    }

    #[test]
    fn group_keys_render_with_scope_prefix() {
        assert_eq!(GroupKey::Company("c1".into()).to_string(), "company:c1");
        assert_eq!(GroupKey::Team("t9".into()).to_string(), "team:t9");
    }

    #[test]
    fn pending_group_is_the_company_even_with_a_team() {
        let mut conv = Conversation::open("s", "Sam", "c1", Source::WhatsApp, None);
        assert_eq!(conv.pending_group(), GroupKey::Company("c1".into()));
        conv.assigned_team_id = Some("t1".into());
        assert_eq!(conv.pending_group(), GroupKey::Company("c1".into()));
    }

    #[test]
    fn session_groups_list_company_then_teams() {
        let session = AgentSession {
            user_id: "u1".into(),
            company_id: "c1".into(),
            team_ids: ["t2".to_string(), "t1".to_string()].into_iter().collect(),
            display_name: "Ada".into(),
            role: Role::Agent,
        };
        assert_eq!(
            session.groups(),
            vec![
                GroupKey::Company("c1".into()),
                GroupKey::Team("t1".into()),
                GroupKey::Team("t2".into()),
            ]
        );
    }

    #[test]
    fn channel_settings_debug_hides_token() {
        let settings = ChannelSettings {
            company_id: "c1".into(),
            source: Source::Facebook,
            company_key: "PAGE".into(),
            routing_id: "PAGE".into(),
            access_token: "EAAGsecret".into(),
            default_team_id: None,
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("EAAGsecret"));
    }
}
