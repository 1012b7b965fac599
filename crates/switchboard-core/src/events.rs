// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized inbound events, outbound requests, and the real-time wire contract.
//!
//! Provider adapters translate webhook payloads into [`InboundBatch`]es. The
//! hub speaks [`PushEvent`] (server to agent) and [`AgentOperation`] (agent to
//! server), both encoded as `{"type": <name>, "data": <payload>}` JSON.

use serde::{Deserialize, Serialize};

use crate::types::{Conversation, ConversationThread, Message, MessageStatus, Source};

/// Events extracted from one provider `entry`, all sharing the same company key.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundBatch {
    pub source: Source,
    /// Page id (Facebook) or business account id (WhatsApp).
    pub company_key: String,
    pub events: Vec<InboundEvent>,
}

/// One normalized unit of provider input.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    NewMessage(NewMessage),
    StatusUpdate(StatusUpdate),
    Watermark(Watermark),
}

/// A customer text message received from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub company_key: String,
    pub sender_id: String,
    pub username: String,
    pub text: String,
    pub provider_message_id: String,
    pub source: Source,
}

/// How a status update identifies the message it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRef {
    /// The id the provider assigned to the message.
    Provider(String),
    /// The local message id, used for updates synthesized by the router.
    Local(String),
}

/// A delivery status change for a single message.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub target: MessageRef,
    pub status: MessageStatus,
    /// Provider-reported time of the change; `None` for synthetic updates.
    pub timestamp_unix: Option<i64>,
    pub error_text: Option<String>,
}

impl StatusUpdate {
    /// A synthetic error update for a message that never reached the provider.
    pub fn local_error(message_id: impl Into<String>, error_text: impl Into<String>) -> Self {
        Self {
            target: MessageRef::Local(message_id.into()),
            status: MessageStatus::Error,
            timestamp_unix: None,
            error_text: Some(error_text.into()),
        }
    }

    /// Returns `true` if this update carries an error.
    pub fn carries_error(&self) -> bool {
        self.error_text.is_some()
    }
}

/// A read or delivery high-water mark covering every outbound message up to a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub company_key: String,
    /// The customer whose conversation the watermark applies to.
    pub sender_id: String,
    pub status: MessageStatus,
    /// Milliseconds since the Unix epoch, as Messenger reports it.
    pub watermark_unix_ms: i64,
}

/// A reply to hand to the provider.
#[derive(Clone, PartialEq)]
pub struct OutboundMessage {
    /// Provider-side customer id (PSID or WhatsApp id).
    pub recipient_id: String,
    pub text: String,
    pub access_token: String,
    /// Page id (Facebook) or phone number id (WhatsApp) to send from.
    pub routing_id: String,
}

impl std::fmt::Debug for OutboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundMessage")
            .field("recipient_id", &self.recipient_id)
            .field("text_len", &self.text.len())
            .field("access_token", &"[redacted]")
            .field("routing_id", &self.routing_id)
            .finish()
    }
}

/// Roster entry sent with presence changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: String,
    pub display_name: String,
    pub company_id: String,
}

/// Server-to-agent push events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushEvent {
    /// Snapshot of conversations assigned to the connecting agent.
    LoadAssignedConversations(Vec<ConversationThread>),
    /// Snapshot of the pending (unassigned) queue visible to the connecting agent.
    LoadNewConversations(Vec<ConversationThread>),
    NewConversationAdded(ConversationThread),
    AssignConversation(ConversationThread),
    RemoveNewConversation(Conversation),
    SendMessageToAssignedUser(Message),
    #[serde(rename_all = "camelCase")]
    MessageStatusUpdated {
        message_id: String,
        status: MessageStatus,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
    AddTeamMember(TeamMember),
    RemoveTeamMember(TeamMember),
    /// An agent operation failed; only the acting connection receives this.
    OperationFailed { operation: String, message: String },
}

impl PushEvent {
    /// Wire name of the event, matching the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            PushEvent::LoadAssignedConversations(_) => "LoadAssignedConversations",
            PushEvent::LoadNewConversations(_) => "LoadNewConversations",
            PushEvent::NewConversationAdded(_) => "NewConversationAdded",
            PushEvent::AssignConversation(_) => "AssignConversation",
            PushEvent::RemoveNewConversation(_) => "RemoveNewConversation",
            PushEvent::SendMessageToAssignedUser(_) => "SendMessageToAssignedUser",
            PushEvent::MessageStatusUpdated { .. } => "MessageStatusUpdated",
            PushEvent::AddTeamMember(_) => "AddTeamMember",
            PushEvent::RemoveTeamMember(_) => "RemoveTeamMember",
            PushEvent::OperationFailed { .. } => "OperationFailed",
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Agent-to-server operations sent over the hub socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AgentOperation {
    #[serde(rename_all = "camelCase")]
    AssignConversationToUser { conversation_id: String },
    #[serde(rename_all = "camelCase")]
    SendMessageToCustomer { conversation_id: String, text: String },
    #[serde(rename_all = "camelCase")]
    CloseAndAnonymizeChat { customer_id: String },
}

impl AgentOperation {
    /// Wire name of the operation, matching the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentOperation::AssignConversationToUser { .. } => "AssignConversationToUser",
            AgentOperation::SendMessageToCustomer { .. } => "SendMessageToCustomer",
            AgentOperation::CloseAndAnonymizeChat { .. } => "CloseAndAnonymizeChat",
        }
    }
}
