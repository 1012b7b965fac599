// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SwitchboardError;
use crate::events::MessageRef;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ArchiveOutcome, ArchivedConversation, Conversation, ConversationThread, Message, MessageStatus,
};

/// Durable storage of live conversations, their messages, and the archive.
///
/// Each method is one storage unit: either all of its writes land or none do.
#[async_trait]
pub trait ConversationStore: PluginAdapter {
    /// The single active conversation for a sender within a company, if any.
    async fn find_active_conversation(
        &self,
        sender_id: &str,
        company_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    /// A conversation with all of its messages in append order.
    async fn get_thread(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationThread>, SwitchboardError>;

    /// Inserts a new conversation together with its first message.
    async fn create_conversation(
        &self,
        conversation: &Conversation,
        first_message: &Message,
    ) -> Result<(), SwitchboardError>;

    /// Appends a message to an existing conversation.
    async fn append_message(&self, message: &Message) -> Result<(), SwitchboardError>;

    /// Sets the assignee and returns the updated conversation, or `None` if it does not exist.
    async fn assign_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    /// Active conversations of a company assigned to one user.
    async fn list_assigned(
        &self,
        company_id: &str,
        user_id: &str,
    ) -> Result<Vec<ConversationThread>, SwitchboardError>;

    /// Active, unassigned conversations of a company.
    async fn list_unassigned(
        &self,
        company_id: &str,
    ) -> Result<Vec<ConversationThread>, SwitchboardError>;

    async fn find_message(
        &self,
        target: &MessageRef,
    ) -> Result<Option<Message>, SwitchboardError>;

    async fn update_message_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        changed_at: DateTime<Utc>,
        error_text: Option<&str>,
    ) -> Result<(), SwitchboardError>;

    async fn set_provider_message_id(
        &self,
        message_id: &str,
        provider_message_id: &str,
    ) -> Result<(), SwitchboardError>;

    /// Outbound messages of a conversation sent at or before `until`, oldest first.
    async fn outbound_messages_until(
        &self,
        conversation_id: &str,
        until: DateTime<Utc>,
    ) -> Result<Vec<Message>, SwitchboardError>;

    /// Inserts the archive and deletes the live conversation it was built from,
    /// atomically. Writes nothing unless the live messages are exactly the
    /// archived ones.
    async fn archive_conversation(
        &self,
        archive: &ArchivedConversation,
    ) -> Result<ArchiveOutcome, SwitchboardError>;
}
