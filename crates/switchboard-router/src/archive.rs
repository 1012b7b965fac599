// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Closing a customer's conversation into the anonymized archive.

use std::sync::Arc;

use chrono::Utc;
use switchboard_core::{
    ArchiveOutcome, ArchivedConversation, ArchivedMessage, ConversationStore, ConversationThread,
    Direction, SwitchboardError,
};
use switchboard_security::{Pseudonymizer, scrub_pii};
use tracing::{debug, info, warn};

/// Rebuilds allowed when messages keep arriving while an archive is built.
const MAX_ARCHIVE_ATTEMPTS: usize = 3;

/// Builds pseudonymized archives and swaps them in for live conversations.
pub struct Archiver {
    store: Arc<dyn ConversationStore>,
    pseudonymizer: Pseudonymizer,
    redaction_marker: String,
}

impl Archiver {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        pseudonymizer: Pseudonymizer,
        redaction_marker: impl Into<String>,
    ) -> Self {
        Self {
            store,
            pseudonymizer,
            redaction_marker: redaction_marker.into(),
        }
    }

    /// Archive the sender's active conversation in `company_id`.
    ///
    /// Returns `None` when there is nothing to archive, including when a
    /// concurrent close got there first. If a message lands between reading
    /// the thread and the swap, the archive is rebuilt from a fresh read.
    pub async fn archive(
        &self,
        company_id: &str,
        sender_id: &str,
    ) -> Result<Option<ArchivedConversation>, SwitchboardError> {
        for attempt in 1..=MAX_ARCHIVE_ATTEMPTS {
            let Some(conversation) = self
                .store
                .find_active_conversation(sender_id, company_id)
                .await?
            else {
                debug!(company_id, "no active conversation to archive");
                return Ok(None);
            };
            let Some(thread) = self.store.get_thread(&conversation.id).await? else {
                return Ok(None);
            };

            let archive = self.anonymize(thread);
            match self.store.archive_conversation(&archive).await? {
                ArchiveOutcome::Archived => {
                    info!(
                        conversation_id = %archive.original_conversation_id,
                        archive_id = %archive.id,
                        company_id,
                        messages = archive.messages.len(),
                        "conversation archived"
                    );
                    return Ok(Some(archive));
                }
                ArchiveOutcome::Gone => {
                    debug!(conversation_id = %archive.original_conversation_id, "conversation already archived");
                    return Ok(None);
                }
                ArchiveOutcome::Stale => {
                    debug!(conversation_id = %archive.original_conversation_id, attempt, "thread changed during archive, rebuilding");
                }
            }
        }
        warn!(company_id, "conversation kept changing, archive abandoned");
        Err(SwitchboardError::Internal(format!(
            "conversation still receiving messages after {MAX_ARCHIVE_ATTEMPTS} archive attempts"
        )))
    }

    fn anonymize(&self, thread: ConversationThread) -> ArchivedConversation {
        let ConversationThread {
            conversation,
            messages,
        } = thread;
        let pseudonym = self.pseudonymizer.pseudonym(&conversation.sender_id);
        let label = Pseudonymizer::label(&pseudonym);
        let id = uuid::Uuid::new_v4().to_string();

        let messages = messages
            .into_iter()
            .map(|m| {
                let (user_id, username) = match m.direction {
                    Direction::Inbound => (pseudonym.clone(), label.clone()),
                    Direction::Outbound => (m.user_id, m.username),
                };
                ArchivedMessage {
                    id: m.id,
                    archived_conversation_id: id.clone(),
                    provider_message_id: m.provider_message_id,
                    user_id,
                    username,
                    content: scrub_pii(&m.content, &self.redaction_marker),
                    direction: m.direction,
                    sent_at: m.sent_at,
                    status: m.status,
                    changed_at: m.changed_at,
                }
            })
            .collect();

        ArchivedConversation {
            id,
            original_conversation_id: conversation.id,
            sender_pseudonym: pseudonym,
            sender_label: label,
            company_id: conversation.company_id,
            assigned_user_id: conversation.assigned_user_id,
            assigned_team_id: conversation.assigned_team_id,
            source: conversation.source,
            created_at: conversation.created_at,
            archived_at: Utc::now(),
            messages,
        }
    }
}
