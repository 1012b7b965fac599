// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding provider delivery statuses back into stored messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use switchboard_core::{
    Broadcaster, ConversationStore, MessageRef, MessageStatus, PushEvent, StatusUpdate,
    SwitchboardError, Watermark,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Applies [`StatusUpdate`]s under the forward-only status rule.
///
/// Reads and writes of a message's status are serialized so concurrent
/// updates for the same message cannot regress it.
pub struct StatusReconciler {
    store: Arc<dyn ConversationStore>,
    broadcaster: Arc<dyn Broadcaster>,
    apply_lock: Mutex<()>,
}

impl StatusReconciler {
    pub fn new(store: Arc<dyn ConversationStore>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            store,
            broadcaster,
            apply_lock: Mutex::new(()),
        }
    }

    /// Apply one update. Returns the new status, or `None` if nothing changed.
    ///
    /// Unknown messages are not an error: providers report on messages sent
    /// before this store existed, or already archived.
    pub async fn apply_status(
        &self,
        update: &StatusUpdate,
    ) -> Result<Option<MessageStatus>, SwitchboardError> {
        let _guard = self.apply_lock.lock().await;

        let Some(message) = self.store.find_message(&update.target).await? else {
            debug!(message_ref = ?update.target, "status update for unknown message");
            return Ok(None);
        };

        let Some(next) = message.status.advance(update.status, update.carries_error()) else {
            debug!(
                message_id = %message.id,
                current = %message.status,
                incoming = %update.status,
                "status update ignored"
            );
            return Ok(None);
        };

        let changed_at = update
            .timestamp_unix
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);
        self.store
            .update_message_status(&message.id, next, changed_at, update.error_text.as_deref())
            .await?;
        debug!(message_id = %message.id, from = %message.status, to = %next, "message status changed");

        let conversation = self.store.get_conversation(&message.conversation_id).await?;
        if let Some(user_id) = conversation.and_then(|c| c.assigned_user_id) {
            self.broadcaster.send_to_user(
                &user_id,
                &PushEvent::MessageStatusUpdated {
                    message_id: message.id.clone(),
                    status: next,
                    error: update.error_text.clone().or(message.error_text),
                },
            );
        }
        Ok(Some(next))
    }

    /// Advance every outbound message of the sender's active conversation sent
    /// at or before the watermark. Returns how many messages changed.
    pub async fn apply_watermark(
        &self,
        company_id: &str,
        watermark: &Watermark,
    ) -> Result<usize, SwitchboardError> {
        let Some(conversation) = self
            .store
            .find_active_conversation(&watermark.sender_id, company_id)
            .await?
        else {
            debug!(sender_id = %watermark.sender_id, company_id, "watermark without active conversation");
            return Ok(0);
        };
        let Some(until) = DateTime::from_timestamp_millis(watermark.watermark_unix_ms) else {
            warn!(watermark = watermark.watermark_unix_ms, "watermark out of range");
            return Ok(0);
        };

        let covered = self
            .store
            .outbound_messages_until(&conversation.id, until)
            .await?;
        let mut changed = 0;
        for message in covered {
            if message.status.advance(watermark.status, false).is_none() {
                continue;
            }
            let update = StatusUpdate {
                target: MessageRef::Local(message.id),
                status: watermark.status,
                timestamp_unix: Some(watermark.watermark_unix_ms / 1000),
                error_text: None,
            };
            if self.apply_status(&update).await?.is_some() {
                changed += 1;
            }
        }
        debug!(conversation_id = %conversation.id, changed, status = %watermark.status, "watermark applied");
        Ok(changed)
    }
}
