// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claiming conversations out of the pending queue.

use std::sync::Arc;

use switchboard_core::{
    Broadcaster, ConversationStore, ConversationThread, PushEvent, SwitchboardError,
};
use tracing::info;

/// Moves conversations from unassigned to assigned.
///
/// Reassignment is allowed and the last claim wins.
pub struct AssignmentEngine {
    store: Arc<dyn ConversationStore>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl AssignmentEngine {
    pub fn new(store: Arc<dyn ConversationStore>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { store, broadcaster }
    }

    /// Assign a conversation of `company_id` to `user_id`.
    ///
    /// The claimer receives the full thread; the group that was shown the
    /// pending conversation is told to drop it.
    pub async fn claim(
        &self,
        company_id: &str,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<ConversationThread, SwitchboardError> {
        let not_found = || SwitchboardError::NotFound {
            entity: "conversation",
            id: conversation_id.to_string(),
        };

        let before = self
            .store
            .get_conversation(conversation_id)
            .await?
            .filter(|c| c.company_id == company_id && c.is_active)
            .ok_or_else(not_found)?;
        let assigned = self
            .store
            .assign_conversation(conversation_id, user_id)
            .await?
            .ok_or_else(not_found)?;
        let thread = self
            .store
            .get_thread(conversation_id)
            .await?
            .ok_or_else(not_found)?;

        match &before.assigned_user_id {
            Some(previous) if previous != user_id => {
                info!(conversation_id, company_id, user_id, %previous, "conversation reassigned")
            }
            _ => info!(conversation_id, company_id, user_id, "conversation claimed"),
        }

        self.broadcaster
            .send_to_user(user_id, &PushEvent::AssignConversation(thread.clone()));
        self.broadcaster.send_to_group(
            &before.pending_group(),
            &PushEvent::RemoveNewConversation(assigned),
        );
        Ok(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingBroadcaster, Target, seeded_store};
    use switchboard_core::{Conversation, GroupKey, Message, Source};

    async fn pending(
        store: &switchboard_storage::SqliteStore,
        team: Option<&str>,
    ) -> Conversation {
        let conv = Conversation::open(
            "wa_123",
            "Wanda",
            "acme",
            Source::WhatsApp,
            team.map(str::to_string),
        );
        store
            .create_conversation(&conv, &Message::inbound(&conv, "wamid.1", "hi"))
            .await
            .unwrap();
        conv
    }

    #[tokio::test]
    async fn claim_pushes_thread_to_claimer_and_removal_to_company() {
        let (_dir, store) = seeded_store(None).await;
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let engine = AssignmentEngine::new(store.clone(), broadcaster.clone());
        let conv = pending(&store, Some("support")).await;

        let thread = engine.claim("acme", &conv.id, "agent-1").await.unwrap();
        assert!(thread.conversation.is_assigned);
        assert_eq!(thread.conversation.assigned_user_id.as_deref(), Some("agent-1"));
        assert_eq!(thread.messages.len(), 1);
        assert!(store.list_unassigned("acme").await.unwrap().is_empty());

        let pushes = broadcaster.take();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[0].0, Target::User("agent-1".into()));
        assert_eq!(pushes[0].1.kind(), "AssignConversation");
        assert_eq!(pushes[1].0, Target::Group(GroupKey::Company("acme".into())));
        assert_eq!(pushes[1].1.kind(), "RemoveNewConversation");
    }

    #[tokio::test]
    async fn last_claim_wins() {
        let (_dir, store) = seeded_store(None).await;
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let engine = AssignmentEngine::new(store.clone(), broadcaster.clone());
        let conv = pending(&store, None).await;

        engine.claim("acme", &conv.id, "agent-1").await.unwrap();
        engine.claim("acme", &conv.id, "agent-2").await.unwrap();

        assert!(store.list_assigned("acme", "agent-1").await.unwrap().is_empty());
        assert_eq!(store.list_assigned("acme", "agent-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_across_companies_is_not_found() {
        let (_dir, store) = seeded_store(None).await;
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let engine = AssignmentEngine::new(store.clone(), broadcaster.clone());
        let conv = pending(&store, None).await;

        let err = engine.claim("globex", &conv.id, "spy").await.unwrap_err();
        assert!(matches!(err, SwitchboardError::NotFound { entity: "conversation", .. }));
        let err = engine.claim("acme", "missing", "agent-1").await.unwrap_err();
        assert!(matches!(err, SwitchboardError::NotFound { .. }));
        assert!(broadcaster.take().is_empty());
        assert_eq!(store.list_unassigned("acme").await.unwrap().len(), 1);
    }
}
