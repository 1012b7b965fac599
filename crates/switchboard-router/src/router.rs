// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound and outbound message routing.
//!
//! Inbound: provider batch -> owning company -> active conversation (found or
//! created) -> push to whoever should see it. Outbound: agent reply -> stored
//! message -> provider send -> status pushed back to the author.

use std::collections::HashMap;
use std::sync::Arc;

use switchboard_core::{
    AgentSession, Broadcaster, ChannelDirectory, ChannelSettings, Conversation,
    ConversationStore, ConversationThread, InboundBatch, InboundEvent, Message, MessageStatus,
    NewMessage, OutboundMessage, ProviderChannel, PushEvent, Source, StatusUpdate,
    SwitchboardError,
};
use tracing::{debug, info, warn};

use crate::status::StatusReconciler;

/// What routing an inbound message did.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// A new conversation was opened with this message.
    Created { conversation_id: String, message_id: String },
    /// The message was appended to the sender's active conversation.
    Appended { conversation_id: String, message_id: String },
    /// No company owns the key the message arrived on.
    Unrouted,
}

/// Routes customer messages in and agent replies out.
pub struct MessageRouter {
    store: Arc<dyn ConversationStore>,
    directory: Arc<dyn ChannelDirectory>,
    broadcaster: Arc<dyn Broadcaster>,
    reconciler: Arc<StatusReconciler>,
    providers: HashMap<Source, Arc<dyn ProviderChannel>>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        directory: Arc<dyn ChannelDirectory>,
        broadcaster: Arc<dyn Broadcaster>,
        reconciler: Arc<StatusReconciler>,
        providers: Vec<Arc<dyn ProviderChannel>>,
    ) -> Self {
        let providers = providers.into_iter().map(|p| (p.source(), p)).collect();
        Self {
            store,
            directory,
            broadcaster,
            reconciler,
            providers,
        }
    }

    pub fn provider(&self, source: Source) -> Option<&Arc<dyn ProviderChannel>> {
        self.providers.get(&source)
    }

    pub fn reconciler(&self) -> &Arc<StatusReconciler> {
        &self.reconciler
    }

    /// Route every event of one provider entry.
    ///
    /// The company key is resolved once. Each event is routed independently:
    /// a failing event is logged and the rest of the batch still runs.
    pub async fn dispatch_batch(&self, batch: &InboundBatch) {
        let settings = match self
            .directory
            .find_by_company_key(batch.source, &batch.company_key)
            .await
        {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                warn!(source = %batch.source, company_key = %batch.company_key, "no company bound to provider key, batch dropped");
                return;
            }
            Err(e) => {
                warn!(source = %batch.source, company_key = %batch.company_key, error = %e, "company lookup failed, batch dropped");
                return;
            }
        };

        for event in &batch.events {
            let result = match event {
                InboundEvent::NewMessage(msg) => self.route_for(&settings, msg).await.map(|_| ()),
                InboundEvent::StatusUpdate(update) => {
                    self.reconciler.apply_status(update).await.map(|_| ())
                }
                InboundEvent::Watermark(watermark) => self
                    .reconciler
                    .apply_watermark(&settings.company_id, watermark)
                    .await
                    .map(|_| ()),
            };
            if let Err(e) = result {
                warn!(
                    company_id = %settings.company_id,
                    source = %batch.source,
                    error = %e,
                    "inbound event failed, continuing with batch"
                );
            }
        }
    }

    /// Route one customer message, resolving its company first.
    pub async fn route_inbound(&self, msg: &NewMessage) -> Result<InboundOutcome, SwitchboardError> {
        match self
            .directory
            .find_by_company_key(msg.source, &msg.company_key)
            .await?
        {
            Some(settings) => self.route_for(&settings, msg).await,
            None => {
                warn!(source = %msg.source, company_key = %msg.company_key, "no company bound to provider key, message dropped");
                Ok(InboundOutcome::Unrouted)
            }
        }
    }

    async fn route_for(
        &self,
        settings: &ChannelSettings,
        msg: &NewMessage,
    ) -> Result<InboundOutcome, SwitchboardError> {
        let company_id = settings.company_id.as_str();
        if let Some(conversation) = self
            .store
            .find_active_conversation(&msg.sender_id, company_id)
            .await?
        {
            return self.append_inbound(&conversation, msg).await;
        }

        let conversation = Conversation::open(
            msg.sender_id.as_str(),
            msg.username.as_str(),
            company_id,
            msg.source,
            settings.default_team_id.clone(),
        );
        let first = Message::inbound(&conversation, msg.provider_message_id.as_str(), msg.text.as_str());
        if let Err(e) = self.store.create_conversation(&conversation, &first).await {
            // A concurrent message from the same sender may have opened it first.
            return match self
                .store
                .find_active_conversation(&msg.sender_id, company_id)
                .await?
            {
                Some(existing) => self.append_inbound(&existing, msg).await,
                None => Err(e),
            };
        }

        info!(
            conversation_id = %conversation.id,
            company_id,
            source = %msg.source,
            "new conversation opened"
        );
        let group = conversation.pending_group();
        let outcome = InboundOutcome::Created {
            conversation_id: conversation.id.clone(),
            message_id: first.id.clone(),
        };
        self.broadcaster.send_to_group(
            &group,
            &PushEvent::NewConversationAdded(ConversationThread {
                conversation,
                messages: vec![first],
            }),
        );
        Ok(outcome)
    }

    async fn append_inbound(
        &self,
        conversation: &Conversation,
        msg: &NewMessage,
    ) -> Result<InboundOutcome, SwitchboardError> {
        let message = Message::inbound(conversation, msg.provider_message_id.as_str(), msg.text.as_str());
        self.store.append_message(&message).await?;
        let outcome = InboundOutcome::Appended {
            conversation_id: conversation.id.clone(),
            message_id: message.id.clone(),
        };

        match (&conversation.assigned_user_id, conversation.is_assigned) {
            (Some(user_id), true) => {
                self.broadcaster
                    .send_to_user(user_id, &PushEvent::SendMessageToAssignedUser(message));
            }
            _ => debug!(conversation_id = %conversation.id, "message appended to unassigned conversation"),
        }
        Ok(outcome)
    }

    /// Store an agent reply and hand it to the provider.
    ///
    /// Provider failures do not fail the call: they become the message's
    /// `Error` status, pushed to the assignee and to the author. Errors are
    /// returned only when the reply could not be attempted at all.
    pub async fn route_outbound(
        &self,
        author: &AgentSession,
        conversation_id: &str,
        text: &str,
    ) -> Result<Message, SwitchboardError> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .filter(|c| c.company_id == author.company_id)
            .ok_or_else(|| SwitchboardError::NotFound {
                entity: "conversation",
                id: conversation_id.to_string(),
            })?;
        let settings = self
            .directory
            .find_for_company(&author.company_id, conversation.source)
            .await?
            .ok_or_else(|| {
                SwitchboardError::Config(format!(
                    "company {} has no {} channel configured",
                    author.company_id, conversation.source
                ))
            })?;
        let provider = self.providers.get(&conversation.source).ok_or_else(|| {
            SwitchboardError::Config(format!("{} provider is not enabled", conversation.source))
        })?;

        let mut message = Message::outbound(
            conversation.id.as_str(),
            author.user_id.as_str(),
            author.display_name.as_str(),
            text,
        );
        self.store.append_message(&message).await?;

        let outbound = OutboundMessage {
            recipient_id: conversation.sender_id.clone(),
            text: text.to_string(),
            access_token: settings.access_token.clone(),
            routing_id: settings.routing_id.clone(),
        };
        match provider.send_outbound(&outbound).await {
            Ok(provider_message_id) => {
                self.store
                    .set_provider_message_id(&message.id, &provider_message_id)
                    .await?;
                debug!(message_id = %message.id, %provider_message_id, "reply accepted by provider");
                message.provider_message_id = Some(provider_message_id);
                self.broadcaster.send_to_user(
                    &author.user_id,
                    &PushEvent::MessageStatusUpdated {
                        message_id: message.id.clone(),
                        status: MessageStatus::Sent,
                        error: None,
                    },
                );
            }
            Err(e) => {
                let reason = failure_text(&e);
                warn!(message_id = %message.id, conversation_id, error = %reason, "provider send failed");
                let update = StatusUpdate::local_error(message.id.as_str(), reason.as_str());
                self.reconciler.apply_status(&update).await?;
                message.status = MessageStatus::Error;
                message.error_text = Some(reason.clone());

                // The reconciler only tells the assignee.
                if conversation.assigned_user_id.as_deref() != Some(author.user_id.as_str()) {
                    self.broadcaster.send_to_user(
                        &author.user_id,
                        &PushEvent::MessageStatusUpdated {
                            message_id: message.id.clone(),
                            status: MessageStatus::Error,
                            error: Some(reason),
                        },
                    );
                }
            }
        }
        Ok(message)
    }
}

/// The text an agent should see for a failed send.
fn failure_text(error: &SwitchboardError) -> String {
    match error {
        SwitchboardError::Provider { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
