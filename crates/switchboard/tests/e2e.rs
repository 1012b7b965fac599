// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete helpdesk pipeline.
//!
//! Each test creates an isolated TestHarness with a temp SQLite database,
//! seeded company settings and agents, and simulated hub connections. Tests
//! are independent and order-insensitive.

use std::sync::Arc;

use serde_json::{Value, json};
use switchboard_config::model::{OutboundConfig, ProviderConfig};
use switchboard_core::{
    AgentOperation, ConversationStore, MessageRef, MessageStatus, Source,
};
use switchboard_security::Pseudonymizer;
use switchboard_storage::queries::archive::list_for_pseudonym;
use switchboard_test_utils::harness::{COMPANY, PSEUDONYM_SALT, WHATSAPP_ACCOUNT};
use switchboard_test_utils::{HubClient, TestHarness};
use switchboard_whatsapp::WhatsAppChannel;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn whatsapp_text(from: &str, id: &str, body: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": WHATSAPP_ACCOUNT,
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "contacts": [{"wa_id": from, "profile": {"name": "Wanda"}}],
                    "messages": [{
                        "from": from,
                        "id": id,
                        "timestamp": "1700000000",
                        "type": "text",
                        "text": {"body": body}
                    }]
                }
            }]
        }]
    })
}

fn whatsapp_status(provider_message_id: &str, status: &str, timestamp: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": WHATSAPP_ACCOUNT,
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "statuses": [{
                        "id": provider_message_id,
                        "status": status,
                        "timestamp": timestamp,
                        "recipient_id": "wa_123"
                    }]
                }
            }]
        }]
    })
}

/// Deliver a first message from wa_123 and return the new conversation's id.
async fn open_conversation(harness: &TestHarness) -> String {
    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_text("wa_123", "wamid.in1", "hi"))
        .await
        .unwrap();
    let pending = harness.store.list_unassigned(COMPANY).await.unwrap();
    assert_eq!(pending.len(), 1);
    pending[0].conversation.id.clone()
}

async fn claim(harness: &TestHarness, agent: &HubClient, conversation_id: &str) {
    harness
        .operate(
            agent,
            AgentOperation::AssignConversationToUser {
                conversation_id: conversation_id.to_string(),
            },
        )
        .await;
}

async fn reply(harness: &TestHarness, agent: &HubClient, conversation_id: &str, text: &str) {
    harness
        .operate(
            agent,
            AgentOperation::SendMessageToCustomer {
                conversation_id: conversation_id.to_string(),
                text: text.to_string(),
            },
        )
        .await;
}

// ---- Inbound message from a new sender ----

#[tokio::test]
async fn inbound_from_new_sender_opens_unassigned_conversation() {
    let harness = TestHarness::new().await.unwrap();
    let mut grace = harness.connect("tok-grace").await.unwrap();
    grace.drain();

    let conversation_id = open_conversation(&harness).await;

    let thread = harness
        .store
        .get_thread(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!thread.conversation.is_assigned);
    assert_eq!(thread.conversation.sender_id, "wa_123");
    assert_eq!(thread.conversation.company_id, COMPANY);
    assert_eq!(thread.messages.len(), 1);
    assert_eq!(thread.messages[0].status, MessageStatus::Received);
    assert_eq!(
        thread.messages[0].provider_message_id.as_deref(),
        Some("wamid.in1")
    );

    let added = grace.drain_kind("NewConversationAdded");
    assert_eq!(added.len(), 1);
    assert_eq!(added[0]["data"]["conversation"]["id"], conversation_id.as_str());
}

#[tokio::test]
async fn team_queue_is_visible_to_staff_outside_the_team() {
    let harness = TestHarness::builder()
        .with_default_team("support")
        .build()
        .await
        .unwrap();
    let mut grace = harness.connect("tok-grace").await.unwrap();
    let mut ada = harness.connect("tok-ada").await.unwrap();
    grace.drain();
    ada.drain();

    let conversation_id = open_conversation(&harness).await;

    let added = grace.drain_kind("NewConversationAdded");
    assert_eq!(added.len(), 1, "manager with no teams is told");
    assert_eq!(added[0]["data"]["conversation"]["assignedTeamId"], "support");
    assert_eq!(ada.drain_kind("NewConversationAdded").len(), 1, "no duplicate for team members");

    let mut late = harness.connect("tok-grace").await.unwrap();
    let snapshot = late.drain_kind("LoadNewConversations");
    assert_eq!(snapshot.len(), 1);
    let pending = snapshot[0]["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["conversation"]["id"], conversation_id.as_str());

    claim(&harness, &ada, &conversation_id).await;
    let removed = grace.drain_kind("RemoveNewConversation");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0]["data"]["id"], conversation_id.as_str());
    assert_eq!(late.drain_kind("RemoveNewConversation").len(), 1);
}

#[tokio::test]
async fn second_message_appends_to_active_conversation() {
    let harness = TestHarness::new().await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_text("wa_123", "wamid.in2", "still there?"))
        .await
        .unwrap();

    assert_eq!(harness.store.list_unassigned(COMPANY).await.unwrap().len(), 1);
    let thread = harness
        .store
        .get_thread(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    let texts: Vec<_> = thread.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, vec!["hi", "still there?"]);
}

// ---- Claim ----

#[tokio::test]
async fn claim_assigns_and_clears_pending_queue() {
    let harness = TestHarness::new().await.unwrap();
    let mut ada = harness.connect("tok-ada").await.unwrap();
    let mut grace = harness.connect("tok-grace").await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    ada.drain();
    grace.drain();

    claim(&harness, &ada, &conversation_id).await;

    let conversation = harness
        .store
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.assigned_user_id.as_deref(), Some("agent-1"));
    assert!(conversation.is_assigned);

    let assigned = ada.drain_kind("AssignConversation");
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0]["data"]["conversation"]["id"], conversation_id.as_str());

    let removed = grace.drain_kind("RemoveNewConversation");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0]["data"]["id"], conversation_id.as_str());
    assert!(harness.store.list_unassigned(COMPANY).await.unwrap().is_empty());
}

#[tokio::test]
async fn inbound_after_claim_goes_to_assignee() {
    let harness = TestHarness::new().await.unwrap();
    let mut ada = harness.connect("tok-ada").await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    claim(&harness, &ada, &conversation_id).await;
    ada.drain();

    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_text("wa_123", "wamid.in2", "thanks"))
        .await
        .unwrap();

    let pushed = ada.drain_kind("SendMessageToAssignedUser");
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0]["data"]["content"], "thanks");
}

// ---- Reply through the WhatsApp Cloud API ----

#[tokio::test]
async fn reply_records_provider_id_and_pushes_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/PNID1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"messages": [{"id": "msg123"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let whatsapp = WhatsAppChannel::new(
        &ProviderConfig {
            api_base_url: server.uri(),
            ..ProviderConfig::default()
        },
        &OutboundConfig::default(),
    )
    .unwrap();
    let harness = TestHarness::builder()
        .with_whatsapp(Arc::new(whatsapp))
        .build()
        .await
        .unwrap();

    let mut ada = harness.connect("tok-ada").await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    claim(&harness, &ada, &conversation_id).await;
    ada.drain();

    reply(&harness, &ada, &conversation_id, "hello").await;

    let stored = harness
        .store
        .find_message(&MessageRef::Provider("msg123".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, "hello");
    assert_eq!(stored.conversation_id, conversation_id);
    assert_eq!(stored.user_id, "agent-1");

    let updates = ada.drain_kind("MessageStatusUpdated");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["data"]["messageId"], stored.id.as_str());
    assert_eq!(updates[0]["data"]["status"], "Sent");
}

#[tokio::test]
async fn rejected_reply_is_stored_as_error() {
    let harness = TestHarness::new().await.unwrap();
    let mut ada = harness.connect("tok-ada").await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    claim(&harness, &ada, &conversation_id).await;
    ada.drain();
    harness
        .whatsapp_mock
        .reject_next("(#131047) Re-engagement message")
        .await;

    reply(&harness, &ada, &conversation_id, "hello").await;

    let thread = harness
        .store
        .get_thread(&conversation_id)
        .await
        .unwrap()
        .unwrap();
    let outbound = thread.messages.last().unwrap();
    assert_eq!(outbound.content, "hello");
    assert_eq!(outbound.status, MessageStatus::Error);
    assert!(outbound.provider_message_id.is_none());

    let updates = ada.drain_kind("MessageStatusUpdated");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["data"]["status"], "Error");
    assert!(updates[0]["data"]["error"].as_str().unwrap().contains("131047"));
}

// ---- Provider status callbacks ----

#[tokio::test]
async fn delivery_status_advances_and_never_regresses() {
    let harness = TestHarness::new().await.unwrap();
    let mut ada = harness.connect("tok-ada").await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    claim(&harness, &ada, &conversation_id).await;
    harness.whatsapp_mock.accept_next("msg123").await;
    reply(&harness, &ada, &conversation_id, "hello").await;
    ada.drain();

    let target = MessageRef::Provider("msg123".into());
    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_status("msg123", "delivered", "1700000100"))
        .await
        .unwrap();
    let delivered = harness.store.find_message(&target).await.unwrap().unwrap();
    assert_eq!(delivered.status, MessageStatus::Delivered);

    let updates = ada.drain_kind("MessageStatusUpdated");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["data"]["status"], "Delivered");

    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_status("msg123", "sent", "1700000050"))
        .await
        .unwrap();
    let after = harness.store.find_message(&target).await.unwrap().unwrap();
    assert_eq!(after.status, MessageStatus::Delivered);
    assert!(ada.drain_kind("MessageStatusUpdated").is_empty());
}

#[tokio::test]
async fn whatsapp_read_marks_every_earlier_reply_read() {
    let harness = TestHarness::new().await.unwrap();
    let mut ada = harness.connect("tok-ada").await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    claim(&harness, &ada, &conversation_id).await;
    harness.whatsapp_mock.accept_next("msg1").await;
    harness.whatsapp_mock.accept_next("msg2").await;
    reply(&harness, &ada, &conversation_id, "first").await;
    reply(&harness, &ada, &conversation_id, "second").await;
    ada.drain();

    // 2100-01-01: after both replies were sent.
    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_status("msg2", "read", "4102444800"))
        .await
        .unwrap();

    for id in ["msg1", "msg2"] {
        let message = harness
            .store
            .find_message(&MessageRef::Provider(id.into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.status, MessageStatus::Read, "{id}");
    }
    let updates = ada.drain_kind("MessageStatusUpdated");
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().all(|u| u["data"]["status"] == "Read"));
}

#[tokio::test]
async fn status_for_unknown_message_is_ignored() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_status("wamid.never", "read", "1700000100"))
        .await
        .unwrap();
    assert!(
        harness
            .store
            .find_message(&MessageRef::Provider("wamid.never".into()))
            .await
            .unwrap()
            .is_none()
    );
}

// ---- Presence ----

#[tokio::test]
async fn disconnect_removes_presence_and_updates_roster() {
    let harness = TestHarness::new().await.unwrap();
    let ada = harness.connect("tok-ada").await.unwrap();
    let mut grace = harness.connect("tok-grace").await.unwrap();
    grace.drain();
    assert!(harness.hub.registry().contains(&ada.connection));

    harness.disconnect(&ada);

    assert!(!harness.hub.registry().contains(&ada.connection));
    let removed = grace.drain_kind("RemoveTeamMember");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0]["data"]["userId"], "agent-1");
    assert!(
        harness
            .hub
            .registry()
            .roster(COMPANY)
            .iter()
            .all(|member| member.user_id != "agent-1")
    );
}

// ---- Close and anonymize ----

#[tokio::test]
async fn close_archives_under_pseudonym() {
    let harness = TestHarness::new().await.unwrap();
    let ada = harness.connect("tok-ada").await.unwrap();
    let conversation_id = open_conversation(&harness).await;
    claim(&harness, &ada, &conversation_id).await;
    reply(&harness, &ada, &conversation_id, "hello").await;

    harness
        .operate(
            &ada,
            AgentOperation::CloseAndAnonymizeChat {
                customer_id: "wa_123".into(),
            },
        )
        .await;

    assert!(
        harness
            .store
            .get_conversation(&conversation_id)
            .await
            .unwrap()
            .is_none()
    );
    let pseudonym = Pseudonymizer::new(PSEUDONYM_SALT)
        .unwrap()
        .pseudonym("wa_123");
    let archived = list_for_pseudonym(harness.store.database().unwrap(), COMPANY, &pseudonym)
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].original_conversation_id, conversation_id);
    assert_eq!(archived[0].messages.len(), 2);
    assert_eq!(archived[0].sender_label, Pseudonymizer::label(&pseudonym));

    // The next message from the same customer starts a fresh conversation.
    harness
        .deliver_webhook(Source::WhatsApp, &whatsapp_text("wa_123", "wamid.in9", "back again"))
        .await
        .unwrap();
    let pending = harness.store.list_unassigned(COMPANY).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_ne!(pending[0].conversation.id, conversation_id);
}

#[tokio::test]
async fn unknown_conversation_claim_reports_failure_to_caller() {
    let harness = TestHarness::new().await.unwrap();
    let mut ada = harness.connect("tok-ada").await.unwrap();
    ada.drain();

    claim(&harness, &ada, "no-such-conversation").await;

    let failed = ada.drain_kind("OperationFailed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["data"]["operation"], "AssignConversationToUser");
}
