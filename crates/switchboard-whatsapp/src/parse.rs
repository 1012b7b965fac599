// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of WhatsApp webhook payloads into normalized inbound events.

use std::collections::HashMap;

use switchboard_core::{
    InboundBatch, InboundEvent, MessageRef, MessageStatus, NewMessage, Source, StatusUpdate,
    Watermark,
};
use tracing::{debug, warn};

use crate::types::{ChangeValue, IncomingMessage, StatusCallback, WebhookEntry};

/// Splits a webhook payload into one batch per `entry`.
///
/// Entries, messages, and statuses that fail to parse are logged and skipped.
pub fn parse_payload(payload: &serde_json::Value) -> Vec<InboundBatch> {
    let Some(entries) = payload.get("entry").and_then(|e| e.as_array()) else {
        debug!("whatsapp payload has no entry array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|raw| match serde_json::from_value::<WebhookEntry>(raw.clone()) {
            Ok(entry) => Some(parse_entry(entry)),
            Err(e) => {
                warn!(error = %e, "skipping malformed whatsapp entry");
                None
            }
        })
        .collect()
}

fn parse_entry(entry: WebhookEntry) -> InboundBatch {
    let company_key = entry.id;
    let mut events = Vec::new();
    for change in entry.changes {
        if change.field.as_deref().is_some_and(|f| f != "messages") {
            debug!(field = ?change.field, "ignoring non-message change");
            continue;
        }
        parse_change(&company_key, change.value, &mut events);
    }
    InboundBatch {
        source: Source::WhatsApp,
        company_key,
        events,
    }
}

fn parse_change(company_key: &str, value: ChangeValue, events: &mut Vec<InboundEvent>) {
    let names: HashMap<&str, &str> = value
        .contacts
        .iter()
        .filter_map(|c| c.profile.as_ref().map(|p| (c.wa_id.as_str(), p.name.as_str())))
        .collect();

    for raw in value.messages {
        let msg = match serde_json::from_value::<IncomingMessage>(raw) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "skipping malformed whatsapp message");
                continue;
            }
        };
        let Some(text) = msg.text.filter(|_| msg.kind == "text") else {
            debug!(kind = %msg.kind, id = %msg.id, "ignoring non-text whatsapp message");
            continue;
        };
        let username = names
            .get(msg.from.as_str())
            .map_or_else(|| msg.from.clone(), |name| name.to_string());
        events.push(InboundEvent::NewMessage(NewMessage {
            company_key: company_key.to_string(),
            sender_id: msg.from,
            username,
            text: text.body,
            provider_message_id: msg.id,
            source: Source::WhatsApp,
        }));
    }

    for raw in value.statuses {
        let callback = match serde_json::from_value::<StatusCallback>(raw) {
            Ok(callback) => callback,
            Err(e) => {
                warn!(error = %e, "skipping malformed whatsapp status");
                continue;
            }
        };
        let watermark = read_watermark(company_key, &callback);
        if let Some(update) = status_update(callback) {
            events.push(InboundEvent::StatusUpdate(update));
        }
        if let Some(watermark) = watermark {
            events.push(InboundEvent::Watermark(watermark));
        }
    }
}

/// A `read` receipt also marks every earlier reply to the same customer as
/// read, so it doubles as a watermark at its timestamp.
fn read_watermark(company_key: &str, callback: &StatusCallback) -> Option<Watermark> {
    if callback.status != "read" {
        return None;
    }
    let (Some(recipient), Some(secs)) = (
        callback.recipient_id.as_ref(),
        callback.timestamp.as_deref().and_then(|t| t.parse::<i64>().ok()),
    ) else {
        debug!(id = %callback.id, "read status without recipient or timestamp, no watermark");
        return None;
    };
    Some(Watermark {
        company_key: company_key.to_string(),
        sender_id: recipient.clone(),
        status: MessageStatus::Read,
        watermark_unix_ms: secs.saturating_mul(1000),
    })
}

fn status_update(callback: StatusCallback) -> Option<StatusUpdate> {
    let status = match callback.status.as_str() {
        "sent" => MessageStatus::Sent,
        "delivered" => MessageStatus::Delivered,
        "read" => MessageStatus::Read,
        "failed" => MessageStatus::Error,
        other => {
            warn!(status = other, id = %callback.id, "skipping unknown whatsapp status");
            return None;
        }
    };

    let error_text = if status == MessageStatus::Error || !callback.errors.is_empty() {
        let described: Vec<String> = callback.errors.iter().map(|e| e.describe()).collect();
        Some(if described.is_empty() {
            "message failed".to_string()
        } else {
            described.join("; ")
        })
    } else {
        None
    };

    Some(StatusUpdate {
        target: MessageRef::Provider(callback.id),
        status,
        timestamp_unix: callback.timestamp.and_then(|t| t.parse().ok()),
        error_text,
    })
}
