// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of Messenger webhook payloads into normalized inbound events.

use switchboard_core::{
    InboundBatch, InboundEvent, MessageRef, MessageStatus, NewMessage, Source, StatusUpdate,
    Watermark,
};
use tracing::{debug, warn};

use crate::types::{MessagingEvent, WebhookEntry};

/// Splits a webhook payload into one batch per page `entry`.
pub fn parse_payload(payload: &serde_json::Value) -> Vec<InboundBatch> {
    let Some(entries) = payload.get("entry").and_then(|e| e.as_array()) else {
        debug!("messenger payload has no entry array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|raw| match serde_json::from_value::<WebhookEntry>(raw.clone()) {
            Ok(entry) => Some(parse_entry(entry)),
            Err(e) => {
                warn!(error = %e, "skipping malformed messenger entry");
                None
            }
        })
        .collect()
}

fn parse_entry(entry: WebhookEntry) -> InboundBatch {
    let company_key = entry.id;
    let mut events = Vec::new();
    for raw in entry.messaging {
        match serde_json::from_value::<MessagingEvent>(raw) {
            Ok(event) => push_events(&company_key, event, &mut events),
            Err(e) => warn!(error = %e, page_id = %company_key, "skipping malformed messaging event"),
        }
    }
    InboundBatch {
        source: Source::Facebook,
        company_key,
        events,
    }
}

fn push_events(company_key: &str, event: MessagingEvent, events: &mut Vec<InboundEvent>) {
    let sender_id = event.sender.id;

    if let Some(message) = event.message {
        if message.is_echo {
            debug!(mid = %message.mid, "ignoring echo of page message");
        } else if let Some(text) = message.text {
            events.push(InboundEvent::NewMessage(NewMessage {
                company_key: company_key.to_string(),
                // Webhooks carry no profile name; the PSID stands in for it.
                username: sender_id.clone(),
                sender_id: sender_id.clone(),
                text,
                provider_message_id: message.mid,
                source: Source::Facebook,
            }));
        } else {
            debug!(mid = %message.mid, "ignoring messenger message without text");
        }
    }

    if let Some(delivery) = event.delivery {
        let timestamp_unix = delivery
            .watermark
            .or(event.timestamp)
            .map(|ms| ms / 1000);
        for mid in delivery.mids {
            events.push(InboundEvent::StatusUpdate(StatusUpdate {
                target: MessageRef::Provider(mid),
                status: MessageStatus::Delivered,
                timestamp_unix,
                error_text: None,
            }));
        }
        if let Some(watermark) = delivery.watermark {
            events.push(InboundEvent::Watermark(Watermark {
                company_key: company_key.to_string(),
                sender_id: sender_id.clone(),
                status: MessageStatus::Delivered,
                watermark_unix_ms: watermark,
            }));
        }
    }

    if let Some(read) = event.read {
        events.push(InboundEvent::Watermark(Watermark {
            company_key: company_key.to_string(),
            sender_id,
            status: MessageStatus::Read,
            watermark_unix_ms: read.watermark,
        }));
    }
}
