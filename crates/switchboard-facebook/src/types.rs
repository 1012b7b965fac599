// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messenger Platform webhook and Send API types.

use serde::{Deserialize, Serialize};

// --- Webhook types ---

/// One `entry` of a `page` webhook.
#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    /// Page id.
    pub id: String,
    /// Raw messaging events, parsed one by one.
    #[serde(default)]
    pub messaging: Vec<serde_json::Value>,
}

/// A single messaging event. Exactly one of the optional parts is normally set.
#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<MessagePart>,
    #[serde(default)]
    pub delivery: Option<DeliveryPart>,
    #[serde(default)]
    pub read: Option<ReadPart>,
}

#[derive(Debug, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagePart {
    pub mid: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Set on copies of messages the page itself sent.
    #[serde(default)]
    pub is_echo: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryPart {
    #[serde(default)]
    pub mids: Vec<String>,
    /// Milliseconds since the epoch; every message sent before it was delivered.
    #[serde(default)]
    pub watermark: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReadPart {
    /// Milliseconds since the epoch; every message sent before it was read.
    pub watermark: i64,
}

// --- Send API types ---

/// Body of `POST /me/messages` for a text reply.
#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub recipient: Recipient<'a>,
    pub messaging_type: &'static str,
    pub message: SendMessage<'a>,
}

#[derive(Debug, Serialize)]
pub struct Recipient<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub text: &'a str,
}

impl<'a> SendRequest<'a> {
    /// A standard reply inside the 24-hour messaging window.
    pub fn response(recipient_id: &'a str, text: &'a str) -> Self {
        Self {
            recipient: Recipient { id: recipient_id },
            messaging_type: "RESPONSE",
            message: SendMessage { text },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub recipient_id: Option<String>,
    pub message_id: String,
}

/// Graph API error envelope.
#[derive(Debug, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Graph API error {} ({}): {}",
            self.code.map_or_else(|| "?".to_string(), |c| c.to_string()),
            self.type_.as_deref().unwrap_or("unknown"),
            self.message
        )?;
        if let Some(sub) = self.error_subcode {
            write!(f, " [subcode {sub}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_serializes_messenger_shape() {
        let body = serde_json::to_value(SendRequest::response("psid-1", "hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "recipient": {"id": "psid-1"},
                "messaging_type": "RESPONSE",
                "message": {"text": "hello"}
            })
        );
    }

    #[test]
    fn graph_error_renders_subcode() {
        let parsed: GraphErrorResponse = serde_json::from_value(serde_json::json!({
            "error": {
                "message": "This message is sent outside of allowed window.",
                "type": "OAuthException",
                "code": 10,
                "error_subcode": 2018278,
                "fbtrace_id": "A1b2"
            }
        }))
        .unwrap();
        assert_eq!(
            parsed.error.to_string(),
            "Graph API error 10 (OAuthException): This message is sent outside of allowed window. [subcode 2018278]"
        );
    }
}
