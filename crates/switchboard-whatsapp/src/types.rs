// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API webhook and send types.
//!
//! Only the fields Switchboard consumes are modelled; everything else in the
//! payload is ignored.

use serde::{Deserialize, Serialize};

// --- Webhook types ---

/// One `entry` of a `whatsapp_business_account` webhook.
#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    /// WhatsApp business account id.
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: Option<String>,
    pub value: ChangeValue,
}

/// Body of a `messages` change.
///
/// Messages and statuses are kept as raw values so one malformed item can be
/// skipped without losing its siblings.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ContactProfile {
    pub name: String,
}

/// An incoming customer message.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// A delivery status callback for a message the business sent.
#[derive(Debug, Deserialize)]
pub struct StatusCallback {
    pub id: String,
    pub status: String,
    /// The customer the message was sent to.
    #[serde(default)]
    pub recipient_id: Option<String>,
    /// Unix seconds, sent as a string.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub errors: Vec<StatusError>,
}

#[derive(Debug, Deserialize)]
pub struct StatusError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub error_data: Option<StatusErrorData>,
}

#[derive(Debug, Deserialize)]
pub struct StatusErrorData {
    #[serde(default)]
    pub details: Option<String>,
}

impl StatusError {
    /// Human-readable error text: title and details when both are present.
    pub fn describe(&self) -> String {
        let title = self.title.as_deref().unwrap_or("message failed");
        let mut text = match self.code {
            Some(code) => format!("{title} ({code})"),
            None => title.to_string(),
        };
        if let Some(details) = self.error_data.as_ref().and_then(|d| d.details.as_deref()) {
            text.push_str(": ");
            text.push_str(details);
        }
        text
    }
}

// --- Send API types ---

/// Body of `POST /{phone-number-id}/messages` for a text reply.
#[derive(Debug, Serialize)]
pub struct SendTextRequest<'a> {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: SendText<'a>,
}

#[derive(Debug, Serialize)]
pub struct SendText<'a> {
    pub preview_url: bool,
    pub body: &'a str,
}

impl<'a> SendTextRequest<'a> {
    pub fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            kind: "text",
            text: SendText {
                preview_url: false,
                body,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessageId>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessageId {
    pub id: String,
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
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Graph API error {} ({}): {}",
            self.code.map_or_else(|| "?".to_string(), |c| c.to_string()),
            self.type_.as_deref().unwrap_or("unknown"),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_serializes_cloud_api_shape() {
        let body = serde_json::to_value(SendTextRequest::new("15551234", "hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "15551234",
                "type": "text",
                "text": {"preview_url": false, "body": "hello"}
            })
        );
    }

    #[test]
    fn status_error_description_includes_details() {
        let err: StatusError = serde_json::from_value(serde_json::json!({
            "code": 131047,
            "title": "Re-engagement message",
            "error_data": {"details": "More than 24 hours have passed"}
        }))
        .unwrap();
        assert_eq!(
            err.describe(),
            "Re-engagement message (131047): More than 24 hours have passed"
        );
    }

    #[test]
    fn graph_error_renders_code_and_type() {
        let parsed: GraphErrorResponse = serde_json::from_value(serde_json::json!({
            "error": {"message": "Invalid OAuth access token.", "type": "OAuthException", "code": 190}
        }))
        .unwrap();
        assert_eq!(
            parsed.error.to_string(),
            "Graph API error 190 (OAuthException): Invalid OAuth access token."
        );
    }
}
