// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp Cloud API send endpoint.

use std::time::Duration;

use switchboard_core::SwitchboardError;
use tracing::debug;

use crate::types::{GraphErrorResponse, SendResponse, SendTextRequest};

/// Sends text replies through `POST {base}/{phone-number-id}/messages`.
///
/// The access token is per company, so it is passed on each call instead of
/// being baked into default headers.
#[derive(Debug, Clone)]
pub struct CloudApiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CloudApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SwitchboardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SwitchboardError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Sends a text message and returns the `wamid` the Cloud API assigned.
    pub async fn send_text(
        &self,
        access_token: &str,
        phone_number_id: &str,
        to: &str,
        body: &str,
    ) -> Result<String, SwitchboardError> {
        let url = format!("{}/{}/messages", self.base_url, phone_number_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&SendTextRequest::new(to, body))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!(status = %status, phone_number_id, "whatsapp send response received");
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(SwitchboardError::provider(describe_failure(status, &text)));
        }

        let parsed: SendResponse =
            serde_json::from_str(&text).map_err(|e| SwitchboardError::Provider {
                message: format!("failed to parse send response: {e}"),
                source: Some(Box::new(e)),
            })?;
        parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| SwitchboardError::provider("send response carried no message id"))
    }

    fn transport_error(&self, e: reqwest::Error) -> SwitchboardError {
        if e.is_timeout() {
            SwitchboardError::Timeout {
                duration: self.timeout,
            }
        } else {
            SwitchboardError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Readable message for a non-success response.
fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<GraphErrorResponse>(body) {
        Ok(parsed) => parsed.error.to_string(),
        Err(_) => format!("Graph API returned {status}: {body}"),
    }
}
