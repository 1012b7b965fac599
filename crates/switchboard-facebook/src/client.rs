// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Messenger Send API.

use std::time::Duration;

use switchboard_core::SwitchboardError;
use tracing::debug;

use crate::types::{GraphErrorResponse, SendRequest, SendResponse};

/// Sends text replies through `POST {base}/me/messages` with a page access token.
#[derive(Debug, Clone)]
pub struct SendApiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SendApiClient {
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

    /// Sends a text reply and returns the Messenger `message_id`.
    ///
    /// The page is implied by the access token, so `page_id` is only logged.
    pub async fn send_text(
        &self,
        page_access_token: &str,
        page_id: &str,
        recipient_psid: &str,
        text: &str,
    ) -> Result<String, SwitchboardError> {
        let url = format!("{}/me/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(page_access_token)
            .json(&SendRequest::response(recipient_psid, text))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!(status = %status, page_id, "messenger send response received");
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<GraphErrorResponse>(&body) {
                Ok(parsed) => parsed.error.to_string(),
                Err(_) => format!("Graph API returned {status}: {body}"),
            };
            return Err(SwitchboardError::provider(message));
        }

        let parsed: SendResponse =
            serde_json::from_str(&body).map_err(|e| SwitchboardError::Provider {
                message: format!("failed to parse send response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.message_id)
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
