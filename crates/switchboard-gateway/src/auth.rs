// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential extraction for hub connections and webhook signature checks.
//!
//! Hub credentials are checked in order:
//! 1. Bearer token (`Authorization: Bearer <token>`)
//! 2. `access_token` query parameter (browsers cannot set headers on a WebSocket)

use axum::http::HeaderMap;
use serde::Deserialize;
use switchboard_core::Credentials;
use switchboard_security::verify_hub_signature;

/// Header carrying Meta's HMAC-SHA256 of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Query parameters accepted on the hub endpoint.
#[derive(Default, Deserialize)]
pub struct HubQuery {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for HubQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubQuery")
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Pull hub credentials from the request. `None` if neither form is present.
pub fn credentials_from(headers: &HeaderMap, query: &HubQuery) -> Option<Credentials> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer
        .or_else(|| query.access_token.as_deref().filter(|t| !t.is_empty()))
        .map(|token| Credentials {
            bearer_token: token.to_string(),
        })
}

/// Check a webhook body against its signature header.
///
/// Without a configured app secret every body is accepted.
pub fn webhook_signature_ok(app_secret: Option<&str>, headers: &HeaderMap, body: &[u8]) -> bool {
    match app_secret {
        None => true,
        Some(secret) => {
            let header = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
            verify_hub_signature(secret, body, header)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use switchboard_security::sign_hub_payload;

    fn query(token: Option<&str>) -> HubQuery {
        HubQuery {
            access_token: token.map(str::to_string),
        }
    }

    #[test]
    fn bearer_header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer tok-header"));
        let creds = credentials_from(&headers, &query(Some("tok-query"))).unwrap();
        assert_eq!(creds.bearer_token, "tok-header");
    }

    #[test]
    fn query_token_is_the_fallback() {
        let creds = credentials_from(&HeaderMap::new(), &query(Some("tok-query"))).unwrap();
        assert_eq!(creds.bearer_token, "tok-query");
    }

    #[test]
    fn missing_or_empty_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(credentials_from(&headers, &query(None)).is_none());
        assert!(credentials_from(&HeaderMap::new(), &query(Some(""))).is_none());
    }

    #[test]
    fn query_debug_redacts_token() {
        let debug = format!("{:?}", query(Some("secret-token")));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn signature_checked_only_with_secret() {
        let body = br#"{"object":"whatsapp_business_account"}"#;
        assert!(webhook_signature_ok(None, &HeaderMap::new(), body));
        assert!(!webhook_signature_ok(Some("s3cret"), &HeaderMap::new(), body));

        let mut headers = HeaderMap::new();
        let signature = sign_hub_payload("s3cret", body).unwrap();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&signature).unwrap());
        assert!(webhook_signature_ok(Some("s3cret"), &headers, body));
        assert!(!webhook_signature_ok(Some("other"), &headers, body));
    }
}
