// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Verification of Meta's `X-Hub-Signature-256` webhook header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Returns `true` if `header` carries a valid HMAC-SHA256 of `body` keyed with `app_secret`.
///
/// The header format is `sha256=<hex digest>`. The comparison is constant-time.
pub fn verify_hub_signature(app_secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(digest_hex) = header
        .map(str::trim)
        .and_then(|h| h.strip_prefix("sha256="))
    else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Computes the `X-Hub-Signature-256` header value Meta would send for `body`.
pub fn sign_hub_payload(app_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "app-secret";
    const BODY: &[u8] = br#"{"object":"page","entry":[]}"#;

    #[test]
    fn accepts_matching_signature() {
        let header = sign_hub_payload(SECRET, BODY).unwrap();
        assert!(verify_hub_signature(SECRET, BODY, Some(&header)));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign_hub_payload(SECRET, BODY).unwrap();
        assert!(!verify_hub_signature(SECRET, b"{}", Some(&header)));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(!verify_hub_signature(SECRET, BODY, None));
        assert!(!verify_hub_signature(SECRET, BODY, Some("sha1=abcd")));
        assert!(!verify_hub_signature(SECRET, BODY, Some("sha256=not-hex")));
    }

    #[test]
    fn rejects_signature_from_other_secret() {
        let header = sign_hub_payload("other", BODY).unwrap();
        assert!(!verify_hub_signature(SECRET, BODY, Some(&header)));
    }
}
