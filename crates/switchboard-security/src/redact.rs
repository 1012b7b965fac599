// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for log output and error messages.
//!
//! Two complementary mechanisms:
//! 1. **Regex-based**: catches known credential formats (Bearer tokens, Graph access tokens).
//! 2. **Exact-match**: catches configured secrets (app secrets, pseudonym salt) registered at startup.

use std::io::Write;
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;

/// Known credential patterns to redact from output.
static REDACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Bearer tokens in headers
        Regex::new(r"Bearer\s+[a-zA-Z0-9._\-]{10,}").unwrap(),
        // Meta Graph API access tokens: EAAG..., EAAB...
        Regex::new(r"\bEAA[a-zA-Z0-9]{20,}").unwrap(),
        // access_token query parameters
        Regex::new(r"access_token=[^&\s]+").unwrap(),
    ]
});

/// The redaction placeholder.
const REDACTED: &str = "[REDACTED]";

/// Shared list of exact secret values to mask, filled in at startup.
pub type SecretList = Arc<RwLock<Vec<String>>>;

/// Redact secrets from a string using regex patterns and exact-match values.
pub fn redact(input: &str, known_secrets: &[String]) -> String {
    let mut result = input.to_string();

    for pattern in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).into_owned();
    }

    // Longest first so a secret containing another is masked whole.
    let mut sorted: Vec<&String> = known_secrets.iter().filter(|s| !s.is_empty()).collect();
    sorted.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for secret in sorted {
        result = result.replace(secret.as_str(), REDACTED);
    }

    result
}

/// A writer wrapper that redacts secrets from output.
///
/// Used as the tracing subscriber's writer so no log line leaks a token.
pub struct RedactingWriter<W> {
    inner: W,
    known_secrets: SecretList,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, known_secrets: SecretList) -> Self {
        Self {
            inner,
            known_secrets,
        }
    }

    /// Register another exact value to mask. Duplicates and empty values are ignored.
    pub fn add_secret(known_secrets: &SecretList, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        if let Ok(mut values) = known_secrets.write()
            && !values.contains(&value)
        {
            values.push(value);
        }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let secrets = self
            .known_secrets
            .read()
            .map(|v| v.clone())
            .unwrap_or_default();
        self.inner.write_all(redact(&input, &secrets).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
