// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PII scrubbing for archived message content.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}").unwrap()
});

// Digit groups joined by at most one separator; a group may be parenthesized.
static PHONE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?(?:\(\d+\)|\d+)(?:[\s.\-]?(?:\(\d+\)|\d+))*").unwrap()
});

// A calendar date at the start of a candidate.
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])").unwrap()
});

/// Minimum digit count for a candidate to be treated as a phone number.
const MIN_PHONE_DIGITS: usize = 7;

/// Replaces email-like and phone-like substrings with `marker`.
///
/// Everything else is returned verbatim.
pub fn scrub_pii(content: &str, marker: &str) -> String {
    let without_emails = EMAIL.replace_all(content, marker);
    scrub_phones(&without_emails, marker)
}

fn scrub_phones(content: &str, marker: &str) -> String {
    PHONE_CANDIDATE
        .replace_all(content, |caps: &Captures<'_>| {
            let candidate = &caps[0];
            if let Some(date) = ISO_DATE.find(candidate) {
                let rest = &candidate[date.end()..];
                return format!("{}{}", date.as_str(), scrub_phones(rest, marker));
            }
            if looks_like_phone(candidate) {
                marker.to_string()
            } else {
                candidate.to_string()
            }
        })
        .into_owned()
}

/// Enough digits, and either unbroken, dialled with a `+`, `(` or trunk `0`
/// prefix, or ending in a subscriber block of four or more digits.
fn looks_like_phone(candidate: &str) -> bool {
    let digits = candidate.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_PHONE_DIGITS {
        return false;
    }
    let groups: Vec<&str> = candidate
        .split(|c: char| !c.is_ascii_digit())
        .filter(|group| !group.is_empty())
        .collect();
    groups.len() == 1
        || candidate.starts_with(['+', '(', '0'])
        || groups.last().is_some_and(|last| last.len() >= 4)
}
