// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Privacy and security primitives for the Switchboard helpdesk.
//!
//! Covers archive anonymization (PII scrubbing, sender pseudonyms), secret
//! redaction for log output, and webhook signature verification.

pub mod pseudonym;
pub mod redact;
pub mod scrub;
pub mod signature;

pub use pseudonym::Pseudonymizer;
pub use redact::{RedactingWriter, SecretList, redact};
pub use scrub::scrub_pii;
pub use signature::{sign_hub_payload, verify_hub_signature};
