// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stable one-way pseudonyms for archived customer identities.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derives customer pseudonyms from a secret salt.
///
/// The same sender id and salt always produce the same pseudonym, so archives
/// of one customer stay linkable without storing the provider id.
#[derive(Clone)]
pub struct Pseudonymizer {
    keyed: HmacSha256,
}

impl Pseudonymizer {
    pub fn new(salt: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        Ok(Self {
            keyed: HmacSha256::new_from_slice(salt.as_ref())?,
        })
    }

    /// Hex-encoded HMAC-SHA256 of the sender id keyed with the salt.
    pub fn pseudonym(&self, sender_id: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(sender_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Human-readable label shown in place of the customer's name.
    pub fn label(pseudonym: &str) -> String {
        let short = pseudonym.get(..8).unwrap_or(pseudonym);
        format!("Customer-{short}")
    }
}

impl std::fmt::Debug for Pseudonymizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pseudonymizer").finish_non_exhaustive()
    }
}
