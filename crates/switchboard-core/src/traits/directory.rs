// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup contracts for company channel bindings, users, and connection credentials.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::types::{ChannelSettings, Credentials, Principal, Source, UserRecord};

/// Resolves which company owns a provider channel, and how to reply through it.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Finds the binding whose inbound key (page id, business account id) matches.
    async fn find_by_company_key(
        &self,
        source: Source,
        company_key: &str,
    ) -> Result<Option<ChannelSettings>, SwitchboardError>;

    /// Finds the binding a company uses for a given provider.
    async fn find_for_company(
        &self,
        company_id: &str,
        source: Source,
    ) -> Result<Option<ChannelSettings>, SwitchboardError>;
}

/// Resolves a principal's user id to the durable user record.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, SwitchboardError>;
}

/// Validates connection credentials.
///
/// Token issuance lives outside Switchboard; this only checks what was presented.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Returns `None` when the credentials are unknown or revoked.
    async fn resolve(&self, credentials: &Credentials)
    -> Result<Option<Principal>, SwitchboardError>;
}
