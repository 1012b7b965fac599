// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Switchboard helpdesk.

use thiserror::Error;

/// The primary error type used across all Switchboard adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging provider errors (Graph API rejection, unreachable endpoint).
    ///
    /// `message` is meant to be shown to the agent who triggered the call.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Real-time transport errors (bind failure, closed connection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A referenced entity does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchboardError {
    /// Shorthand for a storage error built from any error value.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SwitchboardError::Storage {
            source: source.into(),
        }
    }

    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        SwitchboardError::Provider {
            message: message.into(),
            source: None,
        }
    }
}
