// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Switchboard helpdesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Switchboard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// HTTP listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Provider send settings.
    #[serde(default)]
    pub outbound: OutboundConfig,

    /// Conversation archive settings.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// WhatsApp Cloud API integration.
    #[serde(default)]
    pub whatsapp: ProviderConfig,

    /// Facebook Messenger integration.
    #[serde(default)]
    pub facebook: ProviderConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the gateway to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the gateway to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Per-connection push queue capacity. Events beyond it are dropped.
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            connection_buffer: default_connection_buffer(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connection_buffer() -> usize {
    64
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("switchboard").join("switchboard.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("switchboard.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Outbound provider call configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutboundConfig {
    /// Timeout for a single Graph API send, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Archive and anonymization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Secret salt keying sender pseudonyms. Required by `serve`.
    ///
    /// Changing it breaks the link between archives of the same customer.
    #[serde(default)]
    pub pseudonym_salt: Option<String>,

    /// Replacement text for scrubbed emails and phone numbers.
    #[serde(default = "default_redaction_marker")]
    pub redaction_marker: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            pseudonym_salt: None,
            redaction_marker: default_redaction_marker(),
        }
    }
}

fn default_redaction_marker() -> String {
    "[REDACTED]".to_string()
}

/// Messaging provider integration configuration.
///
/// Per-company access tokens live in storage; these settings are shared by
/// every company using the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Whether the webhook endpoint and send path are active.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Graph API base URL, including the version segment.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Meta app secret used to verify `X-Hub-Signature-256`. `None` skips verification.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token expected during the webhook subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_base_url: default_api_base_url(),
            app_secret: None,
            verify_token: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}
