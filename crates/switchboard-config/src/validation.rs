// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as bindable addresses, bounded timeouts, and well-formed provider URLs.

use crate::diagnostic::ConfigError;
use crate::model::{ProviderConfig, SwitchboardConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SwitchboardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        fail(format!(
            "server.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.server.log_level
        ));
    }

    if config.server.connection_buffer == 0 {
        fail("server.connection_buffer must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let timeout = config.outbound.request_timeout_secs;
    if timeout == 0 || timeout > MAX_REQUEST_TIMEOUT_SECS {
        fail(format!(
            "outbound.request_timeout_secs must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}, got {timeout}"
        ));
    }

    if let Some(salt) = &config.archive.pseudonym_salt
        && salt.trim().is_empty()
    {
        fail("archive.pseudonym_salt must not be empty when set".to_string());
    }

    if config.archive.redaction_marker.is_empty() {
        fail("archive.redaction_marker must not be empty".to_string());
    }

    for (section, provider) in [("whatsapp", &config.whatsapp), ("facebook", &config.facebook)] {
        validate_provider(section, provider, &mut fail);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_provider(section: &str, provider: &ProviderConfig, fail: &mut impl FnMut(String)) {
    if !provider.enabled {
        return;
    }
    let url = provider.api_base_url.as_str();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        fail(format!(
            "{section}.api_base_url must be an http(s) URL, got `{url}`"
        ));
    }
    if let Some(secret) = &provider.app_secret
        && secret.trim().is_empty()
    {
        fail(format!("{section}.app_secret must not be empty when set"));
    }
}

/// Returns the pseudonym salt, or a validation error when none is configured.
///
/// Archiving cannot run without it, so `serve` checks this before starting.
pub fn require_pseudonym_salt(config: &SwitchboardConfig) -> Result<&str, ConfigError> {
    config
        .archive
        .pseudonym_salt
        .as_deref()
        .filter(|salt| !salt.trim().is_empty())
        .ok_or_else(|| ConfigError::Validation {
            message: "archive.pseudonym_salt is required to serve; set it in switchboard.toml \
                      or SWITCHBOARD_ARCHIVE_PSEUDONYM_SALT"
                .to_string(),
        })
}
