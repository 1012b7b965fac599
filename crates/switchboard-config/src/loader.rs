// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./switchboard.toml` > `~/.config/switchboard/switchboard.toml`
//! > `/etc/switchboard/switchboard.toml` with environment variable overrides via
//! the `SWITCHBOARD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SwitchboardConfig;

/// Top-level sections, used to map `SWITCHBOARD_<SECTION>_<KEY>` onto `section.key`.
const SECTIONS: &[&str] = &[
    "server", "storage", "outbound", "archive", "whatsapp", "facebook",
];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/switchboard/switchboard.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "switchboard.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("switchboard/switchboard.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/switchboard/switchboard.toml` (system-wide)
/// 3. `~/.config/switchboard/switchboard.toml` (user XDG config)
/// 4. `./switchboard.toml` (local directory)
/// 5. `SWITCHBOARD_*` environment variables
pub fn load_config() -> Result<SwitchboardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SwitchboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SwitchboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Keys are split only at the section prefix so that `SWITCHBOARD_ARCHIVE_PSEUDONYM_SALT`
/// maps to `archive.pseudonym_salt`, not `archive.pseudonym.salt`.
fn env_provider() -> Env {
    Env::prefixed("SWITCHBOARD_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env key onto its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
