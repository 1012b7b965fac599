// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports every problem it finds while extracting
//! [`SwitchboardConfig`](crate::SwitchboardConfig); this module turns each one
//! into a [`ConfigError`] that miette can render against the offending
//! `switchboard.toml`, with a "did you mean" hint for misspelled keys.

// The miette derive assigns span/source fields in generated code.
#![allow(unused_assignments)]

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(switchboard::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest known key, if any is close enough.
        suggestion: Option<String>,
        /// Comma-separated keys accepted by the enclosing section.
        valid_keys: String,
        #[label("not a switchboard setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(switchboard::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path such as `server.port`.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(switchboard::config::missing_key),
        help("add `{key} = <value>` to switchboard.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but is not acceptable, from [`crate::validation`].
    #[error("validation error: {message}")]
    #[diagnostic(code(switchboard::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(switchboard::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// The TOML file an error points into and the byte span of the key.
type Located = (Option<SourceSpan>, Option<NamedSource<String>>);

/// Split one figment error into diagnostics.
///
/// `toml_sources` holds `(path, contents)` for every file that was merged, so
/// unknown keys and bad values can be pointed at in the file they came from.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.iter().map(|p| p.to_string()).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(&error, &section, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&section, field),
                },
                Kind::InvalidType(actual, expected) => {
                    // For a bad value the last path segment is the key itself.
                    let (span, src) = match section.split_last() {
                        Some((field, parent)) => locate(&error, parent, field, toml_sources),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: section.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn dotted(section: &[String], field: &str) -> String {
    if section.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", section.join("."))
    }
}

fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> Located {
    let Some(figment::Source::File(file)) = error.metadata.as_ref().and_then(|m| m.source.as_ref())
    else {
        return (None, None);
    };
    let file = file.display().to_string();
    let Some((path, content)) = toml_sources.iter().find(|(path, _)| *path == file) else {
        return (None, None);
    };
    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the table named by `section`.
///
/// Walks the file line by line, tracking the current `[table]` header, and
/// returns the first `field =` assignment made while `section` is open. An
/// empty `section` means the top level, before any header.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header
                .split(']')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
        } else if current == wanted
            && let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// The known key most similar to `unknown`, if it clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
