// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Switchboard helpdesk.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for
//! conversations, messages, the anonymized archive, and the company/user
//! directory.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: [`Database`] wraps the one connection and every query module goes
//! through it. Do NOT open additional connections for writes.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
