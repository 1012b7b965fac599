// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for operations on storage entities.
//!
//! Each public function takes a [`Database`](crate::Database) and runs as one
//! closure on the writer thread, so its writes land atomically.

pub mod archive;
pub mod conversations;
pub mod directory;
pub mod messages;
