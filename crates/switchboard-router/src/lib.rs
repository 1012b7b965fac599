// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation logic for the Switchboard helpdesk.
//!
//! This crate provides:
//! - [`MessageRouter`]: inbound provider events into conversations, agent replies out
//! - [`StatusReconciler`]: forward-only delivery status updates
//! - [`AssignmentEngine`]: claiming conversations from the pending queue
//! - [`Archiver`]: closing a conversation into the anonymized archive
//! - [`OperationDispatcher`]: hub socket operations onto the above

pub mod archive;
pub mod assignment;
pub mod operations;
pub mod router;
pub mod status;

#[cfg(test)]
mod test_support;

pub use archive::Archiver;
pub use assignment::AssignmentEngine;
pub use operations::OperationDispatcher;
pub use router::{InboundOutcome, MessageRouter};
pub use status::StatusReconciler;
