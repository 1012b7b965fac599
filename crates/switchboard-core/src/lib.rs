// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchboard helpdesk.
//!
//! This crate provides the domain types, the real-time wire contract, the
//! error type, and the adapter traits used throughout the Switchboard
//! workspace. Provider, storage, and transport crates implement traits
//! defined here.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SwitchboardError;
pub use events::{
    AgentOperation, InboundBatch, InboundEvent, MessageRef, NewMessage, OutboundMessage,
    PushEvent, StatusUpdate, TeamMember, Watermark,
};
pub use types::{
    AdapterType, AgentSession, ArchiveOutcome, ArchivedConversation, ArchivedMessage,
    ChannelSettings, ConnectionId, Conversation, ConversationThread, Credentials, Direction,
    GroupKey, HealthStatus, Message, MessageStatus, Principal, Role, Source, UserRecord,
};

pub use traits::{
    Broadcaster, ChannelDirectory, ConversationStore, PluginAdapter, PrincipalResolver,
    ProviderChannel, UserDirectory,
};
