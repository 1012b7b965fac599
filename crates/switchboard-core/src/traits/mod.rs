// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Switchboard components.
//!
//! Provider and storage adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility. The directory and
//! broadcaster traits are the narrow contracts the router and hub depend on.

pub mod adapter;
pub mod broadcaster;
pub mod channel;
pub mod directory;
pub mod storage;

pub use adapter::PluginAdapter;
pub use broadcaster::Broadcaster;
pub use channel::ProviderChannel;
pub use directory::{ChannelDirectory, PrincipalResolver, UserDirectory};
pub use storage::ConversationStore;
