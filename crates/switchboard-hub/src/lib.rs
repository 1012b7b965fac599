// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence registry and real-time push hub for the Switchboard helpdesk.
//!
//! [`PresenceRegistry`] tracks connected agent sessions, [`ChannelBroadcaster`]
//! fans push events out to per-connection queues, and [`RealtimeHub`] runs
//! the connection lifecycle on top of both.

pub mod broadcast;
pub mod hub;
pub mod presence;

pub use broadcast::ChannelBroadcaster;
pub use hub::RealtimeHub;
pub use presence::PresenceRegistry;
