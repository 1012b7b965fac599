// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push delivery contract used by the router and hub.

use crate::events::PushEvent;
use crate::types::{ConnectionId, GroupKey};

/// Best-effort fan-out of push events to live connections.
///
/// Delivery is at-most-once: events for users or groups with no live
/// connection are dropped, and nothing is replayed to later joiners.
/// Implementations must not block the caller.
pub trait Broadcaster: Send + Sync {
    fn send_to_connection(&self, connection: &ConnectionId, event: &PushEvent);

    /// Sends to every connection currently registered for `user_id`.
    fn send_to_user(&self, user_id: &str, event: &PushEvent);

    /// Sends to every current member of `group`.
    fn send_to_group(&self, group: &GroupKey, event: &PushEvent);

    fn add_to_group(&self, connection: &ConnectionId, group: &GroupKey);

    fn remove_from_group(&self, connection: &ConnectionId, group: &GroupKey);
}
