// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Switchboard integration tests.
//!
//! Provides a mock provider and a harness wiring the whole stack over a temp
//! database, for fast, deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Provider channel with scripted send results
//! - [`TestHarness`] - Seeded store, hub, router and simulated hub connections

pub mod harness;
pub mod mock_provider;

pub use harness::{HubClient, TestHarness};
pub use mock_provider::MockProvider;
