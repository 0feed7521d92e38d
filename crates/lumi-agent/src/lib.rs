// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime core of the Lumi agent.
//!
//! - [`ConnectivityOrchestrator`] drives the gateway session to a usable state
//! - [`ConversationEngine`] decides per chat whether and how to answer
//! - [`TaskPool`] runs webhook-triggered work off the request path
//! - [`install_signal_handler`] turns SIGINT/SIGTERM into a cancellation token

pub mod connectivity;
pub mod conversation;
pub mod shutdown;
pub mod tasks;

pub use connectivity::{ConnectivityOrchestrator, OrchestratorSettings, ensure_self_registered};
pub use conversation::{ConversationEngine, ConversationSettings, DiscardReason, Outcome};
pub use shutdown::install_signal_handler;
pub use tasks::{TaskOutcome, TaskPool, spawn_outcome_logger};
