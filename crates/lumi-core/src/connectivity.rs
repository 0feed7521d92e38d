// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide view of the gateway session's last observed status.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Status reported before any webhook event or poll has been observed.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Holder of the last observed connectivity status.
///
/// Written by the connectivity orchestrator, read by status and health
/// endpoints. Injected as `Arc<dyn ConnectivityState>` so tests can swap in
/// their own implementation.
pub trait ConnectivityState: Send + Sync + 'static {
    /// Last observed status string.
    fn get(&self) -> String;

    /// Records a newly observed status.
    fn set(&self, status: &str);
}

/// Lock-free [`ConnectivityState`] backed by an [`ArcSwap`].
#[derive(Debug)]
pub struct SharedConnectivity {
    status: ArcSwap<String>,
}

impl SharedConnectivity {
    pub fn new() -> Self {
        Self {
            status: ArcSwap::from_pointee(UNKNOWN_STATUS.to_string()),
        }
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityState for SharedConnectivity {
    fn get(&self) -> String {
        self.status.load().as_ref().clone()
    }

    fn set(&self, status: &str) {
        self.status.store(Arc::new(status.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        assert_eq!(SharedConnectivity::new().get(), "unknown");
    }

    #[test]
    fn set_is_visible_through_shared_handle() {
        let state: Arc<dyn ConnectivityState> = Arc::new(SharedConnectivity::new());
        let writer = Arc::clone(&state);
        writer.set("WORKING");
        assert_eq!(state.get(), "WORKING");
    }
}
