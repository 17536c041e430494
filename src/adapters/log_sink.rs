//! Log-based state observer.
//!
//! Implements [`StateObserver`] by writing each distinct state snapshot to
//! the logger as JSON (UART / USB-CDC in production).  Snapshots identical
//! to the previous one are skipped.

use std::sync::{Mutex, PoisonError};

use log::{info, warn};

use crate::state::{ObservableState, StateObserver};

#[derive(Default)]
pub struct LogStateObserver {
    last: Mutex<Option<ObservableState>>,
}

impl LogStateObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `state`; `false` when it equals the previous snapshot.
    fn remember(&self, state: &ObservableState) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(state) {
            return false;
        }
        *last = Some(state.clone());
        true
    }
}

impl StateObserver for LogStateObserver {
    fn on_state_changed(&self, state: &ObservableState) {
        if !self.remember(state) {
            return;
        }
        match serde_json::to_string(state) {
            Ok(json) => info!("STATE | {}", json),
            Err(e) => warn!("STATE | unserialisable snapshot: {}", e),
        }
    }
}
