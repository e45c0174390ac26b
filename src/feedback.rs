//! Copy-to-clipboard feedback state.
//!
//! One instance per UI surface: each holds a single pending reset, cleared
//! and re-armed atomically on every new copy action, so feedback on one
//! surface never leaks into another.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct CopyFeedback {
    ttl: Duration,
    copied: Arc<Mutex<Option<usize>>>,
    reset: Mutex<Option<JoinHandle<()>>>,
}

impl CopyFeedback {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            copied: Arc::new(Mutex::new(None)),
            reset: Mutex::new(None),
        }
    }

    /// Record that the entry at `index` was copied and arm the reset,
    /// aborting any previously pending one.
    pub fn mark(&self, index: usize) {
        if let Some(pending) = self
            .reset
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            pending.abort();
        }
        *self.copied.lock().unwrap_or_else(|e| e.into_inner()) = Some(index);

        let copied = Arc::clone(&self.copied);
        let ttl = self.ttl;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            *copied.lock().unwrap_or_else(|e| e.into_inner()) = None;
        });
        *self.reset.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    pub fn is_copied(&self, index: usize) -> bool {
        *self.copied.lock().unwrap_or_else(|e| e.into_inner()) == Some(index)
    }
}
