//! Debounced, cancellable autosave tasks.
//!
//! At most one pending save exists per email. Scheduling replaces the
//! pending save, so a burst of edits produces a single write of the last
//! payload once the applicant pauses for the debounce delay.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

struct PendingSave {
    id: u64,
    handle: JoinHandle<()>,
}

/// Per-email debounce timers.
#[derive(Clone)]
pub struct AutosaveScheduler {
    delay: Duration,
    pending: Arc<Mutex<HashMap<String, PendingSave>>>,
    next_id: Arc<AtomicU64>,
}

impl AutosaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `save` after the debounce delay, replacing any pending save for
    /// `email`.
    pub async fn schedule<F>(&self, email: &str, save: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let pending = Arc::clone(&self.pending);
        let key = email.to_string();

        let mut guard = self.pending.lock().await;
        if let Some(previous) = guard.remove(email) {
            previous.handle.abort();
            debug!(email = %email, "Replaced pending autosave");
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            save.await;

            let mut pending = pending.lock().await;
            if pending.get(&key).is_some_and(|p| p.id == id) {
                pending.remove(&key);
            }
        });
        guard.insert(email.to_string(), PendingSave { id, handle });
    }

    /// Drop the pending save for `email`.
    ///
    /// Returns once the task is gone, so a save already in flight has
    /// either finished or been aborted. Returns true if a save was pending.
    pub async fn cancel(&self, email: &str) -> bool {
        let entry = self.pending.lock().await.remove(email);
        match entry {
            Some(pending) => {
                pending.handle.abort();
                let _ = pending.handle.await;
                debug!(email = %email, "Cancelled pending autosave");
                true
            }
            None => false,
        }
    }

    /// Number of emails with a save pending.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
