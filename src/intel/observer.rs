//! "New intel found" signal
//!
//! Each presentation consumer owns one observer. It remembers the last entity
//! count it saw per session and raises a transient flash whenever the active
//! session's count grows. The flash clears itself after [`FLASH_HOLD`]; the
//! pending clear is a cancellable timer tied to the active session.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// How long a flash stays raised
pub const FLASH_HOLD: Duration = Duration::from_millis(2000);

/// A raised flash for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntelFlash {
    pub session_id: String,
    pub new_entities: usize,
    pub total: usize,
    #[serde(skip)]
    generation: u64,
}

pub struct IntelObserver {
    hold: Duration,
    last_counts: HashMap<String, usize>,
    active: Option<String>,
    generation: u64,
    pending_clear: Option<CancellationToken>,
    flag: Arc<watch::Sender<Option<IntelFlash>>>,
}

impl IntelObserver {
    pub fn new(hold: Duration) -> Self {
        let (flag, _) = watch::channel(None);
        Self {
            hold,
            last_counts: HashMap::new(),
            active: None,
            generation: 0,
            pending_clear: None,
            flag: Arc::new(flag),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<IntelFlash>> {
        self.flag.subscribe()
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<IntelFlash> {
        self.flag.borrow().clone()
    }

    /// Feed the active session and its accumulated entity count.
    ///
    /// Must be called from within a tokio runtime: raising a flash spawns its
    /// clear timer.
    pub fn observe(&mut self, active: Option<(&str, usize)>) {
        let active_id = active.map(|(id, _)| id);
        if active_id != self.active.as_deref() {
            self.cancel_pending();
            // A flag raised for the previous selection no longer applies
            self.flag.send_if_modified(|flag| {
                if flag.as_ref().is_some_and(|f| Some(f.session_id.as_str()) != active_id) {
                    *flag = None;
                    true
                } else {
                    false
                }
            });
            self.active = active_id.map(ToString::to_string);
        }

        let Some((session_id, count)) = active else {
            return;
        };
        let last = self.last_counts.get(session_id).copied().unwrap_or(0);
        if count > last {
            self.raise(session_id, count - last, count);
        }
        self.last_counts.insert(session_id.to_string(), count.max(last));
    }

    fn raise(&mut self, session_id: &str, new_entities: usize, total: usize) {
        self.cancel_pending();
        self.generation += 1;
        let generation = self.generation;

        tracing::debug!(session_id, new_entities, total, "New intel flash raised");
        self.flag.send_replace(Some(IntelFlash {
            session_id: session_id.to_string(),
            new_entities,
            total,
            generation,
        }));

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let flag = Arc::clone(&self.flag);
        let hold = self.hold;
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(hold) => {
                    // Only clear the flash this timer was started for
                    flag.send_if_modified(|current| {
                        if current.as_ref().is_some_and(|f| f.generation == generation) {
                            *current = None;
                            true
                        } else {
                            false
                        }
                    });
                }
            }
        });
        self.pending_clear = Some(token);
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending_clear.take() {
            token.cancel();
        }
    }
}

impl Drop for IntelObserver {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
