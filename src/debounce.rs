//! Trailing-edge debounce timer.
//!
//! At most one timer is armed at a time. Re-scheduling cancels the armed
//! timer and starts a fresh window; only the last action of a burst runs.
//! Once a timer fires its action is detached from the slot, so a later
//! `schedule` never cancels work that is already running.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

#[derive(Default)]
struct Slot {
    generation: u64,
    timer: Option<JoinHandle<()>>,
    burst_started: Option<Instant>,
}

pub struct Debouncer {
    delay: Duration,
    max_wait: Option<Duration>,
    runtime: Handle,
    slot: Arc<Mutex<Slot>>,
}

impl Debouncer {
    pub fn new(delay: Duration, runtime: Handle) -> Self {
        Self {
            delay,
            max_wait: None,
            runtime,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Cap how long a continuous burst may defer the action.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Arm (or re-arm) the trailing timer for `action`.
    pub fn schedule<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().expect("debounce mutex poisoned");
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let now = Instant::now();
        let started = *slot.burst_started.get_or_insert(now);
        let wait = match self.max_wait {
            Some(ceiling) => self.delay.min(ceiling.saturating_sub(now - started)),
            None => self.delay,
        };

        let shared = Arc::clone(&self.slot);
        slot.timer = Some(self.runtime.spawn(async move {
            sleep(wait).await;
            {
                let mut slot = shared.lock().expect("debounce mutex poisoned");
                if slot.generation != generation {
                    return;
                }
                slot.timer = None;
                slot.burst_started = None;
            }
            action().await;
        }));
    }

    /// Drop the armed timer, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.lock().expect("debounce mutex poisoned");
        slot.generation = slot.generation.wrapping_add(1);
        slot.burst_started = None;
        match slot.timer.take() {
            Some(timer) => {
                timer.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .expect("debounce mutex poisoned")
            .timer
            .is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
