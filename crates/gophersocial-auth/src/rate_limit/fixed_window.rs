//! Fixed-window rate limiter.
//!
//! Each key gets a window that opens on its first request and closes exactly
//! `window` later. While the window is open at most `limit` requests are
//! admitted. A single background task owns a [`DelayQueue`] of window
//! deadlines and purges each key when its window closes.

use std::collections::HashMap;
use std::future::poll_fn;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::time::DelayQueue;

use super::{Decision, Limiter};

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    deadline: Instant,
}

type Table = Arc<Mutex<HashMap<String, Window>>>;

/// Fixed-window limiter backed by a mutex-guarded counter table.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    table: Table,
    expiries: mpsc::UnboundedSender<(String, Instant)>,
}

impl FixedWindowLimiter {
    /// Creates a limiter admitting `limit` requests per key per `window` and
    /// spawns its expiry task.
    ///
    /// The expiry task stops once the limiter is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        let table: Table = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_expiry(Arc::clone(&table), rx));

        Self {
            limit,
            window,
            table,
            expiries: tx,
        }
    }

    /// Admissions per window.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Limiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> Decision {
        if self.limit == 0 {
            return Decision::deny(self.window);
        }

        let now = Instant::now();
        let mut table = self.table.lock();

        if let Some(window) = table.get_mut(key).filter(|w| now < w.deadline) {
            if window.count < self.limit {
                window.count += 1;
                return Decision::admit();
            }
            // The hint is the full window length rather than the time left.
            return Decision::deny(self.window);
        }

        // First observation, or a closed window the expiry task has not
        // purged yet.
        let deadline = now + self.window;
        table.insert(key.to_owned(), Window { count: 1, deadline });
        if self.expiries.send((key.to_owned(), deadline)).is_err() {
            tracing::warn!(key = %key, "rate limiter expiry task is gone, window will not be purged");
        }

        Decision::admit()
    }

    fn tracked_keys(&self) -> usize {
        self.table.lock().len()
    }
}

async fn run_expiry(table: Table, mut rx: mpsc::UnboundedReceiver<(String, Instant)>) {
    let mut queue: DelayQueue<(String, Instant)> = DelayQueue::new();

    loop {
        tokio::select! {
            scheduled = rx.recv() => match scheduled {
                Some((key, deadline)) => {
                    queue.insert_at((key, deadline), deadline);
                }
                None => break,
            },
            Some(expired) = poll_fn(|cx| queue.poll_expired(cx)), if !queue.is_empty() => {
                let (key, deadline) = expired.into_inner();
                let mut table = table.lock();
                // A newer window for the same key has its own scheduled expiry.
                if table.get(&key).is_some_and(|w| w.deadline == deadline) {
                    table.remove(&key);
                    tracing::trace!(key = %key, "rate limit window expired");
                }
            }
        }
    }

    tracing::debug!("rate limiter expiry task stopped");
}
