//! Per-key admission gate.
//!
//! The request pipeline depends on the [`Limiter`] trait; the bundled
//! implementation is the [`FixedWindowLimiter`].

mod fixed_window;

use std::time::Duration;

pub use fixed_window::FixedWindowLimiter;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed.
    pub admitted: bool,
    /// For denials, how long the caller should wait before retrying.
    pub retry_after: Option<Duration>,
}

impl Decision {
    #[must_use]
    pub fn admit() -> Self {
        Self {
            admitted: true,
            retry_after: None,
        }
    }

    #[must_use]
    pub fn deny(retry_after: Duration) -> Self {
        Self {
            admitted: false,
            retry_after: Some(retry_after),
        }
    }
}

/// A rate limiter keyed by an opaque string (usually the client IP).
///
/// Implementations never fail: every call yields a [`Decision`].
pub trait Limiter: Send + Sync {
    /// Records one request for `key` and decides whether it is admitted.
    fn allow(&self, key: &str) -> Decision;

    /// Number of keys with a live window.
    fn tracked_keys(&self) -> usize;
}
