//! Stale-response guard for polling fetches
//!
//! Each fetch takes a ticket when it is dispatched. When the response
//! arrives it is applied only if no newer fetch has started since;
//! otherwise it is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Monotonic request counter
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request; every earlier ticket becomes stale
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Invalidate all outstanding tickets without starting a request
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Run `apply` with `value` if `ticket` is still the latest request
    ///
    /// Returns `None` when the result was stale and dropped.
    pub fn apply_if_current<T, R>(
        &self,
        ticket: RequestTicket,
        value: T,
        apply: impl FnOnce(T) -> R,
    ) -> Option<R> {
        if self.is_current(ticket) {
            Some(apply(value))
        } else {
            tracing::debug!(
                ticket = ticket.0,
                latest = self.latest.load(Ordering::Acquire),
                "Dropping stale response"
            );
            None
        }
    }
}
