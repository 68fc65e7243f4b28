use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out dispatch indices until the run's request budget is spent.
#[derive(Debug)]
pub(super) struct RequestLimiter {
    limit: u64,
    counter: AtomicU64,
}

impl RequestLimiter {
    pub(super) const fn new(limit: u64) -> Self {
        Self {
            limit,
            counter: AtomicU64::new(0),
        }
    }

    /// Reserves the next dispatch slot, returning its 0-based index.
    pub(super) fn try_reserve(&self) -> Option<u64> {
        loop {
            let current = self.counter.load(Ordering::Relaxed);
            if current >= self.limit {
                return None;
            }
            let next = current.checked_add(1)?;
            if self
                .counter
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return Some(current);
            }
        }
    }

    /// True once every index has been handed out.
    pub(super) fn is_exhausted(&self) -> bool {
        self.counter.load(Ordering::Relaxed) >= self.limit
    }
}

pub(super) struct InflightGuard<'counter> {
    counter: &'counter AtomicU64,
    in_flight: u64,
}

impl<'counter> InflightGuard<'counter> {
    pub(super) fn acquire(counter: &'counter AtomicU64) -> Self {
        let in_flight = counter.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        Self { counter, in_flight }
    }

    /// Requests in flight when this guard was taken, itself included.
    pub(super) const fn in_flight(&self) -> u64 {
        self.in_flight
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        loop {
            let current = self.counter.load(Ordering::Relaxed);
            let Some(next) = current.checked_sub(1) else {
                break;
            };
            if self
                .counter
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }
}
