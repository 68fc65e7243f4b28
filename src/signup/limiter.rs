use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Entries kept before expired windows are swept.
const SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u64,
}

/// Fixed-window request counter keyed by client IP.
#[derive(Debug)]
pub(crate) struct FixedWindowLimiter {
    limit: u64,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl FixedWindowLimiter {
    pub(crate) fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a hit for `client`; false once the window's budget is spent.
    pub(crate) fn check(&self, client: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if clients.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            clients.retain(|_, entry| now.saturating_duration_since(entry.started) < window);
        }
        let entry = clients.entry(client).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                hits: 0,
            };
        }
        if entry.hits >= self.limit {
            return false;
        }
        entry.hits = entry.hits.saturating_add(1);
        true
    }
}
