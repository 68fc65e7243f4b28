use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::shutdown::ShutdownReceiver;

const MILLIS_PER_SECOND: u64 = 1_000;

/// Splits a per-second rate into per-tick token counts, carrying the fraction.
///
/// Token counts are rounded up, so the first tick always yields at least one
/// token and a run starts dispatching immediately at any rate.
pub(crate) struct TickBudget {
    pub rps: u64,
    pub tick_ms: u64,
    pub remainder: u64,
}

impl TickBudget {
    pub(crate) fn new(rps: u64, tick: Duration) -> Self {
        let tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX).max(1);
        Self {
            rps,
            tick_ms,
            remainder: MILLIS_PER_SECOND.saturating_sub(1),
        }
    }

    pub(crate) fn next_tokens(&mut self) -> usize {
        let scaled = self
            .rps
            .saturating_mul(self.tick_ms)
            .saturating_add(self.remainder);
        let (tokens, rem) = div_mod_u64(scaled, MILLIS_PER_SECOND);
        self.remainder = rem;
        usize::try_from(tokens).unwrap_or(usize::MAX)
    }
}

/// Refills a shared semaphore once per tick until cancelled or dropped.
pub(super) struct Pacer {
    permits: Arc<Semaphore>,
    task: JoinHandle<()>,
}

impl Pacer {
    pub(super) fn spawn(
        permits: Arc<Semaphore>,
        rps: u64,
        tick: Duration,
        mut cancel_rx: ShutdownReceiver,
    ) -> Self {
        let limiter = permits.clone();
        let task = tokio::spawn(async move {
            let mut budget = TickBudget::new(rps, tick);
            let mut rate_tick = interval(tick.max(Duration::from_millis(1)));
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        limiter.close();
                        break;
                    }
                    _ = rate_tick.tick() => {
                        if limiter.is_closed() {
                            break;
                        }
                        let target = budget.next_tokens();
                        let available = limiter.available_permits();
                        if available < target {
                            limiter.add_permits(target.saturating_sub(available));
                        }
                    }
                }
            }
        });
        Self { permits, task }
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        self.permits.close();
        self.task.abort();
    }
}

fn div_mod_u64(value: u64, divisor: u64) -> (u64, u64) {
    if divisor == 0 {
        return (0, 0);
    }
    let div = value.checked_div(divisor).unwrap_or(0);
    let rem = value.checked_rem(divisor).unwrap_or(0);
    (div, rem)
}
