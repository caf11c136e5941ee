use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Length of the rolling window the sustained rate is enforced over
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Window log slots reserved up front; the log grows past this on demand
const WINDOW_PREALLOC: u32 = 64;

/// Sustained-rate discipline for outbound grants.
///
/// A token bucket refilling at `rate` per second up to `burst` tokens,
/// tracked as a theoretical arrival time so refill needs no floating point.
/// On top of the bucket, at most `rate` grants may fall inside any rolling
/// [`RATE_WINDOW`].
pub struct Pacer {
    interval: Duration,
    tolerance: Duration,
    tat: Instant,
    window: VecDeque<Instant>,
    window_cap: usize,
}

impl Pacer {
    pub fn new(rate: u32, burst: u32, now: Instant) -> Self {
        let rate = rate.max(1);
        let burst = burst.max(1);
        let interval = RATE_WINDOW / rate;

        Self {
            interval,
            tolerance: interval * (burst - 1),
            tat: now,
            window: VecDeque::with_capacity(rate.min(WINDOW_PREALLOC) as usize),
            window_cap: rate as usize,
        }
    }

    /// Earliest instant the next grant may happen, or `None` if one may
    /// happen at `now`
    pub fn wait_until(&mut self, now: Instant) -> Option<Instant> {
        while let Some(front) = self.window.front() {
            if *front + RATE_WINDOW <= now {
                self.window.pop_front();
            } else {
                break;
            }
        }

        let bucket_ready = self.tat.checked_sub(self.tolerance).unwrap_or(now);
        let window_ready = if self.window.len() >= self.window_cap {
            self.window.front().map(|front| *front + RATE_WINDOW)
        } else {
            None
        };

        let ready = match window_ready {
            Some(w) => bucket_ready.max(w),
            None => bucket_ready,
        };

        if ready <= now {
            None
        } else {
            Some(ready)
        }
    }

    /// Consume one token at `now`; call only after `wait_until(now)` is `None`
    pub fn record(&mut self, now: Instant) {
        self.tat = self.tat.max(now) + self.interval;
        self.window.push_back(now);
    }
}
