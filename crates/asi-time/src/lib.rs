#![no_std]
#![forbid(unsafe_code)]

mod stamp;
pub use stamp::UtcStamp;

/// Milliseconds from `since` to `now` on the wrapping u32 tick counter.
/// Valid for any two stamps less than 2^31 ms (~24.8 days) apart.
pub fn tick_elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Wrap-tolerant "a is at or after b". Half-range rule: never compare raw
/// tick counters with `<`.
pub fn tick_ge(a: u32, b: u32) -> bool {
    a.wrapping_sub(b) < 0x8000_0000
}

/// Phase/stage timer over the wrapping tick counter. The caller supplies
/// `now` so the type stays free of clock plumbing.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_ms: u32,
}

impl Stopwatch {
    pub fn started_at(now_ms: u32) -> Self {
        Self { start_ms: now_ms }
    }

    pub fn elapsed_ms(&self, now_ms: u32) -> u32 {
        tick_elapsed(now_ms, self.start_ms)
    }

    /// True once the watch has run past `budget_ms`.
    pub fn over_budget(&self, now_ms: u32, budget_ms: u32) -> bool {
        self.elapsed_ms(now_ms) > budget_ms
    }
}
