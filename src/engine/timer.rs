// src/engine/timer.rs

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock timestamps. Injected so tests control time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: u64 },
    /// Raised exactly once, on the tick that reaches zero.
    Expired,
}

/// Single countdown driven by external ticks (one per second).
///
/// * `start` arms it only when the test is timed.
/// * `tick` decrements and reports expiry once.
/// * `stop` disarms it; later ticks are ignored.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    remaining: Option<u64>,
    running: bool,
}

impl Countdown {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Arms the countdown. Returns `false` (and stays idle) for untimed tests.
    pub fn start(&mut self, duration_seconds: Option<u64>) -> bool {
        match duration_seconds {
            Some(secs) if secs > 0 => {
                self.remaining = Some(secs);
                self.running = true;
                true
            }
            _ => {
                self.remaining = None;
                self.running = false;
                false
            }
        }
    }

    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        let remaining = self.remaining.map(|r| r.saturating_sub(1)).unwrap_or(0);
        self.remaining = Some(remaining);
        if remaining == 0 {
            self.running = false;
            Some(TimerEvent::Expired)
        } else {
            Some(TimerEvent::Tick { remaining })
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Remaining seconds, `None` for untimed sessions.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }
}
