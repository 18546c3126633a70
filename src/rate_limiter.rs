//! Token-bucket rate limiter shared by the HTTP poller (and any future
//! producer). `rps = 0` disables limiting entirely.

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct State {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    rps: f64,
    max: f64,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        let rps = rps as f64;
        let max = rps * 2.0;
        RateLimiter {
            rps,
            max,
            state: Mutex::new(State {
                tokens: max,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rps).min(self.max);
        state.last_refill = now;
    }

    /// Blocks until a token is available. Returns immediately if disabled.
    pub fn wait(&self) {
        if self.rps == 0.0 {
            return;
        }
        loop {
            let wait_secs = {
                let mut state = self.state.lock().unwrap();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                (1.0 - state.tokens) / self.rps
            };
            let sleep_us = (wait_secs * 1_000_000.0) as u64;
            let sleep_us = sleep_us.clamp(1_000, 100_000);
            std::thread::sleep(Duration::from_micros(sleep_us));
        }
    }

    /// Non-blocking variant: returns `true` iff a token was consumed.
    pub fn try_acquire(&self) -> bool {
        if self.rps == 0.0 {
            return true;
        }
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
