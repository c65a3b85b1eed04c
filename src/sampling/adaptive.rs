//! Adaptive (windowed) sampling.
//!
//! Keeps the delivered event volume near a target: once per time window
//! the effective rate is recomputed as `min(1, target / observed)` from
//! the previous window's count, then every event in the new window is
//! uniform-random sampled at that rate.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::sampling::engine::SamplingEngine;

#[derive(Debug)]
struct WindowState {
    started: Instant,
    observed: u64,
    effective_rate: f64,
}

/// Windowed adaptive sampler.
///
/// The window state is the only shared-mutable piece of the sampling
/// layer; concurrent callers serialize on its mutex.
#[derive(Debug)]
pub struct AdaptiveSampler {
    target_per_window: u64,
    window: Duration,
    state: Mutex<WindowState>,
}

impl AdaptiveSampler {
    pub fn new(target_per_window: u64, window: Duration) -> Self {
        Self {
            target_per_window,
            window,
            state: Mutex::new(WindowState {
                started: Instant::now(),
                observed: 0,
                effective_rate: 1.0,
            }),
        }
    }

    /// Record one event and decide whether it passes sampling.
    pub fn observe(&self, engine: &SamplingEngine) -> bool {
        let rate = {
            let mut state = self.state.lock();
            if state.started.elapsed() >= self.window {
                state.effective_rate =
                    compute_rate(self.target_per_window, state.observed);
                state.observed = 0;
                state.started = Instant::now();
                log::debug!(
                    "ADAPTIVE_WINDOW_ROLLED rate={} target={}",
                    state.effective_rate,
                    self.target_per_window
                );
            }
            state.observed += 1;
            state.effective_rate
        };

        engine.sample_uniform(rate)
    }

    /// The rate currently applied (recomputed at window rollover only).
    pub fn effective_rate(&self) -> f64 {
        self.state.lock().effective_rate
    }
}

/// `min(1, target / observed)`; an idle window resets to full rate.
fn compute_rate(target: u64, observed: u64) -> f64 {
    if observed == 0 {
        return 1.0;
    }
    (target as f64 / observed as f64).min(1.0)
}
