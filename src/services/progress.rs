//! Cosmetic progress estimate shown while a fitting job runs.
//!
//! The value is driven by elapsed time only and never reflects backend
//! progress. It climbs linearly toward [`CEILING`] over the estimated
//! duration, holds there, and jumps to 100 only when the job completes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Interval between progress updates.
pub const TICK: Duration = Duration::from_millis(100);

/// Highest value reachable before the job actually completes.
pub const CEILING: f64 = 90.0;

/// Estimate used when none (or zero) is given.
pub const DEFAULT_ESTIMATE_SECS: u64 = 45;

/// Per-garment estimate used when resuming a job from history.
pub const SECS_PER_ITEM: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Processing,
    Completed,
}

/// Pure progress state machine; [`ProgressTicker`] drives it on a timer.
#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    phase: Phase,
    value: f64,
    increment: f64,
    estimated_secs: u64,
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSimulator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            value: 0.0,
            increment: 0.0,
            estimated_secs: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn estimated_secs(&self) -> u64 {
        self.estimated_secs
    }

    /// Enter processing with an estimated duration (zero means default).
    pub fn begin(&mut self, estimated_secs: u64) {
        let secs = if estimated_secs > 0 {
            estimated_secs
        } else {
            DEFAULT_ESTIMATE_SECS
        };
        let total_ticks = secs.saturating_mul(1000) as f64 / TICK.as_millis() as f64;

        self.phase = Phase::Processing;
        self.value = 0.0;
        self.estimated_secs = secs;
        self.increment = CEILING / total_ticks;
    }

    /// Advance one tick. No-op outside processing.
    pub fn tick(&mut self) -> f64 {
        if self.phase == Phase::Processing {
            self.value = (self.value + self.increment).min(CEILING);
        }
        self.value
    }

    /// The job completed: snap to 100.
    pub fn complete(&mut self) {
        self.phase = Phase::Completed;
        self.value = 100.0;
    }

    /// Left processing without completing: back to zero, estimate cleared.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Runs a [`ProgressSimulator`] on a [`TICK`] timer and publishes its value.
pub struct ProgressTicker {
    sim: Arc<Mutex<ProgressSimulator>>,
    tx: Arc<watch::Sender<f64>>,
    running: Mutex<Option<CancellationToken>>,
}

impl Default for ProgressTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTicker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self {
            sim: Arc::new(Mutex::new(ProgressSimulator::new())),
            tx: Arc::new(tx),
            running: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.tx.subscribe()
    }

    pub fn value(&self) -> f64 {
        *self.tx.borrow()
    }

    pub fn phase(&self) -> Phase {
        self.sim.lock().unwrap_or_else(PoisonError::into_inner).phase()
    }

    /// Reset to zero and start ticking. Must be called inside a tokio runtime.
    pub fn start(&self, estimated_secs: u64) {
        self.stop();
        {
            let mut sim = self.sim.lock().unwrap_or_else(PoisonError::into_inner);
            sim.begin(estimated_secs);
            self.tx.send_replace(sim.value());
        }

        let cancel = CancellationToken::new();
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());

        let sim = Arc::clone(&self.sim);
        let tx = Arc::clone(&self.tx);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + TICK, TICK);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let value = sim.lock().unwrap_or_else(PoisonError::into_inner).tick();
                        tx.send_replace(value);
                        if value >= CEILING {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// The job completed: stop ticking and publish 100.
    pub fn complete(&self) {
        self.stop();
        let mut sim = self.sim.lock().unwrap_or_else(PoisonError::into_inner);
        sim.complete();
        self.tx.send_replace(sim.value());
    }

    /// Stop ticking and publish 0.
    pub fn reset(&self) {
        self.stop();
        let mut sim = self.sim.lock().unwrap_or_else(PoisonError::into_inner);
        sim.reset();
        self.tx.send_replace(sim.value());
    }

    fn stop(&self) {
        if let Some(cancel) = self.running.lock().unwrap_or_else(PoisonError::into_inner).take() {
            cancel.cancel();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
