//! # System Configuration
//!
//! Everything the embedding runtime can tune: worker-pool size, trace
//! capture/replay, and the timing knobs of the idle-diagnostics loop. All
//! loading/parsing of configuration sources stays external; this is the
//! in-memory form only.

use std::time::Duration;

use crate::trace::Trace;

/// Tracing mode of a run.
#[derive(Debug, Clone, Default)]
pub enum TraceMode {
    /// No trace involvement; sequential actor ids.
    #[default]
    Off,
    /// Append per-actor consumption order; deterministic actor ids.
    Record,
    /// Gate consumption to match the given recording; deterministic actor
    /// ids recomputed from spawn structure.
    Replay(Trace),
}

impl TraceMode {
    pub fn is_traced(&self) -> bool {
        !matches!(self, TraceMode::Off)
    }
}

/// Configuration of one actor system instance.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Number of worker tasks executing actor turns; the parallelism bound.
    pub workers: usize,

    /// How long an idle worker sleeps between shutdown checks when no
    /// notification arrives.
    pub idle_sleep: Duration,

    /// Interval of the completion-wait poll loop.
    pub poll_interval: Duration,

    /// Consecutive no-progress polls with an idle pool before the run is
    /// declared stalled. Diagnostics only, never correctness.
    pub stall_polls: u32,

    /// Grace period for workers to drain in-flight turns at shutdown.
    pub shutdown_timeout: Duration,

    pub trace: TraceMode,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            idle_sleep: Duration::from_millis(10),
            poll_interval: Duration::from_millis(20),
            stall_polls: 50,
            shutdown_timeout: Duration::from_secs(5),
            trace: TraceMode::Off,
        }
    }
}

impl SystemConfig {
    /// Configuration for a recorded run.
    pub fn recording() -> Self {
        Self {
            trace: TraceMode::Record,
            ..Self::default()
        }
    }

    /// Configuration replaying `trace`.
    pub fn replaying(trace: Trace) -> Self {
        Self {
            trace: TraceMode::Replay(trace),
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
