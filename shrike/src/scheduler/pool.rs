//! # Worker Pool
//!
//! Bounded-parallelism executor for actor turns: a fixed set of workers
//! draining one shared scheduling queue. Parallelism equals the configured
//! worker count; per-actor sequential consistency is enforced upstream by
//! the mailbox scheduling claim, so the pool itself needs no per-actor
//! state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::actor::Actor;
use crate::error::SystemError;
use crate::scheduler::queue::SchedulingQueue;
use crate::scheduler::worker::Worker;
use crate::system::SystemCore;

#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    idle_sleep: Duration,
    queue: Arc<SchedulingQueue>,
    shutdown: Arc<AtomicBool>,
    active_turns: Arc<AtomicUsize>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates the pool without starting workers; workers need the system
    /// back-reference, which exists only once the system is constructed.
    pub fn new(size: usize, idle_sleep: Duration) -> Self {
        Self {
            size: size.max(1),
            idle_sleep,
            queue: Arc::new(SchedulingQueue::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            active_turns: Arc::new(AtomicUsize::new(0)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Starts the worker tasks on the current runtime.
    pub fn start(&self, system: Weak<SystemCore>) {
        let mut workers = self.workers.lock().unwrap();
        debug_assert!(workers.is_empty(), "pool started twice");
        for id in 0..self.size {
            let worker = Worker::new(
                id,
                self.queue.clone(),
                self.shutdown.clone(),
                self.active_turns.clone(),
                system.clone(),
                self.idle_sleep,
            );
            workers.push(worker.spawn());
        }
        debug!(workers = self.size, "worker pool started");
    }

    /// Enqueues a turn for `actor`. Callers must hold the mailbox
    /// scheduling claim.
    pub fn schedule(&self, actor: Arc<Actor>) {
        self.queue.push(actor);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// True when no turn is queued or executing. A snapshot; meaningful for
    /// diagnostics only.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active_turns.load(Ordering::SeqCst) == 0
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Stops scheduling new turns and wakes every parked worker. In-flight
    /// turns drain; workers exit on their next loop iteration.
    pub fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.notify_all();
    }

    /// Waits for all workers to exit after [`begin_shutdown`]
    /// (Self::begin_shutdown).
    pub async fn await_terminated(&self, timeout: Duration) -> Result<(), SystemError> {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock().unwrap());
        let join_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        match tokio::time::timeout(timeout, join_all).await {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(?timeout, "worker pool did not drain in time");
                Err(SystemError::ShutdownTimeout(timeout))
            }
        }
    }
}
