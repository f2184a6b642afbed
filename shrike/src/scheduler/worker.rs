//! # Worker
//!
//! One worker task of the shared pool. Each worker pulls an actor with a
//! claimed turn from the scheduling queue and runs that turn to completion;
//! turns never block, so workers only park when the queue is empty.
//!
//! ## Loop
//! 1. Pull an actor from the shared queue.
//! 2. Run one complete turn via the system (batch snapshot + execution).
//! 3. On an empty queue, wait for a notification or the idle-sleep tick,
//!    re-checking the shutdown flag on every tick.
//!
//! A panic escaping the turn machinery is an engine fault, not an
//! application error (those are contained per message inside the turn); it
//! is caught, logged, and the worker keeps serving other actors.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error};

use crate::scheduler::queue::SchedulingQueue;
use crate::system::SystemCore;

pub struct Worker {
    id: usize,
    queue: Arc<SchedulingQueue>,
    shutdown: Arc<AtomicBool>,
    /// Turns currently executing anywhere in the pool; feeds the idle/stall
    /// diagnostics.
    active_turns: Arc<AtomicUsize>,
    system: Weak<SystemCore>,
    idle_sleep: Duration,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<SchedulingQueue>,
        shutdown: Arc<AtomicBool>,
        active_turns: Arc<AtomicUsize>,
        system: Weak<SystemCore>,
        idle_sleep: Duration,
    ) -> Self {
        Self {
            id,
            queue,
            shutdown,
            active_turns,
            system,
            idle_sleep,
        }
    }

    /// Launches the worker loop as a task on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run_loop().await })
    }

    async fn run_loop(self) {
        debug!(worker = self.id, "worker started");

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.queue.try_pop() {
                Some(actor) => {
                    let Some(system) = self.system.upgrade() else {
                        break;
                    };

                    self.active_turns.fetch_add(1, Ordering::SeqCst);
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        system.run_turn(&actor);
                    }));
                    self.active_turns.fetch_sub(1, Ordering::SeqCst);

                    if let Err(payload) = result {
                        let msg = payload
                            .downcast_ref::<String>()
                            .map(String::as_str)
                            .or_else(|| payload.downcast_ref::<&str>().copied())
                            .unwrap_or("non-string panic payload");
                        error!(worker = self.id, actor = %actor.id(), %msg, "turn machinery panicked");
                        // The actor's scheduling claim is lost with the turn;
                        // release it so later sends can schedule again.
                        let reschedule = actor.mailbox().finish_turn(|_| false);
                        debug_assert!(!reschedule);
                    }
                }
                None => {
                    tokio::select! {
                        _ = self.queue.notify().notified() => {}
                        _ = time::sleep(self.idle_sleep) => {}
                    }
                }
            }
        }

        debug!(worker = self.id, "worker stopped");
    }
}
