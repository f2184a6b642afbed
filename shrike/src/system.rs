//! # Actor System
//!
//! The central component tying the engine together: the actor registry, the
//! eventual-send protocol, promise settlement, turn execution, trace
//! record/replay wiring, and the completion/quiescence observation the
//! embedding runtime blocks on.
//!
//! ## Key Concepts
//! - Registry: actors are stored behind their ids; every cross-actor link in
//!   the engine is an id resolved here, never a direct reference.
//! - Send protocol: a sender's turn builds an immutable `EventualMessage`,
//!   the target mailbox claims a turn when idle, the pool runs it. FIFO per
//!   sender→target pair follows from per-sender construction order plus the
//!   single-drain mailbox.
//! - Settlement: promise resolutions convert registrations into fresh
//!   eventual messages through the same send path, in registration order;
//!   resolving with a promise re-chains instead (no promise-of-a-promise).
//! - Containment: a failing message breaks its own resolution chain or lands
//!   in the top-level sink; it never aborts the actor, the batch or the
//!   pool.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use shrike_api::{
    value_of, ActorId, Evaluator, FarReference, LanguageError, Selector, Value, ValueClassifier,
};

use crate::actor::Actor;
use crate::config::{SystemConfig, TraceMode};
use crate::error::SystemError;
use crate::ids::{IdMode, IdentityAllocator};
use crate::message::{EventualMessage, Resolver};
use crate::promise::{CompletionCell, Outcome, Promise, Registration};
use crate::scheduler::WorkerPool;
use crate::trace::{Trace, TraceRecorder, TraceReplayer};
use crate::turn::Turn;

/// Shared engine state behind the [`ActorSystem`] facade.
pub struct SystemCore {
    config: SystemConfig,
    allocator: IdentityAllocator,
    registry: RwLock<HashMap<ActorId, Arc<Actor>>>,
    pool: WorkerPool,
    evaluator: Arc<dyn Evaluator>,
    classifier: Arc<dyn ValueClassifier>,
    recorder: Option<TraceRecorder>,
    replayer: Option<TraceReplayer>,
    /// Top-level completion the embedding caller blocks on.
    completion: Arc<CompletionCell>,
    /// Messages delivered but not yet processed (held replay messages
    /// included). Zero together with an idle pool means quiescence.
    pending_messages: AtomicU64,
    /// Total messages processed; the progress signal of stall detection.
    processed_messages: AtomicU64,
    /// Application errors with nothing chained on their resolution.
    unhandled: Mutex<Vec<LanguageError>>,
}

impl SystemCore {
    fn admits(&self, actor: ActorId, msg: &EventualMessage) -> bool {
        match &self.replayer {
            Some(replayer) => replayer.admits(actor, msg),
            None => true,
        }
    }

    fn lookup(&self, id: ActorId) -> Result<Arc<Actor>, SystemError> {
        self.registry
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(SystemError::ActorNotFound(id))
    }

    /// Atomically appends to the target mailbox and claims a turn when the
    /// target was idle (and, under replay, the message matches).
    fn deliver(&self, msg: EventualMessage) -> Result<(), SystemError> {
        if self.pool.is_shutting_down() {
            return Err(SystemError::ShuttingDown);
        }
        let target = msg.target;
        let actor = self.lookup(target)?;
        self.pending_messages.fetch_add(1, Ordering::SeqCst);
        let wake = actor.mailbox().push(msg, |m| self.admits(target, m));
        if wake {
            self.pool.schedule(actor);
        }
        Ok(())
    }

    /// Wraps an argument for the actor boundary: shareable values and
    /// capabilities pass as-is, everything else becomes a far reference
    /// owned by the sender.
    fn export(&self, sender: ActorId, arg: Value) -> Value {
        if FarReference::from_value(&arg).is_some() || Promise::from_value(&arg).is_some() {
            return arg;
        }
        if self.classifier.is_independently_shareable(&arg) {
            return arg;
        }
        FarReference::new(sender, arg).into_value()
    }

    fn build_message(
        &self,
        sender: ActorId,
        target: ActorId,
        receiver: Value,
        selector: Selector,
        args: Vec<Value>,
        resolver: Option<Resolver>,
        promise_origin: Option<ActorId>,
    ) -> EventualMessage {
        let args = args.into_iter().map(|a| self.export(sender, a)).collect();
        EventualMessage {
            message_id: self.allocator.next_message(),
            target,
            receiver,
            selector,
            args,
            sender,
            resolver,
            promise_origin,
        }
    }

    /// Eventual send through a far reference; returns the fresh reply
    /// promise.
    pub(crate) fn eventual_send(
        &self,
        sender: ActorId,
        far: &FarReference,
        selector: Selector,
        args: Vec<Value>,
    ) -> Result<Arc<Promise>, SystemError> {
        let promise = Promise::new();
        let msg = self.build_message(
            sender,
            far.target,
            far.value.clone(),
            selector,
            args,
            Some(Resolver::Promise(promise.clone())),
            None,
        );
        self.deliver(msg)?;
        Ok(promise)
    }

    /// Eventual send whose result the sender statically discards: no
    /// promise is allocated. An optimization with no semantic effect.
    pub(crate) fn send_discarding(
        &self,
        sender: ActorId,
        far: &FarReference,
        selector: Selector,
        args: Vec<Value>,
    ) -> Result<(), SystemError> {
        let msg = self.build_message(
            sender,
            far.target,
            far.value.clone(),
            selector,
            args,
            None,
            None,
        );
        self.deliver(msg)
    }

    /// Pipelined send: the message is chained on the promise and delivered
    /// to the owner of its eventual value once resolved.
    pub(crate) fn send_to_promise(
        self: &Arc<Self>,
        sender: ActorId,
        promise: &Arc<Promise>,
        selector: Selector,
        args: Vec<Value>,
    ) -> Arc<Promise> {
        let reply = Promise::new();
        let args = args.into_iter().map(|a| self.export(sender, a)).collect();
        let registration = Registration::Message {
            selector,
            args,
            sender,
            resolver: Some(Resolver::Promise(reply.clone())),
        };
        if let Err((registration, outcome, resolving)) = promise.register(registration) {
            self.fire_registration(registration, &outcome, resolving);
        }
        reply
    }

    pub(crate) fn send_to_promise_discarding(
        self: &Arc<Self>,
        sender: ActorId,
        promise: &Arc<Promise>,
        selector: Selector,
        args: Vec<Value>,
    ) {
        let args = args.into_iter().map(|a| self.export(sender, a)).collect();
        let registration = Registration::Message {
            selector,
            args,
            sender,
            resolver: None,
        };
        if let Err((registration, outcome, resolving)) = promise.register(registration) {
            self.fire_registration(registration, &outcome, resolving);
        }
    }

    /// Spawns a child of `parent` owning `init`.
    pub(crate) fn spawn_child(
        self: &Arc<Self>,
        parent: &Actor,
        init: Value,
    ) -> Result<FarReference, SystemError> {
        if self.pool.is_shutting_down() {
            return Err(SystemError::ShuttingDown);
        }
        if !self.classifier.is_independently_shareable(&init) {
            return Err(SystemError::NotShareable);
        }
        let ordinal = parent.next_child_ordinal();
        let id = self.allocator.child_actor(parent.id(), ordinal);
        let actor = Arc::new(Actor::new(id));
        self.registry.write().unwrap().insert(id, actor);
        debug!(parent = %parent.id(), child = %id, ordinal, "actor spawned");
        Ok(FarReference::new(id, init))
    }

    /// Settles `promise` with `outcome`, first resolution wins.
    ///
    /// Resolving with another promise re-chains all registrants onto it
    /// (transitively flattening); a concrete outcome converts every
    /// registration, in registration order, into a message through the
    /// normal send path.
    pub(crate) fn settle_promise(
        self: &Arc<Self>,
        promise: &Arc<Promise>,
        outcome: &Outcome,
        resolving: ActorId,
    ) {
        if let Ok(v) = outcome {
            if let Some(inner) = Promise::from_value(v) {
                if Arc::ptr_eq(&inner, promise) {
                    warn!("promise resolved with itself; ignored");
                    return;
                }
                let Some(registrations) = promise.take_registrations_for_rechain() else {
                    debug!(%resolving, "resolution attempt on settled promise ignored");
                    return;
                };
                // The original promise follows the inner one, so its own
                // observers eventually see the concrete value.
                let mut chained = vec![Registration::Chain(promise.clone())];
                chained.extend(registrations);
                for registration in chained {
                    if let Err((registration, outcome, resolving)) = inner.register(registration) {
                        self.fire_registration(registration, &outcome, resolving);
                    }
                }
                return;
            }
        }

        match promise.try_settle(outcome, resolving) {
            Some(registrations) => {
                for registration in registrations {
                    self.fire_registration(registration, outcome, resolving);
                }
            }
            // Concurrent double resolution: first one won, this is a no-op.
            None => debug!(%resolving, "resolution attempt on settled promise ignored"),
        }
    }

    /// Converts one registration of a settled promise into its effect.
    fn fire_registration(
        self: &Arc<Self>,
        registration: Registration,
        outcome: &Outcome,
        resolving: ActorId,
    ) {
        match registration {
            Registration::Message {
                selector,
                args,
                sender,
                resolver,
            } => match outcome {
                Ok(v) => {
                    // The promise message runs where the value lives: at the
                    // far reference's target, or with the resolving actor
                    // for locally owned values.
                    let (target, receiver) = match FarReference::from_value(v) {
                        Some(far) => (far.target, far.value.clone()),
                        None => (resolving, v.clone()),
                    };
                    let msg = self.build_message(
                        sender,
                        target,
                        receiver,
                        selector,
                        args,
                        resolver,
                        Some(resolving),
                    );
                    if let Err(e) = self.deliver(msg) {
                        debug!(error = %e, "promise message dropped");
                    }
                }
                // A broken promise propagates the error down the chain; the
                // pipelined message never runs.
                Err(e) => match resolver {
                    Some(Resolver::Promise(reply)) => {
                        self.settle_promise(&reply, &Err(e.clone()), resolving)
                    }
                    Some(Resolver::Completion(cell)) => {
                        cell.complete(Err(e.clone()));
                    }
                    None => self.sink(e.clone()),
                },
            },
            Registration::Chain(follower) => self.settle_promise(&follower, outcome, resolving),
            Registration::Settle(cell) => match outcome {
                Ok(v) => match Promise::from_value(v) {
                    // Completion follows promises the same way registrants
                    // do: the caller observes a concrete value.
                    Some(inner) => {
                        if let Err((registration, outcome, resolving)) =
                            inner.register(Registration::Settle(cell))
                        {
                            self.fire_registration(registration, &outcome, resolving);
                        }
                    }
                    None => {
                        cell.complete(Ok(v.clone()));
                    }
                },
                Err(e) => {
                    cell.complete(Err(e.clone()));
                }
            },
        }
    }

    /// Top-level sink for application errors with no resolution handler.
    fn sink(&self, e: LanguageError) {
        error!(error = %e, "unhandled application error");
        self.unhandled.lock().unwrap().push(e);
    }

    /// Runs one complete turn of `actor`: snapshot the batch, execute each
    /// message, settle its resolver, then reschedule or go idle.
    pub(crate) fn run_turn(self: &Arc<Self>, actor: &Arc<Actor>) {
        let batch = match &self.replayer {
            Some(replayer) => actor.mailbox().take_batch_replay(actor.id(), replayer),
            None => actor.mailbox().take_batch(),
        };

        for msg in batch {
            if let Some(recorder) = &self.recorder {
                recorder.record_consumption(actor.id(), &msg);
            }

            let mut ctx = Turn::new(self, actor);
            let invoked = panic::catch_unwind(AssertUnwindSafe(|| {
                self.evaluator
                    .invoke(&mut ctx, &msg.selector, &msg.receiver, &msg.args)
            }));
            let outcome: Outcome = match invoked {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(LanguageError::in_selector(
                    msg.selector.clone(),
                    "evaluator panicked",
                )),
            };

            self.processed_messages.fetch_add(1, Ordering::SeqCst);
            match msg.resolver {
                Some(Resolver::Promise(promise)) => {
                    self.settle_promise(&promise, &outcome, actor.id())
                }
                Some(Resolver::Completion(cell)) => {
                    self.fire_registration(Registration::Settle(cell), &outcome, actor.id())
                }
                None => {
                    if let Err(e) = outcome {
                        self.sink(e);
                    }
                }
            }
            self.pending_messages.fetch_sub(1, Ordering::SeqCst);
        }

        // New admissible messages arrived meanwhile: fresh turn instead of
        // looping in place, so other actors get pool time promptly.
        if actor
            .mailbox()
            .finish_turn(|m| self.admits(actor.id(), m))
        {
            self.pool.schedule(actor.clone());
        }
    }

    fn quiescent(&self) -> bool {
        self.pending_messages.load(Ordering::SeqCst) == 0 && self.pool.is_idle()
    }

    fn pending_descriptions(&self) -> HashMap<ActorId, Vec<String>> {
        let registry = self.registry.read().unwrap();
        registry
            .iter()
            .map(|(id, actor)| (*id, actor.mailbox().describe_pending()))
            .filter(|(_, pending)| !pending.is_empty())
            .collect()
    }
}

impl std::fmt::Debug for SystemCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemCore")
            .field("actors", &self.registry.read().unwrap().len())
            .field("pending", &self.pending_messages.load(Ordering::Relaxed))
            .field("processed", &self.processed_messages.load(Ordering::Relaxed))
            .finish()
    }
}

/// The embedding runtime's handle to one actor engine instance.
///
/// Cheap to clone; all clones share the same engine.
#[derive(Clone, Debug)]
pub struct ActorSystem {
    core: Arc<SystemCore>,
}

impl ActorSystem {
    /// Builds the engine and starts its worker pool on the current tokio
    /// runtime.
    pub fn start(
        config: SystemConfig,
        evaluator: Arc<dyn Evaluator>,
        classifier: Arc<dyn ValueClassifier>,
    ) -> Result<Self, SystemError> {
        Handle::try_current().map_err(|e| SystemError::NoRuntime(e.to_string()))?;

        let id_mode = if config.trace.is_traced() {
            IdMode::Derived
        } else {
            IdMode::Sequential
        };
        let (recorder, replayer) = match &config.trace {
            TraceMode::Off => (None, None),
            TraceMode::Record => (Some(TraceRecorder::new()), None),
            TraceMode::Replay(trace) => (None, Some(TraceReplayer::new(trace))),
        };

        let pool = WorkerPool::new(config.workers, config.idle_sleep);
        let mut registry = HashMap::new();
        registry.insert(ActorId::MAIN, Arc::new(Actor::new(ActorId::MAIN)));

        let core = Arc::new(SystemCore {
            allocator: IdentityAllocator::new(id_mode),
            registry: RwLock::new(registry),
            pool,
            evaluator,
            classifier,
            recorder,
            replayer,
            completion: CompletionCell::new(),
            pending_messages: AtomicU64::new(0),
            processed_messages: AtomicU64::new(0),
            unhandled: Mutex::new(Vec::new()),
            config,
        });
        core.pool.start(Arc::downgrade(&core));
        info!(workers = core.pool.size(), "actor system started");

        Ok(Self { core })
    }

    /// Spawns a top-level actor owning `init` (a child of the implicit main
    /// actor) and returns the capability to it.
    pub fn spawn_actor(&self, init: Value) -> Result<FarReference, SystemError> {
        let main = self.core.lookup(ActorId::MAIN)?;
        self.core.spawn_child(&main, init)
    }

    /// Eventual send from the embedding (attributed to the main actor).
    pub fn send(
        &self,
        target: &FarReference,
        selector: Selector,
        args: Vec<Value>,
    ) -> Result<Arc<Promise>, SystemError> {
        self.core
            .eventual_send(ActorId::MAIN, target, selector, args)
    }

    /// Send without a reply promise, for statically discarded results.
    pub fn send_discarding(
        &self,
        target: &FarReference,
        selector: Selector,
        args: Vec<Value>,
    ) -> Result<(), SystemError> {
        self.core
            .send_discarding(ActorId::MAIN, target, selector, args)
    }

    /// Invokes the program's entry point. Bypasses promise allocation: the
    /// outcome settles the completion observed by
    /// [`await_completion_or_quiescence`](Self::await_completion_or_quiescence).
    pub fn direct_send(
        &self,
        target: &FarReference,
        selector: Selector,
        args: Vec<Value>,
    ) -> Result<(), SystemError> {
        let msg = self.core.build_message(
            ActorId::MAIN,
            target.target,
            target.value.clone(),
            selector,
            args,
            Some(Resolver::Completion(self.core.completion.clone())),
            None,
        );
        self.core.deliver(msg)
    }

    /// Resolves `promise` with `value`; later attempts are no-ops.
    /// Embedding-side resolutions are attributed to the main actor.
    pub fn resolve(&self, promise: &Arc<Promise>, value: Value) {
        self.core
            .settle_promise(promise, &Ok(value), ActorId::MAIN);
    }

    /// Breaks `promise` with `error`; later attempts are no-ops.
    pub fn resolve_with_error(&self, promise: &Arc<Promise>, error: LanguageError) {
        self.core
            .settle_promise(promise, &Err(error), ActorId::MAIN);
    }

    /// Blocks the embedding caller until the program completes or the
    /// system goes quiescent; returns the program's exit code.
    ///
    /// The poll loop exists purely for diagnostics: sustained idleness with
    /// messages still pending is a stall (fatal, forces shutdown) or, under
    /// replay, a divergence, reported with every stuck actor's pending
    /// expectation and held messages.
    pub async fn await_completion_or_quiescence(&self) -> Result<i32, SystemError> {
        let core = &self.core;
        let mut idle_polls = 0u32;
        let mut last_processed = core.processed_messages.load(Ordering::SeqCst);

        loop {
            if let Some(outcome) = core.completion.outcome() {
                return Ok(exit_code(&outcome));
            }

            if core.quiescent() {
                if let Some(replayer) = &core.replayer {
                    if let Some(report) = replayer.divergence_report(&core.pending_descriptions()) {
                        return Err(SystemError::ReplayDivergence(report));
                    }
                }
                return Ok(0);
            }

            let processed = core.processed_messages.load(Ordering::SeqCst);
            if core.pool.is_idle() && processed == last_processed {
                idle_polls += 1;
                if idle_polls >= core.config.stall_polls {
                    if let Some(replayer) = &core.replayer {
                        let report = replayer
                            .divergence_report(&core.pending_descriptions())
                            .unwrap_or_else(|| "no unmet expectations".to_string());
                        self.shutdown().await.ok();
                        return Err(SystemError::ReplayDivergence(report));
                    }
                    let diagnostics = format!(
                        "{} message(s) pending with an idle pool after {} polls",
                        core.pending_messages.load(Ordering::SeqCst),
                        idle_polls
                    );
                    error!(%diagnostics, "pool stall detected, forcing shutdown");
                    self.shutdown().await.ok();
                    return Err(SystemError::Stalled(diagnostics));
                }
            } else {
                idle_polls = 0;
            }
            last_processed = processed;

            let _ = tokio::time::timeout(core.config.poll_interval, core.completion.signalled())
                .await;
        }
    }

    /// Stops scheduling new turns, drains in-flight turns, then halts the
    /// pool.
    pub async fn shutdown(&self) -> Result<(), SystemError> {
        self.core.pool.begin_shutdown();
        self.core
            .pool
            .await_terminated(self.core.config.shutdown_timeout)
            .await
    }

    /// Trace collected so far; `None` unless the system records.
    pub fn take_trace(&self) -> Option<Trace> {
        self.core.recorder.as_ref().map(TraceRecorder::snapshot)
    }

    /// Application errors that reached the top-level sink.
    pub fn unhandled_errors(&self) -> Vec<LanguageError> {
        self.core.unhandled.lock().unwrap().clone()
    }

    /// Returns identity counters to their initial state. Only valid between
    /// runs, for embeddings reusing one process for several programs.
    pub fn reset_identities(&self) {
        self.core.allocator.reset();
    }

    /// Number of actors currently registered (main actor included).
    pub fn actor_count(&self) -> usize {
        self.core.registry.read().unwrap().len()
    }
}

fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Ok(v) => {
            if let Some(code) = value_of::<i32>(v) {
                *code
            } else if let Some(code) = value_of::<i64>(v) {
                *code as i32
            } else {
                0
            }
        }
        Err(e) => {
            error!(error = %e, "program completed with an error");
            1
        }
    }
}
