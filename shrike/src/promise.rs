//! # Promises
//!
//! Single-assignment placeholders for eventual results, supporting
//! continuation chaining before resolution ("pipelining").
//!
//! ## Key Concepts
//! - First resolution wins: the state transition is guarded by one mutex and
//!   happens at most once; later attempts are no-ops (a logged protocol
//!   violation, never a fault).
//! - Registrations accumulate in order while the promise is unresolved; the
//!   resolving turn converts them into eventual messages through the normal
//!   send path, in registration order.
//! - Resolving a promise with another promise re-chains registrants onto the
//!   inner promise and installs a `Chain` back-edge, so no registrant ever
//!   observes a promise-of-a-promise.
//!
//! The conversion of registrations into messages needs the send machinery
//! and therefore lives in the system (`settle_promise`); this module owns
//! only the state machine.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use shrike_api::{ActorId, LanguageError, Selector, Value};

use crate::message::Resolver;

/// Outcome of one message execution.
pub type Outcome = Result<Value, LanguageError>;

/// A continuation chained onto an unresolved promise.
pub enum Registration {
    /// Pipelined send: becomes an eventual message to the owner of the
    /// resolved value.
    Message {
        selector: Selector,
        args: Vec<Value>,
        sender: ActorId,
        resolver: Option<Resolver>,
    },
    /// Forwarding edge from a promise that was resolved with this one.
    Chain(Arc<Promise>),
    /// Top-level completion of the embedding run.
    Settle(Arc<CompletionCell>),
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registration::Message { selector, sender, .. } => f
                .debug_struct("Registration::Message")
                .field("selector", selector)
                .field("sender", sender)
                .finish(),
            Registration::Chain(_) => f.write_str("Registration::Chain"),
            Registration::Settle(_) => f.write_str("Registration::Settle"),
        }
    }
}

enum PromiseState {
    Unresolved,
    Fulfilled(Value),
    Broken(LanguageError),
}

struct PromiseInner {
    state: PromiseState,
    registrations: Vec<Registration>,
    /// Actor whose turn performed the resolution; set together with the
    /// terminal state. Replay matches promise messages on it.
    resolving_actor: Option<ActorId>,
}

/// Single-assignment eventual result.
pub struct Promise {
    inner: Mutex<PromiseInner>,
}

impl Promise {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(PromiseInner {
                state: PromiseState::Unresolved,
                registrations: Vec::new(),
                resolving_actor: None,
            }),
        })
    }

    /// Chains a registration. When the promise is already resolved the
    /// registration is handed back with the settled outcome so the caller
    /// can fire it immediately through the normal send path.
    pub fn register(&self, registration: Registration) -> Result<(), (Registration, Outcome, ActorId)> {
        let mut inner = self.inner.lock().unwrap();
        match &inner.state {
            PromiseState::Unresolved => {
                inner.registrations.push(registration);
                Ok(())
            }
            PromiseState::Fulfilled(v) => {
                let actor = inner.resolving_actor.expect("resolved promise has resolving actor");
                Err((registration, Ok(v.clone()), actor))
            }
            PromiseState::Broken(e) => {
                let actor = inner.resolving_actor.expect("resolved promise has resolving actor");
                Err((registration, Err(e.clone()), actor))
            }
        }
    }

    /// First-wins settlement. Returns the registrations to fire, or `None`
    /// when a resolution already happened (the attempt is a no-op).
    pub fn try_settle(&self, outcome: &Outcome, resolving: ActorId) -> Option<Vec<Registration>> {
        let mut inner = self.inner.lock().unwrap();
        if !matches!(inner.state, PromiseState::Unresolved) {
            return None;
        }
        inner.state = match outcome {
            Ok(v) => PromiseState::Fulfilled(v.clone()),
            Err(e) => PromiseState::Broken(e.clone()),
        };
        inner.resolving_actor = Some(resolving);
        Some(std::mem::take(&mut inner.registrations))
    }

    /// Detaches all registrations for re-chaining onto another promise,
    /// leaving this promise unresolved. `None` when already resolved.
    pub fn take_registrations_for_rechain(&self) -> Option<Vec<Registration>> {
        let mut inner = self.inner.lock().unwrap();
        if !matches!(inner.state, PromiseState::Unresolved) {
            return None;
        }
        Some(std::mem::take(&mut inner.registrations))
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.inner.lock().unwrap().state, PromiseState::Unresolved)
    }

    /// Resolved value, when fulfilled.
    pub fn value(&self) -> Option<Value> {
        match &self.inner.lock().unwrap().state {
            PromiseState::Fulfilled(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Rejection error, when broken.
    pub fn error(&self) -> Option<LanguageError> {
        match &self.inner.lock().unwrap().state {
            PromiseState::Broken(e) => Some(e.clone()),
            _ => None,
        }
    }

    pub fn resolving_actor(&self) -> Option<ActorId> {
        self.inner.lock().unwrap().resolving_actor
    }

    /// Erases the promise into a `Value` so it can travel in arguments and
    /// resolutions.
    pub fn into_value(self: Arc<Self>) -> Value {
        self as Value
    }

    /// Recovers a promise from an opaque value, if it is one.
    pub fn from_value(v: &Value) -> Option<Arc<Promise>> {
        let any: Arc<dyn Any + Send + Sync> = v.clone();
        any.downcast::<Promise>().ok()
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        let state = match inner.state {
            PromiseState::Unresolved => "unresolved",
            PromiseState::Fulfilled(_) => "fulfilled",
            PromiseState::Broken(_) => "broken",
        };
        f.debug_struct("Promise")
            .field("state", &state)
            .field("registrations", &inner.registrations.len())
            .finish()
    }
}

/// Externally observable completion of the embedding run.
///
/// A single resolvable slot the embedding caller blocks on; the bounded-poll
/// loop around it serves stall diagnostics only, never correctness.
pub struct CompletionCell {
    slot: Mutex<Option<Outcome>>,
    notify: Notify,
}

impl CompletionCell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        })
    }

    /// Settles the cell; first settlement wins.
    pub fn complete(&self, outcome: Outcome) -> bool {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        drop(slot);
        self.notify.notify_waiters();
        true
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.slot.lock().unwrap().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Waits until the next settlement signal. Callers must re-check
    /// [`outcome`](Self::outcome) in a loop; the signal alone carries no
    /// state.
    pub async fn signalled(&self) {
        self.notify.notified().await;
    }
}

impl fmt::Debug for CompletionCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCell")
            .field("settled", &self.is_settled())
            .finish()
    }
}
