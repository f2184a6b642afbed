//! # Evaluator Boundary
//!
//! The engine treats message execution as an opaque `invoke` operation
//! provided by the language front end. During a turn the engine hands the
//! evaluator a `TurnContext`; every effect the language can have on the
//! actor world (spawning, eventual sends, pipelined sends on promises)
//! goes back through that context, which keeps the recursive send protocol
//! inside the engine.
//!
//! ## Contract
//! - `invoke` runs to completion without preemption and must never block on
//!   I/O or external locks; waiting is expressed only by returning or
//!   messaging promises.
//! - A `LanguageError` is contained to the failing message's resolution
//!   chain; it aborts neither the actor nor other queued messages.

use crate::errors::LanguageError;
use crate::types::{ActorId, FarReference, Selector, Value};

/// Operations a turn exposes to the evaluator.
///
/// Implemented by the engine; one instance is valid only for the duration of
/// the turn that created it.
pub trait TurnContext {
    /// Identity of the actor whose turn is executing.
    fn self_id(&self) -> ActorId;

    /// Spawns a new actor owning `init` and returns the capability to it.
    ///
    /// Fails when `init` is not independently shareable: an actor's initial
    /// state must not alias state owned by the spawning actor.
    fn spawn_actor(&mut self, init: Value) -> Result<FarReference, LanguageError>;

    /// Asynchronous send returning a fresh promise (as a `Value`).
    ///
    /// `receiver` may be a far reference, a promise (pipelining: the message
    /// is delivered once the promise resolves), or a plain value owned by
    /// the current actor (delivered to self).
    fn eventual_send(&mut self, receiver: &Value, selector: Selector, args: Vec<Value>) -> Value;

    /// Like [`eventual_send`](Self::eventual_send) but without allocating a
    /// reply promise, for sends whose result the caller statically discards.
    fn send_discarding(&mut self, receiver: &Value, selector: Selector, args: Vec<Value>);
}

/// The language front end's message-invoke operation.
pub trait Evaluator: Send + Sync {
    /// Executes `selector` on `receiver` with `args` inside the current
    /// turn, returning the result value or a language-level error.
    fn invoke(
        &self,
        ctx: &mut dyn TurnContext,
        selector: &Selector,
        receiver: &Value,
        args: &[Value],
    ) -> Result<Value, LanguageError>;
}
