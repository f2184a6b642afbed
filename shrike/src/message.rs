//! # Eventual Messages
//!
//! The immutable record of one pending send. Built during the sender's turn,
//! enqueued into the target's mailbox, consumed exactly once by one of the
//! target's turns.

use std::fmt;
use std::sync::Arc;

use shrike_api::{ActorId, Selector, Value};

use crate::ids::MessageId;
use crate::promise::{CompletionCell, Promise};

/// Where the outcome of a message goes once the target has processed it.
#[derive(Clone)]
pub enum Resolver {
    /// Ordinary eventual send: resolve the reply promise.
    Promise(Arc<Promise>),
    /// Program entry point (direct send): settle the externally supplied
    /// completion cell, bypassing promise allocation.
    Completion(Arc<CompletionCell>),
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Promise(_) => f.write_str("Resolver::Promise"),
            Resolver::Completion(_) => f.write_str("Resolver::Completion"),
        }
    }
}

/// One pending asynchronous send.
pub struct EventualMessage {
    /// Globally unique, strictly increasing in send order.
    pub message_id: MessageId,
    /// Actor whose turn will process this message.
    pub target: ActorId,
    /// Value the selector is invoked on; owned by `target`.
    pub receiver: Value,
    pub selector: Selector,
    pub args: Vec<Value>,
    /// Actor whose turn built this message.
    pub sender: ActorId,
    /// Resolution handler for the outcome; `None` when the sender statically
    /// discarded the result.
    pub resolver: Option<Resolver>,
    /// `Some(resolving actor)` exactly when this is a promise message, i.e.
    /// a registration fired by that actor resolving a promise. Replay
    /// matches on it in addition to the sender.
    pub promise_origin: Option<ActorId>,
}

impl EventualMessage {
    pub fn is_promise_message(&self) -> bool {
        self.promise_origin.is_some()
    }
}

impl fmt::Debug for EventualMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventualMessage")
            .field("message_id", &self.message_id)
            .field("target", &self.target)
            .field("selector", &self.selector)
            .field("sender", &self.sender)
            .field("promise_origin", &self.promise_origin)
            .finish()
    }
}
