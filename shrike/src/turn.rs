//! # Turn Context
//!
//! The engine's side of the evaluator boundary: while a message of actor `A`
//! executes, the evaluator holds a `Turn` bound to `A`, and every actor-world
//! effect it produces (spawns, eventual sends, pipelined sends on promises)
//! re-enters the engine through it. Effects are attributed to `A` as the
//! sender, which is what the FIFO-per-pair ordering guarantee and trace
//! records are built on.

use std::sync::Arc;

use tracing::debug;

use shrike_api::{ActorId, FarReference, LanguageError, Selector, TurnContext, Value};

use crate::actor::Actor;
use crate::promise::Promise;
use crate::system::SystemCore;

/// Context for one executing turn; valid only while that turn runs.
pub(crate) struct Turn<'a> {
    core: &'a Arc<SystemCore>,
    actor: &'a Arc<Actor>,
}

impl<'a> Turn<'a> {
    pub(crate) fn new(core: &'a Arc<SystemCore>, actor: &'a Arc<Actor>) -> Self {
        Self { core, actor }
    }
}

impl TurnContext for Turn<'_> {
    fn self_id(&self) -> ActorId {
        self.actor.id()
    }

    fn spawn_actor(&mut self, init: Value) -> Result<FarReference, LanguageError> {
        self.core
            .spawn_child(self.actor, init)
            .map_err(|e| LanguageError::new(e.to_string()))
    }

    fn eventual_send(&mut self, receiver: &Value, selector: Selector, args: Vec<Value>) -> Value {
        let sender = self.actor.id();

        if let Some(far) = FarReference::from_value(receiver) {
            return match self.core.eventual_send(sender, far, selector, args) {
                Ok(promise) => promise.into_value(),
                Err(e) => {
                    // Shutdown race: the send is dropped and the promise
                    // stays forever unresolved, which is the contract.
                    debug!(%sender, error = %e, "eventual send dropped");
                    Promise::new().into_value()
                }
            };
        }

        if let Some(promise) = Promise::from_value(receiver) {
            return self
                .core
                .send_to_promise(sender, &promise, selector, args)
                .into_value();
        }

        // Plain value: owned by the running actor, so the send loops back to
        // self through the ordinary mailbox path.
        let self_ref = FarReference::new(sender, receiver.clone());
        match self.core.eventual_send(sender, &self_ref, selector, args) {
            Ok(promise) => promise.into_value(),
            Err(e) => {
                debug!(%sender, error = %e, "self send dropped");
                Promise::new().into_value()
            }
        }
    }

    fn send_discarding(&mut self, receiver: &Value, selector: Selector, args: Vec<Value>) {
        let sender = self.actor.id();

        if let Some(promise) = Promise::from_value(receiver) {
            self.core
                .send_to_promise_discarding(sender, &promise, selector, args);
            return;
        }

        let far_owned;
        let far = match FarReference::from_value(receiver) {
            Some(far) => far,
            None => {
                far_owned = FarReference::new(sender, receiver.clone());
                &far_owned
            }
        };
        if let Err(e) = self.core.send_discarding(sender, far, selector, args) {
            debug!(%sender, error = %e, "discarding send dropped");
        }
    }
}
