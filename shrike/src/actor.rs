//! # Actor
//!
//! The per-actor engine state: identity, mailbox, and the spawn counter from
//! which child identities are derived. The object graph an actor owns lives
//! entirely on the language side; the engine's invariant is that only turns
//! of this actor ever get to touch it, which the mailbox's single-turn claim
//! enforces.
//!
//! Actors are held in the system registry behind their ids; cross-actor
//! links (message targets, far references, trace segments) are ids into that
//! registry, never direct references, so there are no reference cycles
//! across ownership boundaries.

use std::sync::atomic::{AtomicU32, Ordering};

use shrike_api::ActorId;

use crate::mailbox::Mailbox;

/// One isolated unit of sequential execution.
#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    mailbox: Mailbox,
    /// Number of children spawned so far; the ordinal feeds deterministic
    /// child-id derivation under tracing.
    children: AtomicU32,
}

impl Actor {
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            mailbox: Mailbox::new(),
            children: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Claims the next child ordinal for a spawn performed by this actor.
    pub fn next_child_ordinal(&self) -> u32 {
        self.children.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_ordinals_count_up() {
        let actor = Actor::new(ActorId::MAIN);
        assert_eq!(actor.next_child_ordinal(), 0);
        assert_eq!(actor.next_child_ordinal(), 1);
        assert_eq!(actor.next_child_ordinal(), 2);
    }
}
