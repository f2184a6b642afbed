//! Central queue of actors with a claimed, not-yet-executed turn.

use std::fmt;
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use tokio::sync::Notify;

use crate::actor::Actor;

/// Holds actors whose mailboxes have claimed a turn.
///
/// # Thread Safety
/// - Lock-free queue internally (SegQueue), safe for concurrent producers
///   and consumers.
/// - `Notify` wakes one worker per push; workers re-check after waking
///   because another worker may have taken the actor first.
///
/// An actor appears here at most once: the mailbox `scheduled` flag is the
/// claim, and only its holder pushes.
pub struct SchedulingQueue {
    queue: SegQueue<Arc<Actor>>,
    notify: Notify,
}

impl fmt::Debug for SchedulingQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulingQueue")
            .field("len", &self.queue.len())
            .finish()
    }
}

impl SchedulingQueue {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            notify: Notify::new(),
        }
    }

    /// Enqueues a turn for `actor` and wakes one worker.
    pub fn push(&self, actor: Arc<Actor>) {
        self.queue.push(actor);
        self.notify.notify_one();
    }

    /// Takes the next actor with a pending turn, if any.
    pub fn try_pop(&self) -> Option<Arc<Actor>> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Notification handle workers wait on while idle.
    pub fn notify(&self) -> &Notify {
        &self.notify
    }

    /// Wakes every waiting worker (shutdown broadcast).
    pub fn notify_all(&self) {
        self.notify.notify_waiters();
    }
}

impl Default for SchedulingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrike_api::ActorId;

    #[test]
    fn push_pop_is_fifo() {
        let queue = SchedulingQueue::new();
        queue.push(Arc::new(Actor::new(ActorId::from_raw(1))));
        queue.push(Arc::new(Actor::new(ActorId::from_raw(2))));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().id(), ActorId::from_raw(1));
        assert_eq!(queue.try_pop().unwrap().id(), ActorId::from_raw(2));
        assert!(queue.try_pop().is_none());
    }
}
