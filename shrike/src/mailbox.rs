//! # Mailbox
//!
//! Unbounded multi-producer, single-consumer message queue owned by one
//! actor, fused with the actor's turn-scheduling flag.
//!
//! ## Key Concepts
//! - `push` is callable concurrently from any number of sending turns; the
//!   append and the idle-check happen under one short-lived lock, so exactly
//!   one sender observes the idle→scheduled edge and schedules the turn.
//! - A turn snapshots everything received since the previous turn began into
//!   a local batch; messages arriving during the turn accumulate untouched
//!   in `pending` (the extension buffer) and never contend with the drain.
//! - The `scheduled` flag enforces at most one turn per actor at any
//!   instant: an actor is queued for execution or running at most once, and
//!   `finish_turn` either keeps the claim (reschedule) or releases it.
//! - Under replay, batch selection is gated by the expectation queue:
//!   non-matching messages move to `deferred` and are re-examined, together
//!   with new arrivals, after every successful consumption.

use std::collections::VecDeque;
use std::sync::Mutex;

use shrike_api::ActorId;

use crate::message::EventualMessage;
use crate::trace::TraceReplayer;

#[derive(Debug, Default)]
struct Inner {
    /// Messages received since the current (or upcoming) turn began.
    pending: VecDeque<EventualMessage>,
    /// Replay only: messages held back because they did not match the
    /// expectation head when last examined. Never dropped.
    deferred: Vec<EventualMessage>,
    /// True while the actor is queued for a turn or executing one.
    scheduled: bool,
}

/// Message queue and turn-scheduling state of one actor.
#[derive(Debug, Default)]
pub struct Mailbox {
    inner: Mutex<Inner>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message. Returns `true` when the caller must schedule a
    /// turn for the owning actor: the actor was idle and `admit` accepts the
    /// message (replay gating; always true otherwise).
    pub fn push(&self, msg: EventualMessage, admit: impl FnOnce(&EventualMessage) -> bool) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let wake = !inner.scheduled && admit(&msg);
        inner.pending.push_back(msg);
        if wake {
            inner.scheduled = true;
        }
        wake
    }

    /// Snapshots the batch for one turn: exactly the messages received since
    /// the previous turn began, in arrival order.
    pub fn take_batch(&self) -> Vec<EventualMessage> {
        self.inner.lock().unwrap().pending.drain(..).collect()
    }

    /// Replay variant of [`take_batch`](Self::take_batch): selects the
    /// maximal run of messages matching `actor`'s expectation queue,
    /// re-examining postponed messages after every successful consumption
    /// (linear rescan). Everything else is deferred for a later turn.
    pub fn take_batch_replay(
        &self,
        actor: ActorId,
        replayer: &TraceReplayer,
    ) -> Vec<EventualMessage> {
        let mut inner = self.inner.lock().unwrap();
        let mut candidates: Vec<EventualMessage> = inner.deferred.drain(..).collect();
        candidates.extend(inner.pending.drain(..));

        let mut todo = Vec::new();
        loop {
            match candidates.iter().position(|m| replayer.admits(actor, m)) {
                Some(i) => {
                    let msg = candidates.remove(i);
                    replayer.consume(actor, &msg);
                    todo.push(msg);
                }
                None => break,
            }
        }

        inner.deferred = candidates;
        todo
    }

    /// Ends a turn. Keeps the actor scheduled and returns `true` when more
    /// admissible work is queued (fresh turn instead of looping in place);
    /// otherwise releases the scheduling claim.
    pub fn finish_turn(&self, admit: impl Fn(&EventualMessage) -> bool) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let more = inner
            .pending
            .iter()
            .chain(inner.deferred.iter())
            .any(admit);
        if !more {
            inner.scheduled = false;
        }
        more
    }

    /// Number of queued messages (pending and deferred).
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.pending.len() + inner.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable summaries of every queued message, for the replay
    /// divergence report.
    pub fn describe_pending(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .deferred
            .iter()
            .chain(inner.pending.iter())
            .map(|m| match m.promise_origin {
                Some(resolving) => format!(
                    "`{}` from {} (promise message resolved by {resolving})",
                    m.selector, m.sender
                ),
                None => format!("`{}` from {}", m.selector, m.sender),
            })
            .collect()
    }
}
