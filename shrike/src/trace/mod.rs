//! # Execution Traces
//!
//! Shared trace format plus the two sides using it: the recorder appends
//! per-actor consumption order during a traced run, the replayer gates
//! consumption so a later run reconstructs the identical order despite a
//! different wall-clock interleaving.
//!
//! A record carries only the sender and, for promise messages, the actor
//! that performed the resolution. Actor ids never appear beyond the segment
//! key: child ids are recomputed on the replay side from
//! `(parent, nth-child-of-parent)` (see [`crate::ids`]).
//!
//! Persistence is the embedding's concern; the format is serde-serializable
//! and otherwise stays in memory.

pub mod record;
pub mod replay;

pub use record::TraceRecorder;
pub use replay::TraceReplayer;

use serde::{Deserialize, Serialize};

use shrike_api::ActorId;

/// One consumed message, in the consuming actor's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Actor whose turn built the message.
    pub sender: ActorId,
    /// `Some(actor)` when the message was a promise message fired by that
    /// actor's resolution; `None` for ordinary sends.
    pub resolving_actor: Option<ActorId>,
}

impl MessageRecord {
    pub fn is_promise_message(&self) -> bool {
        self.resolving_actor.is_some()
    }
}

/// Append-only consumption history of one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSegment {
    pub actor: ActorId,
    pub records: Vec<MessageRecord>,
}

/// Complete trace of one run: one segment per actor that consumed messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub segments: Vec<TraceSegment>,
}

impl Trace {
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.records.is_empty())
    }

    /// Total number of recorded consumptions.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.records.len()).sum()
    }

    /// Consumption order of a single actor, when present.
    pub fn segment(&self, actor: ActorId) -> Option<&TraceSegment> {
        self.segments.iter().find(|s| s.actor == actor)
    }
}
