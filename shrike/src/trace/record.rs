//! Trace recording side: one append-only record stream per actor, filled in
//! strict consumption order by the turns that dequeue the messages.

use std::collections::HashMap;
use std::sync::Mutex;

use shrike_api::ActorId;

use crate::message::EventualMessage;
use crate::trace::{MessageRecord, Trace, TraceSegment};

/// Collects per-actor consumption order during a recorded run.
///
/// Appends happen inside turns; distinct actors append to distinct segments,
/// so the single map lock is uncontended in the common case and never held
/// across message execution.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    segments: Mutex<HashMap<ActorId, Vec<MessageRecord>>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `actor`'s current turn dequeued `msg`.
    pub fn record_consumption(&self, actor: ActorId, msg: &EventualMessage) {
        let record = MessageRecord {
            sender: msg.sender,
            resolving_actor: msg.promise_origin,
        };
        self.segments
            .lock()
            .unwrap()
            .entry(actor)
            .or_default()
            .push(record);
    }

    /// Snapshot of everything recorded so far, segments ordered by actor id
    /// for a stable representation.
    pub fn snapshot(&self) -> Trace {
        let segments = self.segments.lock().unwrap();
        let mut out: Vec<TraceSegment> = segments
            .iter()
            .map(|(actor, records)| TraceSegment {
                actor: *actor,
                records: records.clone(),
            })
            .collect();
        out.sort_by_key(|s| s.actor);
        Trace { segments: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MessageId;
    use shrike_api::{unit, Selector};

    fn message(sender: u64, target: u64, origin: Option<u64>) -> EventualMessage {
        EventualMessage {
            message_id: MessageId(1),
            target: ActorId::from_raw(target),
            receiver: unit(),
            selector: Selector::new("ping"),
            args: Vec::new(),
            sender: ActorId::from_raw(sender),
            resolver: None,
            promise_origin: origin.map(ActorId::from_raw),
        }
    }

    #[test]
    fn records_preserve_consumption_order_per_actor() {
        let recorder = TraceRecorder::new();
        let target = ActorId::from_raw(9);
        recorder.record_consumption(target, &message(1, 9, None));
        recorder.record_consumption(target, &message(2, 9, Some(7)));

        let trace = recorder.snapshot();
        let segment = trace.segment(target).unwrap();
        assert_eq!(segment.records.len(), 2);
        assert_eq!(segment.records[0].sender, ActorId::from_raw(1));
        assert!(!segment.records[0].is_promise_message());
        assert_eq!(segment.records[1].resolving_actor, Some(ActorId::from_raw(7)));
    }
}
