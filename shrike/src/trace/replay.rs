//! Trace replay side: expectation queues and the admission test that gates
//! message consumption, plus the end-of-run divergence report.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::debug;

use shrike_api::ActorId;

use crate::message::EventualMessage;
use crate::trace::{MessageRecord, Trace};

/// Gates per-actor consumption to match a previously recorded order.
///
/// A message may be consumed only when it matches the head of its target's
/// expectation queue: same sender, and for promise messages the same
/// resolving actor. Non-matching messages are held by the mailbox and
/// re-examined after every successful consumption; they are never dropped.
#[derive(Debug)]
pub struct TraceReplayer {
    expected: Mutex<HashMap<ActorId, VecDeque<MessageRecord>>>,
}

impl TraceReplayer {
    /// Parses all segments of `trace` into one FIFO expectation queue per
    /// actor.
    pub fn new(trace: &Trace) -> Self {
        let expected = trace
            .segments
            .iter()
            .map(|s| (s.actor, s.records.iter().cloned().collect()))
            .collect();
        Self {
            expected: Mutex::new(expected),
        }
    }

    /// True when `msg` matches the head of `actor`'s expectation queue.
    ///
    /// An actor with an exhausted queue consumes nothing further; an actor
    /// absent from the trace never consumed anything in the recorded run.
    pub fn admits(&self, actor: ActorId, msg: &EventualMessage) -> bool {
        let expected = self.expected.lock().unwrap();
        let Some(queue) = expected.get(&actor) else {
            return false;
        };
        match queue.front() {
            Some(head) => matches(head, msg),
            None => false,
        }
    }

    /// Pops the head expectation after `actor` consumed a matching message.
    pub fn consume(&self, actor: ActorId, msg: &EventualMessage) {
        let mut expected = self.expected.lock().unwrap();
        let queue = expected
            .get_mut(&actor)
            .expect("consumption for actor without expectations");
        let head = queue.pop_front().expect("consumption past recorded end");
        debug_assert!(matches(&head, msg), "consumed message diverges from trace");
        debug!(%actor, sender = %msg.sender, "replay consumed expectation");
    }

    /// True when every expectation queue has been drained.
    pub fn is_exhausted(&self) -> bool {
        self.expected.lock().unwrap().values().all(VecDeque::is_empty)
    }

    /// Diagnoses a run that ended with unmet expectations.
    ///
    /// `pending` maps each actor to descriptions of its postponed and
    /// unconsumed mailbox messages. Returns `None` when the replay matched
    /// the recording completely and nothing is left over.
    pub fn divergence_report(&self, pending: &HashMap<ActorId, Vec<String>>) -> Option<String> {
        let expected = self.expected.lock().unwrap();
        let mut out = String::new();

        let mut stuck: Vec<_> = expected
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .collect();
        stuck.sort_by_key(|(actor, _)| **actor);

        for (actor, queue) in &stuck {
            let head = queue.front().unwrap();
            match head.resolving_actor {
                Some(resolving) => out.push_str(&format!(
                    "{actor} expects a promise message from {} resolved by {resolving} ({} more expected)\n",
                    head.sender,
                    queue.len() - 1
                )),
                None => out.push_str(&format!(
                    "{actor} expects a message from {} ({} more expected)\n",
                    head.sender,
                    queue.len() - 1
                )),
            }
            for desc in pending.get(*actor).into_iter().flatten() {
                out.push_str(&format!("    held: {desc}\n"));
            }
        }

        // Messages arriving at actors the trace says are done are equally
        // diagnosable: the replayed program diverged from the recording.
        let mut unexpected: Vec<_> = pending
            .iter()
            .filter(|(actor, msgs)| {
                !msgs.is_empty() && expected.get(actor).map_or(true, VecDeque::is_empty)
            })
            .collect();
        unexpected.sort_by_key(|(actor, _)| **actor);
        for (actor, msgs) in unexpected {
            out.push_str(&format!("{actor} has {} unexpected message(s)\n", msgs.len()));
            for desc in msgs {
                out.push_str(&format!("    held: {desc}\n"));
            }
        }

        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

fn matches(expected: &MessageRecord, msg: &EventualMessage) -> bool {
    expected.sender == msg.sender && expected.resolving_actor == msg.promise_origin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MessageId;
    use crate::trace::TraceSegment;
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

    fn single_actor_trace(actor: u64, records: Vec<MessageRecord>) -> Trace {
        Trace {
            segments: vec![TraceSegment {
                actor: ActorId::from_raw(actor),
                records,
            }],
        }
    }

    #[test]
    fn admits_only_the_head_expectation() {
        let trace = single_actor_trace(
            5,
            vec![
                MessageRecord {
                    sender: ActorId::from_raw(1),
                    resolving_actor: None,
                },
                MessageRecord {
                    sender: ActorId::from_raw(2),
                    resolving_actor: None,
                },
            ],
        );
        let replayer = TraceReplayer::new(&trace);
        let target = ActorId::from_raw(5);

        let early = message(2, 5, None);
        let expected = message(1, 5, None);
        assert!(!replayer.admits(target, &early));
        assert!(replayer.admits(target, &expected));

        replayer.consume(target, &expected);
        assert!(replayer.admits(target, &early));
        replayer.consume(target, &early);
        assert!(replayer.is_exhausted());
    }

    #[test]
    fn promise_messages_match_on_resolving_actor() {
        let trace = single_actor_trace(
            5,
            vec![MessageRecord {
                sender: ActorId::from_raw(1),
                resolving_actor: Some(ActorId::from_raw(9)),
            }],
        );
        let replayer = TraceReplayer::new(&trace);
        let target = ActorId::from_raw(5);

        assert!(!replayer.admits(target, &message(1, 5, None)));
        assert!(!replayer.admits(target, &message(1, 5, Some(8))));
        assert!(replayer.admits(target, &message(1, 5, Some(9))));
    }

    #[test]
    fn unknown_actors_admit_nothing() {
        let replayer = TraceReplayer::new(&single_actor_trace(5, Vec::new()));
        assert!(!replayer.admits(ActorId::from_raw(6), &message(1, 6, None)));
    }

    #[test]
    fn divergence_report_names_stuck_actors_and_held_messages() {
        let trace = single_actor_trace(
            5,
            vec![MessageRecord {
                sender: ActorId::from_raw(3),
                resolving_actor: None,
            }],
        );
        let replayer = TraceReplayer::new(&trace);

        let mut pending = HashMap::new();
        pending.insert(
            ActorId::from_raw(5),
            vec!["`ping` from actor-4".to_string()],
        );

        let report = replayer.divergence_report(&pending).unwrap();
        assert!(report.contains("actor-5 expects a message from actor-3"));
        assert!(report.contains("held: `ping` from actor-4"));
    }

    #[test]
    fn clean_replay_produces_no_report() {
        let trace = single_actor_trace(
            5,
            vec![MessageRecord {
                sender: ActorId::from_raw(1),
                resolving_actor: None,
            }],
        );
        let replayer = TraceReplayer::new(&trace);
        let msg = message(1, 5, None);
        replayer.consume(ActorId::from_raw(5), &msg);
        assert!(replayer.divergence_report(&HashMap::new()).is_none());
    }
}
