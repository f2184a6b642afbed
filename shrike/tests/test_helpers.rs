// Shared fixtures for the integration tests: a small scripted evaluator
// standing in for a language front end, plus receiver state types and
// system-construction helpers.
#![allow(dead_code)]

use std::sync::atomic::AtomicI64;
use std::sync::{Arc, Mutex};

use shrike::logging;
use shrike::{
    unit, value, value_of, ActorSystem, Evaluator, FarReference, LanguageError, Selector,
    ShareAll, SystemConfig, TurnContext, Value, ValueClassifier,
};

/// Stateless receiver answering arithmetic selectors.
pub struct Doubler;

/// Receiver appending every pushed integer, in consumption order.
pub struct EventLog(pub Arc<Mutex<Vec<i64>>>);

/// Receiver bumping a shared counter.
pub struct Counter(pub Arc<AtomicI64>);

/// Receiver forwarding queries along a chain of actors; the end of the
/// chain (`next: None`) answers directly.
pub struct Relay {
    pub next: Option<FarReference>,
}

/// Receiver registering several pipelined sends on one unresolved promise
/// and reporting their effects to a log.
pub struct Fan {
    pub next: FarReference,
    pub report: FarReference,
}

/// Receiver flooding a target with tagged pushes in one turn.
pub struct Pump {
    pub target: FarReference,
    pub tag: i64,
    pub count: i64,
}

fn int_arg(selector: &Selector, args: &[Value], i: usize) -> Result<i64, LanguageError> {
    args.get(i)
        .and_then(value_of::<i64>)
        .copied()
        .ok_or_else(|| {
            LanguageError::in_selector(selector.clone(), format!("argument {i} must be an integer"))
        })
}

fn receiver_as<'a, T: Send + Sync + 'static>(
    selector: &Selector,
    receiver: &'a Value,
) -> Result<&'a T, LanguageError> {
    value_of::<T>(receiver).ok_or_else(|| {
        LanguageError::in_selector(selector.clone(), "receiver has the wrong type")
    })
}

/// Scripted evaluator: each selector is one hard-coded behavior.
pub struct TestEvaluator;

impl Evaluator for TestEvaluator {
    fn invoke(
        &self,
        ctx: &mut dyn TurnContext,
        selector: &Selector,
        receiver: &Value,
        args: &[Value],
    ) -> Result<Value, LanguageError> {
        match selector.as_str() {
            "double:" => Ok(value(int_arg(selector, args, 0)? * 2)),

            "doubleSelf" => {
                let n = *receiver_as::<i64>(selector, receiver)?;
                Ok(value(n * 2))
            }

            "push:" => {
                let log = receiver_as::<EventLog>(selector, receiver)?;
                log.0.lock().unwrap().push(int_arg(selector, args, 0)?);
                Ok(unit())
            }

            "bump" => {
                let counter = receiver_as::<Counter>(selector, receiver)?;
                counter.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(unit())
            }

            // Forwarded down the relay chain; the terminal relay answers
            // with the doubled argument. The reply promise of every hop is
            // resolved with the next hop's promise, so the caller's promise
            // flattens down to the terminal answer.
            "query:" => {
                let relay = receiver_as::<Relay>(selector, receiver)?;
                match &relay.next {
                    Some(next) => Ok(ctx.eventual_send(
                        &next.clone().into_value(),
                        Selector::new("query:"),
                        vec![args[0].clone()],
                    )),
                    None => Ok(value(int_arg(selector, args, 0)? * 2)),
                }
            }

            // Sends to the unresolved reply promise of a prior send: the
            // chained message runs on the resolved value once it exists.
            "pipeline:" => {
                let relay = receiver_as::<Relay>(selector, receiver)?;
                let next = relay.next.as_ref().ok_or_else(|| {
                    LanguageError::in_selector(selector.clone(), "relay has no next hop")
                })?;
                let inner = ctx.eventual_send(
                    &next.clone().into_value(),
                    Selector::new("double:"),
                    vec![args[0].clone()],
                );
                Ok(ctx.eventual_send(&inner, Selector::new("doubleSelf"), Vec::new()))
            }

            // Registers three sends on the unresolved reply promise of one
            // `double:` send; they must fire in registration order.
            "fanout:" => {
                let fan = receiver_as::<Fan>(selector, receiver)?;
                let inner = ctx.eventual_send(
                    &fan.next.clone().into_value(),
                    Selector::new("double:"),
                    vec![args[0].clone()],
                );
                for k in [10i64, 20, 30] {
                    ctx.send_discarding(
                        &inner,
                        Selector::new("reportPlus:"),
                        vec![value(k), fan.report.clone().into_value()],
                    );
                }
                Ok(unit())
            }

            // Runs on the resolved integer of a pipelined send; forwards
            // the sum to the log passed as the second argument.
            "reportPlus:" => {
                let n = *receiver_as::<i64>(selector, receiver)?;
                let k = int_arg(selector, args, 0)?;
                let report = args.get(1).ok_or_else(|| {
                    LanguageError::in_selector(selector.clone(), "missing report target")
                })?;
                ctx.send_discarding(report, Selector::new("push:"), vec![value(n + k)]);
                Ok(unit())
            }

            // Result is the promise of a send that will fail downstream.
            "relayFailure" => {
                let relay = receiver_as::<Relay>(selector, receiver)?;
                let next = relay.next.as_ref().ok_or_else(|| {
                    LanguageError::in_selector(selector.clone(), "relay has no next hop")
                })?;
                Ok(ctx.eventual_send(
                    &next.clone().into_value(),
                    Selector::new("boom"),
                    Vec::new(),
                ))
            }

            "spawnDouble:" => {
                let child = ctx.spawn_actor(value(Doubler))?;
                Ok(ctx.eventual_send(
                    &child.into_value(),
                    Selector::new("double:"),
                    vec![args[0].clone()],
                ))
            }

            "pump" => {
                let pump = receiver_as::<Pump>(selector, receiver)?;
                let target = pump.target.clone().into_value();
                for i in 0..pump.count {
                    ctx.send_discarding(&target, Selector::new("push:"), vec![value(pump.tag + i)]);
                }
                Ok(unit())
            }

            "inspect:" => {
                let wrapped = args
                    .first()
                    .map(|a| FarReference::from_value(a).is_some())
                    .unwrap_or(false);
                Ok(value(wrapped))
            }

            "boom" => Err(LanguageError::in_selector(
                selector.clone(),
                "requested failure",
            )),

            "panic" => panic!("requested panic"),

            other => Err(LanguageError::in_selector(
                selector.clone(),
                format!("unknown selector `{other}`"),
            )),
        }
    }
}

/// Classifier treating only integers, unit and `Doubler` as shareable;
/// everything else crosses the boundary as a far reference.
pub struct ShareIntsOnly;

impl ValueClassifier for ShareIntsOnly {
    fn is_independently_shareable(&self, value: &Value) -> bool {
        value.downcast_ref::<i64>().is_some()
            || value.downcast_ref::<()>().is_some()
            || value.downcast_ref::<Doubler>().is_some()
    }
}

pub fn start(config: SystemConfig) -> ActorSystem {
    start_with(config, Arc::new(ShareAll))
}

pub fn start_with(config: SystemConfig, classifier: Arc<dyn ValueClassifier>) -> ActorSystem {
    logging::init_for_tests();
    ActorSystem::start(config, Arc::new(TestEvaluator), classifier).expect("actor system start")
}

/// Resolved integer value of a promise, panicking when it is not one.
pub fn int_result(promise: &shrike::Promise) -> i64 {
    let v = promise.value().expect("promise is unresolved or broken");
    *value_of::<i64>(&v).expect("promise value is not an integer")
}
