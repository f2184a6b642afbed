// Promise semantics through the running system: pipelining, chain
// flattening, first-resolution-wins, error propagation along chains.

use shrike::{value, value_of, Promise, Selector, SystemConfig};

mod test_helpers;
use test_helpers::{int_result, start, Doubler, EventLog, Fan, Relay};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn relay_chains_flatten_to_the_terminal_answer() {
    let system = start(SystemConfig::default().with_workers(2));

    // Three hops; every hop resolves its reply promise with the next hop's
    // promise, so the caller's promise must flatten to the final integer.
    let c = system.spawn_actor(value(Relay { next: None })).unwrap();
    let b = system.spawn_actor(value(Relay { next: Some(c) })).unwrap();
    let a = system.spawn_actor(value(Relay { next: Some(b) })).unwrap();

    let promise = system
        .send(&a, Selector::new("query:"), vec![value(21i64)])
        .unwrap();

    assert_eq!(system.await_completion_or_quiescence().await.unwrap(), 0);
    assert_eq!(int_result(&promise), 42);
    system.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sends_to_an_unresolved_promise_run_on_the_resolved_value() {
    let system = start(SystemConfig::default().with_workers(2));

    let doubler = system.spawn_actor(value(Doubler)).unwrap();
    let relay = system
        .spawn_actor(value(Relay {
            next: Some(doubler),
        }))
        .unwrap();

    // `pipeline:` sends `double:` and immediately messages the still
    // unresolved reply promise, so 10 becomes 20 and then 40.
    let promise = system
        .send(&relay, Selector::new("pipeline:"), vec![value(10i64)])
        .unwrap();

    assert_eq!(system.await_completion_or_quiescence().await.unwrap(), 0);
    assert_eq!(int_result(&promise), 40);
    system.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn continuations_fire_in_registration_order() {
    let system = start(SystemConfig::default().with_workers(2));

    let entries = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = system.spawn_actor(value(EventLog(entries.clone()))).unwrap();
    let doubler = system.spawn_actor(value(Doubler)).unwrap();
    let fan = system
        .spawn_actor(value(Fan {
            next: doubler,
            report: log,
        }))
        .unwrap();

    // `fanout:` registers three sends on the unresolved reply promise of a
    // `double:` send. 5 resolves to 10, so the registrations report
    // 20, 30, 40, and must do so in registration order.
    system
        .send_discarding(&fan, Selector::new("fanout:"), vec![value(5i64)])
        .unwrap();

    assert_eq!(system.await_completion_or_quiescence().await.unwrap(), 0);
    assert_eq!(*entries.lock().unwrap(), vec![20i64, 30, 40]);
    system.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_propagate_down_the_promise_chain() {
    let system = start(SystemConfig::default().with_workers(2));

    let doubler = system.spawn_actor(value(Doubler)).unwrap();
    let relay = system
        .spawn_actor(value(Relay {
            next: Some(doubler),
        }))
        .unwrap();

    let promise = system
        .send(&relay, Selector::new("relayFailure"), Vec::new())
        .unwrap();

    assert_eq!(system.await_completion_or_quiescence().await.unwrap(), 0);
    let error = promise.error().expect("promise should be broken");
    assert_eq!(error.message, "requested failure");
    assert!(system.unhandled_errors().is_empty());
    system.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn the_first_resolution_wins() {
    let system = start(SystemConfig::default().with_workers(2));

    let promise = Promise::new();
    system.resolve(&promise, value(1i64));
    system.resolve(&promise, value(2i64));
    system.resolve_with_error(&promise, shrike::LanguageError::new("too late"));

    assert_eq!(int_result(&promise), 1);
    assert!(promise.error().is_none());
    system.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resolving_with_a_promise_follows_that_promise() {
    let system = start(SystemConfig::default().with_workers(2));

    let outer = Promise::new();
    let inner = Promise::new();
    system.resolve(&outer, inner.clone().into_value());

    // No registrant ever sees a promise-of-a-promise: the outer promise
    // stays unresolved until the inner one settles.
    assert!(!outer.is_resolved());

    system.resolve(&inner, value(7i64));
    assert_eq!(int_result(&outer), 7);
    system.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn breaking_the_inner_promise_breaks_the_chain() {
    let system = start(SystemConfig::default().with_workers(2));

    let outer = Promise::new();
    let inner = Promise::new();
    system.resolve(&outer, inner.clone().into_value());
    system.resolve_with_error(&inner, shrike::LanguageError::new("downstream failure"));

    assert_eq!(outer.error().unwrap().message, "downstream failure");
    system.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resolving_with_a_settled_promise_adopts_its_value() {
    let system = start(SystemConfig::default().with_workers(2));

    let doubler = system.spawn_actor(value(Doubler)).unwrap();
    let promise = system
        .send(&doubler, Selector::new("double:"), vec![value(4i64)])
        .unwrap();
    assert_eq!(system.await_completion_or_quiescence().await.unwrap(), 0);
    assert_eq!(int_result(&promise), 8);

    let follower = Promise::new();
    system.resolve(&follower, promise.clone().into_value());
    let v = follower.value().expect("follower should settle immediately");
    assert_eq!(value_of::<i64>(&v), Some(&8));
    system.shutdown().await.unwrap();
}
