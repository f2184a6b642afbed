// Shrike Actor Engine
//
// A communicating event-loop actor engine: per-actor sequential turns over a
// shared worker pool, eventual sends with promise pipelining, and a
// deterministic trace record/replay facility that reproduces each actor's
// message-consumption order across runs.
//
// The engine is language-agnostic. It executes messages through the
// `Evaluator` supplied by the embedding runtime (see the `shrike-api` crate)
// and treats every value as opaque.

pub mod actor;
pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod promise;
pub mod scheduler;
pub mod system;
pub mod trace;

mod turn;

// Re-export the surface an embedding typically needs.
pub use config::{SystemConfig, TraceMode};
pub use error::SystemError;
pub use promise::{Outcome, Promise};
pub use system::ActorSystem;
pub use trace::{MessageRecord, Trace, TraceSegment};

pub use shrike_api::{
    unit, value, value_of, ActorId, Evaluator, FarReference, LanguageError, Selector, ShareAll,
    TurnContext, Value, ValueClassifier,
};
