// Shrike Actor Engine API
//
// This crate defines the boundary between the Shrike actor engine and the
// embedding language runtime. The engine consumes an `Evaluator` (the opaque
// message-invoke operation of the language front end) and a `ValueClassifier`
// (the shareability predicate of the language's object model); it exposes
// far references and turn contexts back to the runtime.

pub mod classify;
pub mod errors;
pub mod eval;
pub mod types;

// Re-export commonly used types
pub use classify::{ShareAll, ValueClassifier};
pub use errors::LanguageError;
pub use eval::{Evaluator, TurnContext};
pub use types::{unit, value, value_of, ActorId, FarReference, Selector, Value};
