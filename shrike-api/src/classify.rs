//! # Shareability Classification
//!
//! Consumed from the language's object/storage model: the predicate deciding
//! whether a value may cross an actor boundary as-is (deeply immutable
//! values) or must be wrapped in a far reference owned by the sender. The
//! engine applies it to message arguments and to actor initial state.

use crate::types::Value;

/// Predicate over language values.
pub trait ValueClassifier: Send + Sync {
    /// True when `value` can be handed to another actor without creating a
    /// mutable alias across the ownership boundary.
    fn is_independently_shareable(&self, value: &Value) -> bool;
}

/// Classifier for embeddings whose exchanged values are all deeply
/// immutable. Useful in tests and simple hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShareAll;

impl ValueClassifier for ShareAll {
    fn is_independently_shareable(&self, _value: &Value) -> bool {
        true
    }
}
