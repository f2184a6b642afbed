//! # Core Value and Identity Types
//!
//! The engine never inspects language values: everything crossing the
//! boundary is an opaque, reference-counted `Value`. The only structure the
//! engine understands is the pair of capability types defined here:
//! `FarReference` (addressing state owned by another actor) and, on the
//! engine side, promises, both of which travel *as* values and are recovered
//! by downcast.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque language value shared across actor boundaries.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wraps an arbitrary sendable payload as a `Value`.
pub fn value<T: Send + Sync + 'static>(v: T) -> Value {
    Arc::new(v)
}

/// The canonical "no result" value.
pub fn unit() -> Value {
    Arc::new(())
}

/// Borrows the payload of a `Value` if it has the expected concrete type.
pub fn value_of<T: Send + Sync + 'static>(v: &Value) -> Option<&T> {
    v.downcast_ref::<T>()
}

/// Unique identity of an actor.
///
/// Opaque 64-bit value, never reused within a system instance. Serializable
/// because trace segments are keyed by actor identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    /// Identity of the implicit main actor every system starts with.
    pub const MAIN: ActorId = ActorId(0);

    pub const fn from_raw(raw: u64) -> Self {
        ActorId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

/// Message selector.
///
/// Cheap to clone and compare; the engine treats it as a tag resolved by the
/// evaluator's own dispatch, never by reflection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(Arc<str>);

impl Selector {
    pub fn new(name: impl AsRef<str>) -> Self {
        Selector(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::new(s)
    }
}

/// Capability pairing a target actor with a value it owns.
///
/// The sole legitimate path to state owned by another actor. Immutable and
/// freely shared; sending through it is always asynchronous.
#[derive(Clone)]
pub struct FarReference {
    /// Actor owning the referenced value.
    pub target: ActorId,
    /// The referenced value; only turns of `target` may be given access.
    pub value: Value,
}

impl FarReference {
    pub fn new(target: ActorId, value: Value) -> Self {
        Self { target, value }
    }

    /// Erases the reference into a `Value` so it can travel in message
    /// arguments and promise resolutions.
    pub fn into_value(self) -> Value {
        Arc::new(self)
    }

    /// Recovers a far reference from an opaque value, if it is one.
    pub fn from_value(v: &Value) -> Option<&FarReference> {
        v.downcast_ref::<FarReference>()
    }
}

impl fmt::Debug for FarReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FarReference")
            .field("target", &self.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_roundtrip() {
        let v = value(42i64);
        assert_eq!(value_of::<i64>(&v), Some(&42));
        assert_eq!(value_of::<String>(&v), None);
    }

    #[test]
    fn far_reference_travels_as_value() {
        let far = FarReference::new(ActorId::from_raw(7), value("payload"));
        let v = far.into_value();
        let back = FarReference::from_value(&v).unwrap();
        assert_eq!(back.target, ActorId::from_raw(7));
        assert_eq!(value_of::<&str>(&back.value), Some(&"payload"));
    }

    #[test]
    fn selector_equality() {
        assert_eq!(Selector::new("double:"), Selector::from("double:"));
        assert_ne!(Selector::new("double:"), Selector::new("halve:"));
    }
}
