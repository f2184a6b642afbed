//! # Identity Allocation
//!
//! Actor and message identities for one system instance. The allocator is
//! owned by the system and injectable into tests, with an explicit `reset`
//! lifecycle; it is deliberately not a process-wide singleton.
//!
//! ## Modes
//! - `Sequential`: monotonically increasing ids, never reused. Default for
//!   untraced runs.
//! - `Derived`: a child id is a pure 64-bit mix of the parent id and the
//!   parent's spawn count. Used whenever tracing is active, on both the
//!   record and the replay side: the replayed run recomputes the identical
//!   ids, so the trace never has to store them.

use std::sync::atomic::{AtomicU64, Ordering};

use shrike_api::ActorId;

/// Globally unique send-order identity of an eventual message.
///
/// Strictly increasing in send order; used for tie-breaking, never stored in
/// traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

/// How actor ids are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// Monotonic counter.
    Sequential,
    /// Deterministic function of `(parent, nth_child_of_parent)`.
    Derived,
}

/// Issues actor and message identities for one system instance.
#[derive(Debug)]
pub struct IdentityAllocator {
    mode: IdMode,
    next_actor: AtomicU64,
    next_message: AtomicU64,
}

impl IdentityAllocator {
    pub fn new(mode: IdMode) -> Self {
        Self {
            mode,
            // 0 is reserved for the main actor in both modes.
            next_actor: AtomicU64::new(1),
            next_message: AtomicU64::new(1),
        }
    }

    pub fn mode(&self) -> IdMode {
        self.mode
    }

    /// Returns all counters to their initial state.
    ///
    /// Only valid between runs, when no actor of the previous run is still
    /// reachable.
    pub fn reset(&self) {
        self.next_actor.store(1, Ordering::SeqCst);
        self.next_message.store(1, Ordering::SeqCst);
    }

    /// Identity for the `nth` child spawned by `parent`.
    pub fn child_actor(&self, parent: ActorId, nth: u32) -> ActorId {
        match self.mode {
            IdMode::Sequential => ActorId::from_raw(self.next_actor.fetch_add(1, Ordering::SeqCst)),
            IdMode::Derived => ActorId::from_raw(derive_child_id(parent.raw(), nth)),
        }
    }

    /// Next message id, strictly increasing in send order.
    pub fn next_message(&self) -> MessageId {
        MessageId(self.next_message.fetch_add(1, Ordering::SeqCst))
    }
}

/// 64-bit mix of `(parent, nth)`, splitmix64-style.
///
/// Collision-free in practice over the id population of a single run; the
/// replay side recomputes the same value because spawn order per parent is
/// reproduced by the expectation queues.
fn derive_child_id(parent: u64, nth: u32) -> u64 {
    let mut x = parent ^ (u64::from(nth).wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}
