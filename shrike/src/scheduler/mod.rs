//! # Turn Scheduling
//!
//! A fixed-size pool of worker tasks executes actor-turn work drawn from one
//! shared queue. The queue holds actors whose mailboxes claimed a turn; any
//! FIFO task order is acceptable because the ordering guarantee of the
//! engine (FIFO per sender→target pair) is carried by the mailboxes, not by
//! the pool.

pub mod pool;
pub mod queue;
pub mod worker;

pub use pool::WorkerPool;
pub use queue::SchedulingQueue;
