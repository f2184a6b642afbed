//! # Engine Error Types
//!
//! Errors surfaced by the engine to the embedding runtime. Language-level
//! application errors are *not* here: a `LanguageError` stays inside the
//! failing message's resolution chain (or the top-level sink) and never
//! escalates. Only completion failure, replay divergence and detected stalls
//! reach process level.

use shrike_api::ActorId;
use thiserror::Error;

/// Errors related to the actor system itself.
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("no actor registered under {0}")]
    ActorNotFound(ActorId),

    #[error("actor system is shutting down")]
    ShuttingDown,

    #[error("initial actor state is not independently shareable")]
    NotShareable,

    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("replay diverged from the recorded run:\n{0}")]
    ReplayDivergence(String),

    #[error("worker pool stalled: {0}")]
    Stalled(String),

    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(std::time::Duration),

    #[error("internal system error: {0}")]
    Other(#[from] anyhow::Error),
}
