//! # Language-Level Error Type
//!
//! `LanguageError` is the application error raised by the evaluator while a
//! message executes. The engine never interprets it: it is captured
//! per-message and delivered through the message's resolution chain, or to
//! the system's top-level sink when nothing is chained on the result. It
//! must never terminate an actor or the worker pool.

use thiserror::Error;

use crate::types::Selector;

/// Error raised by the invoked callable during a turn.
///
/// Cloneable because a single failure may break several chained promises.
#[derive(Error, Debug, Clone)]
#[error("language error{}: {message}", .selector.as_ref().map(|s| format!(" in `{s}`")).unwrap_or_default())]
pub struct LanguageError {
    /// Selector that was executing when the error was raised, when known.
    pub selector: Option<Selector>,
    /// Human-readable description produced by the language runtime.
    pub message: String,
}

impl LanguageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            selector: None,
            message: message.into(),
        }
    }

    pub fn in_selector(selector: Selector, message: impl Into<String>) -> Self {
        Self {
            selector: Some(selector),
            message: message.into(),
        }
    }
}
