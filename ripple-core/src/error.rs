//! Error types for the signal protocol.
//!
//! Errors travel in-band: a fire is a [`Fire<T>`], and a failed asynchronous
//! transform or source arrives as `Err` through the same callback that
//! carries values. The subscription stays open after an `Err` fire; the
//! consumer decides whether it is fatal.

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while building or consuming signals.
///
/// The type is `Clone` because a single error may fan out to many
/// subscribers (through `memo` or `writable`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// `combine_list`/`combine_map` was given no inputs.
    #[error("combine requires at least one input signal")]
    EmptyCombine,

    /// An asynchronous `mute` transform failed or panicked.
    #[error("asynchronous transform failed: {0}")]
    Rejected(String),

    /// The future behind a `when` signal failed or panicked.
    #[error("source future failed: {0}")]
    SourceFailed(String),

    /// `until` gave up waiting for a matching value.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// `is_sync` saw no fire at all within its grace period.
    #[error("signal did not fire during the {0:?} grace period")]
    Silent(Duration),

    /// Asynchronous work was requested outside a tokio runtime.
    #[error("no async runtime available to drive {0}")]
    NoRuntime(&'static str),
}

/// One delivery on a signal's callback channel.
pub type Fire<T> = Result<T, SignalError>;
