//! Ripple Core
//!
//! This crate provides a small push-based signal protocol and the
//! combinators that build on it. It implements:
//!
//! - Sources (mutable cells, constants, futures)
//! - Order-preserving synchronous and asynchronous transforms
//! - Change filtering, joining, sharing and debouncing
//! - Consumers that read a signal from sync or async code
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the signal protocol, sources and combinators
//! - `consume`: `get`, `iter`, `next`, `until` and the synchronicity checks
//! - `equality`: shallow and deep change detection
//! - `error`: the in-band error type carried by every fire
//! - `config`: tuning defaults for the timed operations
//!
//! Asynchronous work runs on the ambient tokio runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::{gate, mute, next, writable};
//!
//! let (count, set) = writable(1);
//! let doubled = gate(&mute(&count, |n| n * 2));
//!
//! set.set(5);
//! assert_eq!(next(&doubled, 0).await, Ok(10));
//! ```

pub mod config;
pub mod consume;
pub mod equality;
pub mod error;
pub mod reactive;

pub use config::{SettleConfig, DEFAULT_GRACE, DEFAULT_QUIET};
pub use consume::{get, is_sync, is_sync_now, iter, next, next_inspected, until, Iter};
pub use equality::{not_equal, not_equal_deep, Structural};
pub use error::{Fire, SignalError};
pub use reactive::{
    combine_list, combine_map, gate, gate_with, init, init_from, memo, mute, mute_async, mute_with,
    settle, when, writable, Callback, Differ, InspectContext, MemoState, Mutation, Release, Setter,
    Signal,
};
