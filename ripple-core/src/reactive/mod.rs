//! Reactive Primitives
//!
//! This module implements the signal protocol and the combinators that
//! compose signals into derived, possibly asynchronous values.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is subscribed with a callback and fires it zero or more
//! times, synchronously during `subscribe` and/or later, until the returned
//! [`Release`] is released or dropped. Every fire is a [`Fire<T>`]:
//! `Ok(value)` or an in-band `Err`.
//!
//! ## Sources
//!
//! [`writable`] is a mutable cell, [`init`]/[`init_from`] guarantee a
//! synchronous first value, and [`when`] bridges a future.
//!
//! ## Combinators
//!
//! [`mute`] maps (in order, even when the map is asynchronous), [`gate`]
//! filters unchanged values, [`combine_list`]/[`combine_map`] join many
//! signals into one, [`memo`] shares one upstream among many subscribers
//! and [`settle`] debounces.
//!
//! # Implementation Notes
//!
//! There is no central scheduler or dependency graph: composition is plain
//! nesting, and each combinator owns the state of its own subscriptions.
//! Locks are never held across a callback, so callbacks may re-enter the
//! graph (write to a cell, subscribe, release) from inside a notification.
//!
//! [`Fire<T>`]: crate::Fire

mod signal;
mod subscriber;
mod writable;
mod source;
mod mute;
mod gate;
mod combine;
mod memo;
mod settle;
mod inspect;

pub use signal::{Signal, Release, Callback};
pub use subscriber::{Entry, SubscriberId, SubscriberSet, Snapshot};
pub use writable::{writable, Setter};
pub use source::{init, init_from, when};
pub use mute::{mute, mute_async, mute_with, Mutation};
pub use gate::{gate, gate_with, Differ};
pub use combine::{combine_list, combine_map};
pub use memo::{memo, MemoState};
pub use settle::settle;
pub use inspect::InspectContext;
