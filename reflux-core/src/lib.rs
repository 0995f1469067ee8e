//! Reflux Core
//!
//! This crate provides a small reactive-state library. It implements:
//!
//! - Observable values that notify subscribers on every write
//! - Computed values that track their own dependencies and re-evaluate lazily
//! - Revocable subscriptions
//! - Pausable and protectable wrappers around any value
//!
//! # Architecture
//!
//! Everything lives in the `reactive` module; the most used items are
//! re-exported at the crate root.
//!
//! The library is single-threaded. Handles are cheap `Rc` clones and are not
//! `Send`. Errors are returned synchronously from the call that caused them
//! (see [`ReactiveError`]).
//!
//! # Example
//!
//! ```rust
//! use reflux_core::{computed, observable};
//!
//! // Create an observable
//! let count = observable(2);
//!
//! // Create a derived value
//! let source = count.clone();
//! let tenfold = computed(move || source.get() * 10);
//! assert_eq!(tenfold.get(), 20);
//!
//! // Watch the observable
//! let watch = count.subscribe(|v| println!("count is now {v}"));
//!
//! // Update it; the computed re-evaluates on its next read
//! count.set(3).unwrap();
//! assert_eq!(tenfold.get(), 30);
//!
//! use reflux_core::Disposable;
//! watch.dispose();
//! ```

pub mod reactive;

pub use reactive::{
    computed, computed_try, computed_with_setter, observable, Computed, ComputedOptions,
    Disposable, Notifiable, Observable, Pausable, Protectable, ReactiveError, Result,
    Subscription,
};
