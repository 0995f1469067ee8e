//! Reactive Primitives
//!
//! This module implements the reactive system: observables, computed values,
//! and the subscriptions that connect them.
//!
//! # Concepts
//!
//! ## Observables
//!
//! An Observable is a container for mutable state. When its value is read
//! within a tracking frame, it registers itself with that frame. When its
//! value is written, every subscriber is notified synchronously.
//!
//! ## Computed Values
//!
//! A Computed is a derived value that caches its result. It re-evaluates only
//! when something it read during its latest evaluation has changed, and only
//! when it is read again (or has subscribers of its own).
//!
//! ## Wrappers
//!
//! `Pausable` freezes reads of a value behind a snapshot. `Protectable` stages
//! writes until they are committed.
//!
//! # Implementation Notes
//!
//! Values are assembled from small capabilities: a [`ValueCell`] holds the
//! value, a [`SubscribableCell`] adds a subscriber list, and the
//! [`Dependable`] trait lets a value take part in dependency tracking.
//!
//! Tracking uses a thread-local stack of frames ([`ReactiveContext`]). Every
//! handle is `Rc` based, so the whole graph lives on one thread.

mod cell;
mod computed;
mod context;
mod error;
mod observable;
mod pausable;
mod protectable;
mod subscribable;
mod subscriber;
mod traits;

pub use cell::{container, Getter, Setter, ValueCell};
pub use computed::{computed, computed_try, computed_with_setter, Computed, ComputedOptions};
pub use context::ReactiveContext;
pub use error::{ReactiveError, Result};
pub use observable::{observable, Observable};
pub use pausable::{pausable, Pausable};
pub use protectable::{protectable, Protectable};
pub use subscribable::{subscribable, SubscribableCell};
pub use subscriber::{Disposable, SubscriberId, SubscriberList, Subscription};
pub use traits::{
    Access, Capabilities, Dependable, DependableId, Gettable, Notifiable, Settable, Tagged,
};
