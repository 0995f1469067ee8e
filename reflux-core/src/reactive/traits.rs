//! Capability Traits
//!
//! Every reactive value is assembled from a handful of small capabilities.
//! Concrete types (`ValueCell`, `SubscribableCell`, `Observable`, `Computed`,
//! `Pausable`, `Protectable`) implement the traits below for the
//! capabilities they carry and advertise them through [`Capabilities`].
//!
//! The tags are only consulted at construction time, to reject a computed
//! value built on top of another dependency-tracking scope.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use super::error::Result;
use super::subscriber::{Disposable, Subscription};

bitflags! {
    /// Capability tags carried by a reactive value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Holds a single value behind `get`/`set`.
        const CONTAINER = 1 << 0;
        /// Keeps a subscriber list and notifies it on every write.
        const SUBSCRIBABLE = 1 << 1;
        /// Registers itself with the active dependency frame when read.
        const DEPENDABLE = 1 << 2;
        /// Externally mutable reactive primitive.
        const OBSERVABLE = 1 << 3;
        /// Lazily recomputed from the values it read.
        const DEPENDENT = 1 << 4;
        /// Opens dependency-tracking frames of its own.
        const DEPENDER = 1 << 5;
        /// Reads can be frozen with `pause`.
        const PAUSABLE = 1 << 6;
        /// Writes are staged until `commit`.
        const PROTECTABLE = 1 << 7;
    }
}

/// Identity of a dependable value, used to deduplicate dependency frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependableId(u64);

impl DependableId {
    /// Generate a new unique id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DependableId {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports which capabilities a value carries.
pub trait Tagged {
    /// The capability tags of this value.
    fn capabilities(&self) -> Capabilities;
}

/// A value that can be read.
pub trait Gettable<T> {
    /// Read the value, registering a dependency if a frame is active.
    fn try_get(&self) -> Result<T>;
}

/// A value that can be written.
pub trait Settable<T> {
    /// Write the value, returning what was stored.
    fn try_set(&self, value: T) -> Result<T>;
}

/// A value with a subscriber list.
pub trait Notifiable<T> {
    /// Register a fallible callback for every future notification.
    fn try_subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<()> + 'static;

    /// Notify all live subscribers with the current value.
    fn notify(&self) -> Result<()>;

    /// Register a callback for every future notification.
    fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + 'static,
    {
        self.try_subscribe(move |value| {
            callback(value);
            Ok(())
        })
    }
}

/// Type-erased view of a value that can be tracked as a dependency.
///
/// Dependency frames hold heterogeneous values, so a computed only needs to
/// know the identity of what it read and how to be told when it changes.
pub trait Dependable {
    /// Identity used to deduplicate frames.
    fn dependable_id(&self) -> DependableId;

    /// Subscribe a handler that fires whenever this value changes.
    fn subscribe_invalidation(&self, on_change: Rc<dyn Fn() -> Result<()>>) -> Box<dyn Disposable>;
}

/// Read-or-write convenience mirroring a zero/one argument call.
pub trait Access<T>: Gettable<T> + Settable<T> {
    /// `None` reads the value; `Some(v)` writes `v` and then reads back.
    fn call(&self, value: Option<T>) -> Result<T> {
        if let Some(value) = value {
            self.try_set(value)?;
        }
        self.try_get()
    }
}

impl<T, S> Access<T> for S where S: Gettable<T> + Settable<T> + ?Sized {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependable_ids_are_unique() {
        let id1 = DependableId::new();
        let id2 = DependableId::new();
        let id3 = DependableId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn capability_sets() {
        let observable = Capabilities::CONTAINER
            | Capabilities::SUBSCRIBABLE
            | Capabilities::DEPENDABLE
            | Capabilities::OBSERVABLE;

        assert!(observable.contains(Capabilities::DEPENDABLE));
        assert!(!observable.contains(Capabilities::DEPENDER));
        assert!(!observable.intersects(Capabilities::PAUSABLE | Capabilities::PROTECTABLE));
    }
}
