//! Subscriber types for the reactive system.
//!
//! A subscriber is a callback that lives in exactly one [`SubscriberList`].
//! Subscribing returns a [`Subscription`], a revocable handle that removes the
//! callback from its list on `dispose()`.
//!
//! # Fan-out
//!
//! Notification iterates a snapshot of the list taken before the first
//! callback runs. A callback that disposes itself (or any other subscriber)
//! mid fan-out does not change the current pass, except that disposed
//! entries are skipped. New subscriptions added during a pass are not called
//! until the next one.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::error::Result;

/// Unique identifier for a subscriber.
///
/// Each subscription gets a unique ID when created. It is used to find the
/// entry again on disposal and to label tracing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that can be revoked.
///
/// Computed values hold handles to upstreams of different value types, so
/// they keep them behind this trait.
pub trait Disposable {
    /// Revoke the handle. Calling this more than once has no further effect.
    fn dispose(&self);

    /// Whether `dispose` has been called.
    fn is_disposed(&self) -> bool;
}

type Callback<T> = Box<dyn Fn(&T) -> Result<()>>;

/// A callback tagged with its disposal state.
struct Entry<T> {
    id: SubscriberId,
    callback: Callback<T>,
    disposed: Cell<bool>,
}

type Entries<T> = RefCell<Vec<Rc<Entry<T>>>>;

/// An ordered list of subscribers. Insertion order is notification order.
pub struct SubscriberList<T> {
    entries: Rc<Entries<T>>,
}

impl<T: 'static> SubscriberList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Append a callback and return its handle.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        let entry = Rc::new(Entry {
            id: SubscriberId::new(),
            callback: Box::new(callback),
            disposed: Cell::new(false),
        });
        self.entries.borrow_mut().push(Rc::clone(&entry));
        trace!(subscriber = entry.id.raw(), "subscribed");

        Subscription {
            entry,
            list: Rc::downgrade(&self.entries),
        }
    }

    /// Invoke every live subscriber with `value`.
    ///
    /// The first callback that fails aborts the rest of this pass and its
    /// error is returned.
    pub fn notify(&self, value: &T) -> Result<()> {
        let snapshot: Vec<Rc<Entry<T>>> = self.entries.borrow().clone();
        trace!(subscribers = snapshot.len(), "notifying subscribers");

        for entry in snapshot {
            if !entry.disposed.get() {
                (entry.callback)(value)?;
            }
        }
        Ok(())
    }

    /// Number of subscribers currently in the list.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the list has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<T: 'static> Default for SubscriberList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SubscriberList<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<T> fmt::Debug for SubscriberList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.entries.borrow().len())
            .finish()
    }
}

/// Handle to one subscription.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::dispose`].
pub struct Subscription<T> {
    entry: Rc<Entry<T>>,
    list: Weak<Entries<T>>,
}

impl<T> Subscription<T> {
    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.entry.id
    }

    /// Run the callback directly. Does nothing once disposed.
    pub fn invoke(&self, value: &T) -> Result<()> {
        if self.entry.disposed.get() {
            return Ok(());
        }
        (self.entry.callback)(value)
    }
}

impl<T> Disposable for Subscription<T> {
    fn dispose(&self) {
        self.entry.disposed.set(true);

        if let Some(list) = self.list.upgrade() {
            let mut entries = list.borrow_mut();
            if let Some(index) = entries.iter().position(|e| Rc::ptr_eq(e, &self.entry)) {
                entries.remove(index);
                trace!(subscriber = self.entry.id.raw(), "subscription disposed");
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.entry.disposed.get()
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Rc::clone(&self.entry),
            list: Weak::clone(&self.list),
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("disposed", &self.entry.disposed.get())
            .finish()
    }
}
