//! Subscribable Cell
//!
//! A value cell with a subscriber list attached. Every successful `set`
//! notifies the list with the value the cell actually stored.
//!
//! This is the layer a computed value uses for its private dirty flag, and
//! the layer an observable builds on before adding dependency tracking.

use std::fmt::{self, Debug};

use super::cell::ValueCell;
use super::error::Result;
use super::subscriber::{SubscriberList, Subscription};
use super::traits::{Capabilities, Gettable, Notifiable, Settable, Tagged};

/// A cell that notifies subscribers on every write.
pub struct SubscribableCell<T> {
    /// The wrapped storage.
    cell: ValueCell<T>,

    /// Subscribers notified after each write.
    subscribers: SubscriberList<T>,
}

impl<T> SubscribableCell<T>
where
    T: Clone + 'static,
{
    /// Create a subscribable cell owning `value`.
    pub fn new(value: T) -> Self {
        Self::from_cell(ValueCell::new(value))
    }

    /// Attach a subscriber list to an existing cell.
    pub fn from_cell(cell: ValueCell<T>) -> Self {
        Self {
            cell,
            subscribers: SubscriberList::new(),
        }
    }

    /// Get the current value. Reads are never tracked at this layer.
    pub fn get(&self) -> Result<T> {
        self.cell.get()
    }

    /// Store `value`, notify subscribers with what was stored, and return it.
    ///
    /// Fails with [`ReactiveError::Unsettable`](super::ReactiveError::Unsettable)
    /// if the cell has no setter. A failing subscriber aborts the fan-out and
    /// its error is returned; the value stays stored.
    pub fn set(&self, value: T) -> Result<T> {
        let stored = self.cell.set(value)?;
        self.subscribers.notify(&stored)?;
        Ok(stored)
    }

    /// Notify subscribers with the current value.
    pub fn notify(&self) -> Result<()> {
        let value = self.cell.get()?;
        self.subscribers.notify(&value)
    }

    /// Notify subscribers with an explicit value.
    pub fn notify_with(&self, value: &T) -> Result<()> {
        self.subscribers.notify(value)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The wrapped cell.
    pub fn cell(&self) -> &ValueCell<T> {
        &self.cell
    }

    /// The subscriber list.
    pub fn subscribers(&self) -> &SubscriberList<T> {
        &self.subscribers
    }
}

impl<T: Clone + 'static> Gettable<T> for SubscribableCell<T> {
    fn try_get(&self) -> Result<T> {
        self.get()
    }
}

impl<T: Clone + 'static> Settable<T> for SubscribableCell<T> {
    fn try_set(&self, value: T) -> Result<T> {
        self.set(value)
    }
}

impl<T: Clone + 'static> Notifiable<T> for SubscribableCell<T> {
    fn try_subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    fn notify(&self) -> Result<()> {
        SubscribableCell::notify(self)
    }
}

impl<T> Tagged for SubscribableCell<T> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTAINER | Capabilities::SUBSCRIBABLE
    }
}

impl<T> Debug for SubscribableCell<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribableCell")
            .field("cell", &self.cell)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

/// Attach a subscriber list to `cell`.
pub fn subscribable<T: Clone + 'static>(cell: ValueCell<T>) -> SubscribableCell<T> {
    SubscribableCell::from_cell(cell)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
