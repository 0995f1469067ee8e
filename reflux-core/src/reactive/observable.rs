//! Observable Implementation
//!
//! An Observable is the externally mutable reactive primitive: a value cell,
//! with a subscriber list, that registers itself as a dependency whenever it
//! is read inside a tracking frame.
//!
//! # How Observables Work
//!
//! 1. Reading the observable returns its value and then, if a frame is
//!    active, records the observable in that frame.
//!
//! 2. Writing stores the value and synchronously notifies every subscriber
//!    with it, in subscription order.
//!
//! 3. A computed value that read the observable holds one of those
//!    subscriptions; its handler marks the computed dirty.
//!
//! # Sharing
//!
//! Cloning an observable yields another handle to the same value. Handles
//! are `!Send`: the reactive system is confined to one thread.

use std::fmt::{self, Debug};
use std::rc::Rc;

use tracing::trace;

use super::context::ReactiveContext;
use super::error::Result;
use super::subscribable::SubscribableCell;
use super::subscriber::{Disposable, Subscription};
use super::traits::{Capabilities, Dependable, DependableId, Gettable, Notifiable, Settable, Tagged};

struct ObservableInner<T> {
    /// Identity used by dependency frames.
    id: DependableId,

    /// Owned storage plus subscribers.
    store: SubscribableCell<T>,
}

impl<T: Clone + 'static> ObservableInner<T> {
    fn read(&self) -> T {
        self.store
            .get()
            .expect("observable storage is always gettable")
    }
}

impl<T: Clone + 'static> Dependable for ObservableInner<T> {
    fn dependable_id(&self) -> DependableId {
        self.id
    }

    fn subscribe_invalidation(&self, on_change: Rc<dyn Fn() -> Result<()>>) -> Box<dyn Disposable> {
        Box::new(self.store.subscribers().subscribe(move |_| on_change()))
    }
}

/// A reactive value holding a `T`.
///
/// # Example
///
/// ```rust
/// use reflux_core::reactive::Observable;
///
/// let count = Observable::new(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5).unwrap();
/// assert_eq!(count.get(), 5);
/// ```
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Observable<T>
where
    T: Clone + 'static,
{
    /// Create a new observable with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                id: DependableId::new(),
                store: SubscribableCell::new(value),
            }),
        }
    }

    /// Get the observable's unique ID.
    pub fn id(&self) -> DependableId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a tracking frame, this also records the observable
    /// as a dependency of that frame.
    pub fn get(&self) -> T {
        let value = self.inner.read();
        ReactiveContext::track_dependency(self.as_dependable());
        value
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.read()
    }

    /// Access the current value with a closure, tracking the read.
    ///
    /// # Panics
    ///
    /// The value stays borrowed while `f` runs, so `f` must not write to this
    /// observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let result = self
            .inner
            .store
            .cell()
            .with(f)
            .expect("observable storage is always gettable");
        ReactiveContext::track_dependency(self.as_dependable());
        result
    }

    /// Set a new value and notify subscribers.
    ///
    /// The value is stored before the fan-out starts. If a subscriber fails,
    /// the remaining subscribers are skipped and the error is returned.
    pub fn set(&self, value: T) -> Result<()> {
        trace!(observable = self.inner.id.raw(), "set");
        self.inner.store.set(value).map(|_| ())
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.inner.read();
        self.set(f(&current))
    }

    /// Register a callback invoked with every new value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + 'static,
    {
        Notifiable::subscribe(&self.inner.store, callback)
    }

    /// Register a fallible callback invoked with every new value.
    pub fn try_subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        self.inner.store.try_subscribe(callback)
    }

    /// Notify subscribers with the current value without changing it.
    pub fn notify(&self) -> Result<()> {
        self.inner.store.notify()
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.store.subscriber_count()
    }

    /// Get the observable as a type-erased dependable.
    pub fn as_dependable(&self) -> Rc<dyn Dependable> {
        self.inner.clone()
    }
}

impl<T: Clone + 'static> Gettable<T> for Observable<T> {
    fn try_get(&self) -> Result<T> {
        Ok(self.get())
    }
}

impl<T: Clone + 'static> Settable<T> for Observable<T> {
    fn try_set(&self, value: T) -> Result<T> {
        trace!(observable = self.inner.id.raw(), "set");
        self.inner.store.set(value)
    }
}

impl<T: Clone + 'static> Notifiable<T> for Observable<T> {
    fn try_subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        Observable::try_subscribe(self, callback)
    }

    fn notify(&self) -> Result<()> {
        Observable::notify(self)
    }
}

impl<T> Tagged for Observable<T> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTAINER
            | Capabilities::SUBSCRIBABLE
            | Capabilities::DEPENDABLE
            | Capabilities::OBSERVABLE
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Observable<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a new observable.
pub fn observable<T: Clone + 'static>(value: T) -> Observable<T> {
    Observable::new(value)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::error::ReactiveError;
    use crate::reactive::traits::Access;
    use std::cell::{Cell, RefCell};

    #[test]
    fn observable_get_and_set() {
        let obs = Observable::new(0);
        assert_eq!(obs.get(), 0);

        obs.set(42).unwrap();
        assert_eq!(obs.get(), 42);
    }

    #[test]
    fn observable_update() {
        let obs = Observable::new(10);
        obs.update(|v| v + 5).unwrap();
        assert_eq!(obs.get(), 15);
    }

    #[test]
    fn update_closure_may_write_the_same_observable() {
        let obs = Observable::new(1);
        let inner = obs.clone();
        obs.update(|v| {
            inner.set(v * 100).unwrap();
            v + 1
        })
        .unwrap();
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn observable_call_convention() {
        let obs = observable("a".to_string());
        assert_eq!(obs.call(None), Ok("a".to_string()));
        assert_eq!(obs.call(Some("b".to_string())), Ok("b".to_string()));
        assert_eq!(obs.get(), "b");
    }

    #[test]
    fn observable_notifies_subscribers_once_per_write() {
        let obs = Observable::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        obs.subscribe(move |v| seen_clone.borrow_mut().push(*v));

        assert!(seen.borrow().is_empty());

        obs.set(1).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);

        obs.set(2).unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn observable_unsubscribe() {
        let obs = Observable::new(0);
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let sub = obs.subscribe(move |_| {
            call_count_clone.set(call_count_clone.get() + 1);
        });

        obs.set(1).unwrap();
        assert_eq!(call_count.get(), 1);

        sub.dispose();
        obs.set(2).unwrap();
        // Should not have been called again
        assert_eq!(call_count.get(), 1);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn failing_subscriber_surfaces_from_set() {
        let obs = Observable::new(0);
        obs.try_subscribe(|v| {
            if *v > 10 {
                Err(ReactiveError::evaluation("too large"))
            } else {
                Ok(())
            }
        });

        assert!(obs.set(5).is_ok());
        assert_eq!(obs.set(11), Err(ReactiveError::Evaluation("too large".into())));
        // The write itself happened before the fan-out
        assert_eq!(obs.get(), 11);
    }

    #[test]
    fn observable_read_is_tracked() {
        let obs = Observable::new(1);

        let (value, deps) = ReactiveContext::dependents_of(|| obs.get() + obs.get());
        assert_eq!(value, 2);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].dependable_id(), obs.id());

        let (_, deps) = ReactiveContext::dependents_of(|| obs.get_untracked());
        assert!(deps.is_empty());

        let (len, deps) = ReactiveContext::dependents_of(|| obs.with(|v| v.to_string().len()));
        assert_eq!(len, 1);
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn observable_clone_shares_state() {
        let obs1 = Observable::new(0);
        let obs2 = obs1.clone();

        obs1.set(42).unwrap();
        assert_eq!(obs2.get(), 42);
        assert_eq!(obs1.id(), obs2.id());
    }

    #[test]
    fn observable_ids_are_unique() {
        let o1 = Observable::new(0);
        let o2 = Observable::new(0);
        assert_ne!(o1.id(), o2.id());
    }

    #[test]
    fn observable_debug() {
        let obs = Observable::new(7);
        let debug = format!("{:?}", obs);
        assert!(debug.contains("Observable"));
        assert!(debug.contains('7'));
    }
}
