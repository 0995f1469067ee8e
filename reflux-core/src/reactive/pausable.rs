//! Pausable Values
//!
//! [`Pausable`] wraps any gettable value and lets its reads be frozen. While
//! paused, reads return the snapshot taken by `pause()`; after `resume()`
//! they go to the wrapped value again.
//!
//! The pause flag is itself an [`Observable`], and every read consults it
//! first. A computed that reads a pausable value therefore depends on the
//! flag, and re-evaluates when the value is paused or resumed.

use std::cell::RefCell;
use std::fmt::{self, Debug};

use tracing::debug;

use super::context::ReactiveContext;
use super::error::Result;
use super::observable::Observable;
use super::traits::{Capabilities, Gettable, Settable, Tagged};

/// A value whose reads can be frozen.
///
/// ```rust
/// use reflux_core::reactive::{Observable, Pausable};
///
/// let count = Observable::new(1);
/// let frozen = Pausable::new(count.clone());
///
/// frozen.pause().unwrap();
/// count.set(2).unwrap();
/// assert_eq!(frozen.get().unwrap(), 1);
///
/// frozen.resume().unwrap();
/// assert_eq!(frozen.get().unwrap(), 2);
/// ```
pub struct Pausable<S, T> {
    inner: S,
    paused: Observable<bool>,
    snapshot: RefCell<Option<T>>,
}

impl<S, T> Pausable<S, T>
where
    S: Gettable<T>,
    T: Clone + 'static,
{
    /// Wrap `inner`. The wrapper starts resumed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            paused: Observable::new(false),
            snapshot: RefCell::new(None),
        }
    }

    /// Read the snapshot while paused, the wrapped value otherwise.
    pub fn get(&self) -> Result<T> {
        if self.paused.get() {
            if let Some(value) = self.snapshot.borrow().as_ref() {
                return Ok(value.clone());
            }
        }
        self.inner.try_get()
    }

    /// Snapshot the current value and freeze reads.
    ///
    /// Pausing an already paused value keeps the existing snapshot.
    pub fn pause(&self) -> Result<()> {
        let value = ReactiveContext::untracked(|| self.get())?;
        *self.snapshot.borrow_mut() = Some(value);
        debug!("paused");
        self.paused.set(true)
    }

    /// Drop the snapshot and read the wrapped value again.
    pub fn resume(&self) -> Result<()> {
        self.snapshot.borrow_mut().take();
        debug!("resumed");
        self.paused.set(false)
    }

    /// Check whether reads are frozen.
    pub fn is_paused(&self) -> bool {
        self.paused.get_untracked()
    }

    /// The wrapped value.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, T> Gettable<T> for Pausable<S, T>
where
    S: Gettable<T>,
    T: Clone + 'static,
{
    fn try_get(&self) -> Result<T> {
        self.get()
    }
}

impl<S, T> Settable<T> for Pausable<S, T>
where
    S: Settable<T>,
{
    /// Writes always reach the wrapped value, paused or not.
    fn try_set(&self, value: T) -> Result<T> {
        self.inner.try_set(value)
    }
}

impl<S, T> Tagged for Pausable<S, T>
where
    S: Tagged,
{
    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities() | Capabilities::PAUSABLE
    }
}

impl<S, T> Debug for Pausable<S, T>
where
    S: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pausable")
            .field("inner", &self.inner)
            .field("paused", &self.paused.get_untracked())
            .field("snapshot", &*self.snapshot.borrow())
            .finish()
    }
}

/// Wrap `inner` so its reads can be frozen.
pub fn pausable<S, T>(inner: S) -> Pausable<S, T>
where
    S: Gettable<T>,
    T: Clone + 'static,
{
    Pausable::new(inner)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::computed::computed;
    use std::rc::Rc;

    #[test]
    fn pause_freezes_reads() {
        let obs = Observable::new(1);
        let p = pausable(obs.clone());
        assert!(!p.is_paused());

        p.pause().unwrap();
        assert!(p.is_paused());

        obs.set(2).unwrap();
        assert_eq!(p.get(), Ok(1));

        p.resume().unwrap();
        assert_eq!(p.get(), Ok(2));
    }

    #[test]
    fn pausing_twice_keeps_first_snapshot() {
        let obs = Observable::new("a");
        let p = Pausable::new(obs.clone());

        p.pause().unwrap();
        obs.set("b").unwrap();
        p.pause().unwrap();

        assert_eq!(p.get(), Ok("a"));
    }

    #[test]
    fn writes_pass_through_while_paused() {
        let obs = Observable::new(1);
        let p = Pausable::new(obs.clone());

        p.pause().unwrap();
        assert_eq!(p.try_set(5), Ok(5));
        assert_eq!(obs.get(), 5);
        assert_eq!(p.get(), Ok(1));
    }

    #[test]
    fn computed_reacts_to_pause_and_resume() {
        let obs = Observable::new(10);
        let p = Rc::new(Pausable::new(obs.clone()));
        let p2 = p.clone();
        let c = computed(move || p2.get().unwrap_or_default() + 1);
        assert_eq!(c.get(), 11);

        p.pause().unwrap();
        obs.set(20).unwrap();
        assert_eq!(c.get(), 11);

        p.resume().unwrap();
        assert!(c.is_dirty());
        assert_eq!(c.get(), 21);
    }

    #[test]
    fn capabilities_extend_inner() {
        let p = Pausable::new(Observable::new(0));
        let caps = p.capabilities();
        assert!(caps.contains(Capabilities::OBSERVABLE | Capabilities::PAUSABLE));
    }
}
