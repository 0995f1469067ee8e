//! Protectable Values
//!
//! [`Protectable`] puts a staging slot in front of a writable value. Writes
//! land in the slot only; reads keep returning the underlying value until
//! `commit()` pushes the staged value through, or `reset()` discards it.

use std::cell::RefCell;
use std::fmt::{self, Debug};

use tracing::debug;

use super::context::ReactiveContext;
use super::error::Result;
use super::traits::{Capabilities, Gettable, Settable, Tagged};

/// A value whose writes are staged until committed.
///
/// ```rust
/// use reflux_core::reactive::{Observable, Protectable};
///
/// let name = Observable::new("draft".to_string());
/// let form = Protectable::new(name.clone()).unwrap();
///
/// form.set("final".to_string());
/// assert_eq!(name.get(), "draft");
///
/// form.commit().unwrap();
/// assert_eq!(name.get(), "final");
/// ```
pub struct Protectable<S, T> {
    inner: S,
    staged: RefCell<T>,
}

impl<S, T> Protectable<S, T>
where
    S: Gettable<T> + Settable<T>,
    T: Clone + 'static,
{
    /// Wrap `inner`, staging its current value.
    pub fn new(inner: S) -> Result<Self> {
        let staged = ReactiveContext::untracked(|| inner.try_get())?;
        Ok(Self {
            inner,
            staged: RefCell::new(staged),
        })
    }

    /// Read the underlying value.
    pub fn get(&self) -> Result<T> {
        self.inner.try_get()
    }

    /// Stage `value` without touching the underlying value.
    pub fn set(&self, value: T) -> T {
        *self.staged.borrow_mut() = value.clone();
        value
    }

    /// Read the staged value.
    pub fn staged(&self) -> T {
        self.staged.borrow().clone()
    }

    /// Write the staged value through to the underlying value.
    pub fn commit(&self) -> Result<()> {
        let value = self.staged();
        debug!("committing staged value");
        self.inner.try_set(value).map(|_| ())
    }

    /// Discard the staged value and stage the underlying one again.
    pub fn reset(&self) -> Result<()> {
        let value = ReactiveContext::untracked(|| self.inner.try_get())?;
        debug!("staged value reset");
        *self.staged.borrow_mut() = value;
        Ok(())
    }

    /// The wrapped value.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, T> Gettable<T> for Protectable<S, T>
where
    S: Gettable<T> + Settable<T>,
    T: Clone + 'static,
{
    fn try_get(&self) -> Result<T> {
        self.get()
    }
}

impl<S, T> Settable<T> for Protectable<S, T>
where
    S: Gettable<T> + Settable<T>,
    T: Clone + 'static,
{
    fn try_set(&self, value: T) -> Result<T> {
        Ok(self.set(value))
    }
}

impl<S, T> Tagged for Protectable<S, T>
where
    S: Tagged,
{
    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities() | Capabilities::PROTECTABLE
    }
}

impl<S, T> Debug for Protectable<S, T>
where
    S: Debug,
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protectable")
            .field("inner", &self.inner)
            .field("staged", &*self.staged.borrow())
            .finish()
    }
}

/// Wrap `inner` so its writes are staged until committed.
pub fn protectable<S, T>(inner: S) -> Result<Protectable<S, T>>
where
    S: Gettable<T> + Settable<T>,
    T: Clone + 'static,
{
    Protectable::new(inner)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
