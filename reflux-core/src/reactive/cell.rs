//! Value Cell
//!
//! The innermost building block: a single slot behind `get`/`set`. A cell
//! either owns its value or delegates both operations to accessor closures,
//! which is how a computed value plugs its evaluator and setter into the
//! same shape as a plain container.

use std::cell::RefCell;
use std::fmt::{self, Debug};

use super::error::{ReactiveError, Result};
use super::traits::{Capabilities, Gettable, Settable, Tagged};

/// Read accessor for a delegating cell.
pub type Getter<T> = Box<dyn Fn() -> Result<T>>;

/// Write accessor for a delegating cell. Returns what was stored.
pub type Setter<T> = Box<dyn Fn(T) -> Result<T>>;

enum Storage<T> {
    Owned(RefCell<T>),
    Accessors {
        getter: Option<Getter<T>>,
        setter: Option<Setter<T>>,
    },
}

/// A mutable single-slot container.
pub struct ValueCell<T> {
    storage: Storage<T>,
}

impl<T> ValueCell<T>
where
    T: Clone + 'static,
{
    /// Create a cell that owns `value`.
    pub fn new(value: T) -> Self {
        Self {
            storage: Storage::Owned(RefCell::new(value)),
        }
    }

    /// Create a cell that delegates to the given accessors.
    ///
    /// A missing getter makes `get` fail with [`ReactiveError::Ungettable`];
    /// a missing setter makes `set` fail with [`ReactiveError::Unsettable`].
    pub fn from_accessors(getter: Option<Getter<T>>, setter: Option<Setter<T>>) -> Self {
        Self {
            storage: Storage::Accessors { getter, setter },
        }
    }

    /// Get the current value.
    pub fn get(&self) -> Result<T> {
        match &self.storage {
            Storage::Owned(value) => Ok(value.borrow().clone()),
            Storage::Accessors { getter, .. } => match getter {
                Some(getter) => getter(),
                None => Err(ReactiveError::Ungettable),
            },
        }
    }

    /// Store `value` and return it.
    pub fn set(&self, value: T) -> Result<T> {
        match &self.storage {
            Storage::Owned(slot) => {
                *slot.borrow_mut() = value.clone();
                Ok(value)
            }
            Storage::Accessors { setter, .. } => match setter {
                Some(setter) => setter(value),
                None => Err(ReactiveError::Unsettable),
            },
        }
    }

    /// Access the current value with a closure.
    ///
    /// Owned cells lend the value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        match &self.storage {
            Storage::Owned(value) => Ok(f(&value.borrow())),
            Storage::Accessors { .. } => self.get().map(|value| f(&value)),
        }
    }

    /// Whether `get` can succeed.
    pub fn is_gettable(&self) -> bool {
        match &self.storage {
            Storage::Owned(_) => true,
            Storage::Accessors { getter, .. } => getter.is_some(),
        }
    }

    /// Whether `set` can succeed.
    pub fn is_settable(&self) -> bool {
        match &self.storage {
            Storage::Owned(_) => true,
            Storage::Accessors { setter, .. } => setter.is_some(),
        }
    }
}

impl<T: Clone + 'static> Gettable<T> for ValueCell<T> {
    fn try_get(&self) -> Result<T> {
        self.get()
    }
}

impl<T: Clone + 'static> Settable<T> for ValueCell<T> {
    fn try_set(&self, value: T) -> Result<T> {
        self.set(value)
    }
}

impl<T> Tagged for ValueCell<T> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTAINER
    }
}

impl<T> Debug for ValueCell<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.storage {
            Storage::Owned(value) => f
                .debug_struct("ValueCell")
                .field("value", &*value.borrow())
                .finish(),
            Storage::Accessors { getter, setter } => f
                .debug_struct("ValueCell")
                .field("getter", &getter.is_some())
                .field("setter", &setter.is_some())
                .finish(),
        }
    }
}

/// Create a cell that owns `value`.
pub fn container<T: Clone + 'static>(value: T) -> ValueCell<T> {
    ValueCell::new(value)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn cell_get_and_set() {
        let cell = container(1);
        assert_eq!(cell.get(), Ok(1));

        assert_eq!(cell.set(42), Ok(42));
        assert_eq!(cell.get(), Ok(42));
    }

    #[test]
    fn cell_with_borrows() {
        let cell = container(vec![1, 2, 3]);
        assert_eq!(cell.with(|v| v.iter().sum::<i32>()), Ok(6));
    }

    #[test]
    fn accessor_cell_delegates() {
        let backing = Rc::new(RefCell::new(String::from("a")));
        let read = backing.clone();
        let write = backing.clone();

        let cell = ValueCell::from_accessors(
            Some(Box::new(move || Ok(read.borrow().clone()))),
            Some(Box::new(move |v: String| {
                *write.borrow_mut() = v.to_uppercase();
                Ok(write.borrow().clone())
            })),
        );

        assert_eq!(cell.set("bee".into()), Ok("BEE".to_string()));
        assert_eq!(cell.get(), Ok("BEE".to_string()));
        assert_eq!(*backing.borrow(), "BEE");
    }

    #[test]
    fn missing_accessors_fail() {
        let get_only: ValueCell<i32> = ValueCell::from_accessors(Some(Box::new(|| Ok(3))), None);
        assert!(get_only.is_gettable());
        assert!(!get_only.is_settable());
        assert_eq!(get_only.set(1), Err(ReactiveError::Unsettable));

        let set_only: ValueCell<i32> = ValueCell::from_accessors(None, Some(Box::new(|v| Ok(v))));
        assert_eq!(set_only.get(), Err(ReactiveError::Ungettable));
        assert_eq!(set_only.with(|v| *v), Err(ReactiveError::Ungettable));
        assert_eq!(set_only.set(9), Ok(9));
    }

    #[test]
    fn cell_is_tagged_container() {
        assert_eq!(container(0).capabilities(), Capabilities::CONTAINER);
    }
}
