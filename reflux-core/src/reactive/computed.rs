//! Computed Implementation
//!
//! A Computed is a cached derived value. It discovers what it depends on by
//! running its evaluator inside a dependency frame, and re-runs only after one
//! of those dependencies changed.
//!
//! # How Computeds Work
//!
//! 1. Construction evaluates once. Every dependable read during evaluation is
//!    handed an invalidation handler, and the handles are kept.
//!
//! 2. A change in any of those dependables sets the private `dirty` flag.
//!
//! 3. Setting `dirty` tells downstream computeds they are stale too. Nothing
//!    is recomputed unless the computed has value subscribers, in which case
//!    it recomputes and notifies them with the fresh value.
//!
//! 4. The next read of a dirty computed disposes every held handle, evaluates
//!    again in a fresh frame, subscribes to whatever was read *this* time, and
//!    caches the result.
//!
//! Because handles are replaced wholesale, a branch that was not taken in the
//! latest evaluation does not cause recomputation.
//!
//! # Chains
//!
//! A computed read inside another computed's evaluator registers itself in the
//! outer frame after its own read returns. The outer computed then subscribes
//! to the inner one's invalidation list, so staleness propagates down a chain
//! of any depth without evaluating anything.
//!
//! # Consistency
//!
//! Without value subscribers the graph is pull-based and reads are always
//! consistent. A computed with value subscribers recomputes while the
//! upstream fan-out is still running, so in a diamond a subscriber can observe
//! an intermediate value before the final one arrives.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::mem;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::{debug, debug_span, trace};

use super::cell::{Getter, Setter, ValueCell};
use super::context::ReactiveContext;
use super::error::{ReactiveError, Result};
use super::subscribable::SubscribableCell;
use super::subscriber::{Disposable, SubscriberList, Subscription};
use super::traits::{Capabilities, Dependable, DependableId, Gettable, Notifiable, Settable, Tagged};

/// Handles to the dependables read in the latest evaluation.
type Upstream = SmallVec<[Box<dyn Disposable>; 4]>;

/// Construction-time configuration for a [`Computed`].
///
/// ```rust
/// use reflux_core::reactive::{ComputedOptions, Observable};
///
/// let celsius = Observable::new(100.0);
/// let read = celsius.clone();
/// let write = celsius.clone();
///
/// let fahrenheit = ComputedOptions::new(move || read.get() * 9.0 / 5.0 + 32.0)
///     .setter(move |f: f64| {
///         write.set((f - 32.0) * 5.0 / 9.0)?;
///         Ok(f)
///     })
///     .label("fahrenheit")
///     .build();
///
/// assert_eq!(fahrenheit.get(), 212.0);
/// fahrenheit.set(32.0).unwrap();
/// assert_eq!(celsius.get(), 0.0);
/// ```
pub struct ComputedOptions<T> {
    evaluator: Getter<T>,
    setter: Option<Setter<T>>,
    label: Option<String>,
}

impl<T> ComputedOptions<T>
where
    T: Clone + 'static,
{
    /// Start from an infallible evaluator.
    pub fn new<F>(evaluator: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::fallible(move || Ok(evaluator()))
    }

    /// Start from an evaluator that may fail.
    pub fn fallible<F>(evaluator: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self {
            evaluator: Box::new(evaluator),
            setter: None,
            label: None,
        }
    }

    /// Make the computed settable. The setter returns what it stored.
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(T) -> Result<T> + 'static,
    {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Attach a label shown in tracing spans and `Debug` output.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Create the computed and evaluate it once.
    pub fn build(self) -> Computed<T> {
        Computed::from_options(self)
    }
}

struct ComputedInner<T> {
    /// Identity used by dependency frames.
    id: DependableId,

    /// Optional name for diagnostics.
    label: Option<String>,

    /// Back-reference handed to invalidation handlers.
    this: Weak<ComputedInner<T>>,

    /// Evaluator and setter behind the cell interface. Its subscriber list
    /// holds the value subscribers.
    source: SubscribableCell<T>,

    /// Result of the latest successful evaluation.
    cache: RefCell<Option<T>>,

    /// Staleness flag. Setting it to `true` runs `invalidated`.
    dirty: SubscribableCell<bool>,

    /// Subscriptions to everything read in the latest evaluation.
    upstream: RefCell<Upstream>,

    /// Invalidation handlers of downstream computeds.
    dependents: SubscriberList<()>,

    /// Set while the evaluator runs.
    evaluating: Cell<bool>,

    /// Number of times the evaluator has run.
    evaluations: Cell<u64>,
}

/// Resets the evaluating flag even if the evaluator panics.
struct EvaluationGuard<'a>(&'a Cell<bool>);

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + 'static,
{
    fn is_dirty(&self) -> bool {
        self.dirty.get().unwrap_or(true)
    }

    /// The cached value, evaluating first if stale.
    fn current(&self) -> Result<T> {
        if !self.is_dirty() {
            if let Some(value) = self.cache.borrow().as_ref() {
                return Ok(value.clone());
            }
        }
        self.evaluate()
    }

    fn evaluate(&self) -> Result<T> {
        if self.evaluating.replace(true) {
            panic!("computed value read itself during evaluation");
        }
        let _guard = EvaluationGuard(&self.evaluating);

        let span = debug_span!(
            "evaluate",
            computed = self.id.raw(),
            label = self.label.as_deref().unwrap_or_default()
        );
        let _enter = span.enter();

        let stale = mem::take(&mut *self.upstream.borrow_mut());
        for handle in &stale {
            handle.dispose();
        }
        drop(stale);

        let (result, dependencies) = ReactiveContext::dependents_of(|| self.source.get());
        self.evaluations.set(self.evaluations.get() + 1);

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "evaluation failed");
                return Err(err);
            }
        };

        let handler = self.invalidation_handler();
        let handles: Upstream = dependencies
            .iter()
            .map(|dependency| dependency.subscribe_invalidation(Rc::clone(&handler)))
            .collect();
        debug!(dependencies = handles.len(), "evaluated");

        *self.upstream.borrow_mut() = handles;
        *self.cache.borrow_mut() = Some(value.clone());
        self.dirty.set(false)?;

        Ok(value)
    }

    fn invalidation_handler(&self) -> Rc<dyn Fn() -> Result<()>> {
        let this = Weak::clone(&self.this);
        Rc::new(move || match this.upgrade() {
            Some(inner) => inner.dirty.set(true).map(|_| ()),
            None => Ok(()),
        })
    }

    /// Runs whenever `dirty` is set to `true`.
    fn invalidated(&self) -> Result<()> {
        trace!(computed = self.id.raw(), "invalidated");
        self.dependents.notify(&())?;

        if !self.source.subscribers().is_empty() {
            // A subscribed dependent may already have pulled a fresh value.
            let value = self.current()?;
            self.source.notify_with(&value)?;
        }
        Ok(())
    }
}

impl<T: Clone + 'static> Dependable for ComputedInner<T> {
    fn dependable_id(&self) -> DependableId {
        self.id
    }

    fn subscribe_invalidation(&self, on_change: Rc<dyn Fn() -> Result<()>>) -> Box<dyn Disposable> {
        Box::new(self.dependents.subscribe(move |_| on_change()))
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        for handle in self.upstream.get_mut().drain(..) {
            handle.dispose();
        }
    }
}

/// A lazily recomputed, self-memoizing derived value.
///
/// # Example
///
/// ```rust
/// use reflux_core::reactive::{computed, observable};
///
/// let a = observable(2);
/// let b = observable(3);
///
/// let (a2, b2) = (a.clone(), b.clone());
/// let sum = computed(move || a2.get() + b2.get());
/// assert_eq!(sum.get(), 5);
///
/// a.set(5).unwrap();
/// assert_eq!(sum.get(), 8);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: Clone + 'static,
{
    /// Create a computed from an infallible evaluator.
    pub fn new<F>(evaluator: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        ComputedOptions::new(evaluator).build()
    }

    /// Create a computed from an evaluator that may fail.
    ///
    /// A failure during the initial evaluation is not reported here; the
    /// computed stays dirty and the next read retries.
    pub fn try_new<F>(evaluator: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        ComputedOptions::fallible(evaluator).build()
    }

    /// Create a settable computed.
    pub fn with_setter<F, S>(evaluator: F, setter: S) -> Self
    where
        F: Fn() -> T + 'static,
        S: Fn(T) -> Result<T> + 'static,
    {
        ComputedOptions::new(evaluator).setter(setter).build()
    }

    /// Build a computed over an existing value.
    ///
    /// Reads go through `source.try_get()` and writes through
    /// `source.try_set()`. Fails with [`ReactiveError::InvalidRole`] if
    /// `source` opens dependency frames of its own, such as another computed.
    pub fn wrap<S>(source: S) -> Result<Self>
    where
        S: Gettable<T> + Settable<T> + Tagged + 'static,
    {
        let capabilities = source.capabilities();
        if capabilities.contains(Capabilities::DEPENDER) {
            return Err(ReactiveError::InvalidRole { capabilities });
        }

        let source = Rc::new(source);
        let writer = Rc::clone(&source);
        Ok(ComputedOptions::fallible(move || source.try_get())
            .setter(move |value| writer.try_set(value))
            .build())
    }

    /// Create a computed from options.
    pub fn from_options(options: ComputedOptions<T>) -> Self {
        let ComputedOptions {
            evaluator,
            setter,
            label,
        } = options;

        let inner = Rc::new_cyclic(|this: &Weak<ComputedInner<T>>| {
            let dirty = SubscribableCell::new(true);
            let on_dirty = Weak::clone(this);
            dirty.try_subscribe(move |dirty: &bool| match on_dirty.upgrade() {
                Some(inner) if *dirty => inner.invalidated(),
                _ => Ok(()),
            });

            ComputedInner {
                id: DependableId::new(),
                label,
                this: Weak::clone(this),
                source: SubscribableCell::from_cell(ValueCell::from_accessors(
                    Some(evaluator),
                    setter,
                )),
                cache: RefCell::new(None),
                dirty,
                upstream: RefCell::new(SmallVec::new()),
                dependents: SubscriberList::new(),
                evaluating: Cell::new(false),
                evaluations: Cell::new(0),
            }
        });

        if let Err(err) = inner.current() {
            debug!(computed = inner.id.raw(), error = %err, "initial evaluation failed");
        }

        Self { inner }
    }

    /// Get the computed's unique ID.
    pub fn id(&self) -> DependableId {
        self.inner.id
    }

    /// Get the label, if one was configured.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Get the current value, re-evaluating if stale.
    ///
    /// If called within a tracking frame, this also records the computed as a
    /// dependency of that frame.
    ///
    /// # Panics
    ///
    /// Panics if the evaluator fails. Use [`Computed::try_get`] for fallible
    /// evaluators. Also panics if the evaluator reads this computed.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("computed evaluation failed: {err}"),
        }
    }

    /// Get the current value, re-evaluating if stale.
    ///
    /// On failure the computed stays dirty and the next read retries.
    pub fn try_get(&self) -> Result<T> {
        let value = self.inner.current()?;
        ReactiveContext::track_dependency(self.as_dependable());
        Ok(value)
    }

    /// Get the current value without tracking dependencies.
    ///
    /// # Panics
    ///
    /// Panics if the evaluator fails.
    pub fn get_untracked(&self) -> T {
        match self.try_get_untracked() {
            Ok(value) => value,
            Err(err) => panic!("computed evaluation failed: {err}"),
        }
    }

    /// Get the current value without tracking dependencies.
    pub fn try_get_untracked(&self) -> Result<T> {
        self.inner.current()
    }

    /// Write through the setter and notify subscribers with what it stored.
    ///
    /// Fails with [`ReactiveError::Unsettable`] if no setter was configured.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.source.set(value).map(|_| ())
    }

    /// Register a callback invoked with every new value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) + 'static,
    {
        Notifiable::subscribe(self, callback)
    }

    /// Register a fallible callback invoked with every new value.
    pub fn try_subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        self.inner.source.subscribers().subscribe(callback)
    }

    /// Notify subscribers with the current value, re-evaluating if stale.
    pub fn notify(&self) -> Result<()> {
        let value = self.inner.current()?;
        self.inner.source.notify_with(&value)
    }

    /// Get the number of value subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.source.subscriber_count()
    }

    /// Check whether the next read will re-evaluate.
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    /// Number of dependables read in the latest successful evaluation.
    pub fn dependency_count(&self) -> usize {
        self.inner.upstream.borrow().len()
    }

    /// Number of times the evaluator has run.
    pub fn evaluation_count(&self) -> u64 {
        self.inner.evaluations.get()
    }

    /// Get the computed as a type-erased dependable.
    pub fn as_dependable(&self) -> Rc<dyn Dependable> {
        self.inner.clone()
    }
}

impl<T: Clone + 'static> Gettable<T> for Computed<T> {
    fn try_get(&self) -> Result<T> {
        Computed::try_get(self)
    }
}

impl<T: Clone + 'static> Settable<T> for Computed<T> {
    fn try_set(&self, value: T) -> Result<T> {
        self.inner.source.set(value)
    }
}

impl<T: Clone + 'static> Notifiable<T> for Computed<T> {
    fn try_subscribe<F>(&self, callback: F) -> Subscription<T>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        Computed::try_subscribe(self, callback)
    }

    fn notify(&self) -> Result<()> {
        Computed::notify(self)
    }
}

impl<T> Tagged for Computed<T> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTAINER
            | Capabilities::SUBSCRIBABLE
            | Capabilities::DEPENDABLE
            | Capabilities::DEPENDENT
            | Capabilities::DEPENDER
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("dirty", &self.is_dirty())
            .field("cached", &*self.inner.cache.borrow())
            .field("dependency_count", &self.dependency_count())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a computed from an infallible evaluator.
pub fn computed<T, F>(evaluator: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(evaluator)
}

/// Create a settable computed.
pub fn computed_with_setter<T, F, S>(evaluator: F, setter: S) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
    S: Fn(T) -> Result<T> + 'static,
{
    Computed::with_setter(evaluator, setter)
}

/// Create a computed from an evaluator that may fail.
pub fn computed_try<T, F>(evaluator: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> Result<T> + 'static,
{
    Computed::try_new(evaluator)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
