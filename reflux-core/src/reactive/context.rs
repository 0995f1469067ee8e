//! Reactive Context
//!
//! The reactive context records which dependable values are read while a
//! computation runs. When a dependable value is read and a frame is active,
//! the value registers itself with the innermost frame.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a context pushes an empty
//! frame and returns a guard; finishing (or dropping) the guard pops it, so
//! the stack stays balanced even when the computation fails or panics.
//!
//! Frames nest. Only the innermost frame receives registrations, and what an
//! inner frame collected is not copied into the outer one when it pops. A
//! computed value read inside an outer computation registers *itself* in the
//! outer frame once its own `get` returns, which is how chains form.
//!
//! The stack is confined to one thread. Values read on another thread are
//! tracked by that thread's stack only.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::traits::{Dependable, DependableId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One dependency-collection frame.
struct Frame {
    /// Dependables read while this frame was on top, in first-read order.
    dependencies: IndexMap<DependableId, Rc<dyn Dependable>>,
    /// Untracked frames swallow registrations.
    untracked: bool,
}

/// Guard for an entered frame.
///
/// Call [`ReactiveContext::finish`] to pop the frame and take what it
/// collected. Dropping the guard pops the frame and discards it.
pub struct ReactiveContext {
    depth: usize,
    finished: bool,
}

impl ReactiveContext {
    /// Push a new tracking frame.
    pub fn enter() -> Self {
        Self::push(false)
    }

    /// Push a frame that records nothing.
    ///
    /// Reads inside it do not register with any outer frame either.
    pub fn enter_untracked() -> Self {
        Self::push(true)
    }

    fn push(untracked: bool) -> Self {
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(Frame {
                dependencies: IndexMap::new(),
                untracked,
            });
            stack.len()
        });
        trace!(depth, untracked, "entered dependency frame");

        Self {
            depth,
            finished: false,
        }
    }

    /// Pop this frame and return the deduplicated dependables it collected.
    pub fn finish(mut self) -> Vec<Rc<dyn Dependable>> {
        self.finished = true;
        self.pop()
            .map(|frame| frame.dependencies.into_values().collect())
            .unwrap_or_default()
    }

    fn pop(&self) -> Option<Frame> {
        let popped = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext mismatch: expected depth {}, got {}",
                self.depth,
                stack.len()
            );
            stack.pop()
        });
        trace!(depth = self.depth, "left dependency frame");
        popped
    }

    /// Check if reads are currently being recorded.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| !frame.untracked)
                .unwrap_or(false)
        })
    }

    /// Number of frames on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Record a read of `item` in the innermost frame, if any.
    ///
    /// Registering the same value twice in one frame keeps a single entry at
    /// the position of the first read.
    pub fn track_dependency(item: Rc<dyn Dependable>) {
        let id = item.dependable_id();
        let recorded = CONTEXT_STACK.with(|stack| match stack.borrow_mut().last_mut() {
            Some(frame) if !frame.untracked => {
                frame.dependencies.entry(id).or_insert(item);
                true
            }
            _ => false,
        });
        if recorded {
            trace!(dependable = id.raw(), "dependency recorded");
        }
    }

    /// Run `callback` in a fresh frame and return its result together with
    /// every dependable it read.
    pub fn dependents_of<R>(callback: impl FnOnce() -> R) -> (R, Vec<Rc<dyn Dependable>>) {
        let ctx = Self::enter();
        let result = callback();
        let dependencies = ctx.finish();
        (result, dependencies)
    }

    /// Run `callback` without recording any reads.
    pub fn untracked<R>(callback: impl FnOnce() -> R) -> R {
        let _ctx = Self::enter_untracked();
        callback()
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        if !self.finished {
            // Dropped outside the borrow so a dependable's own Drop can run freely.
            drop(self.pop());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::error::Result;
    use crate::reactive::subscriber::Disposable;

    struct Probe {
        id: DependableId,
    }

    struct Noop;

    impl Disposable for Noop {
        fn dispose(&self) {}

        fn is_disposed(&self) -> bool {
            false
        }
    }

    impl Dependable for Probe {
        fn dependable_id(&self) -> DependableId {
            self.id
        }

        fn subscribe_invalidation(&self, _: Rc<dyn Fn() -> Result<()>>) -> Box<dyn Disposable> {
            Box::new(Noop)
        }
    }

    fn probe() -> Rc<dyn Dependable> {
        Rc::new(Probe {
            id: DependableId::new(),
        })
    }

    fn ids(deps: &[Rc<dyn Dependable>]) -> Vec<DependableId> {
        deps.iter().map(|d| d.dependable_id()).collect()
    }

    #[test]
    fn context_tracks_frames() {
        assert!(!ReactiveContext::is_active());
        assert_eq!(ReactiveContext::depth(), 0);

        {
            let _ctx = ReactiveContext::enter();
            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::depth(), 1);
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn reads_outside_a_frame_are_ignored() {
        ReactiveContext::track_dependency(probe());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn frame_collects_deduplicated_dependencies_in_order() {
        let (a, b, c) = (probe(), probe(), probe());

        let ctx = ReactiveContext::enter();
        ReactiveContext::track_dependency(a.clone());
        ReactiveContext::track_dependency(b.clone());
        ReactiveContext::track_dependency(a.clone());
        ReactiveContext::track_dependency(c.clone());
        let deps = ctx.finish();

        assert_eq!(
            ids(&deps),
            vec![a.dependable_id(), b.dependable_id(), c.dependable_id()]
        );
    }

    #[test]
    fn nested_frames_do_not_leak_into_outer() {
        let (outer_dep, inner_dep) = (probe(), probe());

        let (inner_deps, outer_deps) = {
            let outer = ReactiveContext::enter();
            ReactiveContext::track_dependency(outer_dep.clone());

            let (_, inner_deps) = ReactiveContext::dependents_of(|| {
                ReactiveContext::track_dependency(inner_dep.clone());
            });

            (inner_deps, outer.finish())
        };

        assert_eq!(ids(&inner_deps), vec![inner_dep.dependable_id()]);
        assert_eq!(ids(&outer_deps), vec![outer_dep.dependable_id()]);
    }

    #[test]
    fn untracked_frame_swallows_reads() {
        let dep = probe();

        let (_, deps) = ReactiveContext::dependents_of(|| {
            ReactiveContext::untracked(|| {
                assert!(!ReactiveContext::is_active());
                ReactiveContext::track_dependency(dep.clone());
            });
        });

        assert!(deps.is_empty());
    }

    #[test]
    fn frame_is_popped_when_callback_panics() {
        let result = std::panic::catch_unwind(|| {
            ReactiveContext::dependents_of(|| panic!("evaluator failed"));
        });

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), 0);
    }
}
