//! Active Target Stack
//!
//! The target stack tracks which subscriber is currently collecting
//! dependencies. When a slot is read, the subscriber on top of the stack is
//! the one that gets to depend on it.
//!
//! # Implementation
//!
//! The stack is owned by a [`Runtime`] rather than living in a global. When
//! a computation starts evaluating it pushes itself; when it finishes it
//! pops, restoring whichever computation was running before. This supports
//! nested evaluation (e.g., a watcher whose getter reads a computed value
//! that has to re-evaluate first).
//!
//! A `None` entry suspends tracking without ending the outer evaluation.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use super::runtime::Runtime;
use super::subscriber::Subscriber;

/// Stack of active targets. The current target is the top entry.
#[derive(Default)]
pub(crate) struct TargetStack {
    entries: RefCell<Vec<Option<Rc<dyn Subscriber>>>>,
}

impl TargetStack {
    pub(crate) fn push(&self, target: Option<Rc<dyn Subscriber>>) {
        trace!(subscriber = ?target.as_ref().map(|t| t.id()), "push target");
        self.entries.borrow_mut().push(target);
    }

    pub(crate) fn pop(&self) -> Option<Rc<dyn Subscriber>> {
        let popped = self.entries.borrow_mut().pop().flatten();
        trace!(subscriber = ?popped.as_ref().map(|t| t.id()), "pop target");
        popped
    }

    pub(crate) fn current(&self) -> Option<Rc<dyn Subscriber>> {
        self.entries.borrow().last().cloned().flatten()
    }

    pub(crate) fn depth(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Guard that pops the target when dropped.
///
/// This ensures the stack is properly maintained even if the evaluation
/// returns early with an error or panics.
pub struct TargetGuard {
    runtime: Runtime,
    depth: usize,
}

impl TargetGuard {
    pub(crate) fn new(runtime: Runtime, target: Option<Rc<dyn Subscriber>>) -> Self {
        runtime.push_target(target);
        let depth = runtime.target_depth();
        Self { runtime, depth }
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        // Verify we're popping our own entry.
        // This helps catch unbalanced push/pop pairs.
        debug_assert_eq!(
            self.runtime.target_depth(),
            self.depth,
            "TargetGuard mismatch: stack depth changed under the guard"
        );
        self.runtime.pop_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::probe::Probe;
    use crate::reactive::SubscriberId;

    fn current_id(runtime: &Runtime) -> Option<SubscriberId> {
        runtime.target().map(|t| t.id())
    }

    #[test]
    fn guard_tracks_subscriber() {
        let runtime = Runtime::default();
        let probe = Probe::new();

        assert!(!runtime.is_tracking());
        assert!(runtime.target().is_none());

        {
            let _guard = runtime.enter(probe.clone());
            assert!(runtime.is_tracking());
            assert_eq!(current_id(&runtime), Some(probe.id()));
        }

        // Target should be cleaned up after drop
        assert!(!runtime.is_tracking());
        assert_eq!(runtime.target_depth(), 0);
    }

    #[test]
    fn nested_guards_restore_outer_target() {
        let runtime = Runtime::default();
        let outer = Probe::new();
        let inner = Probe::new();

        {
            let _outer = runtime.enter(outer.clone());
            assert_eq!(current_id(&runtime), Some(outer.id()));

            {
                let _inner = runtime.enter(inner.clone());
                assert_eq!(current_id(&runtime), Some(inner.id()));
            }

            // After inner guard drops, outer should be current
            assert_eq!(current_id(&runtime), Some(outer.id()));
        }

        assert!(runtime.target().is_none());
    }

    #[test]
    fn none_entry_suspends_tracking() {
        let runtime = Runtime::default();
        let outer = Probe::new();

        let _outer = runtime.enter(outer.clone());
        runtime.push_target(None);
        assert!(runtime.target().is_none());
        runtime.pop_target();
        assert_eq!(current_id(&runtime), Some(outer.id()));
    }

    #[test]
    fn guard_pops_when_evaluation_panics() {
        let runtime = Runtime::default();
        let probe = Probe::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = runtime.enter(probe.clone());
            panic!("evaluation failed");
        }));

        assert!(result.is_err());
        assert_eq!(runtime.target_depth(), 0);
    }
}
