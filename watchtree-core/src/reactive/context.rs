//! Reactive Context
//!
//! The reactive context tracks which subscriber is currently evaluating.
//! When an observed slot is read, its dependency asks the context for the
//! current subscriber and links itself to it.
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering an evaluation pushes the
//! subscriber; finishing it pops, restoring the outer reader. This supports
//! nested evaluation (a render that reads a computed value which is itself
//! being evaluated).
//!
//! An entry may be `None`, meaning "no active reader". Pushing `None`
//! suspends tracking for reads that must not register dependencies.
//!
//! [`ReactiveContext`] is the guarded form of push/pop: the pop happens in
//! `Drop`, so it runs on every exit path including unwinding.

use std::cell::RefCell;
use std::sync::Arc;

use super::{Subscriber, SubscriberId};

type Target = Option<Arc<dyn Subscriber>>;

thread_local! {
    static TARGET_STACK: RefCell<Vec<Target>> = const { RefCell::new(Vec::new()) };
}

/// Push `target` and make it the current reader.
///
/// Prefer [`ReactiveContext::enter`], which pairs the pop automatically.
pub fn push_target(target: Target) {
    TARGET_STACK.with(|stack| stack.borrow_mut().push(target));
}

/// Pop the current reader, restoring the previous one.
pub fn pop_target() -> Target {
    TARGET_STACK.with(|stack| stack.borrow_mut().pop().flatten())
}

/// The subscriber currently evaluating, if any.
pub fn current_target() -> Target {
    TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Whether reads are currently being attributed to a subscriber.
pub fn is_tracking() -> bool {
    TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// Number of entries on the stack.
pub fn depth() -> usize {
    TARGET_STACK.with(|stack| stack.borrow().len())
}

/// Run `f` with tracking suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter(None);
    f()
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the evaluation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// The context is automatically exited when the returned guard is dropped.
    pub fn enter(target: Target) -> Self {
        let subscriber_id = target.as_ref().map(|s| s.id());
        push_target(target);
        Self { subscriber_id }
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = TARGET_STACK.with(|stack| stack.borrow_mut().pop());

        // Catch mismatched enter/exit pairs.
        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.as_ref().map(|s| s.id()),
                self.subscriber_id,
                "ReactiveContext mismatch"
            );
        }
    }
}
