//! Reactive arrays.
//!
//! `ReactiveArray` owns its backing vector and exposes the seven structural
//! mutators as its own methods: `push`, `pop`, `shift`, `unshift`,
//! `splice`, `sort` and `reverse`. Each performs the native operation and
//! returns what the native operation returns. When the array is observed,
//! the mutator then observes any newly inserted items and notifies the
//! array observer's dependency once.
//!
//! Indexed writes through [`ReactiveArray::set_index`] and length changes
//! through [`ReactiveArray::set_length`] are raw and do not notify; use
//! [`set`](super::set) and [`del`](super::del) for observable index writes.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::Observer;
use crate::value::Value;

/// The intercepted operations, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayOp {
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
    Sort,
    Reverse,
}

struct ArrayInner {
    items: RwLock<Vec<Value>>,
    /// Hidden observer marker.
    observer: Mutex<Option<Arc<Observer>>>,
    extensible: AtomicBool,
}

/// A shared handle to an array.
#[derive(Clone)]
pub struct ReactiveArray {
    inner: Arc<ArrayInner>,
}

impl ReactiveArray {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(ArrayInner {
                items: RwLock::new(items),
                observer: Mutex::new(None),
                extensible: AtomicBool::new(true),
            }),
        }
    }

    /// Run a native mutation, then observe inserted items and notify.
    ///
    /// `mutate` returns the operation's result and the inserted items.
    fn intercept<R>(&self, op: ArrayOp, mutate: impl FnOnce(&mut Vec<Value>) -> (R, Vec<Value>)) -> R {
        let (result, inserted) = {
            let mut items = self.inner.items.write();
            mutate(&mut items)
        };

        if let Some(observer) = self.observer() {
            if !inserted.is_empty() {
                Observer::observe_items(&inserted);
            }
            tracing::trace!(?op, inserted = inserted.len(), "array mutated");
            observer.dep().notify();
        }
        result
    }

    /// Append one item. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        self.push_all([value.into()])
    }

    /// Append several items in order. Returns the new length.
    pub fn push_all(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let values: Vec<Value> = values.into_iter().collect();
        self.intercept(ArrayOp::Push, |items| {
            items.extend(values.iter().cloned());
            (items.len(), values)
        })
    }

    /// Remove the last item, or return `Undefined` when empty.
    pub fn pop(&self) -> Value {
        self.intercept(ArrayOp::Pop, |items| (items.pop().unwrap_or_default(), Vec::new()))
    }

    /// Remove the first item, or return `Undefined` when empty.
    pub fn shift(&self) -> Value {
        self.intercept(ArrayOp::Shift, |items| {
            let first = if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            };
            (first, Vec::new())
        })
    }

    /// Insert one item at the front. Returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        self.unshift_all([value.into()])
    }

    /// Insert several items at the front, keeping their order.
    pub fn unshift_all(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let values: Vec<Value> = values.into_iter().collect();
        self.intercept(ArrayOp::Unshift, |items| {
            items.splice(0..0, values.iter().cloned());
            (items.len(), values)
        })
    }

    /// Remove `delete_count` items starting at `start` and insert `values`
    /// in their place. Returns the removed items.
    ///
    /// A negative `start` counts from the end. Both bounds are clamped to
    /// the array; `None` deletes through the end.
    pub fn splice(&self, start: isize, delete_count: Option<usize>, values: Vec<Value>) -> Vec<Value> {
        self.intercept(ArrayOp::Splice, |items| {
            let len = items.len();
            let start = if start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                (start as usize).min(len)
            };
            let end = match delete_count {
                Some(count) => start + count.min(len - start),
                None => len,
            };
            let removed = items.splice(start..end, values.iter().cloned()).collect();
            (removed, values)
        })
    }

    /// Sort in place by string form, with `Undefined` last.
    pub fn sort(&self) -> &Self {
        let (defined, undefined) = self.partition_undefined();
        // Keys are rendered before sorting; rendering may read this array.
        let keyed: Vec<(String, Value)> = defined
            .into_iter()
            .map(|value| (value.to_display_string(), value))
            .collect();
        let sorted = merge_sort(keyed, &mut |a: &(String, Value), b: &(String, Value)| {
            a.0.cmp(&b.0)
        });
        self.write_sorted(sorted.into_iter().map(|(_, value)| value), undefined)
    }

    /// Sort in place with a comparator. `Undefined` items always sort last
    /// and are never passed to `compare`. The sort is stable.
    ///
    /// `compare` runs without any lock held and may read the array. An
    /// inconsistent comparator yields an unspecified order, never a panic.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> CmpOrdering) -> &Self {
        let (defined, undefined) = self.partition_undefined();
        let sorted = merge_sort(defined, &mut compare);
        self.write_sorted(sorted, undefined)
    }

    fn partition_undefined(&self) -> (Vec<Value>, usize) {
        let (undefined, defined): (Vec<Value>, Vec<Value>) = self
            .to_vec()
            .into_iter()
            .partition(|value| matches!(value, Value::Undefined));
        (defined, undefined.len())
    }

    fn write_sorted(&self, sorted: impl IntoIterator<Item = Value>, undefined: usize) -> &Self {
        let mut sorted: Vec<Value> = sorted.into_iter().collect();
        sorted.resize(sorted.len() + undefined, Value::Undefined);
        self.intercept(ArrayOp::Sort, move |items| {
            *items = sorted;
            ((), Vec::new())
        });
        self
    }

    /// Reverse in place.
    pub fn reverse(&self) -> &Self {
        self.intercept(ArrayOp::Reverse, |items| {
            items.reverse();
            ((), Vec::new())
        });
        self
    }

    // ------------------------------------------------------------------------
    // Indexed access
    // ------------------------------------------------------------------------

    /// Item at `index`, or `Undefined` past the end.
    pub fn get(&self, index: usize) -> Value {
        self.inner.items.read().get(index).cloned().unwrap_or_default()
    }

    /// Raw indexed write; grows the array with `Undefined` as needed.
    /// Does not notify.
    ///
    /// Returns false, leaving the array untouched, when the storage for
    /// the grown array cannot be reserved.
    pub fn set_index(&self, index: usize, value: Value) -> bool {
        let mut items = self.inner.items.write();
        if index >= items.len() {
            let Some(len) = index.checked_add(1) else {
                return false;
            };
            if !grow(&mut items, len) {
                return false;
            }
        }
        items[index] = value;
        true
    }

    /// Raw length change, truncating or padding with `Undefined`.
    /// Does not notify.
    ///
    /// Returns false, leaving the array untouched, when the storage for
    /// `len` items cannot be reserved.
    pub fn set_length(&self, len: usize) -> bool {
        let mut items = self.inner.items.write();
        if len > items.len() {
            grow(&mut items, len)
        } else {
            items.truncate(len);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.read().clone()
    }

    pub fn prevent_extensions(&self) {
        self.inner.extensible.store(false, Ordering::Relaxed);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.load(Ordering::Relaxed)
    }

    /// The observer recorded in the hidden marker.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        self.inner.observer.lock().clone()
    }

    pub(crate) fn set_observer(&self, observer: Arc<Observer>) {
        *self.inner.observer.lock() = Some(observer);
    }

    pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

/// Pad `items` with `Undefined` up to `len`.
fn grow(items: &mut Vec<Value>, len: usize) -> bool {
    if items.try_reserve(len - items.len()).is_err() {
        return false;
    }
    items.resize(len, Value::Undefined);
    true
}

/// Stable top-down merge sort.
///
/// Each merge step only asks whether the right item is strictly less than
/// the left one, so any comparator terminates and keeps every item.
fn merge_sort<T, F>(mut items: Vec<T>, compare: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> CmpOrdering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l) == CmpOrdering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged
}

impl Default for ReactiveArray {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Value> for ReactiveArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl fmt::Debug for ReactiveArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveArray")
            .field("len", &self.len())
            .field("observed", &self.observer().is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
