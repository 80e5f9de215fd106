//! Integration Tests for the Observation Engine
//!
//! These tests drive observed data through the public API the way a
//! rendering layer would: subscribers evaluate inside a reactive context,
//! data is mutated, and notification counts are checked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use watchtree_core::reactive::{self, Dep};
use watchtree_core::{
    del, observe, set, ReactiveArray, ReactiveContext, ReactiveObject, Subscriber, SubscriberId,
    Value, Watcher,
};

/// A subscriber that counts updates and logs its ID into a shared order log.
struct Recorder {
    id: SubscriberId,
    updates: AtomicUsize,
    order: Arc<Mutex<Vec<SubscriberId>>>,
}

impl Recorder {
    fn new(order: &Arc<Mutex<Vec<SubscriberId>>>) -> Arc<Self> {
        Arc::new(Self {
            id: SubscriberId::new(),
            updates: AtomicUsize::new(0),
            order: order.clone(),
        })
    }

    fn solo() -> Arc<Self> {
        Self::new(&Arc::new(Mutex::new(Vec::new())))
    }

    fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Evaluate `f` with this recorder as the active reader.
    fn read<R>(self: &Arc<Self>, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::enter(Some(self.clone()));
        f()
    }
}

impl Subscriber for Recorder {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Arc<Self>, dep: &Dep) {
        dep.add_sub(&(self as Arc<dyn Subscriber>));
    }

    fn update(&self) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.order.lock().push(self.id);
    }
}

fn json(value: serde_json::Value) -> Value {
    Value::from(value)
}

/// Observing an already observed value yields the same observer.
#[test]
fn observe_is_idempotent() {
    let value = json(serde_json::json!({ "k": [1, 2] }));
    let first = observe(&value, false).unwrap();
    let again = observe(&value, false).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
}

/// Reading one slot many times in one evaluation yields one edge.
#[test]
fn repeated_reads_register_one_edge() {
    let value = json(serde_json::json!({ "k": 1 }));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();

    let reader = object.clone();
    let watcher = Watcher::new(move || {
        for _ in 0..5 {
            reader.get("k");
        }
        Value::Undefined
    });

    assert_eq!(object.slot_dep("k").unwrap().sub_count(), 1);
    assert_eq!(watcher.dependency_count(), 1);
}

/// Equal writes and NaN-over-NaN writes do not notify.
#[test]
fn noop_writes_do_not_notify() {
    let object = ReactiveObject::from_entries([
        ("k", Value::from("v")),
        ("nan", Value::from(f64::NAN)),
    ]);
    observe(&Value::from(object.clone()), false);

    let recorder = Recorder::solo();
    recorder.read(|| {
        object.get("k");
        object.get("nan");
    });

    object.assign("k", Value::from("v"));
    object.assign("nan", Value::from(f64::NAN));
    assert_eq!(recorder.updates(), 0);
}

/// A key added with `set` becomes reactive, and shape readers hear the add.
#[test]
fn structural_add() {
    let value = json(serde_json::json!({}));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();
    let observer = value.observer().unwrap();

    let shape = Recorder::solo();
    shape.read(|| observer.dep().depend());

    set(&value, "x", Value::from(1));
    assert_eq!(shape.updates(), 1);

    let slot_reader = Recorder::solo();
    slot_reader.read(|| object.get("x"));
    object.assign("x", Value::from(2));
    assert_eq!(slot_reader.updates(), 1);
}

/// Pushing notifies once and observes a pushed container.
#[test]
fn array_append() {
    let value = json(serde_json::json!({ "list": [] }));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();

    let recorder = Recorder::solo();
    recorder.read(|| object.get("list"));

    let list = object.get("list");
    let pushed = ReactiveObject::new();
    list.as_array().unwrap().push(pushed.clone());

    assert_eq!(recorder.updates(), 1);
    assert!(pushed.observer().is_some());
}

/// `del` on an array index splices and notifies once; absent keys do nothing.
#[test]
fn array_delete() {
    let value = json(serde_json::json!(["a", "b", "c", "d"]));
    let observer = observe(&value, false).unwrap();
    let recorder = Recorder::solo();
    recorder.read(|| observer.dep().depend());

    del(&value, 2usize);
    assert_eq!(
        value.as_array().unwrap().to_vec(),
        vec![Value::from("a"), Value::from("b"), Value::from("d")]
    );
    assert_eq!(recorder.updates(), 1);

    let object = json(serde_json::json!({ "a": 1 }));
    let object_observer = observe(&object, false).unwrap();
    let shape = Recorder::solo();
    shape.read(|| object_observer.dep().depend());
    del(&object, "absent");
    assert_eq!(shape.updates(), 0);
}

/// Earlier-created subscribers are updated first.
#[test]
fn notification_order_follows_creation() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let s1 = Recorder::new(&order);
    let s2 = Recorder::new(&order);

    let value = json(serde_json::json!({ "p": 0 }));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();

    // Subscribe the later recorder first.
    s2.read(|| object.get("p"));
    s1.read(|| object.get("p"));

    object.slot_dep("p").unwrap().notify();
    assert_eq!(*order.lock(), vec![s1.id, s2.id]);
}

/// Root data scenario: one update per distinct write.
#[test]
fn root_scenario() {
    let root = json(serde_json::json!({ "a": 1 }));
    let observer = observe(&root, true).unwrap();
    assert_eq!(observer.vm_count(), 1);
    let object = root.as_object().unwrap().clone();

    let w = Recorder::solo();
    w.read(|| object.get("a"));

    object.assign("a", Value::from(2));
    assert_eq!(w.updates(), 1);
    object.assign("a", Value::from(2));
    assert_eq!(w.updates(), 1);
}

/// Array scenario: push and sort each notify once.
#[test]
fn array_scenario() {
    let arr = json(serde_json::json!([1, 2]));
    let observer = observe(&arr, false).unwrap();
    let w = Recorder::solo();
    w.read(|| observer.dep().depend());

    let array = arr.as_array().unwrap();
    assert_eq!(array.push(3), 3);
    assert_eq!(w.updates(), 1);
    assert!(array.get(2).observer().is_none());

    array.sort();
    assert_eq!(w.updates(), 2);
}

/// A nested evaluation attributes reads to the inner reader only, and the
/// outer reader resumes afterwards.
#[test]
fn nested_evaluation_attribution() {
    let value = json(serde_json::json!({ "outer": 1, "inner": 2 }));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();

    let outer = Recorder::solo();
    let inner = Recorder::solo();
    outer.read(|| {
        inner.read(|| object.get("inner"));
        object.get("outer");
    });

    object.assign("inner", Value::from(20));
    assert_eq!(inner.updates(), 1);
    assert_eq!(outer.updates(), 0);

    object.assign("outer", Value::from(10));
    assert_eq!(outer.updates(), 1);
}

/// Suspended tracking registers nothing.
#[test]
fn untracked_reads_do_not_link() {
    let value = json(serde_json::json!({ "k": 1 }));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();

    let recorder = Recorder::solo();
    recorder.read(|| reactive::untracked(|| object.get("k")));

    object.assign("k", Value::from(2));
    assert_eq!(recorder.updates(), 0);
}

/// A watcher that writes to data it reads does not disturb the pass
/// delivering to its siblings.
#[test]
fn reentrant_writes_during_notify() {
    let value = json(serde_json::json!({ "n": 0, "echo": 0 }));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();

    let writer_view = object.clone();
    let writer = Watcher::new(move || {
        let n = writer_view.get("n");
        writer_view.assign("echo", n.clone());
        n
    });

    let reader_view = object.clone();
    let reader = Watcher::new(move || reader_view.get("echo"));

    object.assign("n", Value::from(5));
    assert_eq!(writer.value(), Value::from(5));
    assert_eq!(reader.value(), Value::from(5));
}

/// Writing a new container into a slot re-points readers at it.
#[test]
fn replaced_containers_are_tracked() {
    let value = json(serde_json::json!({ "list": [1] }));
    observe(&value, false);
    let object = value.as_object().unwrap().clone();

    let view = object.clone();
    let watcher = Watcher::new(move || {
        let list = view.get("list");
        Value::from(list.as_array().map_or(0, ReactiveArray::len) as i64)
    });

    let replacement = ReactiveArray::new();
    object.assign("list", Value::from(replacement.clone()));
    assert_eq!(watcher.value(), Value::from(0));

    replacement.push(1);
    replacement.push(2);
    assert_eq!(watcher.value(), Value::from(2));
}
