//! Dynamic Values
//!
//! `Value` is the data held by observed containers. Scalars are stored
//! inline; objects and arrays are shared handles, so cloning a `Value`
//! never copies a container and two clones always refer to the same
//! underlying data.
//!
//! # Equality
//!
//! The engine compares values with strict equality: numbers by IEEE `==`,
//! strings by content, containers by identity. `PartialEq` for `Value`
//! follows the same rule, which means `Value::Number(f64::NAN)` is not
//! equal to itself.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::observer::{Observer, ReactiveArray, ReactiveObject};

/// A value that may live inside an observed container.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Object(ReactiveObject),
    Array(ReactiveArray),
    /// A host value that is not plain data. Never observed.
    Opaque(OpaqueValue),
}

impl Value {
    /// Shorthand for a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Name of the value's category, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Opaque(_) => "opaque",
        }
    }

    /// True for objects and arrays.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ReactiveArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The observer attached to this container, if it has been observed.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        match self {
            Value::Object(object) => object.observer(),
            Value::Array(array) => array.observer(),
            _ => None,
        }
    }

    /// Address of the underlying container, used for identity sets.
    pub(crate) fn container_addr(&self) -> Option<usize> {
        match self {
            Value::Object(object) => Some(object.addr()),
            Value::Array(array) => Some(array.addr()),
            _ => None,
        }
    }

    /// Strict equality.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Whether writing `other` over `self` is a no-op: strict equality,
    /// plus NaN over NaN.
    pub fn same_value_for_write(&self, other: &Value) -> bool {
        self.strict_eq(other) || (self.is_nan() && other.is_nan())
    }

    /// String conversion used by the default array sort order.
    pub fn to_display_string(&self) -> String {
        let mut seen = HashSet::new();
        display_string(self, &mut seen)
    }
}

fn display_string(value: &Value, seen: &mut HashSet<usize>) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => s.to_string(),
        Value::Object(_) | Value::Opaque(_) => "[object Object]".to_string(),
        Value::Array(array) => {
            // Cyclic arrays render their back-reference as empty.
            if !seen.insert(array.addr()) {
                return String::new();
            }
            let joined = array
                .to_vec()
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => display_string(other, seen),
                })
                .collect::<Vec<_>>()
                .join(",");
            seen.remove(&array.addr());
            joined
        }
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        String::from(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<ReactiveObject> for Value {
    fn from(object: ReactiveObject) -> Self {
        Value::Object(object)
    }
}

impl From<ReactiveArray> for Value {
    fn from(array: ReactiveArray) -> Self {
        Value::Array(array)
    }
}

impl From<OpaqueValue> for Value {
    fn from(opaque: OpaqueValue) -> Self {
        Value::Opaque(opaque)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Builds plain, unobserved data from a JSON document.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(ReactiveObject::from_entries(
                map.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}

// ----------------------------------------------------------------------------
// Opaque host values
// ----------------------------------------------------------------------------

/// A shared handle to a non-plain host value.
#[derive(Clone)]
pub struct OpaqueValue(Arc<dyn Any + Send + Sync>);

impl OpaqueValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn ptr_eq(&self, other: &OpaqueValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpaqueValue(..)")
    }
}

// ----------------------------------------------------------------------------
// Property keys
// ----------------------------------------------------------------------------

/// Largest valid array index, `2^32 - 2`.
pub const MAX_ARRAY_INDEX: u64 = 4_294_967_294;

/// A property key: an array index or a named key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    Index(usize),
    Name(Arc<str>),
}

impl PropKey {
    /// The key as a valid array index.
    ///
    /// Names qualify when they parse to a finite, non-negative integer,
    /// so `"2"` and `"2.0"` both yield `Some(2)`. Indices above
    /// [`MAX_ARRAY_INDEX`] are not array indices.
    pub fn as_index(&self) -> Option<usize> {
        let index = match self {
            PropKey::Index(index) => *index as f64,
            PropKey::Name(name) => name.trim().parse().ok()?,
        };
        let in_range = index >= 0.0 && index <= MAX_ARRAY_INDEX as f64;
        if index.is_finite() && in_range && index == index.floor() {
            Some(index as usize)
        } else {
            None
        }
    }

    /// The key as an object property name.
    pub fn to_name(&self) -> Arc<str> {
        match self {
            PropKey::Index(index) => index.to_string().into(),
            PropKey::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Index(index) => write!(f, "{index}"),
            PropKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        PropKey::Name(name.into())
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        PropKey::Name(name.into())
    }
}

impl From<Arc<str>> for PropKey {
    fn from(name: Arc<str>) -> Self {
        PropKey::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_rules() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::from(0.0), Value::from(-0.0));
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
        assert_ne!(Value::Null, Value::Undefined);
        assert_eq!(Value::from("a"), Value::string("a"));

        let a = ReactiveObject::new();
        let b = ReactiveObject::new();
        assert_eq!(Value::from(a.clone()), Value::from(a));
        assert_ne!(Value::from(b), Value::from(ReactiveObject::new()));
    }

    #[test]
    fn nan_over_nan_is_a_noop_write() {
        let nan = Value::from(f64::NAN);
        assert!(nan.same_value_for_write(&Value::from(f64::NAN)));
        assert!(!nan.same_value_for_write(&Value::from(1)));
    }

    #[test]
    fn index_keys() {
        assert_eq!(PropKey::from(3usize).as_index(), Some(3));
        assert_eq!(PropKey::from("2").as_index(), Some(2));
        assert_eq!(PropKey::from("2.0").as_index(), Some(2));
        assert_eq!(PropKey::from("-1").as_index(), None);
        assert_eq!(PropKey::from("1.5").as_index(), None);
        assert_eq!(PropKey::from("name").as_index(), None);
        assert_eq!(PropKey::from("4294967294").as_index(), Some(4_294_967_294));
        assert_eq!(PropKey::from("4294967295").as_index(), None);
        assert_eq!(PropKey::from("18446744073709551615").as_index(), None);
        assert_eq!(PropKey::from(usize::MAX).as_index(), None);
        assert_eq!(&*PropKey::from(7).to_name(), "7");
    }

    #[test]
    fn display_strings_follow_number_formatting() {
        assert_eq!(Value::from(10).to_display_string(), "10");
        assert_eq!(Value::from(-0.0).to_display_string(), "0");
        assert_eq!(Value::from(1.5).to_display_string(), "1.5");
        assert_eq!(Value::from(f64::NAN).to_display_string(), "NaN");

        let nested: ReactiveArray = vec![Value::from(1), Value::Null, Value::from("x")]
            .into_iter()
            .collect();
        assert_eq!(Value::from(nested).to_display_string(), "1,,x");
    }

    #[test]
    fn json_builds_plain_data() {
        let value = Value::from(serde_json::json!({ "a": 1, "list": [true, null] }));
        let object = value.as_object().unwrap();
        assert!(object.observer().is_none());
        assert_eq!(object.get("a"), Value::from(1));
        assert_eq!(object.get("list").as_array().unwrap().len(), 2);
    }

    #[test]
    fn opaque_values_compare_by_identity() {
        let a = OpaqueValue::new(5u8);
        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a.clone()), Value::from(OpaqueValue::new(5u8)));
        assert_eq!(a.downcast_ref::<u8>(), Some(&5));
    }
}
