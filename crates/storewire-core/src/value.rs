#![forbid(unsafe_code)]

//! Dynamic state values with persistent containers.
//!
//! [`Value`] is the bundled state model for stores whose shape is decided at
//! runtime (form state keyed by field name). Arrays and objects are backed by
//! `im` persistent collections, so cloning a value is O(1) and mutating a
//! clone copies only the touched path. Every other subtree stays shared with
//! the original, which is what makes a cloned snapshot a cheap draft.
//!
//! # Invariants
//!
//! 1. Cloning never deep-copies: `a.clone()` shares every container with `a`.
//! 2. Mutating a clone never changes the original.
//! 3. After a mutation through a path, siblings of every touched container are
//!    still `ptr_eq` to the corresponding containers of the original.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | Path names an absent field | `get_path` returns `None` |
//! | Scalar parent | Path descends through a scalar | `set_path` returns `PathError::NotAContainer` |
//! | Bad index | Non-numeric or out-of-range array segment | `PathError::InvalidIndex` / `IndexOutOfRange` |

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use im::{OrdMap, Vector};

use crate::path::{FieldPath, PathError, parse_index};

/// A dynamically typed state value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / explicitly empty.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A point in time, stored in UTC.
    Date(DateTime<Utc>),
    Array(Vector<Value>),
    Object(OrdMap<String, Value>),
}

impl Value {
    /// An empty object.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(OrdMap::new())
    }

    /// An empty array.
    #[must_use]
    pub fn array() -> Self {
        Self::Array(Vector::new())
    }

    /// Build an object from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Type name used in diagnostics and by the codec tags.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> Option<&Vector<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&OrdMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Truthiness as used for checkbox state: `Null`, `false`, `0`, `NaN` and
    /// `""` are false, everything else is true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Date(_) | Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Number of children for containers, `0` for scalars.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            Self::Object(map) => map.len(),
            _ => 0,
        }
    }

    /// Whether a container has no children (scalars are empty).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both values are containers sharing the same storage.
    ///
    /// This is the identity check used to observe structural sharing; two
    /// equal scalars are never "the same". Very small arrays are stored inline
    /// by `im` and also report `false`.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Look up a direct child by key (objects) or index (arrays).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(key),
            Self::Array(items) => parse_index(key).ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Mutable lookup of a direct child. Copies the touched chunk on write.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Self::Object(map) => map.get_mut(key),
            Self::Array(items) => parse_index(key).ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
    }

    /// Assign a direct child, returning the previous value if any.
    ///
    /// On arrays, `key` must be an index `<= len`; `len` appends.
    pub fn insert(
        &mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, PathError> {
        let value = value.into();
        match self {
            Self::Object(map) => Ok(map.insert(key.to_owned(), value)),
            Self::Array(items) => {
                let index = parse_index(key)?;
                let len = items.len();
                if index < len {
                    Ok(Some(items.set(index, value)))
                } else if index == len {
                    items.push_back(value);
                    Ok(None)
                } else {
                    Err(PathError::IndexOutOfRange { index, len })
                }
            }
            other => Err(PathError::NotAContainer {
                segment: key.to_owned(),
                found: other.type_name(),
            }),
        }
    }

    /// Remove a direct child.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self {
            Self::Object(map) => map.remove(key),
            Self::Array(items) => {
                let index = parse_index(key).ok()?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }

    /// Append to an array.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), PathError> {
        match self {
            Self::Array(items) => {
                items.push_back(value.into());
                Ok(())
            }
            other => Err(PathError::NotAContainer {
                segment: "push".to_owned(),
                found: other.type_name(),
            }),
        }
    }

    /// Walk `path` and return the value it names.
    #[must_use]
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// Mutable variant of [`get_path`](Self::get_path).
    pub fn get_path_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let mut node = self;
        for segment in path.segments() {
            node = node.get_mut(segment)?;
        }
        Some(node)
    }

    /// Assign the value named by `path`.
    ///
    /// Missing intermediate keys are created as empty objects, and a `Null`
    /// intermediate is replaced by an object. Descending through any other
    /// scalar fails without modifying `self` beyond the already-created
    /// intermediates of this call.
    pub fn set_path(&mut self, path: &FieldPath, value: impl Into<Value>) -> Result<(), PathError> {
        let (parents, leaf) = path.split_leaf();
        let mut node = self;
        for segment in parents {
            if node.is_null() {
                *node = Value::object();
            }
            if node.get(segment).is_none() {
                node.insert(segment, Value::object())?;
            }
            node = match node.get_mut(segment) {
                Some(child) => child,
                None => {
                    return Err(PathError::NotAContainer {
                        segment: segment.clone(),
                        found: "null",
                    });
                }
            };
        }
        if node.is_null() {
            *node = Value::object();
        }
        node.insert(leaf, value)?;
        Ok(())
    }

    /// Display string used when a value is shown in a text-like control.
    ///
    /// `Null` renders as the empty string, numbers use [`format_number`], dates
    /// use RFC 3339 with millisecond precision.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Render a number the way a text control expects it: integral values have no
/// fractional part, `-0` is `0`, and non-finite values are spelled out.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Object(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Vector::from(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::Array(iter.into_iter().collect())
    }
}

/// Field access by path, implemented by state types that bindings can address
/// by name.
///
/// [`Value`] implements this directly. Application state structs can
/// implement it to expose their fields to name-based bindings and patches.
pub trait Record {
    /// Read the field named by `path`.
    fn read(&self, path: &FieldPath) -> Option<Value>;

    /// Write the field named by `path`.
    fn write(&mut self, path: &FieldPath, value: Value) -> Result<(), PathError>;
}

impl Record for Value {
    fn read(&self, path: &FieldPath) -> Option<Value> {
        self.get_path(path).cloned()
    }

    fn write(&mut self, path: &FieldPath, value: Value) -> Result<(), PathError> {
        self.set_path(path, value)
    }
}
