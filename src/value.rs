//! The format-neutral value tree.
//!
//! A [`Value`] is what the encoding engine produces and what every codec writer consumes.
//! Once a subtree has been rolled up it is never mutated again, only consumed.
//!
//! # Example
//!
//! ```
//! use treecode::{Mapping, Value};
//!
//! let mut mapping = Mapping::new();
//! mapping.insert("b", Value::from(1));
//! mapping.insert("a", Value::from("x"));
//! mapping.insert("b", Value::from(2)); // replaced in place
//!
//! let keys: Vec<_> = mapping.keys().filter_map(Value::as_str).collect();
//! assert_eq!(keys, ["b", "a"]);
//! assert_eq!(mapping.get("b"), Some(&Value::from(2)));
//! ```

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

/// Presentation hint for string scalars (used by text formats that support styles).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarStyle {
    /// Let the writer decide.
    #[default]
    Any,
    /// Unquoted.
    Plain,
    /// `'single'` quoted.
    SingleQuoted,
    /// `"double"` quoted.
    DoubleQuoted,
    /// Literal block (`|`).
    Literal,
    /// Folded block (`>`).
    Folded,
}

/// Presentation hint for sequences and mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStyle {
    /// Let the writer decide.
    #[default]
    Any,
    /// Inline (`[a, b]`, `{k: v}`).
    Flow,
    /// One entry per line.
    Block,
}

/// A string scalar with its optional presentation hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringValue {
    /// The text itself.
    pub text: String,
    /// Presentation style hint.
    pub style: ScalarStyle,
    /// Anchor name, for formats that support graph sharing.
    pub anchor: Option<String>,
}

impl StringValue {
    /// A plain string with no hints.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: ScalarStyle::Any,
            anchor: None,
        }
    }

    /// Sets the presentation style.
    #[must_use]
    pub fn with_style(mut self, style: ScalarStyle) -> Self {
        self.style = style;
        self
    }

    /// Sets the anchor name.
    #[must_use]
    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }
}

/// An ordered list of values.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    /// Elements in insertion order.
    pub items: Vec<Value>,
    /// Presentation style hint.
    pub style: CollectionStyle,
}

impl Sequence {
    /// Creates a sequence with the default style.
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            style: CollectionStyle::Any,
        }
    }

    /// Sets the presentation style.
    #[must_use]
    pub fn with_style(mut self, style: CollectionStyle) -> Self {
        self.style = style;
        self
    }
}

/// An ordered key → value mapping. Keys are unique; inserting an existing key replaces
/// its value in place without changing the entry order.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: IndexMap<Value, Value>,
    /// Presentation style hint.
    pub style: CollectionStyle,
}

impl Mapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mapping with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            style: CollectionStyle::Any,
        }
    }

    /// Builds a mapping from string-keyed entries, such as the contents of a finished
    /// keyed container.
    pub fn from_string_entries(entries: Vec<(String, Value)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (Value::from(k), v))
                .collect(),
            style: CollectionStyle::Any,
        }
    }

    /// Inserts `value` under `key`, returning the previous value if the key existed.
    pub fn insert(&mut self, key: impl Into<Value>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Looks up a string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Value::from(key))
    }

    /// Looks up an arbitrary key.
    pub fn get_value(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter()
    }

    /// Iterates over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.keys()
    }

    /// Iterates over values in order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    /// Consumes the mapping, returning its entries.
    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries.into_iter().collect()
    }

    /// Reorders the entries by key using `compare`. The sort is stable.
    pub fn sort_keys_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.entries.sort_by(|a, _, b, _| compare(a, b));
    }

    /// Sets the presentation style.
    #[must_use]
    pub fn with_style(mut self, style: CollectionStyle) -> Self {
        self.style = style;
        self
    }
}

impl FromIterator<(Value, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            style: CollectionStyle::Any,
        }
    }
}

impl IntoIterator for Mapping {
    type Item = (Value, Value);
    type IntoIter = indexmap::map::IntoIter<Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// An immutable, format-neutral tree node.
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar. Wide enough for every native signed and unsigned width.
    Integer(i128),
    /// IEEE double.
    Float(f64),
    /// String scalar with presentation hints.
    String(StringValue),
    /// Opaque byte payload, for codecs with a native byte-string type.
    Bytes(Vec<u8>),
    /// Ordered sequence.
    Sequence(Sequence),
    /// Ordered mapping.
    Mapping(Mapping),
    /// Back-reference to a previously anchored node.
    Alias(String),
}

impl Value {
    /// An empty mapping.
    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// An empty sequence.
    pub fn empty_sequence() -> Self {
        Self::Sequence(Sequence::default())
    }

    /// Builds a sequence from its items.
    pub fn sequence(items: Vec<Value>) -> Self {
        Self::Sequence(Sequence::new(items))
    }

    /// Name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
            Self::Alias(_) => "alias",
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float, if this is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(&s.text),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a byte payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the sequence items, if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(s) => Some(&s.items),
            _ => None,
        }
    }

    /// Returns the mapping, if this is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) => 2,
            Self::Float(_) => 3,
            Self::String(_) => 4,
            Self::Bytes(_) => 5,
            Self::Sequence(_) => 6,
            Self::Mapping(_) => 7,
            Self::Alias(_) => 8,
        }
    }
}

// Structural ordering: variant rank first, then contents. Floats use `total_cmp`, so two
// floats compare equal exactly when their bit patterns match; mapping order participates.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Sequence(a), Self::Sequence(b)) => {
                a.items.cmp(&b.items).then(a.style.cmp(&b.style))
            }
            (Self::Mapping(a), Self::Mapping(b)) => {
                a.entries
                    .iter()
                    .cmp(b.entries.iter())
                    .then(a.style.cmp(&b.style))
            }
            (Self::Alias(a), Self::Alias(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

// Consistent with `Ord`: floats hash their bit pattern, mappings hash their entries in order.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::Sequence(s) => {
                s.items.hash(state);
                s.style.hash(state);
            }
            Self::Mapping(m) => {
                m.len().hash(state);
                for (k, v) in m.iter() {
                    k.hash(state);
                    v.hash(state);
                }
                m.style.hash(state);
            }
            Self::Alias(name) => name.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Self::Integer(i128::from(i))
                }
            }
        )*
    }
}

impl_from_integer!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(StringValue::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(StringValue::new(s))
    }
}

impl From<StringValue> for Value {
    fn from(s: StringValue) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(Sequence::new(items))
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Self::Sequence(s)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

/// Serializes the tree through any serde data format. Aliases are written as `*name`
/// strings; style hints and anchors are dropped.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => {
                if let Ok(v) = i64::try_from(*i) {
                    serializer.serialize_i64(v)
                } else if let Ok(v) = u64::try_from(*i) {
                    serializer.serialize_u64(v)
                } else {
                    serializer.serialize_i128(*i)
                }
            }
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(&s.text),
            Self::Bytes(b) => serializer.serialize_bytes(b),
            Self::Sequence(s) => {
                let mut seq = serializer.serialize_seq(Some(s.items.len()))?;
                for item in &s.items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Alias(name) => serializer.serialize_str(&format!("*{name}")),
        }
    }
}
