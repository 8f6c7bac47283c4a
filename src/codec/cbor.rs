//! Compact binary codec (a subset of CBOR, RFC 8949).
//!
//! Only definite-length items are written. Integers use the shortest head; floats use the
//! narrowest width that represents the value exactly. Deterministic mode orders map keys
//! by their encoded bytes, shorter keys first.

use std::cmp::Ordering;
use std::io::Write;

use chrono::SecondsFormat;

use crate::api::encode_tree;
use crate::encode::Encode;
use crate::error::{EncodeError, Result};
use crate::options::EncodeOptions;
use crate::semantic::{Semantic, SemanticKind};
use crate::transform::{BoxContext, Transform};
use crate::value::{Mapping, Value};

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

const FALSE: u8 = 0xF4;
const TRUE: u8 = 0xF5;
const NULL: u8 = 0xF6;
const FLOAT32: u8 = 0xFA;
const FLOAT64: u8 = 0xFB;

/// Boxing rules for the binary format.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborTransform {
    deterministic: bool,
}

impl CborTransform {
    /// Transform that keeps keyed containers in insertion order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables canonical map key ordering.
    #[must_use]
    pub fn deterministic(mut self, enabled: bool) -> Self {
        self.deterministic = enabled;
        self
    }

    /// Returns true if map keys are sorted canonically.
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }
}

impl Transform for CborTransform {
    fn box_nil(&self, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::Null)
    }

    fn box_bool(&self, value: bool, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::Bool(value))
    }

    fn box_i64(&self, value: i64, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::Integer(i128::from(value)))
    }

    fn box_u64(&self, value: u64, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::Integer(i128::from(value)))
    }

    fn box_f64(&self, value: f64, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::Float(value))
    }

    fn box_str(&self, value: &str, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::from(value))
    }

    fn box_i128(&self, value: i128, cx: &BoxContext<'_>) -> Result<Value> {
        if in_range(value) {
            Ok(Value::Integer(value))
        } else {
            Err(cx.invalid_value(format!("{value} is outside the CBOR integer range")))
        }
    }

    fn box_u128(&self, value: u128, cx: &BoxContext<'_>) -> Result<Value> {
        match u64::try_from(value) {
            Ok(v) => Ok(Value::Integer(i128::from(v))),
            Err(_) => Err(cx.invalid_value(format!("{value} is outside the CBOR integer range"))),
        }
    }

    fn intercepts(&self, _kind: SemanticKind) -> bool {
        true
    }

    fn box_semantic(&self, value: &Semantic<'_>, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(match value {
            Semantic::DateTime(at) => Value::from(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Semantic::Data(bytes) => Value::Bytes(bytes.to_vec()),
            Semantic::Decimal(decimal) => Value::from(decimal.as_str()),
            Semantic::Uuid(id) => Value::Bytes(id.as_bytes().to_vec()),
            Semantic::Url(url) => Value::from(url.as_str()),
        })
    }

    fn keyed_to_value(&self, entries: Vec<(String, Value)>, _cx: &BoxContext<'_>) -> Result<Value> {
        let mut mapping = Mapping::from_string_entries(entries);
        if self.deterministic {
            mapping.sort_keys_by(canonical_key_order);
        }
        Ok(Value::Mapping(mapping))
    }
}

fn in_range(value: i128) -> bool {
    let limit = i128::from(u64::MAX);
    (-limit - 1..=limit).contains(&value)
}

/// Orders keys by encoded length, then by encoded bytes.
fn canonical_key_order(a: &Value, b: &Value) -> Ordering {
    let (mut left, mut right) = (Vec::new(), Vec::new());
    match (write_value(a, &mut left), write_value(b, &mut right)) {
        (Ok(()), Ok(())) => left.len().cmp(&right.len()).then_with(|| left.cmp(&right)),
        _ => a.cmp(b),
    }
}

fn write_head(major: u8, n: u64, out: &mut Vec<u8>) {
    let major = major << 5;
    if n < 24 {
        out.push(major | n as u8);
    } else if let Ok(n) = u8::try_from(n) {
        out.extend_from_slice(&[major | 24, n]);
    } else if let Ok(n) = u16::try_from(n) {
        out.push(major | 25);
        out.extend_from_slice(&n.to_be_bytes());
    } else if let Ok(n) = u32::try_from(n) {
        out.push(major | 26);
        out.extend_from_slice(&n.to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&n.to_be_bytes());
    }
}

fn write_len(major: u8, len: usize, out: &mut Vec<u8>) {
    // usize always fits in u64 on supported targets
    write_head(major, len as u64, out);
}

fn write_float(value: f64, out: &mut Vec<u8>) {
    let narrow = value as f32;
    if value.is_nan() || f64::from(narrow) == value {
        out.push(FLOAT32);
        out.extend_from_slice(&narrow.to_be_bytes());
    } else {
        out.push(FLOAT64);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Appends the binary encoding of `value` to `out`.
///
/// # Errors
/// Fails with [`EncodeError::Codec`] for aliases and for integers outside
/// `-2^64 ..= 2^64 - 1`.
///
/// ```
/// use treecode::Value;
/// use treecode::codec::cbor::write_value;
///
/// let mut out = Vec::new();
/// write_value(&Value::Integer(-1000), &mut out)?;
/// assert_eq!(out, [0x39, 0x03, 0xE7]);
/// # Ok::<(), treecode::EncodeError>(())
/// ```
pub fn write_value(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => out.push(NULL),
        Value::Bool(b) => out.push(if *b { TRUE } else { FALSE }),
        Value::Integer(n) => {
            let (major, magnitude) = if *n >= 0 {
                (MAJOR_UNSIGNED, u64::try_from(*n))
            } else {
                (MAJOR_NEGATIVE, u64::try_from(-1 - *n))
            };
            let magnitude = magnitude
                .map_err(|_| EncodeError::Codec(format!("integer {n} is outside the CBOR range")))?;
            write_head(major, magnitude, out);
        }
        Value::Float(f) => write_float(*f, out),
        Value::String(s) => {
            write_len(MAJOR_TEXT, s.text.len(), out);
            out.extend_from_slice(s.text.as_bytes());
        }
        Value::Bytes(bytes) => {
            write_len(MAJOR_BYTES, bytes.len(), out);
            out.extend_from_slice(bytes);
        }
        Value::Sequence(seq) => {
            write_len(MAJOR_ARRAY, seq.items.len(), out);
            for item in &seq.items {
                write_value(item, out)?;
            }
        }
        Value::Mapping(map) => {
            write_len(MAJOR_MAP, map.len(), out);
            for (k, v) in map.iter() {
                write_value(k, out)?;
                write_value(v, out)?;
            }
        }
        Value::Alias(name) => {
            return Err(EncodeError::Codec(format!(
                "alias *{name} cannot be represented in CBOR"
            )));
        }
    }
    Ok(())
}

/// Binary front-end: encodes a value and writes the resulting tree as bytes.
///
/// ```
/// use treecode::codec::cbor::CborEncoder;
///
/// let bytes = CborEncoder::new().to_vec(&vec![1u8, 2])?;
/// assert_eq!(bytes, [0x82, 0x01, 0x02]);
/// # Ok::<(), treecode::EncodeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CborEncoder {
    transform: CborTransform,
    options: EncodeOptions,
}

impl CborEncoder {
    /// Encoder with insertion-ordered maps and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables canonical map key ordering.
    #[must_use]
    pub fn deterministic(mut self, enabled: bool) -> Self {
        self.transform = self.transform.deterministic(enabled);
        self
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Encodes `value` into the intermediate tree without writing bytes.
    pub fn encode_tree<V: Encode + ?Sized>(&self, value: &V) -> Result<Value> {
        encode_tree(value, &self.transform, &self.options)
    }

    /// Encodes `value` to bytes.
    pub fn to_vec<V: Encode + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        let tree = self.encode_tree(value)?;
        let mut out = Vec::new();
        write_value(&tree, &mut out)?;
        Ok(out)
    }

    /// Encodes `value` and writes the bytes to `writer`.
    pub fn to_writer<W: Write, V: Encode + ?Sized>(&self, mut writer: W, value: &V) -> Result<()> {
        let bytes = self.to_vec(value)?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

/// Encodes `value` to bytes with default settings.
pub fn to_vec<V: Encode + ?Sized>(value: &V) -> Result<Vec<u8>> {
    CborEncoder::new().to_vec(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        assert!(write_value(value, &mut out).is_ok());
        out
    }

    #[test]
    fn shortest_heads() {
        assert_eq!(bytes(&Value::Integer(23)), [0x17]);
        assert_eq!(bytes(&Value::Integer(24)), [0x18, 0x18]);
        assert_eq!(bytes(&Value::Integer(256)), [0x19, 0x01, 0x00]);
        assert_eq!(bytes(&Value::Integer(-1)), [0x20]);
        assert_eq!(bytes(&Value::empty_sequence()), [0x80]);
        assert_eq!(bytes(&Value::empty_mapping()), [0xA0]);
    }

    #[test]
    fn integer_range_is_enforced() {
        let max = i128::from(u64::MAX);
        assert!(write_value(&Value::Integer(max), &mut Vec::new()).is_ok());
        assert!(write_value(&Value::Integer(-max - 1), &mut Vec::new()).is_ok());
        assert!(write_value(&Value::Integer(max + 1), &mut Vec::new()).is_err());
        assert!(write_value(&Value::Integer(-max - 2), &mut Vec::new()).is_err());
    }

    #[test]
    fn floats_use_narrowest_exact_width() {
        assert_eq!(bytes(&Value::Float(1.5)), [0xFA, 0x3F, 0xC0, 0x00, 0x00]);
        assert_eq!(bytes(&Value::Float(0.1))[0], 0xFB);
    }

    #[test]
    fn canonical_order_is_length_first() {
        let mut keys = vec![Value::from("bb"), Value::from("a"), Value::from("ab")];
        keys.sort_by(canonical_key_order);
        let texts: Vec<_> = keys.iter().filter_map(Value::as_str).collect();
        assert_eq!(texts, ["a", "ab", "bb"]);
    }
}
