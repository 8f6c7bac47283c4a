//! The value-transformer contract.
//!
//! A [`Transform`] is the only format-specific piece of an encode: it turns primitives
//! into [`Value`] leaves and folds finished containers into tree nodes. The engine never
//! looks inside the values a transform produces.

use crate::encode::{Encode, Primitive};
use crate::engine::Encoder;
use crate::error::{EncodeError, Result};
use crate::options::EncodeOptions;
use crate::path::CodingPath;
use crate::semantic::{Semantic, SemanticKind};
use crate::value::{Mapping, Value};

/// Where a boxing call happens and under which options.
#[derive(Debug, Clone, Copy)]
pub struct BoxContext<'a> {
    path: &'a CodingPath,
    options: &'a EncodeOptions,
}

impl<'a> BoxContext<'a> {
    /// Creates a context for a boxing call at `path`.
    pub fn new(path: &'a CodingPath, options: &'a EncodeOptions) -> Self {
        Self { path, options }
    }

    /// Path of the value being boxed.
    pub fn path(&self) -> &'a CodingPath {
        self.path
    }

    /// Options of the running encode call.
    pub fn options(&self) -> &'a EncodeOptions {
        self.options
    }

    /// Builds an invalid-value error located at this context's path.
    pub fn invalid_value(&self, reason: impl Into<String>) -> EncodeError {
        EncodeError::invalid_value(self.path, reason)
    }
}

/// Format-specific boxing rules.
///
/// The six required methods cover the primitive leaves every format must support. The
/// remaining methods have structural defaults that a codec overrides when its format
/// needs something different: narrow integers widen, semantic types are decomposed
/// through their `Encode` impl, and containers fold into [`Value::Mapping`] and
/// [`Value::Sequence`].
///
/// Transforms are shared across threads by [`TreeEncoder::encode_many`](crate::TreeEncoder),
/// hence the `Send + Sync` bound.
pub trait Transform: Send + Sync {
    /// Boxes an explicit null.
    fn box_nil(&self, cx: &BoxContext<'_>) -> Result<Value>;

    /// Boxes a boolean.
    fn box_bool(&self, value: bool, cx: &BoxContext<'_>) -> Result<Value>;

    /// Boxes a signed integer.
    fn box_i64(&self, value: i64, cx: &BoxContext<'_>) -> Result<Value>;

    /// Boxes an unsigned integer.
    fn box_u64(&self, value: u64, cx: &BoxContext<'_>) -> Result<Value>;

    /// Boxes a double.
    fn box_f64(&self, value: f64, cx: &BoxContext<'_>) -> Result<Value>;

    /// Boxes text.
    fn box_str(&self, value: &str, cx: &BoxContext<'_>) -> Result<Value>;

    /// Boxes an `i8`. Defaults to [`box_i64`](Transform::box_i64).
    fn box_i8(&self, value: i8, cx: &BoxContext<'_>) -> Result<Value> {
        self.box_i64(i64::from(value), cx)
    }

    /// Boxes an `i16`. Defaults to [`box_i64`](Transform::box_i64).
    fn box_i16(&self, value: i16, cx: &BoxContext<'_>) -> Result<Value> {
        self.box_i64(i64::from(value), cx)
    }

    /// Boxes an `i32`. Defaults to [`box_i64`](Transform::box_i64).
    fn box_i32(&self, value: i32, cx: &BoxContext<'_>) -> Result<Value> {
        self.box_i64(i64::from(value), cx)
    }

    /// Boxes an `i128`. The default narrows to 64 bits and rejects values that do not fit.
    fn box_i128(&self, value: i128, cx: &BoxContext<'_>) -> Result<Value> {
        if let Ok(v) = i64::try_from(value) {
            return self.box_i64(v, cx);
        }
        if let Ok(v) = u64::try_from(value) {
            return self.box_u64(v, cx);
        }
        Err(cx.invalid_value(format!("{value} does not fit in a 64-bit integer")))
    }

    /// Boxes a `u8`. Defaults to [`box_u64`](Transform::box_u64).
    fn box_u8(&self, value: u8, cx: &BoxContext<'_>) -> Result<Value> {
        self.box_u64(u64::from(value), cx)
    }

    /// Boxes a `u16`. Defaults to [`box_u64`](Transform::box_u64).
    fn box_u16(&self, value: u16, cx: &BoxContext<'_>) -> Result<Value> {
        self.box_u64(u64::from(value), cx)
    }

    /// Boxes a `u32`. Defaults to [`box_u64`](Transform::box_u64).
    fn box_u32(&self, value: u32, cx: &BoxContext<'_>) -> Result<Value> {
        self.box_u64(u64::from(value), cx)
    }

    /// Boxes a `u128`. The default narrows to 64 bits and rejects values that do not fit.
    fn box_u128(&self, value: u128, cx: &BoxContext<'_>) -> Result<Value> {
        match u64::try_from(value) {
            Ok(v) => self.box_u64(v, cx),
            Err(_) => Err(cx.invalid_value(format!("{value} does not fit in a 64-bit integer"))),
        }
    }

    /// Boxes an `f32`. Defaults to [`box_f64`](Transform::box_f64).
    fn box_f32(&self, value: f32, cx: &BoxContext<'_>) -> Result<Value> {
        self.box_f64(f64::from(value), cx)
    }

    /// Returns true if values of `kind` go through [`box_semantic`](Transform::box_semantic)
    /// instead of their structural encoding.
    fn intercepts(&self, kind: SemanticKind) -> bool {
        let _ = kind;
        false
    }

    /// Boxes an intercepted semantic value.
    fn box_semantic(&self, value: &Semantic<'_>, cx: &BoxContext<'_>) -> Result<Value> {
        Err(EncodeError::unsupported(
            cx.path(),
            format!("{} values are not boxed by this transform", value.kind()),
        ))
    }

    /// Boxes a composite value. The default decomposes it through its `Encode` impl;
    /// `Ok(None)` means the value wrote nothing.
    fn box_composite(
        &self,
        value: &dyn Encode,
        encoder: &mut Encoder<'_, '_>,
    ) -> Result<Option<Value>> {
        encoder.decompose(value)
    }

    /// Folds the entries of a finished, non-empty keyed container. Entries arrive in
    /// first-insertion order with unique keys.
    fn keyed_to_value(&self, entries: Vec<(String, Value)>, cx: &BoxContext<'_>) -> Result<Value> {
        let _ = cx;
        Ok(Value::Mapping(Mapping::from_string_entries(entries)))
    }

    /// Folds the items of a finished, non-empty unkeyed container.
    fn unkeyed_to_value(&self, items: Vec<Value>, cx: &BoxContext<'_>) -> Result<Value> {
        let _ = cx;
        Ok(Value::sequence(items))
    }

    /// The value of a keyed container with no entries. Also used for positions whose
    /// value wrote nothing at all.
    fn empty_keyed(&self) -> Value {
        Value::empty_mapping()
    }

    /// The value of an unkeyed container with no items.
    fn empty_unkeyed(&self) -> Value {
        Value::empty_sequence()
    }
}

/// Dispatches a primitive to the matching boxing method.
pub(crate) fn box_primitive(
    transform: &dyn Transform,
    primitive: Primitive<'_>,
    cx: &BoxContext<'_>,
) -> Result<Value> {
    match primitive {
        Primitive::Nil => transform.box_nil(cx),
        Primitive::Bool(v) => transform.box_bool(v, cx),
        Primitive::I8(v) => transform.box_i8(v, cx),
        Primitive::I16(v) => transform.box_i16(v, cx),
        Primitive::I32(v) => transform.box_i32(v, cx),
        Primitive::I64(v) | Primitive::Isize(v) => transform.box_i64(v, cx),
        Primitive::I128(v) => transform.box_i128(v, cx),
        Primitive::U8(v) => transform.box_u8(v, cx),
        Primitive::U16(v) => transform.box_u16(v, cx),
        Primitive::U32(v) => transform.box_u32(v, cx),
        Primitive::U64(v) | Primitive::Usize(v) => transform.box_u64(v, cx),
        Primitive::U128(v) => transform.box_u128(v, cx),
        Primitive::F32(v) => transform.box_f32(v, cx),
        Primitive::F64(v) => transform.box_f64(v, cx),
        Primitive::Str(v) => transform.box_str(v, cx),
    }
}

/// Boxes everything into the generic tree with no format rules: integers keep their full
/// range, floats are stored as-is, and semantic types fall back to their structural
/// encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTransform;

impl Transform for NativeTransform {
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

    fn box_i128(&self, value: i128, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::Integer(value))
    }

    fn box_u128(&self, value: u128, cx: &BoxContext<'_>) -> Result<Value> {
        i128::try_from(value)
            .map(Value::Integer)
            .map_err(|_| cx.invalid_value(format!("{value} does not fit in a 128-bit signed integer")))
    }
}
