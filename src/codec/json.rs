//! JSON codec.
//!
//! Semantic types become strings: dates as RFC 3339, binary data as standard base64.
//! Non-finite floats follow [`NonFiniteFloatStrategy`]. The finished tree is written by
//! `serde_json` through `Value`'s `Serialize` impl.

use std::io::Write;

use base64ct::{Base64, Encoding};
use chrono::SecondsFormat;

use crate::api::encode_tree;
use crate::encode::Encode;
use crate::error::{EncodeError, Result};
use crate::options::{EncodeOptions, NonFiniteFloatStrategy};
use crate::semantic::{Semantic, SemanticKind};
use crate::transform::{BoxContext, Transform};
use crate::value::{Mapping, Value};

/// Boxing rules for JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransform {
    sort_keys: bool,
}

impl JsonTransform {
    /// Transform that keeps object members in insertion order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts object members by key.
    #[must_use]
    pub fn sort_keys(mut self, enabled: bool) -> Self {
        self.sort_keys = enabled;
        self
    }
}

impl Transform for JsonTransform {
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

    fn box_f64(&self, value: f64, cx: &BoxContext<'_>) -> Result<Value> {
        if value.is_finite() {
            return Ok(Value::Float(value));
        }
        match cx.options().non_finite_floats() {
            NonFiniteFloatStrategy::Throw => {
                Err(cx.invalid_value(format!("{value} is not a valid JSON number")))
            }
            NonFiniteFloatStrategy::ConvertToString {
                positive_infinity,
                negative_infinity,
                nan,
            } => {
                let text = if value.is_nan() {
                    nan
                } else if value.is_sign_positive() {
                    positive_infinity
                } else {
                    negative_infinity
                };
                Ok(Value::from(text.as_str()))
            }
        }
    }

    fn box_str(&self, value: &str, _cx: &BoxContext<'_>) -> Result<Value> {
        Ok(Value::from(value))
    }

    fn intercepts(&self, _kind: SemanticKind) -> bool {
        true
    }

    fn box_semantic(&self, value: &Semantic<'_>, _cx: &BoxContext<'_>) -> Result<Value> {
        let text = match value {
            Semantic::DateTime(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Semantic::Data(bytes) => Base64::encode_string(bytes),
            Semantic::Decimal(decimal) => decimal.to_string(),
            Semantic::Uuid(id) => id.hyphenated().to_string(),
            Semantic::Url(url) => url.as_str().to_owned(),
        };
        Ok(Value::from(text))
    }

    fn keyed_to_value(&self, entries: Vec<(String, Value)>, _cx: &BoxContext<'_>) -> Result<Value> {
        let mut mapping = Mapping::from_string_entries(entries);
        if self.sort_keys {
            mapping.sort_keys_by(Value::cmp);
        }
        Ok(Value::Mapping(mapping))
    }
}

/// JSON front-end.
///
/// ```
/// use std::collections::BTreeMap;
/// use treecode::codec::json::JsonEncoder;
///
/// let mut scores = BTreeMap::new();
/// scores.insert("b", 2);
/// scores.insert("a", 1);
/// assert_eq!(JsonEncoder::new().to_string(&scores)?, r#"{"a":1,"b":2}"#);
/// # Ok::<(), treecode::EncodeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    transform: JsonTransform,
    options: EncodeOptions,
    pretty: bool,
}

impl JsonEncoder {
    /// Compact output, insertion-ordered members, default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables indented output.
    #[must_use]
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.pretty = enabled;
        self
    }

    /// Sorts object members by key.
    #[must_use]
    pub fn sort_keys(mut self, enabled: bool) -> Self {
        self.transform = self.transform.sort_keys(enabled);
        self
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Encodes `value` into the intermediate tree without writing text.
    pub fn encode_tree<V: Encode + ?Sized>(&self, value: &V) -> Result<Value> {
        encode_tree(value, &self.transform, &self.options)
    }

    /// Encodes `value` to a JSON string.
    pub fn to_string<V: Encode + ?Sized>(&self, value: &V) -> Result<String> {
        let tree = self.encode_tree(value)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&tree)
        } else {
            serde_json::to_string(&tree)
        };
        text.map_err(codec_error)
    }

    /// Encodes `value` to JSON bytes.
    pub fn to_vec<V: Encode + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        self.to_string(value).map(String::into_bytes)
    }

    /// Encodes `value` and writes the JSON text to `writer`.
    pub fn to_writer<W: Write, V: Encode + ?Sized>(&self, writer: W, value: &V) -> Result<()> {
        let tree = self.encode_tree(value)?;
        if self.pretty {
            serde_json::to_writer_pretty(writer, &tree).map_err(codec_error)
        } else {
            serde_json::to_writer(writer, &tree).map_err(codec_error)
        }
    }
}

fn codec_error(err: serde_json::Error) -> EncodeError {
    if err.is_io() {
        EncodeError::from(std::io::Error::other(err))
    } else {
        EncodeError::Codec(err.to_string())
    }
}

/// Encodes `value` to a compact JSON string with default settings.
pub fn to_string<V: Encode + ?Sized>(value: &V) -> Result<String> {
    JsonEncoder::new().to_string(value)
}
