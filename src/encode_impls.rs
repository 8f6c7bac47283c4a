//! `Encode` implementations for standard library types and the semantic carriers.
//!
//! Primitives and strings report a [`Shape::Primitive`] so they are boxed directly
//! without touching the container stack. Collections decompose into unkeyed containers;
//! string-keyed maps are data maps and keep their keys verbatim.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::encode::{Encode, Primitive, Shape};
use crate::engine::Encoder;
use crate::error::Result;
use crate::semantic::{Blob, Decimal, Semantic};
use crate::value::Value;

macro_rules! impl_primitive_encode {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Encode for $t {
                fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
                    encoder
                        .single_value_container()?
                        .encode_primitive(Primitive::$variant(*self))
                }

                fn shape(&self) -> Shape<'_> {
                    Shape::Primitive(Primitive::$variant(*self))
                }
            }
        )*
    };
}

impl_primitive_encode!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    f32 => F32,
    f64 => F64,
);

impl Encode for isize {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.single_value_container()?.encode_primitive(self.primitive())
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Primitive(self.primitive())
    }
}

impl Encode for usize {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.single_value_container()?.encode_primitive(self.primitive())
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Primitive(self.primitive())
    }
}

trait Widen {
    fn primitive(&self) -> Primitive<'static>;
}

impl Widen for isize {
    fn primitive(&self) -> Primitive<'static> {
        match i64::try_from(*self) {
            Ok(v) => Primitive::Isize(v),
            Err(_) => Primitive::I128(*self as i128),
        }
    }
}

impl Widen for usize {
    fn primitive(&self) -> Primitive<'static> {
        match u64::try_from(*self) {
            Ok(v) => Primitive::Usize(v),
            Err(_) => Primitive::U128(*self as u128),
        }
    }
}

impl Encode for str {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.single_value_container()?.encode_str(self)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Primitive(Primitive::Str(self))
    }
}

impl Encode for String {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        self.as_str().encode(encoder)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Primitive(Primitive::Str(self))
    }
}

impl Encode for Cow<'_, str> {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        str::encode(self, encoder)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Primitive(Primitive::Str(self))
    }
}

impl Encode for char {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        let mut buf = [0u8; 4];
        encoder
            .single_value_container()?
            .encode_str(self.encode_utf8(&mut buf))
    }
}

impl Encode for () {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.single_value_container()?.encode_nil()
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Primitive(Primitive::Nil)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        match self {
            Some(value) => value.encode(encoder),
            None => encoder.single_value_container()?.encode_nil(),
        }
    }

    fn shape(&self) -> Shape<'_> {
        match self {
            Some(value) => value.shape(),
            None => Shape::Primitive(Primitive::Nil),
        }
    }
}

macro_rules! impl_delegate_encode {
    ($($ptr:ident),*) => {
        $(
            impl<T: Encode + ?Sized> Encode for $ptr<T> {
                fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
                    (**self).encode(encoder)
                }

                fn shape(&self) -> Shape<'_> {
                    (**self).shape()
                }
            }
        )*
    };
}

impl_delegate_encode!(Box, Rc, Arc);

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        (**self).encode(encoder)
    }

    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }
}

impl<T: Encode + ?Sized> Encode for &mut T {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        (**self).encode(encoder)
    }

    fn shape(&self) -> Shape<'_> {
        (**self).shape()
    }
}

fn encode_items<'a, T, I>(encoder: &mut Encoder<'_, '_>, items: I) -> Result<()>
where
    T: Encode + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut container = encoder.unkeyed_container()?;
    for item in items {
        container.encode(item)?;
    }
    Ok(())
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encode_items(encoder, self)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encode_items(encoder, self)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encode_items(encoder, self)
    }
}

impl<T: Encode> Encode for VecDeque<T> {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encode_items(encoder, self)
    }
}

impl<T: Encode> Encode for BTreeSet<T> {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encode_items(encoder, self)
    }
}

impl<K: AsRef<str>, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.encode_data_map(self.iter().map(|(k, v)| (k.as_ref(), v as &dyn Encode)))
    }

    fn shape(&self) -> Shape<'_> {
        Shape::DataMap(self.iter().map(|(k, v)| (k.as_ref(), v as &dyn Encode)).collect())
    }
}

// Entries are written in key order, not iteration order.
impl<K: AsRef<str>, V: Encode, S: BuildHasher> Encode for HashMap<K, V, S> {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.encode_data_map(sorted_entries(self))
    }

    fn shape(&self) -> Shape<'_> {
        Shape::DataMap(sorted_entries(self))
    }
}

fn sorted_entries<K: AsRef<str>, V: Encode, S>(map: &HashMap<K, V, S>) -> Vec<(&str, &dyn Encode)> {
    let mut entries: Vec<(&str, &dyn Encode)> =
        map.iter().map(|(k, v)| (k.as_ref(), v as &dyn Encode)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

impl Encode for Value {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.single_value_container()?.encode_tree(self.clone())
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Value(self)
    }
}

impl Encode for DateTime<Utc> {
    /// Seconds since the Unix epoch as a double.
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        let seconds = self.timestamp() as f64 + f64::from(self.timestamp_subsec_nanos()) / 1e9;
        encoder.single_value_container()?.encode_f64(seconds)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Semantic(Semantic::DateTime(self))
    }
}

impl Encode for Blob {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encode_items(encoder, &self.0)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Semantic(Semantic::Data(&self.0))
    }
}

impl Encode for Decimal {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.single_value_container()?.encode_str(self.as_str())
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Semantic(Semantic::Decimal(self))
    }
}

impl Encode for Uuid {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        let mut buf = Uuid::encode_buffer();
        let text = self.hyphenated().encode_lower(&mut buf);
        encoder.single_value_container()?.encode_str(text)
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Semantic(Semantic::Uuid(self))
    }
}

impl Encode for Url {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.single_value_container()?.encode_str(self.as_str())
    }

    fn shape(&self) -> Shape<'_> {
        Shape::Semantic(Semantic::Url(self))
    }
}
