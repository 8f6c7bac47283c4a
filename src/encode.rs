//! Defines the [`Encode`] trait: how a type describes itself to the encoding engine.
//!
//! This is the counterpart of `serde::Serialize` for the value-tree engine. Instead of
//! writing bytes, an implementation requests containers from the [`Encoder`] and writes
//! its fields into them; the engine folds the result into a [`Value`].
//!
//! # Example
//!
//! ```
//! use treecode::{Encode, Encoder, Result};
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Encode for Point {
//!     fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
//!         let mut container = encoder.keyed_container()?;
//!         container.encode("x", &self.x)?;
//!         container.encode("y", &self.y)
//!     }
//! }
//! ```

use crate::engine::Encoder;
use crate::error::Result;
use crate::semantic::Semantic;
use crate::value::Value;

/// A primitive leaf, boxed by the active transform without any container traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive<'a> {
    /// Explicit null.
    Nil,
    /// `bool`
    Bool(bool),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `i128`
    I128(i128),
    /// `isize`, widened to 64 bits.
    Isize(i64),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `u128`
    U128(u128),
    /// `usize`, widened to 64 bits.
    Usize(u64),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// UTF-8 text.
    Str(&'a str),
}

/// How the engine should treat a value before falling back to [`Encode::encode`].
pub enum Shape<'a> {
    /// Ordinary composite: decomposed field by field through `encode`.
    Structured,
    /// A primitive leaf.
    Primitive(Primitive<'a>),
    /// Already a tree node; returned verbatim.
    Value(&'a Value),
    /// A semantic type the transform may intercept.
    Semantic(Semantic<'a>),
    /// A map whose keys are data rather than schema field names. Keys are written
    /// verbatim, bypassing the key strategy.
    DataMap(Vec<(&'a str, &'a dyn Encode)>),
}

/// A type that can be encoded into a value tree.
///
/// Implement [`encode`](Encode::encode) by requesting exactly one container (keyed,
/// unkeyed, or single value) from the encoder and writing into it. Requesting a second
/// container at the same position is a container invariant violation.
///
/// Most types only need `encode`; `shape` lets leaves and special types skip the
/// container machinery.
pub trait Encode {
    /// Writes `self` through `encoder`.
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()>;

    /// Describes how the engine should box this value.
    fn shape(&self) -> Shape<'_> {
        Shape::Structured
    }
}
