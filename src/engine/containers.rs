//! Container handles returned by [`Encoder`](super::Encoder).
//!
//! A handle borrows the encoder mutably, so nothing else can write at its position while
//! it is alive. Nested scopes are closure-scoped: the closure populates the scope and the
//! parent slot is resolved before the call returns, or the error is surfaced.

use super::encoder::{Encoder, Engine};
use super::referencing::run_scope;
use super::storage::{Reservation, Slot};
use crate::encode::{Encode, Primitive};
use crate::error::Result;
use crate::path::{CodingPath, PathSegment, SUPER_KEY};
use crate::value::Value;

/// A keyed container: a record with named fields.
pub struct KeyedContainer<'e, 't> {
    engine: &'e mut Engine<'t>,
    index: usize,
}

impl<'e, 't> KeyedContainer<'e, 't> {
    pub(crate) fn new(engine: &'e mut Engine<'t>, index: usize) -> Self {
        Self { engine, index }
    }

    /// Path of the container.
    pub fn coding_path(&self) -> &CodingPath {
        self.engine.path()
    }

    /// Number of distinct keys written so far.
    pub fn len(&self) -> usize {
        self.engine.stack.keyed(self.index).map_or(0, |store| store.len())
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encodes `value` under `key`. The key strategy is applied to `key`; writing the
    /// same key again replaces the value but keeps its original position.
    pub fn encode<V: Encode + ?Sized>(&mut self, key: &str, value: &V) -> Result<()> {
        let stored = self.engine.convert_key(key);
        self.write(stored, key, &value)
    }

    /// Encodes `value` under `key` verbatim, bypassing the key strategy. Used for data
    /// maps whose keys are content rather than field names.
    pub fn encode_entry<V: Encode + ?Sized>(&mut self, key: &str, value: &V) -> Result<()> {
        self.write(key.to_owned(), key, &value)
    }

    /// Encodes an explicit null under `key`.
    pub fn encode_nil(&mut self, key: &str) -> Result<()> {
        self.encode(key, &())
    }

    /// Encodes the value if present; writes nothing for `None`.
    pub fn encode_if_present<V: Encode>(&mut self, key: &str, value: &Option<V>) -> Result<()> {
        match value {
            Some(v) => self.encode(key, v),
            None => Ok(()),
        }
    }

    fn write(&mut self, stored: String, key: &str, value: &dyn Encode) -> Result<()> {
        let boxed = self
            .engine
            .with_segment(PathSegment::key(key), |engine| engine.box_value(value))?;
        let boxed = boxed.unwrap_or_else(|| self.engine.transform().empty_keyed());
        self.engine
            .keyed_store(self.index)?
            .insert(stored, Slot::Leaf(boxed));
        Ok(())
    }

    /// Opens a keyed container under `key` and populates it with `f`.
    pub fn nested_keyed_container<F>(&mut self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut KeyedContainer<'_, 't>) -> Result<()>,
    {
        self.nested_scope(key, |encoder| f(&mut encoder.keyed_container()?))
    }

    /// Opens an unkeyed container under `key` and populates it with `f`.
    pub fn nested_unkeyed_container<F>(&mut self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut UnkeyedContainer<'_, 't>) -> Result<()>,
    {
        self.nested_scope(key, |encoder| f(&mut encoder.unkeyed_container()?))
    }

    /// Hands a fresh encoder to `f` whose result is stored under the key `"super"`.
    /// Used to encode a base type's fields in their own scope.
    pub fn super_encoder<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
    {
        self.super_encoder_for_key(SUPER_KEY, f)
    }

    /// Like [`super_encoder`](Self::super_encoder) with an explicit key.
    pub fn super_encoder_for_key<F>(&mut self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
    {
        self.nested_scope(key, f)
    }

    fn nested_scope<F>(&mut self, key: &str, populate: F) -> Result<()>
    where
        F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
    {
        let stored = self.engine.convert_key(key);
        self.engine.keyed_store(self.index)?.reserve(stored.clone());
        run_scope(
            self.engine,
            self.index,
            PathSegment::key(key),
            Reservation::Key(stored),
            populate,
        )
    }
}

/// An unkeyed container: an ordered list of values.
pub struct UnkeyedContainer<'e, 't> {
    engine: &'e mut Engine<'t>,
    index: usize,
}

impl<'e, 't> UnkeyedContainer<'e, 't> {
    pub(crate) fn new(engine: &'e mut Engine<'t>, index: usize) -> Self {
        Self { engine, index }
    }

    /// Path of the container.
    pub fn coding_path(&self) -> &CodingPath {
        self.engine.path()
    }

    /// Number of items appended so far, reservations included.
    pub fn count(&self) -> usize {
        self.engine.stack.unkeyed(self.index).map_or(0, |store| store.len())
    }

    /// Appends `value`.
    pub fn encode<V: Encode + ?Sized>(&mut self, value: &V) -> Result<()> {
        let position = self.count();
        let value: &dyn Encode = &value;
        let boxed = self
            .engine
            .with_segment(PathSegment::Index(position), |engine| engine.box_value(value))?;
        let boxed = boxed.unwrap_or_else(|| self.engine.transform().empty_keyed());
        self.engine.unkeyed_store(self.index)?.push(Slot::Leaf(boxed));
        Ok(())
    }

    /// Appends an explicit null.
    pub fn encode_nil(&mut self) -> Result<()> {
        self.encode(&())
    }

    /// Appends every item of `items`.
    pub fn encode_all<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Encode,
    {
        for item in items {
            self.encode(&item)?;
        }
        Ok(())
    }

    /// Appends a keyed container populated by `f`.
    pub fn nested_keyed_container<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut KeyedContainer<'_, 't>) -> Result<()>,
    {
        self.nested_scope(|encoder| f(&mut encoder.keyed_container()?))
    }

    /// Appends an unkeyed container populated by `f`.
    pub fn nested_unkeyed_container<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut UnkeyedContainer<'_, 't>) -> Result<()>,
    {
        self.nested_scope(|encoder| f(&mut encoder.unkeyed_container()?))
    }

    /// Appends the result of encoding through a fresh encoder handed to `f`.
    pub fn super_encoder<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
    {
        self.nested_scope(f)
    }

    fn nested_scope<F>(&mut self, populate: F) -> Result<()>
    where
        F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
    {
        let at = self.engine.unkeyed_store(self.index)?.reserve();
        run_scope(
            self.engine,
            self.index,
            PathSegment::Index(at),
            Reservation::Index(at),
            populate,
        )
    }
}

/// A container holding exactly one value.
pub struct SingleValueContainer<'e, 't> {
    engine: &'e mut Engine<'t>,
}

impl<'e, 't> SingleValueContainer<'e, 't> {
    pub(crate) fn new(engine: &'e mut Engine<'t>) -> Self {
        Self { engine }
    }

    /// Path of the value.
    pub fn coding_path(&self) -> &CodingPath {
        self.engine.path()
    }

    /// Encodes an explicit null.
    pub fn encode_nil(&mut self) -> Result<()> {
        self.encode_primitive(Primitive::Nil)
    }

    /// Encodes a boolean.
    pub fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.encode_primitive(Primitive::Bool(value))
    }

    /// Encodes a signed integer.
    pub fn encode_i64(&mut self, value: i64) -> Result<()> {
        self.encode_primitive(Primitive::I64(value))
    }

    /// Encodes an unsigned integer.
    pub fn encode_u64(&mut self, value: u64) -> Result<()> {
        self.encode_primitive(Primitive::U64(value))
    }

    /// Encodes a double.
    pub fn encode_f64(&mut self, value: f64) -> Result<()> {
        self.encode_primitive(Primitive::F64(value))
    }

    /// Encodes text.
    pub fn encode_str(&mut self, value: &str) -> Result<()> {
        self.encode_primitive(Primitive::Str(value))
    }

    /// Boxes `primitive` with the active transform and stores it.
    pub fn encode_primitive(&mut self, primitive: Primitive<'_>) -> Result<()> {
        self.engine.ensure_can_encode_new_value("single value")?;
        let value = self.engine.box_primitive(primitive)?;
        self.engine.stack.push_leaf(value);
        Ok(())
    }

    /// Encodes any value at this position.
    pub fn encode<V: Encode + ?Sized>(&mut self, value: &V) -> Result<()> {
        self.engine.ensure_can_encode_new_value("single value")?;
        let boxed = self.engine.box_value(&value)?;
        let boxed = boxed.unwrap_or_else(|| self.engine.transform().empty_keyed());
        self.engine.stack.push_leaf(boxed);
        Ok(())
    }

    /// Stores an already-built tree node as is.
    pub fn encode_tree(&mut self, value: Value) -> Result<()> {
        self.engine.ensure_can_encode_new_value("single value")?;
        self.engine.stack.push_leaf(value);
        Ok(())
    }
}
