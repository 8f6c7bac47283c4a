use std::any::Any;

use tracing::error;

use super::containers::{KeyedContainer, SingleValueContainer, UnkeyedContainer};
use super::storage::{ContainerStack, KeyedStore, Reservation, Slot, UnkeyedStore};
use crate::encode::{Encode, Primitive, Shape};
use crate::error::{EncodeError, Result};
use crate::options::EncodeOptions;
use crate::path::{CodingPath, PathSegment};
use crate::transform::{self, BoxContext, Transform};
use crate::value::Value;

/// Traversal state of one encoder: its container stack and coding path.
///
/// The top-level encoder starts at the empty path. A nested scope gets its own engine
/// whose `base_depth` is the length of the path it was opened at, so the
/// one-value-per-position check works the same way at every depth.
///
/// Invariant faults and errors escaping a nested scope are latched in `aborted`. Once
/// set, every later fold fails with that error, so dropping the `Err` at the call site
/// cannot turn the call into a partial tree.
pub(crate) struct Engine<'t> {
    transform: &'t dyn Transform,
    options: &'t EncodeOptions,
    pub(crate) stack: ContainerStack,
    path: CodingPath,
    base_depth: usize,
    aborted: Option<EncodeError>,
}

impl<'t> Engine<'t> {
    pub(crate) fn new(transform: &'t dyn Transform, options: &'t EncodeOptions) -> Self {
        Self {
            transform,
            options,
            stack: ContainerStack::default(),
            path: CodingPath::new(),
            base_depth: 0,
            aborted: None,
        }
    }

    /// Engine for a nested scope opened by `parent` under `segment`.
    pub(crate) fn scoped(parent: &Engine<'t>, segment: PathSegment) -> Self {
        let path = parent.path.child(segment);
        Self {
            transform: parent.transform,
            options: parent.options,
            stack: ContainerStack::default(),
            base_depth: path.len(),
            path,
            aborted: None,
        }
    }

    pub(crate) fn transform(&self) -> &'t dyn Transform {
        self.transform
    }

    pub(crate) fn options(&self) -> &'t EncodeOptions {
        self.options
    }

    pub(crate) fn path(&self) -> &CodingPath {
        &self.path
    }

    fn context(&self) -> BoxContext<'_> {
        BoxContext::new(&self.path, self.options)
    }

    /// Latches `err` as the outcome of the whole call and hands it back. The first error
    /// latched wins.
    pub(crate) fn abort(&mut self, err: EncodeError) -> EncodeError {
        latch(&mut self.aborted, &err);
        err
    }

    /// Fails with the latched error, if any.
    pub(crate) fn check_aborted(&self) -> Result<()> {
        match &self.aborted {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// True while no value has been produced at the current position.
    pub(crate) fn can_encode_new_value(&self) -> bool {
        self.base_depth + self.stack.len() == self.path.len()
    }

    pub(crate) fn ensure_can_encode_new_value(&mut self, request: &str) -> Result<()> {
        if self.can_encode_new_value() {
            return Ok(());
        }
        error!(path = %self.path, request, "container invariant violated");
        let err = EncodeError::invariant(
            &self.path,
            format!("{request} requested after a value was already encoded at this position"),
        );
        Err(self.abort(err))
    }

    /// Runs `f` with `segment` appended to the path.
    pub(crate) fn with_segment<R>(
        &mut self,
        segment: PathSegment,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.path.push(segment);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Applies the key strategy to a field name written at the current path.
    pub(crate) fn convert_key(&self, key: &str) -> String {
        self.options.key_strategy().convert(&self.path, key)
    }

    pub(crate) fn keyed_store(&mut self, index: usize) -> Result<&mut KeyedStore> {
        let Self { stack, path, aborted, .. } = self;
        stack.keyed_mut(index).ok_or_else(|| {
            let err = EncodeError::invariant(path, "keyed container is no longer open");
            latch(aborted, &err);
            err
        })
    }

    pub(crate) fn unkeyed_store(&mut self, index: usize) -> Result<&mut UnkeyedStore> {
        let Self { stack, path, aborted, .. } = self;
        stack.unkeyed_mut(index).ok_or_else(|| {
            let err = EncodeError::invariant(path, "unkeyed container is no longer open");
            latch(aborted, &err);
            err
        })
    }

    /// Writes a nested scope's value into the slot it reserved.
    pub(crate) fn resolve(
        &mut self,
        index: usize,
        reservation: &Reservation,
        value: Value,
    ) -> Result<()> {
        if self.stack.resolve(index, reservation, value) {
            return Ok(());
        }
        error!(path = %self.path, ?reservation, "reserved slot vanished before resolution");
        let err = EncodeError::invariant(
            &self.path,
            "reserved slot was not found in its parent container",
        );
        Err(self.abort(err))
    }

    pub(crate) fn box_primitive(&self, primitive: Primitive<'_>) -> Result<Value> {
        transform::box_primitive(self.transform, primitive, &self.context())
    }

    /// Boxes `value` at the current path. `None` means the value wrote nothing.
    pub(crate) fn box_value(&mut self, value: &dyn Encode) -> Result<Option<Value>> {
        match value.shape() {
            Shape::Value(tree) => Ok(Some(tree.clone())),
            Shape::Primitive(primitive) => self.box_primitive(primitive).map(Some),
            Shape::Semantic(semantic) if self.transform.intercepts(semantic.kind()) => self
                .transform
                .box_semantic(&semantic, &self.context())
                .map(Some),
            Shape::DataMap(entries) => {
                self.sub_encode(|encoder| encoder.encode_data_map(entries))
            }
            Shape::Semantic(_) | Shape::Structured => {
                let transform = self.transform;
                transform.box_composite(value, &mut Encoder::new(self))
            }
        }
    }

    /// Runs `block` against this engine and folds whatever it pushed into a value.
    ///
    /// On failure the stack is unwound to where it was, so the parent container stays
    /// usable by the caller that decides to recover. A latched abort fails the block
    /// even if it returned `Ok`.
    pub(crate) fn sub_encode<F>(&mut self, block: F) -> Result<Option<Value>>
    where
        F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
    {
        let depth = self.stack.len();
        let outcome = block(&mut Encoder::new(self));
        if let Err(err) = outcome.and_then(|()| self.check_aborted()) {
            self.stack.truncate(depth);
            return Err(err);
        }
        match self.stack.len().saturating_sub(depth) {
            0 => Ok(None),
            1 => match self.stack.pop() {
                Some(slot) => self.roll_up(slot).map(Some),
                None => Ok(None),
            },
            n => {
                self.stack.truncate(depth);
                error!(path = %self.path, containers = n, "value left several containers open");
                let err = EncodeError::invariant(
                    &self.path,
                    format!("{n} containers were opened for a single value"),
                );
                Err(self.abort(err))
            }
        }
    }

    /// Folds a finished slot and everything below it into a value.
    pub(crate) fn roll_up(&self, slot: Slot) -> Result<Value> {
        match slot {
            Slot::Leaf(value) => Ok(value),
            Slot::Reserved => Ok(self.transform.empty_keyed()),
            Slot::Keyed(store) if store.is_empty() => Ok(self.transform.empty_keyed()),
            Slot::Keyed(store) => {
                let entries = store
                    .into_entries()
                    .map(|(key, child)| Ok((key, self.roll_up(child)?)))
                    .collect::<Result<Vec<_>>>()?;
                self.transform.keyed_to_value(entries, &self.context())
            }
            Slot::Unkeyed(store) if store.is_empty() => Ok(self.transform.empty_unkeyed()),
            Slot::Unkeyed(store) => {
                let items = store
                    .into_items()
                    .into_iter()
                    .map(|child| self.roll_up(child))
                    .collect::<Result<Vec<_>>>()?;
                self.transform.unkeyed_to_value(items, &self.context())
            }
        }
    }
}

fn latch(slot: &mut Option<EncodeError>, err: &EncodeError) {
    if slot.is_none() {
        *slot = Some(err.clone());
    }
}

/// The handle an [`Encode`] implementation writes through.
///
/// Request exactly one container per value. The coding path tells where in the tree the
/// value sits; it is the same path reported by errors raised below this point.
pub struct Encoder<'e, 't> {
    engine: &'e mut Engine<'t>,
}

impl<'e, 't> Encoder<'e, 't> {
    pub(crate) fn new(engine: &'e mut Engine<'t>) -> Self {
        Self { engine }
    }

    /// Path of the value being encoded.
    pub fn coding_path(&self) -> &CodingPath {
        self.engine.path()
    }

    /// Options of the running encode call.
    pub fn options(&self) -> &EncodeOptions {
        self.engine.options()
    }

    /// Looks up a user-info entry of type `T`.
    pub fn user_info<T: Any>(&self, key: &str) -> Option<&T> {
        self.engine.options().user_info().get(key)
    }

    /// Opens the keyed container for this value.
    ///
    /// # Errors
    /// Returns [`EncodeError::InvariantViolation`] if a value was already produced at
    /// this position.
    pub fn keyed_container(&mut self) -> Result<KeyedContainer<'_, 't>> {
        self.engine.ensure_can_encode_new_value("keyed container")?;
        let index = self.engine.stack.push_keyed();
        Ok(KeyedContainer::new(self.engine, index))
    }

    /// Opens the unkeyed container for this value.
    ///
    /// # Errors
    /// Same as [`keyed_container`](Self::keyed_container).
    pub fn unkeyed_container(&mut self) -> Result<UnkeyedContainer<'_, 't>> {
        self.engine.ensure_can_encode_new_value("unkeyed container")?;
        let index = self.engine.stack.push_unkeyed();
        Ok(UnkeyedContainer::new(self.engine, index))
    }

    /// Opens a single-value container for this value.
    ///
    /// # Errors
    /// Same as [`keyed_container`](Self::keyed_container).
    pub fn single_value_container(&mut self) -> Result<SingleValueContainer<'_, 't>> {
        self.engine
            .ensure_can_encode_new_value("single value container")?;
        Ok(SingleValueContainer::new(self.engine))
    }

    /// Boxes a primitive with the active transform without storing it.
    pub fn box_primitive(&self, primitive: Primitive<'_>) -> Result<Value> {
        self.engine.box_primitive(primitive)
    }

    /// Boxes `value` at the current path without storing it.
    pub fn box_value<V: Encode + ?Sized>(&mut self, value: &V) -> Result<Option<Value>> {
        self.engine.box_value(&value)
    }

    /// Encodes `value` through its `Encode` impl in an isolated sub-encode and returns
    /// the folded result, bypassing its shape.
    pub fn decompose(&mut self, value: &dyn Encode) -> Result<Option<Value>> {
        self.engine.sub_encode(|encoder| value.encode(encoder))
    }

    /// Writes a string-keyed data map. Keys are stored verbatim.
    pub fn encode_data_map<'a, I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a dyn Encode)>,
    {
        let mut container = self.keyed_container()?;
        for (key, value) in entries {
            container.encode_entry(key, value)?;
        }
        Ok(())
    }
}
