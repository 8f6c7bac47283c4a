//! Container stack and the slots it holds.
//!
//! Each open container occupies one stack entry. Keyed and unkeyed stores own their
//! children as [`Slot`]s, so a nested scope can reserve a position up front and fill it
//! once its own subtree is finished.

use indexmap::IndexMap;

use crate::value::Value;

/// One position in the tree under construction.
#[derive(Debug)]
pub(crate) enum Slot {
    /// A finished value.
    Leaf(Value),
    /// An open keyed container.
    Keyed(KeyedStore),
    /// An open unkeyed container.
    Unkeyed(UnkeyedStore),
    /// Held for a nested scope that has not resolved yet.
    Reserved,
}

/// Entries of a keyed container in first-insertion order.
#[derive(Debug, Default)]
pub(crate) struct KeyedStore {
    entries: IndexMap<String, Slot>,
}

impl KeyedStore {
    /// Writes `slot` under `key`. An existing key keeps its position.
    pub(crate) fn insert(&mut self, key: String, slot: Slot) {
        self.entries.insert(key, slot);
    }

    pub(crate) fn reserve(&mut self, key: String) {
        self.insert(key, Slot::Reserved);
    }

    /// Fills the reservation under `key`. Returns false if there is none.
    pub(crate) fn resolve(&mut self, key: &str, value: Value) -> bool {
        match self.entries.get_mut(key) {
            Some(slot @ Slot::Reserved) => {
                *slot = Slot::Leaf(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, Slot)> {
        self.entries.into_iter()
    }
}

/// Items of an unkeyed container in append order.
#[derive(Debug, Default)]
pub(crate) struct UnkeyedStore {
    items: Vec<Slot>,
}

impl UnkeyedStore {
    pub(crate) fn push(&mut self, slot: Slot) {
        self.items.push(slot);
    }

    /// Appends a reservation and returns its index.
    pub(crate) fn reserve(&mut self) -> usize {
        self.items.push(Slot::Reserved);
        self.items.len() - 1
    }

    /// Fills the reservation at `index`. Returns false if there is none.
    pub(crate) fn resolve(&mut self, index: usize, value: Value) -> bool {
        match self.items.get_mut(index) {
            Some(slot @ Slot::Reserved) => {
                *slot = Slot::Leaf(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_items(self) -> Vec<Slot> {
        self.items
    }
}

/// Handle to a reserved slot in a parent container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reservation {
    /// Converted key in a keyed container.
    Key(String),
    /// Index in an unkeyed container.
    Index(usize),
}

/// The stack of containers opened by one encoder.
#[derive(Debug, Default)]
pub(crate) struct ContainerStack {
    slots: Vec<Slot>,
}

impl ContainerStack {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Opens a keyed container and returns its stack index.
    pub(crate) fn push_keyed(&mut self) -> usize {
        self.slots.push(Slot::Keyed(KeyedStore::default()));
        self.slots.len() - 1
    }

    /// Opens an unkeyed container and returns its stack index.
    pub(crate) fn push_unkeyed(&mut self) -> usize {
        self.slots.push(Slot::Unkeyed(UnkeyedStore::default()));
        self.slots.len() - 1
    }

    pub(crate) fn push_leaf(&mut self, value: Value) {
        self.slots.push(Slot::Leaf(value));
    }

    pub(crate) fn pop(&mut self) -> Option<Slot> {
        self.slots.pop()
    }

    /// Drops everything above `depth`. Used to unwind after a failed sub-encode.
    pub(crate) fn truncate(&mut self, depth: usize) {
        self.slots.truncate(depth);
    }

    pub(crate) fn keyed(&self, index: usize) -> Option<&KeyedStore> {
        match self.slots.get(index) {
            Some(Slot::Keyed(store)) => Some(store),
            _ => None,
        }
    }

    pub(crate) fn keyed_mut(&mut self, index: usize) -> Option<&mut KeyedStore> {
        match self.slots.get_mut(index) {
            Some(Slot::Keyed(store)) => Some(store),
            _ => None,
        }
    }

    pub(crate) fn unkeyed(&self, index: usize) -> Option<&UnkeyedStore> {
        match self.slots.get(index) {
            Some(Slot::Unkeyed(store)) => Some(store),
            _ => None,
        }
    }

    pub(crate) fn unkeyed_mut(&mut self, index: usize) -> Option<&mut UnkeyedStore> {
        match self.slots.get_mut(index) {
            Some(Slot::Unkeyed(store)) => Some(store),
            _ => None,
        }
    }

    /// Writes `value` into the reservation held by the container at `index`.
    pub(crate) fn resolve(&mut self, index: usize, reservation: &Reservation, value: Value) -> bool {
        match (self.slots.get_mut(index), reservation) {
            (Some(Slot::Keyed(store)), Reservation::Key(key)) => store.resolve(key, value),
            (Some(Slot::Unkeyed(store)), Reservation::Index(at)) => store.resolve(*at, value),
            _ => false,
        }
    }
}
