//! The encoding engine: container stack, coding path, and nested scopes.

mod containers;
mod encoder;
mod referencing;
mod storage;

pub use containers::{KeyedContainer, SingleValueContainer, UnkeyedContainer};
pub use encoder::Encoder;
pub(crate) use encoder::Engine;
