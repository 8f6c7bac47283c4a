//! Reference codecs built on the engine.
//!
//! Each codec is a [`Transform`](crate::Transform) plus a front-end that writes the
//! finished tree in its wire format.

pub mod cbor;
pub mod json;
