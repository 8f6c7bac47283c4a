//! # Treecode
//!
//! A format-agnostic encoding engine. Types describe themselves through containers; the
//! engine folds what they write into an ordered, format-neutral [`Value`] tree; a
//! pluggable [`Transform`] decides what each leaf and container becomes for one format.
//!
//! ## Overview
//!
//! Encoding is split into three roles:
//!
//! *   **The value** implements [`Encode`] (usually through `#[derive(Encode)]`) and asks
//!     the [`Encoder`] for exactly one container: keyed (a record), unkeyed (a list), or
//!     single value (a leaf).
//! *   **The engine** keeps a stack of open containers and the coding path of the value
//!     being written. It enforces one value per position and resolves nested scopes into
//!     the slots they reserved in their parent.
//! *   **The transform** boxes primitives and folds finished containers. Codecs are just
//!     transforms plus a writer for the finished tree; see [`codec::cbor`] and
//!     [`codec::json`].
//!
//! ## Architecture
//!
//! ### Containers and the stack
//!
//! Every container request pushes one entry onto the stack. A value that is a container
//! (a struct field holding another struct, for example) is boxed in an isolated
//! sub-encode: whatever it pushes is popped and folded into a single [`Value`] before it
//! is stored in the parent. Writing twice at one position, or requesting a second
//! container for the same value, fails with [`EncodeError::InvariantViolation`].
//!
//! ### Nested scopes
//!
//! `nested_keyed_container`, `nested_unkeyed_container` and `super_encoder` reserve a slot
//! in the parent first, run a closure against a fresh encoder rooted at that slot, and
//! write the folded result back before returning. A failure inside the scope, including
//! one raised while folding, is returned by the call that opened it.
//!
//! ### Key strategy
//!
//! Field names are converted by the [`KeyStrategy`] exactly once, when they are written
//! into a keyed container. Keys of data maps such as `BTreeMap<String, _>` are never
//! converted.
//!
//! ## Usage
//!
//! ```rust
//! use treecode::Encode;
//! use treecode::codec::json::JsonEncoder;
//! use treecode::{EncodeOptions, KeyStrategy};
//!
//! #[derive(Encode)]
//! struct Release {
//!     crateName: String,
//!     downloads: u64,
//!     #[treecode(skip_none)]
//!     yanked: Option<bool>,
//! }
//!
//! let release = Release { crateName: "treecode".into(), downloads: 42, yanked: None };
//! let json = JsonEncoder::new()
//!     .with_options(EncodeOptions::new().with_key_strategy(KeyStrategy::SnakeCase))
//!     .to_string(&release)?;
//! assert_eq!(json, r#"{"crate_name":"treecode","downloads":42}"#);
//! # Ok::<(), treecode::EncodeError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * No `unsafe` code.
//! * No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * Every failure is an [`EncodeError`] carrying the coding path where it happened.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

extern crate self as treecode;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod codec;
pub mod encode;
pub mod error;
pub mod key_strategy;
pub mod options;
pub mod path;
pub mod semantic;
pub mod transform;
pub mod value;

// --- INTERNAL IMPLEMENTATION MODULES ---
mod encode_impls;
mod engine;

// --- RE-EXPORTS ---

pub use api::{TreeEncoder, encode_tree};
pub use encode::{Encode, Primitive, Shape};
pub use engine::{Encoder, KeyedContainer, SingleValueContainer, UnkeyedContainer};
pub use error::{EncodeError, Result};
pub use key_strategy::KeyStrategy;
pub use options::{EncodeOptions, NonFiniteFloatStrategy, UserInfo};
pub use path::{CodingPath, PathSegment};
pub use semantic::{Blob, Decimal, Semantic, SemanticKind};
pub use transform::{BoxContext, NativeTransform, Transform};
pub use value::{CollectionStyle, Mapping, ScalarStyle, Sequence, StringValue, Value};

// Re-export the derive macro so it is accessible as `treecode::Encode`
pub use treecode_derive::Encode;
