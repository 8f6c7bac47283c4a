//! Centralized error handling for treecode.
//!
//! Every failure an encode call can produce is an [`EncodeError`]. The engine never
//! panics: faults that indicate a defect in a type's own encoding logic (for example
//! requesting two containers at one position) are reported as
//! [`EncodeError::InvariantViolation`] and abort the current encode call.
//!
//! ## Error Categories
//!
//! - **Empty top-level** ([`EncodeError::EmptyTopLevel`]): the root value wrote nothing.
//! - **Invalid value** ([`EncodeError::InvalidValue`]): a transform could not represent a
//!   value (a non-finite float under the `Throw` policy, an integer that does not fit).
//! - **Invariant violation** ([`EncodeError::InvariantViolation`]): container misuse.
//! - **Unsupported** ([`EncodeError::Unsupported`]): a transform was handed a semantic
//!   value it has no boxing for.
//! - **Custom** ([`EncodeError::Custom`]): raised by hand-written `Encode` impls.
//! - **Codec / Io**: failures of the final tree-to-bytes writers.
//!
//! Path-carrying variants name the traversal position that caused the failure:
//!
//! ```rust
//! use treecode::{CodingPath, EncodeError, PathSegment};
//!
//! let path = CodingPath::from_segments([PathSegment::key("items"), PathSegment::Index(2)]);
//! let err = EncodeError::invalid_value(&path, "NaN is not allowed");
//! assert_eq!(err.to_string(), "Invalid Value at $.items[2]: NaN is not allowed");
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::path::CodingPath;

/// A specialized `Result` type for treecode operations.
pub type Result<T> = std::result::Result<T, EncodeError>;

/// The master error enum covering all failure domains of an encode call.
///
/// This type is `Clone` so a failure can be stored and replayed; I/O errors are wrapped
/// in an `Arc` to keep cloning cheap.
#[derive(Debug, Clone)]
pub enum EncodeError {
    /// The root value finished without writing anything.
    EmptyTopLevel {
        /// `std::any::type_name` of the root value.
        type_name: &'static str,
    },

    /// A transform rejected a value it cannot represent without losing information.
    InvalidValue {
        /// Position of the offending value.
        path: CodingPath,
        /// Human readable reason.
        reason: String,
    },

    /// A container invariant was violated.
    ///
    /// This is a programming error in the traversed type's `Encode` impl (e.g. asking
    /// for a keyed and an unkeyed container at the same position). It is never retried.
    InvariantViolation {
        /// Position at which the conflicting request happened.
        path: CodingPath,
        /// Which invariant was broken.
        reason: String,
    },

    /// The active codec has no representation for a node kind.
    Unsupported {
        /// Position of the node, when known.
        path: CodingPath,
        /// What could not be represented.
        reason: String,
    },

    /// Raised by user `Encode` implementations.
    Custom {
        /// Position at which the implementation failed.
        path: CodingPath,
        /// The message supplied by the implementation.
        message: String,
    },

    /// A codec writer failed while turning a finished tree into bytes or text.
    Codec(String),

    /// Low-level I/O failure while writing encoded output to a sink.
    Io(Arc<io::Error>),
}

impl EncodeError {
    /// Creates an [`EncodeError::InvalidValue`] at `path`.
    pub fn invalid_value(path: &CodingPath, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Creates an [`EncodeError::InvariantViolation`] at `path`.
    pub fn invariant(path: &CodingPath, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Creates an [`EncodeError::Unsupported`] at `path`.
    pub fn unsupported(path: &CodingPath, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Creates an [`EncodeError::Custom`] error, for use in hand-written `Encode` impls.
    pub fn custom(path: &CodingPath, message: impl fmt::Display) -> Self {
        Self::Custom {
            path: path.clone(),
            message: message.to_string(),
        }
    }

    /// Returns the traversal path carried by this error, if any.
    pub fn path(&self) -> Option<&CodingPath> {
        match self {
            Self::InvalidValue { path, .. }
            | Self::InvariantViolation { path, .. }
            | Self::Unsupported { path, .. }
            | Self::Custom { path, .. } => Some(path),
            Self::EmptyTopLevel { .. } | Self::Codec(_) | Self::Io(_) => None,
        }
    }

    /// Returns true for programming-error faults that must not be recovered from.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTopLevel { type_name } => {
                write!(f, "Empty Top-Level Value: {type_name} did not encode any value")
            }
            Self::InvalidValue { path, reason } => write!(f, "Invalid Value at {path}: {reason}"),
            Self::InvariantViolation { path, reason } => {
                write!(f, "Container Invariant Violated at {path}: {reason}")
            }
            Self::Unsupported { path, reason } => write!(f, "Unsupported at {path}: {reason}"),
            Self::Custom { path, message } => write!(f, "Encoding Failed at {path}: {message}"),
            Self::Codec(s) => write!(f, "Codec Error: {s}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
