//! Well-known semantic types that a codec may box specially.
//!
//! A transform declares which kinds it intercepts through
//! [`Transform::intercepts`](crate::Transform::intercepts). Values of a kind that is not
//! intercepted fall back to their structural `Encode` implementation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

/// The closed set of semantic kinds recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticKind {
    /// A point in time.
    DateTime,
    /// An opaque binary blob.
    Data,
    /// An arbitrary-precision decimal number.
    Decimal,
    /// A universally unique identifier.
    Uuid,
    /// A URL.
    Url,
}

impl fmt::Display for SemanticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DateTime => "date/time",
            Self::Data => "binary data",
            Self::Decimal => "decimal",
            Self::Uuid => "UUID",
            Self::Url => "URL",
        };
        f.write_str(name)
    }
}

/// A borrowed semantic value handed to [`Transform::box_semantic`](crate::Transform::box_semantic).
#[derive(Debug, Clone, Copy)]
pub enum Semantic<'a> {
    /// See [`SemanticKind::DateTime`].
    DateTime(&'a DateTime<Utc>),
    /// See [`SemanticKind::Data`].
    Data(&'a [u8]),
    /// See [`SemanticKind::Decimal`].
    Decimal(&'a Decimal),
    /// See [`SemanticKind::Uuid`].
    Uuid(&'a Uuid),
    /// See [`SemanticKind::Url`].
    Url(&'a Url),
}

impl Semantic<'_> {
    /// The kind of this value.
    pub fn kind(&self) -> SemanticKind {
        match self {
            Self::DateTime(_) => SemanticKind::DateTime,
            Self::Data(_) => SemanticKind::Data,
            Self::Decimal(_) => SemanticKind::Decimal,
            Self::Uuid(_) => SemanticKind::Uuid,
            Self::Url(_) => SemanticKind::Url,
        }
    }
}

/// Owned binary payload. Encodes as [`SemanticKind::Data`]; when not intercepted it
/// falls back to a sequence of byte integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    /// Borrows the bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Error returned when parsing a [`Decimal`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError {
    input: String,
}

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal: {:?}", self.input)
    }
}

impl std::error::Error for ParseDecimalError {}

/// An arbitrary-precision decimal, stored as validated text
/// (`-?digits(.digits)?([eE][+-]?digits)?`).
///
/// ```
/// use treecode::Decimal;
///
/// let price: Decimal = "1234567890.123456789012345".parse()?;
/// assert_eq!(price.as_str(), "1234567890.123456789012345");
/// assert!("12.".parse::<Decimal>().is_err());
/// # Ok::<(), treecode::semantic::ParseDecimalError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    text: String,
}

impl Decimal {
    /// The decimal's canonical text.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError {
            input: input.to_owned(),
        };
        let unsigned = input.strip_prefix('-').unwrap_or(input);
        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
            None => (unsigned, None),
        };
        let (whole, fraction) = match mantissa.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (mantissa, None),
        };
        if !digits(whole) || fraction.is_some_and(|f| !digits(f)) {
            return Err(err());
        }
        if let Some(exp) = exponent {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            if !digits(exp) {
                return Err(err());
            }
        }
        Ok(Self {
            text: input.to_owned(),
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
