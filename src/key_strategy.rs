//! Key conversion for keyed containers.
//!
//! The strategy is applied exactly once, at the moment a field is written into a keyed
//! container. Keys of data maps (`HashMap<String, _>` and friends) are never converted.

use std::fmt;
use std::sync::Arc;

use crate::path::CodingPath;

/// Signature of a caller-supplied key conversion: receives the path of the container
/// being written and the key as written by the traversed type.
pub type KeyConverter = dyn Fn(&CodingPath, &str) -> String + Send + Sync;

/// Transforms schema field names into the keys stored in the tree.
#[derive(Clone, Default)]
pub enum KeyStrategy {
    /// Keys are stored as written.
    #[default]
    Identity,
    /// `camelCase` identifiers become `snake_case`.
    SnakeCase,
    /// Caller-supplied conversion.
    Custom(Arc<KeyConverter>),
}

impl KeyStrategy {
    /// Wraps a closure as a [`KeyStrategy::Custom`].
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&CodingPath, &str) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Converts `key`, written in the container at `path`.
    pub fn convert(&self, path: &CodingPath, key: &str) -> String {
        match self {
            Self::Identity => key.to_owned(),
            Self::SnakeCase => to_snake_case(key),
            Self::Custom(f) => f(path, key),
        }
    }
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::SnakeCase => f.write_str("SnakeCase"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Converts a `camelCase` identifier to `snake_case`.
///
/// Word boundaries are placed before an uppercase letter that follows a lowercase letter
/// or digit, and before the last letter of an uppercase run that is followed by a
/// lowercase letter (`myURLValue` → `my_url_value`). Leading and trailing underscores are
/// preserved.
///
/// ```
/// use treecode::key_strategy::to_snake_case;
///
/// assert_eq!(to_snake_case("myValue"), "my_value");
/// assert_eq!(to_snake_case("HTTPServer"), "http_server");
/// assert_eq!(to_snake_case("_privateKey_"), "_private_key_");
/// ```
pub fn to_snake_case(key: &str) -> String {
    let core = key.trim_matches('_');
    if core.is_empty() {
        return key.to_owned();
    }
    let leading = key.len() - key.trim_start_matches('_').len();
    let trailing = key.len() - key.trim_end_matches('_').len();

    let chars: Vec<char> = core.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    out.push_str(&key[..leading]);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
            let next = chars.get(i + 1).copied();
            let after_lower = prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            let ends_acronym = prev.is_some_and(char::is_uppercase)
                && next.is_some_and(char::is_lowercase);
            if (after_lower || ends_acronym) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out.push_str(&key[key.len() - trailing..]);
    out
}
