//! Per-call configuration.
//!
//! [`EncodeOptions`] is fixed for the duration of one top-level encode call. It is visible
//! to `Encode` implementations through [`Encoder::options`](crate::Encoder::options) and to
//! transforms through [`BoxContext::options`](crate::BoxContext::options).

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::key_strategy::KeyStrategy;

/// How text transforms treat `NaN` and the infinities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NonFiniteFloatStrategy {
    /// Fail with an invalid-value error carrying the traversal path.
    #[default]
    Throw,
    /// Write the given strings instead.
    ConvertToString {
        /// Replacement for `+inf`.
        positive_infinity: String,
        /// Replacement for `-inf`.
        negative_infinity: String,
        /// Replacement for `NaN`.
        nan: String,
    },
}

/// Typed, caller-supplied context data keyed by name.
#[derive(Clone, Default)]
pub struct UserInfo {
    entries: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl UserInfo {
    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Returns the entry under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns true if an entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Configuration bag for one encode call.
///
/// ```
/// use treecode::{EncodeOptions, KeyStrategy};
///
/// let options = EncodeOptions::new()
///     .with_key_strategy(KeyStrategy::SnakeCase)
///     .with_user_info("api_version", 3u32);
///
/// assert_eq!(options.user_info().get::<u32>("api_version"), Some(&3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    key_strategy: KeyStrategy,
    non_finite_floats: NonFiniteFloatStrategy,
    user_info: UserInfo,
}

impl EncodeOptions {
    /// Default options: identity keys, non-finite floats rejected, no user info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key strategy.
    #[must_use]
    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Sets the non-finite float policy.
    #[must_use]
    pub fn with_non_finite_floats(mut self, strategy: NonFiniteFloatStrategy) -> Self {
        self.non_finite_floats = strategy;
        self
    }

    /// Adds a user-info entry.
    #[must_use]
    pub fn with_user_info<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.user_info.insert(key, value);
        self
    }

    /// The active key strategy.
    pub fn key_strategy(&self) -> &KeyStrategy {
        &self.key_strategy
    }

    /// The active non-finite float policy.
    pub fn non_finite_floats(&self) -> &NonFiniteFloatStrategy {
        &self.non_finite_floats
    }

    /// Caller-supplied context.
    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }
}
