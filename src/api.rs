//! Top-level entry points: [`encode_tree`] and the reusable [`TreeEncoder`].
//!
//! Each call runs on its own engine. The caller gets either a complete tree or a single
//! error; a fault latched anywhere during traversal fails the call even when the value
//! that hit it carried on.

use std::any::type_name;

use tracing::debug;

use crate::encode::Encode;
use crate::engine::Engine;
use crate::error::{EncodeError, Result};
use crate::options::EncodeOptions;
use crate::transform::{NativeTransform, Transform};
use crate::value::Value;

/// Encodes `value` into a tree using `transform` and `options`.
///
/// This is the single entry point every front-end goes through.
///
/// # Errors
/// * [`EncodeError::EmptyTopLevel`] if the value wrote nothing.
/// * Any error raised by the value, the transform, or a nested scope.
pub fn encode_tree<V>(value: &V, transform: &dyn Transform, options: &EncodeOptions) -> Result<Value>
where
    V: Encode + ?Sized,
{
    let root = type_name::<V>();
    let span = tracing::debug_span!("encode", root);
    let _entered = span.enter();

    let mut engine = Engine::new(transform, options);
    let outcome = engine.box_value(&value);
    match outcome.and_then(|tree| engine.check_aborted().map(|()| tree)) {
        Ok(Some(tree)) => {
            debug!(kind = tree.kind_name(), "encode finished");
            Ok(tree)
        }
        Ok(None) => {
            debug!("top-level value wrote nothing");
            Err(EncodeError::EmptyTopLevel { type_name: root })
        }
        Err(err) => {
            debug!(error = %err, "encode failed");
            Err(err)
        }
    }
}

/// A reusable encoder: a transform paired with the options every call runs under.
///
/// ```
/// use treecode::{NativeTransform, TreeEncoder, Value};
///
/// let tree = TreeEncoder::new(NativeTransform).encode(&vec![1u8, 2, 3])?;
/// assert_eq!(tree.as_sequence().map(<[Value]>::len), Some(3));
/// # Ok::<(), treecode::EncodeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeEncoder<T = NativeTransform> {
    transform: T,
    options: EncodeOptions,
}

impl<T: Transform> TreeEncoder<T> {
    /// Creates an encoder with default options.
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            options: EncodeOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// The options every call runs under.
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// The transform.
    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Encodes one value.
    pub fn encode<V: Encode + ?Sized>(&self, value: &V) -> Result<Value> {
        encode_tree(value, &self.transform, &self.options)
    }

    /// Encodes a batch of independent values, in parallel when the `parallel` feature
    /// is enabled. Results keep the input order.
    pub fn encode_many<V: Encode + Sync>(&self, values: &[V]) -> Vec<Result<Value>> {
        debug!(count = values.len(), "encoding batch");
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            values.par_iter().map(|value| self.encode(value)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            values.iter().map(|value| self.encode(value)).collect()
        }
    }
}
