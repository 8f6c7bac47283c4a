//! Nested scopes whose value lands in a slot reserved in the parent container.
//!
//! The scope runs on its own [`Engine`] rooted at the reserved position. When the
//! populating closure returns, [`ReferencingEncoder::finish`] folds whatever the scope
//! wrote into a single value. Any failure, including one raised while folding, is
//! returned to the caller of the container operation that opened the scope and latched
//! on the parent engine, so the top-level call fails even if that caller ignores it.

use tracing::{error, trace};

use super::encoder::{Encoder, Engine};
use super::storage::{Reservation, Slot};
use crate::error::{EncodeError, Result};
use crate::path::PathSegment;
use crate::value::Value;

/// Lifecycle of a nested scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceState {
    /// Slot reserved, nothing written yet.
    Reserved,
    /// The populating closure has run.
    Populated,
    /// The value was produced for write-back.
    Resolved,
    /// Population or folding failed.
    Faulted,
}

pub(crate) struct ReferencingEncoder<'t> {
    engine: Engine<'t>,
    reservation: Reservation,
    state: ReferenceState,
}

impl<'t> ReferencingEncoder<'t> {
    pub(crate) fn new(parent: &Engine<'t>, segment: PathSegment, reservation: Reservation) -> Self {
        Self {
            engine: Engine::scoped(parent, segment),
            reservation,
            state: ReferenceState::Reserved,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ReferenceState {
        self.state
    }

    /// Runs `populate` against the scope's encoder. An abort latched inside the scope
    /// fails the population even when the closure returned `Ok`.
    pub(crate) fn populate<F>(&mut self, populate: F) -> Result<()>
    where
        F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
    {
        if self.state != ReferenceState::Reserved {
            return Err(self.fault("scope was already populated"));
        }
        let outcome = populate(&mut Encoder::new(&mut self.engine));
        match outcome.and_then(|()| self.engine.check_aborted()) {
            Ok(()) => {
                self.state = ReferenceState::Populated;
                Ok(())
            }
            Err(err) => {
                self.state = ReferenceState::Faulted;
                self.engine.stack.truncate(0);
                Err(err)
            }
        }
    }

    /// Folds the scope into the value for its reserved slot.
    ///
    /// A scope that wrote nothing yields the transform's empty keyed value. More than
    /// one top-level container in one scope is an invariant violation.
    pub(crate) fn finish(&mut self) -> Result<(Reservation, Value)> {
        if self.state != ReferenceState::Populated {
            return Err(self.fault("scope cannot be resolved in its current state"));
        }
        if let Err(err) = self.engine.check_aborted() {
            self.state = ReferenceState::Faulted;
            return Err(err);
        }
        let folded = match self.engine.stack.len() {
            0 => Ok(self.engine.transform().empty_keyed()),
            1 => {
                let slot = self.engine.stack.pop().unwrap_or(Slot::Reserved);
                self.engine.roll_up(slot)
            }
            n => Err(self.fault(&format!("{n} containers were left open in one nested scope"))),
        };
        match folded {
            Ok(value) => {
                self.state = ReferenceState::Resolved;
                trace!(path = %self.engine.path(), kind = value.kind_name(), "nested scope resolved");
                Ok((self.reservation.clone(), value))
            }
            Err(err) => {
                self.state = ReferenceState::Faulted;
                Err(err)
            }
        }
    }

    fn fault(&mut self, reason: &str) -> EncodeError {
        error!(path = %self.engine.path(), state = ?self.state, reason, "nested scope fault");
        let err = EncodeError::invariant(self.engine.path(), reason);
        self.engine.abort(err)
    }
}

/// Opens a nested scope under `segment`, populates it and writes the result into the
/// slot `reservation` holds in the container at `index` of `parent`.
///
/// The reservation must already be in place. A failure is latched on `parent` before it
/// is returned.
pub(crate) fn run_scope<'t, F>(
    parent: &mut Engine<'t>,
    index: usize,
    segment: PathSegment,
    reservation: Reservation,
    populate: F,
) -> Result<()>
where
    F: FnOnce(&mut Encoder<'_, 't>) -> Result<()>,
{
    let mut scope = ReferencingEncoder::new(parent, segment, reservation);
    let resolved = match scope.populate(populate) {
        Ok(()) => scope.finish(),
        Err(err) => Err(err),
    };
    match resolved {
        Ok((reservation, value)) => parent.resolve(index, &reservation, value),
        Err(err) => Err(parent.abort(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::EncodeOptions;
    use crate::transform::NativeTransform;

    #[test]
    fn resolves_exactly_once() {
        let options = EncodeOptions::new();
        let parent = Engine::new(&NativeTransform, &options);
        let mut scope =
            ReferencingEncoder::new(&parent, PathSegment::key("sub"), Reservation::Key("sub".into()));
        assert_eq!(scope.state(), ReferenceState::Reserved);
        assert!(scope.finish().is_err());

        let mut scope =
            ReferencingEncoder::new(&parent, PathSegment::key("sub"), Reservation::Key("sub".into()));
        assert!(scope.populate(|_| Ok(())).is_ok());
        let resolved = scope.finish();
        assert!(matches!(resolved, Ok((Reservation::Key(ref k), Value::Mapping(ref m))) if k == "sub" && m.is_empty()));
        assert_eq!(scope.state(), ReferenceState::Resolved);
        assert!(scope.finish().is_err());
    }

    #[test]
    fn failed_population_faults() {
        let options = EncodeOptions::new();
        let parent = Engine::new(&NativeTransform, &options);
        let mut scope = ReferencingEncoder::new(&parent, PathSegment::Index(0), Reservation::Index(0));
        let outcome = scope.populate(|encoder| {
            encoder.keyed_container()?;
            Err(EncodeError::custom(encoder.coding_path(), "boom"))
        });
        assert!(outcome.is_err());
        assert_eq!(scope.state(), ReferenceState::Faulted);
        assert!(scope.finish().is_err());
    }
}
