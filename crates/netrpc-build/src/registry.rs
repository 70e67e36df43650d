//! # Serializer Registry
//!
//! Maps a payload type to the procedure that writes it and the procedure that
//! reads it. Matching is exact equality on the resolved `RustType`: a writer
//! for `crate::math::Vec3` is never used for `Vec3` declared elsewhere, and
//! there is no fallback to anything structurally similar.
//!
//! Candidates are registered in scan order (built-ins first). When two
//! candidates claim the same type and direction, the first is kept and the
//! clash is reported as `AmbiguousSerializer`.

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::diagnostic::DiagnosticCode;
use crate::diagnostic::Location;
use crate::model::RustType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Write,
    Read,
}

/// The shape of a serializer, derived from its signature alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerShape {
    pub direction: Direction,
    pub payload: RustType,
    /// Writer takes `&T` instead of `T`.
    pub by_ref: bool,
    /// Reader returns `Result<T, _>` instead of `T`.
    pub fallible: bool,
}

impl SerializerShape {
    /// Classifies a free function by its resolved parameter and return types.
    ///
    /// - `fn(&mut Writer, T)` or `fn(&mut Writer, &T)` returning `()` writes `T`.
    /// - `fn(&mut Reader) -> Result<T>` or `-> T` reads `T`.
    ///
    /// Anything else is not a serializer.
    pub fn classify(params: &[RustType], ret: &RustType) -> Option<Self> {
        match params {
            [writer, value] if writer.is_mut_ref_to("Writer") && ret.is_unit() => {
                let (payload, by_ref) = match value {
                    RustType::Reference { mutable: false, inner } => ((**inner).clone(), true),
                    RustType::Reference { mutable: true, .. } => return None,
                    other => (other.clone(), false),
                };
                Some(Self { direction: Direction::Write, payload, by_ref, fallible: false })
            }
            [reader] if reader.is_mut_ref_to("Reader") && !ret.is_unit() => {
                let (payload, fallible) = match (ret.last_segment(), ret.generic_args().first()) {
                    (Some("Result"), Some(ok)) => (ok.clone(), true),
                    _ => (ret.clone(), false),
                };
                Some(Self { direction: Direction::Read, payload, by_ref: false, fallible })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerCandidate {
    /// Absolute path of the function.
    pub function: RustType,
    pub shape: SerializerShape,
    pub location: Location,
}

#[derive(Debug, Default)]
pub struct SerializerRegistry {
    writers: HashMap<RustType, SerializerCandidate>,
    readers: HashMap<RustType, SerializerCandidate>,
}

impl SerializerRegistry {
    pub fn build(candidates: impl IntoIterator<Item = SerializerCandidate>) -> (Self, Vec<Diagnostic>) {
        let mut registry = Self::default();
        let mut diagnostics = Vec::new();

        for candidate in candidates {
            let map = match candidate.shape.direction {
                Direction::Write => &mut registry.writers,
                Direction::Read => &mut registry.readers,
            };

            if let Some(kept) = map.get(&candidate.shape.payload) {
                let what = match candidate.shape.direction {
                    Direction::Write => "writer",
                    Direction::Read => "reader",
                };
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::Nrpc0010AmbiguousSerializer,
                        format!(
                            "`{}` is a second {} for `{}`; `{}` is already registered and will be used",
                            candidate.function, what, candidate.shape.payload, kept.function
                        ),
                    )
                    .at(candidate.location.clone()),
                );
                continue;
            }

            tracing::trace!(function = %candidate.function, payload = %candidate.shape.payload, "serializer registered");
            map.insert(candidate.shape.payload.clone(), candidate);
        }

        (registry, diagnostics)
    }

    pub fn writer(&self, payload: &RustType) -> Option<&SerializerCandidate> {
        self.writers.get(payload)
    }

    pub fn reader(&self, payload: &RustType) -> Option<&SerializerCandidate> {
        self.readers.get(payload)
    }

    pub fn len(&self) -> usize {
        self.writers.len() + self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
