//! # Parse State
//!
//! [`ParseState`] is threaded through every invocation of a parse. It holds the
//! committed start and the uncommitted end position, the error-recording
//! toggle, and a set of [`StateSlot`]s: the built-in capture, seed and
//! precedence slots plus any extension slots registered on the
//! [`ParserConfig`](crate::ParserConfig).
//!
//! The state-level operations apply the slot protocol to the positions and to
//! every slot at once.
//!
//! ## Invariant
//!
//! An expression is invoked with an empty uncommitted view (`start == end`).
//! If it succeeds the uncommitted view holds its effects; if it fails the
//! state is exactly as it was before the call.

mod precedence;
mod seeds;
mod slot;

pub use precedence::{PrecedenceFrame, PrecedenceSlot};
pub use seeds::SeedSlot;
pub use slot::{SlotId, SlotRegistry, StateSlot};

pub(crate) use slot::ErasedSlot;

use crate::capture::{CaptureNode, CaptureSlot, CaptureSnapshot};
use smallvec::SmallVec;
use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Opaque snapshot of a [`ParseState`].
pub struct Snapshot {
    start: usize,
    end: usize,
    capture: CaptureSnapshot,
    extensions: SmallVec<[Box<dyn Any>; 2]>,
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

/// Effects of one successful invocation: the end position it reached plus the
/// delta of every slot. Memo entries and seeds are `ParseChanges`.
#[derive(Debug, Clone, Default)]
pub struct ParseChanges {
    end: usize,
    captures: Option<Arc<[Arc<CaptureNode>]>>,
    extensions: SmallVec<[(usize, Rc<dyn Any>); 2]>,
}

impl ParseChanges {
    /// Changes that only move the end position.
    #[must_use]
    pub fn at(end: usize) -> Self {
        Self {
            end,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub fn captures(&self) -> &[Arc<CaptureNode>] {
        self.captures.as_deref().unwrap_or_default()
    }
}

pub struct ParseState {
    start: usize,
    end: usize,
    record_errors: bool,
    pub(crate) capture: CaptureSlot,
    pub(crate) seeds: SeedSlot,
    pub(crate) precedence: PrecedenceSlot,
    extensions: Vec<Box<dyn ErasedSlot>>,
}

impl fmt::Debug for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseState")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("record_errors", &self.record_errors)
            .field("captures", &self.capture.len())
            .field("seeds", &self.seeds.len())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

impl Default for ParseState {
    fn default() -> Self {
        Self::new(&SlotRegistry::default())
    }
}

impl ParseState {
    #[must_use]
    pub fn new(registry: &SlotRegistry) -> Self {
        Self {
            start: 0,
            end: 0,
            record_errors: true,
            capture: CaptureSlot::new(),
            seeds: SeedSlot::new(),
            precedence: PrecedenceSlot::new(),
            extensions: registry.instantiate(),
        }
    }

    /// Committed position.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Position reached by the uncommitted view.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub(crate) fn advance_to(&mut self, end: usize) {
        self.end = end;
    }

    #[must_use]
    pub const fn record_errors(&self) -> bool {
        self.record_errors
    }

    /// Set the error-recording flag, returning the previous value.
    pub(crate) fn set_record_errors(&mut self, record: bool) -> bool {
        std::mem::replace(&mut self.record_errors, record)
    }

    #[must_use]
    pub fn captures(&self) -> &CaptureSlot {
        &self.capture
    }

    /// # Panics
    ///
    /// Panics if `id` was issued by a registry other than the one this state
    /// was created from.
    #[must_use]
    pub fn slot<S: StateSlot>(&self, id: SlotId<S>) -> &S {
        self.extensions
            .get(id.index())
            .and_then(|slot| slot.as_any().downcast_ref::<S>())
            .unwrap_or_else(|| panic!("no {} registered at {id:?}", type_name::<S>()))
    }

    /// # Panics
    ///
    /// Same as [`ParseState::slot`].
    pub fn slot_mut<S: StateSlot>(&mut self, id: SlotId<S>) -> &mut S {
        self.extensions
            .get_mut(id.index())
            .and_then(|slot| slot.as_any_mut().downcast_mut::<S>())
            .unwrap_or_else(|| panic!("no {} registered at {id:?}", type_name::<S>()))
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            start: self.start,
            end: self.end,
            capture: StateSlot::snapshot(&self.capture),
            extensions: self.extensions.iter().map(|s| s.snapshot()).collect(),
        }
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.start = snapshot.start;
        self.end = snapshot.end;
        StateSlot::restore(&mut self.capture, &snapshot.capture);
        StateSlot::restore(&mut self.seeds, &());
        StateSlot::restore(&mut self.precedence, &());
        for (slot, snap) in self.extensions.iter_mut().zip(&snapshot.extensions) {
            slot.restore(snap.as_ref());
        }
    }

    /// Keep everything, but move the commit point back to `snapshot`.
    pub fn uncommit(&mut self, snapshot: &Snapshot) {
        self.start = snapshot.start;
        StateSlot::uncommit(&mut self.capture, &snapshot.capture);
        StateSlot::uncommit(&mut self.seeds, &());
        StateSlot::uncommit(&mut self.precedence, &());
        for (slot, snap) in self.extensions.iter_mut().zip(&snapshot.extensions) {
            slot.uncommit(snap.as_ref());
        }
    }

    /// Drop the uncommitted view.
    pub fn discard(&mut self) {
        self.end = self.start;
        StateSlot::discard(&mut self.capture);
        StateSlot::discard(&mut self.seeds);
        StateSlot::discard(&mut self.precedence);
        for slot in &mut self.extensions {
            slot.discard();
        }
    }

    pub fn commit(&mut self) {
        self.start = self.end;
        StateSlot::commit(&mut self.capture);
        StateSlot::commit(&mut self.seeds);
        StateSlot::commit(&mut self.precedence);
        for slot in &mut self.extensions {
            slot.commit();
        }
    }

    /// The uncommitted view as replayable changes.
    #[must_use]
    pub fn extract(&self) -> ParseChanges {
        ParseChanges {
            end: self.end,
            captures: StateSlot::extract(&self.capture),
            extensions: self
                .extensions
                .iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.extract().map(|delta| (i, delta)))
                .collect(),
        }
    }

    /// Replay `changes` on top of the uncommitted view.
    pub fn merge(&mut self, changes: &ParseChanges) {
        self.end = changes.end;
        if let Some(captures) = &changes.captures {
            StateSlot::merge(&mut self.capture, captures);
        }
        for (index, delta) in &changes.extensions {
            self.extensions[*index].merge(delta.as_ref());
        }
    }

    /// Combined fingerprint of everything that can change a match outcome.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hash = mix(0, StateSlot::fingerprint(&self.seeds));
        hash = mix(hash, StateSlot::fingerprint(&self.precedence));
        hash = mix(hash, StateSlot::fingerprint(&self.capture));
        for slot in &self.extensions {
            hash = mix(hash, slot.fingerprint());
        }
        hash
    }
}

#[inline]
fn mix(hash: u64, value: u64) -> u64 {
    (hash.rotate_left(5) ^ value).wrapping_mul(0x517c_c1b7_2722_0a95)
}
