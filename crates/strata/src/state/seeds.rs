use super::{ParseChanges, StateSlot};
use crate::expr::ExprId;
use hashbrown::{HashMap, HashSet};

/// Seeds of the left-recursive invocations in progress.
///
/// A seed is the best result obtained so far by a `LeftRecursive` node or a
/// cluster at a position; `None` is the initial failing seed. The blocked set
/// holds left-associative nodes whose growth is running, so that a re-entry at
/// another position does not grow a competing seed.
///
/// Seeds are installed and removed by the invocation that owns them, so there
/// is nothing to undo on backtracking. They do change what nested expressions
/// match, hence the fingerprint.
#[derive(Debug, Clone, Default)]
pub struct SeedSlot {
    seeds: HashMap<(ExprId, usize), Option<ParseChanges>, ahash::RandomState>,
    blocked: HashSet<ExprId, ahash::RandomState>,
    hasher: ahash::RandomState,
    fingerprint: u64,
}

impl SeedSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn seed_hash(&self, id: ExprId, position: usize, seed: Option<&ParseChanges>) -> u64 {
        self.hasher.hash_one((id, position, seed.map(ParseChanges::end)))
    }

    fn blocked_hash(&self, id: ExprId) -> u64 {
        self.hasher.hash_one((id, usize::MAX, "blocked"))
    }

    /// Seed for `id` at `position`, if one is installed.
    #[must_use]
    pub fn get(&self, id: ExprId, position: usize) -> Option<&Option<ParseChanges>> {
        self.seeds.get(&(id, position))
    }

    pub fn insert(&mut self, id: ExprId, position: usize, seed: Option<ParseChanges>) {
        let added = self.seed_hash(id, position, seed.as_ref());
        if let Some(old) = self.seeds.insert((id, position), seed) {
            self.fingerprint ^= self.seed_hash(id, position, old.as_ref());
        }
        self.fingerprint ^= added;
    }

    pub fn remove(&mut self, id: ExprId, position: usize) {
        if let Some(old) = self.seeds.remove(&(id, position)) {
            self.fingerprint ^= self.seed_hash(id, position, old.as_ref());
        }
    }

    #[must_use]
    pub fn is_blocked(&self, id: ExprId) -> bool {
        self.blocked.contains(&id)
    }

    /// Set the blocked flag of `id` and return its previous value.
    pub fn set_blocked(&mut self, id: ExprId, blocked: bool) -> bool {
        let was = if blocked {
            !self.blocked.insert(id)
        } else {
            self.blocked.remove(&id)
        };
        if was != blocked {
            self.fingerprint ^= self.blocked_hash(id);
        }
        was
    }

    /// Unblock everything, returning the previous set for [`SeedSlot::restore_blocked`].
    pub fn take_blocked(&mut self) -> HashSet<ExprId, ahash::RandomState> {
        for id in &self.blocked {
            self.fingerprint ^= self.blocked_hash(*id);
        }
        std::mem::take(&mut self.blocked)
    }

    pub fn restore_blocked(&mut self, blocked: HashSet<ExprId, ahash::RandomState>) {
        drop(self.take_blocked());
        for id in &blocked {
            self.fingerprint ^= self.blocked_hash(*id);
        }
        self.blocked = blocked;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty() && self.blocked.is_empty()
    }
}

impl StateSlot for SeedSlot {
    type Snapshot = ();
    type Delta = ();

    fn snapshot(&self) {}
    fn restore(&mut self, _snapshot: &()) {}
    fn uncommit(&mut self, _snapshot: &()) {}
    fn discard(&mut self) {}
    fn commit(&mut self) {}

    fn extract(&self) -> Option<()> {
        None
    }

    fn merge(&mut self, _delta: &()) {}

    fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}
