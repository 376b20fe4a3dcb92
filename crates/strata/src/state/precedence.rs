use super::StateSlot;
use crate::expr::ExprId;
use hashbrown::HashMap;

/// Minimum precedence admissible in each cluster.
///
/// Clusters raise their own floor while they parse the operands of a level and
/// put it back afterwards; `WithMinPrecedence` swaps the whole table for one
/// with a fixed default. Both are scoped by the invocation that changed them.
#[derive(Debug, Clone, Default)]
pub struct PrecedenceSlot {
    floors: HashMap<ExprId, u32, ahash::RandomState>,
    default_floor: u32,
    hasher: ahash::RandomState,
}

/// Saved precedence table, restored by [`PrecedenceSlot::restore_frame`].
#[derive(Debug)]
pub struct PrecedenceFrame {
    floors: HashMap<ExprId, u32, ahash::RandomState>,
    default_floor: u32,
}

impl PrecedenceSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn floor(&self, cluster: ExprId) -> u32 {
        self.floors.get(&cluster).copied().unwrap_or(self.default_floor)
    }

    /// Set the floor of `cluster`, returning the previous explicit entry.
    pub fn set_floor(&mut self, cluster: ExprId, floor: u32) -> Option<u32> {
        self.floors.insert(cluster, floor)
    }

    /// Put back an entry returned by [`PrecedenceSlot::set_floor`].
    pub fn reset_floor(&mut self, cluster: ExprId, previous: Option<u32>) {
        match previous {
            Some(floor) => {
                self.floors.insert(cluster, floor);
            }
            None => {
                self.floors.remove(&cluster);
            }
        }
    }

    /// Replace every floor by `floor` until the frame is restored.
    pub fn override_all(&mut self, floor: u32) -> PrecedenceFrame {
        let frame = PrecedenceFrame {
            floors: std::mem::take(&mut self.floors),
            default_floor: self.default_floor,
        };
        self.default_floor = floor;
        frame
    }

    pub fn restore_frame(&mut self, frame: PrecedenceFrame) {
        self.floors = frame.floors;
        self.default_floor = frame.default_floor;
    }
}

impl StateSlot for PrecedenceSlot {
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
        let floors = self
            .floors
            .iter()
            .fold(0, |acc, (id, floor)| acc ^ self.hasher.hash_one((*id, *floor)));
        floors ^ self.hasher.hash_one(self.default_floor)
    }
}
