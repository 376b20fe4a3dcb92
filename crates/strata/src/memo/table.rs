use super::{MemoHandler, MemoKey, Memoized};
use crate::expr::ExprId;

const INITIAL_BITS: u32 = 6;
const FIBONACCI: u64 = 0x9E37_79B9_7F4A_7C15;

struct Entry {
    expr: ExprId,
    fingerprint: u64,
    outcome: Memoized,
    next: Option<Box<Entry>>,
}

struct Bucket {
    position: usize,
    head: Box<Entry>,
}

/// Open-addressing memo table keyed by text position.
///
/// Each occupied bucket holds one position and a singly linked chain of the
/// expressions memoized there. Lookup probes linearly to the position's bucket
/// and then scans the chain. The table doubles once more than three quarters
/// of the buckets are occupied; chains move with their bucket.
pub struct PositionTable {
    buckets: Vec<Option<Bucket>>,
    bits: u32,
    occupied: usize,
    entries: usize,
}

impl Default for PositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionTable")
            .field("capacity", &self.buckets.len())
            .field("positions", &self.occupied)
            .field("entries", &self.entries)
            .finish()
    }
}

impl PositionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::with_bits(INITIAL_BITS)
    }

    fn with_bits(bits: u32) -> Self {
        Self {
            buckets: std::iter::repeat_with(|| None).take(1 << bits).collect(),
            bits,
            occupied: 0,
            entries: 0,
        }
    }

    /// Number of positions with at least one entry.
    #[must_use]
    pub const fn positions(&self) -> usize {
        self.occupied
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn home(&self, position: usize) -> usize {
        ((position as u64).wrapping_mul(FIBONACCI) >> (64 - self.bits)) as usize
    }

    /// `Ok(index)` of the bucket holding `position`, or `Err(index)` of the
    /// free bucket where it would go.
    fn probe(&self, position: usize) -> Result<usize, usize> {
        let mask = self.buckets.len() - 1;
        let mut index = self.home(position);
        loop {
            match &self.buckets[index] {
                None => return Err(index),
                Some(bucket) if bucket.position == position => return Ok(index),
                Some(_) => index = (index + 1) & mask,
            }
        }
    }

    fn grow(&mut self) {
        let mut grown = Self::with_bits(self.bits + 1);
        for bucket in self.buckets.drain(..).flatten() {
            if let Err(index) = grown.probe(bucket.position) {
                grown.buckets[index] = Some(bucket);
                grown.occupied += 1;
            }
        }
        grown.entries = self.entries;
        *self = grown;
    }
}

impl MemoHandler for PositionTable {
    fn get(&self, key: &MemoKey) -> Option<&Memoized> {
        let index = self.probe(key.position).ok()?;
        let bucket = self.buckets[index].as_ref()?;
        let mut cursor = Some(bucket.head.as_ref());
        while let Some(entry) = cursor {
            if entry.expr == key.expr && entry.fingerprint == key.fingerprint {
                return Some(&entry.outcome);
            }
            cursor = entry.next.as_deref();
        }
        None
    }

    fn insert(&mut self, key: MemoKey, outcome: Memoized) {
        if (self.occupied + 1) * 4 > self.buckets.len() * 3 {
            self.grow();
        }
        match self.probe(key.position) {
            Ok(index) => {
                let Some(bucket) = self.buckets[index].as_mut() else {
                    return;
                };
                let mut cursor = Some(bucket.head.as_mut());
                while let Some(entry) = cursor {
                    if entry.expr == key.expr && entry.fingerprint == key.fingerprint {
                        entry.outcome = outcome;
                        return;
                    }
                    cursor = entry.next.as_deref_mut();
                }
                let next = std::mem::replace(
                    &mut bucket.head,
                    Box::new(Entry {
                        expr: key.expr,
                        fingerprint: key.fingerprint,
                        outcome,
                        next: None,
                    }),
                );
                bucket.head.next = Some(next);
            }
            Err(index) => {
                self.buckets[index] = Some(Bucket {
                    position: key.position,
                    head: Box::new(Entry {
                        expr: key.expr,
                        fingerprint: key.fingerprint,
                        outcome,
                        next: None,
                    }),
                });
                self.occupied += 1;
            }
        }
        self.entries += 1;
    }

    fn len(&self) -> usize {
        self.entries
    }
}
