use alloc::vec::Vec;
use core::{
    fmt,
    fmt::Display,
};
use hashbrown::HashMap;

/// A persistent clause identity.
///
/// Assigned once per clause, monotonically, and never reused. Deferred work
/// refers to clauses through persistent ids; the bimap resolves them to the
/// clause's current slot, if the clause is still alive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PersistentId(u64);

impl Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A bijection between live persistent clause ids and transient slots.
///
/// The transient side tracks the problem clause list of the kernel, whose
/// slots shift on removal and simplification. Point updates go through
/// [`swap`][`Bimap::swap`] and [`drop`][`Bimap::drop`]; bulk relocations of
/// a simplification pass are staged with [`will_move`][`Bimap::will_move`]
/// and committed with [`flip_buffer`][`Bimap::flip_buffer`]. Any slot not
/// reported by then is dropped by omission.
#[derive(Debug, Default)]
pub struct Bimap {
    next_free: u64,
    /// Persistent to transient. A persistent id missing here is dead.
    forward: HashMap<PersistentId, usize>,
    /// Transient to persistent.
    backward: Vec<Option<PersistentId>>,
    /// Transient to persistent, pending the next buffer flip.
    backward_next: Vec<Option<PersistentId>>,
}

impl Bimap {
    /// Returns the number of live persistent ids.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` if no persistent id is live.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Records a new clause at the given transient slot and returns its
    /// fresh persistent id.
    pub fn add(&mut self, slot: usize) -> PersistentId {
        debug_assert!(
            self.backward.len() <= slot || self.backward[slot].is_none(),
            "tried to add a clause to the occupied slot {}",
            slot,
        );
        let id = PersistentId(self.next_free);
        self.next_free += 1;
        self.forward.insert(id, slot);
        if self.backward.len() <= slot {
            self.backward.resize(slot + 1, None);
        }
        self.backward[slot] = Some(id);
        id
    }

    /// Drops the clause at the given transient slot.
    pub fn drop(&mut self, slot: usize) {
        let id = self.backward[slot]
            .take()
            .expect("tried to drop a vacant transient slot");
        self.forward.remove(&id);
    }

    /// Swaps the clauses of two transient slots.
    pub fn swap(&mut self, lhs: usize, rhs: usize) {
        let lhs_id = self.backward[lhs].expect("tried to swap a vacant transient slot");
        let rhs_id = self.backward[rhs].expect("tried to swap a vacant transient slot");
        self.forward.insert(lhs_id, rhs);
        self.forward.insert(rhs_id, lhs);
        self.backward.swap(lhs, rhs);
    }

    /// Stages the move of a clause from its old slot to a new slot for the
    /// next buffer flip.
    pub fn will_move(&mut self, old_slot: usize, new_slot: usize) {
        let id = self.backward[old_slot]
            .expect("tried to move a vacant transient slot");
        if self.backward_next.len() <= new_slot {
            self.backward_next.resize(new_slot + 1, None);
        }
        self.backward_next[new_slot] = Some(id);
    }

    /// Commits all staged moves.
    ///
    /// Every clause whose move was not staged since the last flip is
    /// dropped.
    pub fn flip_buffer(&mut self) {
        core::mem::swap(&mut self.backward, &mut self.backward_next);
        self.backward_next.clear();
        self.forward.clear();
        for (slot, id) in self.backward.iter().enumerate() {
            if let Some(id) = id {
                self.forward.insert(*id, slot);
            }
        }
    }

    /// Returns the transient slot of the given persistent id, or `None` if
    /// the clause was dropped.
    pub fn fw(&self, id: PersistentId) -> Option<usize> {
        self.forward.get(&id).copied()
    }

    /// Returns the persistent id of the clause at the given transient slot.
    ///
    /// # Panics
    ///
    /// If the slot is vacant.
    pub fn bw(&self, slot: usize) -> PersistentId {
        self.backward[slot].expect("encountered unexpected vacant transient slot")
    }
}
