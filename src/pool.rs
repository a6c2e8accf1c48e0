// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component A: the subtree pool. A slab allocator for the fixed-size
//! [`crate::tree::NodeData`] records — subtree lifetimes are short-to-medium
//! and highly bursty (every shift and reduce mints one, most die within a
//! few rounds once a competing version is pruned), so slab reuse keeps the
//! hot path off the general-purpose heap, the same trade `cactus` and
//! `cfgrammar`'s arena-flavoured index types (`PIdx`/`RIdx`/...) make.

use vob::Vob;

use crate::tree::NodeData;

/// Width of one slab. 64 matches a single `u64` occupancy word.
pub const SLAB_WIDTH: usize = 64;

/// An index into the pool: which slab, which slot within it. `Copy` because
/// the rest of the crate treats it as a lightweight handle, not an owning
/// pointer — ownership is tracked separately via `NodeData::ref_count`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct SubtreeId {
    slab: u32,
    slot: u32,
}

struct Slab {
    slots: Vec<Option<NodeData>>,
    occupied: Vob,
    len: usize,
}

impl Slab {
    fn new() -> Self {
        let mut slots = Vec::with_capacity(SLAB_WIDTH);
        slots.resize_with(SLAB_WIDTH, || None);
        Slab {
            slots,
            occupied: Vob::from_elem(SLAB_WIDTH, false),
            len: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.len == SLAB_WIDTH
    }
}

/// The slab pool. `allocate`/`free` are the only ways subtrees come into or
/// leave existence; [`crate::tree`]'s `retain`/`release` helpers call them
/// once a node's `ref_count` hits zero.
pub struct Pool {
    slabs: Vec<Slab>,
    /// Index of the first slab known to have room; advanced lazily, never
    /// speculatively, so `free`-ing a slot in an earlier slab can lower it
    /// back down (see `free`).
    first_available: usize,
}

impl Pool {
    pub fn new() -> Self {
        Pool {
            slabs: vec![Slab::new()],
            first_available: 0,
        }
    }

    /// Scans from `first_available` for a slab with a free slot, appending a
    /// fresh one if none has room, and occupies the first free slot found.
    pub fn allocate(&mut self, data: NodeData) -> SubtreeId {
        loop {
            if self.first_available >= self.slabs.len() {
                self.slabs.push(Slab::new());
            }
            let slab_idx = self.first_available;
            if self.slabs[slab_idx].is_full() {
                self.first_available += 1;
                continue;
            }
            let slab = &mut self.slabs[slab_idx];
            let slot_idx = find_free_slot(slab).expect("slab reported room but has none");
            slab.occupied.set(slot_idx, true);
            slab.slots[slot_idx] = Some(data);
            slab.len += 1;
            return SubtreeId {
                slab: slab_idx as u32,
                slot: slot_idx as u32,
            };
        }
    }

    /// Clears the slot's bit and, if the freed slot lives in an earlier slab
    /// than the cursor, lowers the cursor so future allocations notice the
    /// room again.
    pub fn free(&mut self, id: SubtreeId) {
        let slab_idx = id.slab as usize;
        let slot_idx = id.slot as usize;
        let slab = &mut self.slabs[slab_idx];
        debug_assert!(slab.occupied[slot_idx]);
        slab.occupied.set(slot_idx, false);
        slab.slots[slot_idx] = None;
        slab.len -= 1;
        if slab_idx < self.first_available {
            self.first_available = slab_idx;
        }
    }

    pub fn get(&self, id: SubtreeId) -> &NodeData {
        self.slabs[id.slab as usize].slots[id.slot as usize]
            .as_ref()
            .expect("dangling SubtreeId: slot already freed")
    }

    pub fn get_mut(&mut self, id: SubtreeId) -> &mut NodeData {
        self.slabs[id.slab as usize].slots[id.slot as usize]
            .as_mut()
            .expect("dangling SubtreeId: slot already freed")
    }

    /// Total occupied slots across all slabs — used by the debug-assertion
    /// property tests in §8 ("after the caller releases the returned tree,
    /// the pool has no marked slots").
    pub fn live_count(&self) -> usize {
        self.slabs.iter().map(|s| s.len).sum()
    }
}

impl Default for Pool {
    fn default() -> Self {
        Pool::new()
    }
}

fn find_free_slot(slab: &Slab) -> Option<usize> {
    (0..SLAB_WIDTH).find(|&i| !slab.occupied[i])
}
