// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component G: the graph-structured parse stack. A DAG of [`StackNode`]s
//! held in a small arena (the "arena + indices" strategy spec §9 recommends
//! for exactly this shape of sharing problem); a [`Version`] is just a head
//! pointer into that arena plus the bookkeeping (`push_count`, the summary
//! trail, halted-ness) that travels with one branch of the parse.
//!
//! The summary trail is backed by [`cactus::Cactus`], the same persistent,
//! `Rc`-shared stack `cpctplus.rs` uses for its speculative `pstack` search —
//! here it plays the equivalent role of letting sibling versions share the
//! (position, depth, state) trail recorded while they were still one branch,
//! without copying it on every fork.

use std::collections::HashMap;

use cactus::Cactus;

use crate::pool::Pool;
use crate::tree::{self, Subtree};
use crate::types::{Position, StateId};

/// An index into the stack's node arena.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct NodeId(u32);

/// An index into the version table. Stable until the version is removed or
/// renumbered (`remove_version`/`renumber_version`/`swap_versions`).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct VersionId(pub u32);

/// What one stack link carries, beyond the state it leads to.
#[derive(Clone, Copy, Debug)]
enum LinkPayload {
    /// The bottom of the stack; no predecessor, no tree.
    Root,
    /// An ordinary link: a subtree consumed to reach this node. `pending`
    /// mirrors spec §3's "a link is pending if the tree it carries is
    /// interior" — set by the caller of `push`, not recomputed here.
    Tree { subtree: Subtree, pending: bool },
    /// A NULL-tree link in `ERROR_STATE`: the discontinuity `handle_error`
    /// installs before exploring potential reductions (spec §4.G, §4.H).
    ErrorDiscontinuity,
}

struct StackNode {
    state: StateId,
    payload: LinkPayload,
    /// Normally exactly one predecessor; more than one only after
    /// `force_merge` has folded a second version's incoming link in.
    predecessors: Vec<NodeId>,
    /// Cumulative byte/point offset at the *end* of this node's tree (or
    /// its predecessor's, for `Root`/`ErrorDiscontinuity`, which consume no
    /// input) — cached so `top_position` is O(1) per spec §4.G.
    position: Position,
    ref_count: u32,
}

/// One (position, depth, state) entry of a version's summary trail (spec
/// §4.G `record_summary`). `total_pushes` is the version's push counter at
/// record time; `recover` turns the difference against the version's
/// *current* counter into the `depth` the spec describes, rather than
/// storing depth directly, since depth only means anything relative to a
/// specific later vantage point.
#[derive(Clone, Copy, Debug)]
pub struct SummaryEntry {
    pub position: Position,
    pub state: StateId,
    total_pushes: u64,
}

struct Version {
    head: NodeId,
    halted: bool,
    /// Pushes since this version's birth; never reset (used to turn a
    /// recorded summary entry's snapshot into a pop depth).
    total_pushes: u64,
    /// Pushes since the last `ErrorDiscontinuity`; reset there. Spec
    /// §4.G's `push_count`, a `compare_versions` tiebreak signal.
    push_count: u32,
    summary: Cactus<SummaryEntry>,
    in_use: bool,
}

/// A `(version, trees)` pair produced by popping a (possibly shared) prefix
/// (spec §4.G, glossary "Slice"). `trees` is oldest-first, ready to become
/// `make_node`'s `children` argument directly.
pub struct Slice {
    pub version: VersionId,
    pub trees: Vec<Subtree>,
}

/// The graph-structured parse stack.
pub struct Stack {
    nodes: Vec<Option<StackNode>>,
    free_nodes: Vec<NodeId>,
    versions: Vec<Version>,
    free_versions: Vec<VersionId>,
    /// Dedups fresh `Tree` links: `(predecessor, state, subtree)` → node,
    /// so that two versions shifting the *same* lookahead subtree (the
    /// common case right after a token-cache hit) land on one shared node
    /// instead of two, per spec §4.G's push contract.
    link_cache: HashMap<(NodeId, StateId, Subtree), NodeId>,
}

impl Stack {
    pub fn new(initial_state: StateId) -> Self {
        let root = StackNode {
            state: initial_state,
            payload: LinkPayload::Root,
            predecessors: Vec::new(),
            position: Position::ZERO,
            ref_count: 1,
        };
        let mut stack = Stack {
            nodes: vec![Some(root)],
            free_nodes: Vec::new(),
            versions: Vec::new(),
            free_versions: Vec::new(),
            link_cache: HashMap::new(),
        };
        stack.versions.push(Version {
            head: NodeId(0),
            halted: false,
            total_pushes: 0,
            push_count: 0,
            summary: Cactus::new(),
            in_use: true,
        });
        stack
    }

    fn node(&self, id: NodeId) -> &StackNode {
        self.nodes[id.0 as usize]
            .as_ref()
            .expect("dangling stack NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut StackNode {
        self.nodes[id.0 as usize]
            .as_mut()
            .expect("dangling stack NodeId")
    }

    fn version(&self, v: VersionId) -> &Version {
        &self.versions[v.0 as usize]
    }

    fn version_mut(&mut self, v: VersionId) -> &mut Version {
        &mut self.versions[v.0 as usize]
    }

    fn alloc_node(&mut self, node: StackNode) -> NodeId {
        if let Some(id) = self.free_nodes.pop() {
            self.nodes[id.0 as usize] = Some(node);
            id
        } else {
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(Some(node));
            id
        }
    }

    fn retain_node(&mut self, id: NodeId) {
        self.node_mut(id).ref_count += 1;
    }

    /// Drops one reference to `id`; at zero, releases its tree (if any) and
    /// recurses into its predecessors, returning the node to the free list.
    fn release_node(&mut self, pool: &mut Pool, id: NodeId) {
        let remaining = {
            let n = self.node_mut(id);
            debug_assert!(n.ref_count > 0);
            n.ref_count -= 1;
            n.ref_count
        };
        if remaining > 0 {
            return;
        }
        let (payload, predecessors) = {
            let n = self.nodes[id.0 as usize].take().expect("dangling stack NodeId");
            (n.payload, n.predecessors)
        };
        if let LinkPayload::Tree { subtree, .. } = payload {
            tree::release(pool, subtree);
        }
        self.link_cache.retain(|_, &mut v| v != id);
        self.free_nodes.push(id);
        for pred in predecessors {
            self.release_node(pool, pred);
        }
    }

    // ---- basic contracts ----

    pub fn top_state(&self, v: VersionId) -> StateId {
        self.node(self.version(v).head).state
    }

    pub fn top_position(&self, v: VersionId) -> Position {
        self.node(self.version(v).head).position
    }

    pub fn push_count(&self, v: VersionId) -> u32 {
        self.version(v).push_count
    }

    pub fn is_halted(&self, v: VersionId) -> bool {
        self.version(v).halted
    }

    pub fn halt(&mut self, v: VersionId) {
        self.version_mut(v).halted = true;
    }

    /// Whether the top link of `v` is marked pending (spec §4.G
    /// `pop_pending`, glossary "Pending link").
    pub fn top_is_pending(&self, v: VersionId) -> bool {
        matches!(
            self.node(self.version(v).head).payload,
            LinkPayload::Tree { pending: true, .. }
        )
    }

    /// Whether the top link of `v` is the `ERROR_STATE` discontinuity (spec
    /// §4.G `pop_error`).
    pub fn top_is_error_discontinuity(&self, v: VersionId) -> bool {
        matches!(self.node(self.version(v).head).payload, LinkPayload::ErrorDiscontinuity)
    }

    /// Whether `v`'s head is the bottom-of-stack root (no tree, no
    /// predecessor). A walk that reaches this without finding what it was
    /// looking for has exhausted the version's whole spine.
    pub fn top_is_root(&self, v: VersionId) -> bool {
        matches!(self.node(self.version(v).head).payload, LinkPayload::Root)
    }

    pub fn live_versions(&self) -> Vec<VersionId> {
        (0..self.versions.len() as u32)
            .map(VersionId)
            .filter(|v| self.versions[v.0 as usize].in_use)
            .collect()
    }

    pub fn version_count(&self) -> usize {
        self.versions.iter().filter(|v| v.in_use).count()
    }

    // ---- push / pop ----

    /// Appends a node carrying `tree` to `v`'s spine (spec §4.G `push`).
    /// Takes ownership of one refcount on `tree`.
    pub fn push(&mut self, pool: &mut Pool, v: VersionId, tree: Subtree, pending: bool, state: StateId) {
        self.push_link(pool, v, LinkPayload::Tree { subtree: tree, pending }, state);
    }

    /// Pushes the `ERROR_STATE` discontinuity marker (spec §4.G: "A NULL
    /// tree with `ERROR_STATE` marks a discontinuity used by error
    /// recovery").
    pub fn push_error_discontinuity(&mut self, pool: &mut Pool, v: VersionId, error_state: StateId) {
        self.push_link(pool, v, LinkPayload::ErrorDiscontinuity, error_state);
    }

    fn push_link(&mut self, pool: &mut Pool, v: VersionId, payload: LinkPayload, state: StateId) {
        let old_head = self.version(v).head;

        if let LinkPayload::Tree { subtree, .. } = payload {
            let key = (old_head, state, subtree);
            if let Some(&shared) = self.link_cache.get(&key) {
                tree::release(pool, subtree);
                self.retain_node(shared);
                self.release_node(pool, old_head);
                let ver = self.version_mut(v);
                ver.head = shared;
                ver.total_pushes += 1;
                ver.push_count += 1;
                return;
            }
        }

        let position = match payload {
            LinkPayload::Tree { subtree, .. } => self.node(old_head).position.advance(pool.get(subtree).total_extent()),
            _ => self.node(old_head).position,
        };
        let new_node = self.alloc_node(StackNode {
            state,
            payload,
            predecessors: vec![old_head],
            position,
            ref_count: 0,
        });
        self.retain_node(old_head); // referenced by new_node.predecessors
        self.retain_node(new_node); // referenced by the version
        self.release_node(pool, old_head); // version no longer owns it directly

        if let LinkPayload::Tree { subtree, .. } = payload {
            self.link_cache.insert((old_head, state, subtree), new_node);
        }

        let is_error = matches!(payload, LinkPayload::ErrorDiscontinuity);
        let ver = self.version_mut(v);
        ver.head = new_node;
        ver.total_pushes += 1;
        ver.push_count = if is_error { 0 } else { ver.push_count + 1 };
    }

    /// Walks `steps` links back from `v`'s head, fanning out into one
    /// `Slice` per distinct predecessor path (spec §4.G `pop_count`).
    /// `Root`/`ErrorDiscontinuity` links contribute no tree but still
    /// consume one step, so `steps` and `Version::total_pushes` stay in the
    /// same unit (see `SummaryEntry`). Each returned `Slice` owns one
    /// refcount per tree in `trees`; the caller must hand them to
    /// `make_node` or `tree::release` them.
    ///
    /// All branches are derived from `v`'s state as it was *before* this
    /// call, not re-read mid-loop: branch 0 reuses `v`'s slot, the rest get
    /// fresh version slots, and the single refcount `v` held on its old head
    /// is released exactly once after every branch has claimed its own.
    pub fn pop_count(&mut self, pool: &mut Pool, v: VersionId, steps: usize) -> Vec<Slice> {
        let old_head = self.version(v).head;
        let branches = self.walk_back(pool, old_head, steps, Vec::new());

        let halted = self.version(v).halted;
        let push_count = self.version(v).push_count;
        let summary = self.version(v).summary.clone();
        let new_total_pushes = self.version(v).total_pushes.saturating_sub(steps as u64);

        let mut slices = Vec::with_capacity(branches.len());
        for (i, (end_node, trees_newest_first)) in branches.into_iter().enumerate() {
            let mut trees = trees_newest_first;
            trees.reverse();
            self.retain_node(end_node);
            let target = if i == 0 {
                let ver = self.version_mut(v);
                ver.head = end_node;
                ver.total_pushes = new_total_pushes;
                v
            } else {
                let new_ver = Version {
                    head: end_node,
                    halted,
                    total_pushes: new_total_pushes,
                    push_count,
                    summary: summary.clone(),
                    in_use: true,
                };
                if let Some(id) = self.free_versions.pop() {
                    self.versions[id.0 as usize] = new_ver;
                    id
                } else {
                    let id = VersionId(self.versions.len() as u32);
                    self.versions.push(new_ver);
                    id
                }
            };
            slices.push(Slice { version: target, trees });
        }
        self.release_node(pool, old_head);
        slices
    }

    /// Retains each tree it collects, since the walked-through nodes are
    /// about to lose their own owning reference once `old_head` is released.
    fn walk_back(
        &self,
        pool: &mut Pool,
        node: NodeId,
        remaining: usize,
        acc_newest_first: Vec<Subtree>,
    ) -> Vec<(NodeId, Vec<Subtree>)> {
        if remaining == 0 {
            return vec![(node, acc_newest_first)];
        }
        let n = self.node(node);
        let tree = match n.payload {
            LinkPayload::Tree { subtree, .. } => Some(subtree),
            _ => None,
        };
        let predecessors = n.predecessors.clone();
        let mut out = Vec::new();
        for pred in predecessors {
            let mut acc = acc_newest_first.clone();
            if let Some(t) = tree {
                tree::retain(pool, t);
                acc.push(t);
            }
            out.extend(self.walk_back(pool, pred, remaining - 1, acc));
        }
        out
    }

    /// Pops exactly one link if it's marked pending, returning its subtree
    /// (spec §4.G `pop_pending`) so the driver can re-push its children.
    pub fn pop_pending(&mut self, pool: &mut Pool, v: VersionId) -> Option<Subtree> {
        if !self.top_is_pending(v) {
            return None;
        }
        let mut slices = self.pop_count(pool, v, 1);
        debug_assert_eq!(slices.len(), 1, "pending link should not fan out");
        self.discard_extra_branches(pool, &mut slices);
        slices.into_iter().next().and_then(|s| s.trees.into_iter().next())
    }

    /// Pops exactly one link if it carries the `ERROR_STATE` discontinuity
    /// (spec §4.G `pop_error`).
    pub fn pop_error(&mut self, pool: &mut Pool, v: VersionId) -> bool {
        if !self.top_is_error_discontinuity(v) {
            return false;
        }
        let mut slices = self.pop_count(pool, v, 1);
        debug_assert_eq!(slices.len(), 1, "error discontinuity link should not fan out");
        self.discard_extra_branches(pool, &mut slices);
        true
    }

    /// Releases every branch after the first: its trees and the stray
    /// version `pop_count` allocated for it. Callers that only want a single
    /// answer (the common case outside of genuine ambiguity) use this to
    /// avoid leaking the rare extra branch rather than assuming it away.
    fn discard_extra_branches(&mut self, pool: &mut Pool, slices: &mut Vec<Slice>) {
        while slices.len() > 1 {
            let extra = slices.pop().unwrap();
            for t in extra.trees {
                tree::release(pool, t);
            }
            self.remove_version(pool, extra.version);
        }
    }

    /// Pops to the bottom, returning one slice per distinct history above
    /// the root (spec §4.G `pop_all`, used at `Accept`).
    pub fn pop_all(&mut self, pool: &mut Pool, v: VersionId) -> Vec<Slice> {
        let depth = self.version(v).total_pushes as usize;
        self.pop_count(pool, v, depth)
    }

    /// Walks backwards from `v` invoking `callback(state, trees_so_far,
    /// depth)` at every step (trees collected oldest-first so far); stops
    /// when `callback` returns `true` or the root is reached (spec §4.G
    /// `iterate`; the spec's `{stop, pop}` bitmask collapses here to a
    /// single bool since this crate doesn't need the `pop` half separately
    /// from `pop_count`, which callers use directly when they do).
    pub fn iterate(&self, v: VersionId, mut callback: impl FnMut(StateId, &[Subtree], usize) -> bool) {
        let mut node = self.version(v).head;
        let mut trees = Vec::new();
        let mut depth = 0usize;
        loop {
            let n = self.node(node);
            if callback(n.state, &trees, depth) {
                return;
            }
            let tree = match n.payload {
                LinkPayload::Tree { subtree, .. } => Some(subtree),
                _ => None,
            };
            let Some(&pred) = n.predecessors.first() else {
                return;
            };
            if let Some(t) = tree {
                trees.insert(0, t);
            }
            node = pred;
            depth += 1;
        }
    }

    // ---- merging ----

    pub fn can_merge(&self, a: VersionId, b: VersionId) -> bool {
        self.version(a).head == self.version(b).head
    }

    /// If `a` and `b` share a head node, frees `b` in O(1); no-op (returns
    /// `false`) otherwise.
    pub fn merge(&mut self, pool: &mut Pool, a: VersionId, b: VersionId) -> bool {
        if !self.can_merge(a, b) {
            return false;
        }
        self.remove_version(pool, b);
        true
    }

    /// Folds `b`'s incoming link into `a`'s head node regardless of head
    /// equality, then removes `b` (spec §4.G `force_merge`, used when two
    /// `ERROR_STATE` versions must collapse into one).
    pub fn force_merge(&mut self, pool: &mut Pool, a: VersionId, b: VersionId) {
        let a_head = self.version(a).head;
        let b_head = self.version(b).head;
        if a_head == b_head {
            self.remove_version(pool, b);
            return;
        }
        let b_predecessors = self.node(b_head).predecessors.clone();
        for pred in &b_predecessors {
            self.retain_node(*pred);
        }
        self.node_mut(a_head).predecessors.extend(b_predecessors);
        self.version_mut(a).push_count = self.version(a).push_count.max(self.version(b).push_count);
        self.remove_version(pool, b);
    }

    // ---- summaries ----

    /// Records the current `(position, state)` into `v`'s summary trail,
    /// tagged with the version's push counter so `recover` can later turn
    /// it back into a pop depth (spec §4.G `record_summary`).
    pub fn record_summary(&mut self, v: VersionId, max_depth: usize) {
        let entry = SummaryEntry {
            position: self.top_position(v),
            state: self.top_state(v),
            total_pushes: self.version(v).total_pushes,
        };
        let ver = self.version_mut(v);
        ver.summary = ver.summary.child(entry);
        // Bound the trail: drop the oldest recorded entry once past
        // max_depth by rebuilding from the front. Cheap relative to parse
        // cost since this only runs when not already in error recovery.
        let len = ver.summary.vals().count();
        if len > max_depth {
            let mut kept: Vec<SummaryEntry> = ver.summary.vals().take(max_depth).copied().collect();
            kept.reverse();
            let mut rebuilt = Cactus::new();
            for e in kept {
                rebuilt = rebuilt.child(e);
            }
            self.version_mut(v).summary = rebuilt;
        }
    }

    /// The recorded trail, most-recently-recorded first.
    pub fn get_summary(&self, v: VersionId) -> Vec<SummaryEntry> {
        self.version(v).summary.vals().copied().collect()
    }

    pub fn total_pushes(&self, v: VersionId) -> u64 {
        self.version(v).total_pushes
    }

    // ---- error cost ----

    /// Sum of subtree error costs along `v`'s spine plus a flat penalty per
    /// `ERROR_STATE` discontinuity crossed (spec §4.G `error_cost`).
    pub fn error_cost(&self, pool: &Pool, v: VersionId, penalty_per_discontinuity: u32) -> u32 {
        let mut node = self.version(v).head;
        let mut cost = 0u32;
        loop {
            let n = self.node(node);
            match n.payload {
                LinkPayload::Tree { subtree, .. } => cost += pool.get(subtree).error_cost,
                LinkPayload::ErrorDiscontinuity => cost += penalty_per_discontinuity,
                LinkPayload::Root => {}
            }
            match n.predecessors.first() {
                Some(&pred) if pred != node => node = pred,
                _ => break,
            }
        }
        cost
    }

    // ---- version id management ----

    /// Creates a new version with the same head/summary/push-count as `v`.
    pub fn copy_version(&mut self, v: VersionId) -> VersionId {
        let src = self.version(v);
        let new = Version {
            head: src.head,
            halted: src.halted,
            total_pushes: src.total_pushes,
            push_count: src.push_count,
            summary: src.summary.clone(),
            in_use: true,
        };
        self.retain_node(new.head);
        if let Some(id) = self.free_versions.pop() {
            self.versions[id.0 as usize] = new;
            id
        } else {
            let id = VersionId(self.versions.len() as u32);
            self.versions.push(new);
            id
        }
    }

    pub fn swap_versions(&mut self, a: VersionId, b: VersionId) {
        self.versions.swap(a.0 as usize, b.0 as usize);
    }

    /// Renumbers `from` to occupy `to`'s slot. If `to` currently holds a
    /// live version, it is removed first (its head released) — used by the
    /// driver's "renumber the last reduction's version back to v" step
    /// (spec §4.H step 4), where `to` is the original `v` a reduction just
    /// forked away from.
    pub fn renumber_version(&mut self, pool: &mut Pool, from: VersionId, to: VersionId) {
        if from == to {
            return;
        }
        if self.versions[to.0 as usize].in_use {
            self.remove_version(pool, to);
        }
        let moved = std::mem::replace(
            &mut self.versions[from.0 as usize],
            Version {
                head: NodeId(0),
                halted: true,
                total_pushes: 0,
                push_count: 0,
                summary: Cactus::new(),
                in_use: false,
            },
        );
        self.versions[to.0 as usize] = moved;
        self.free_versions.retain(|&id| id != to);
        self.free_versions.push(from);
    }

    pub fn remove_version(&mut self, pool: &mut Pool, v: VersionId) {
        let head = self.version(v).head;
        self.release_node(pool, head);
        self.versions[v.0 as usize].in_use = false;
        self.free_versions.push(v);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::language::tests::test_language;
    use crate::tree::{self as tree_mod, LeafInfo, StateOrNone};
    use crate::types::{Extent, FirstLeaf, LexMode, Symbol};

    fn leaf(pool: &mut Pool, bytes: u32) -> Subtree {
        let lang = test_language();
        tree_mod::make_leaf(
            pool,
            &lang,
            Symbol(1),
            Extent::ZERO,
            Extent {
                bytes,
                chars: bytes,
                rows: 0,
                columns: bytes,
            },
            FirstLeaf {
                symbol: Symbol(1),
                lex_mode: LexMode::default(),
            },
            LeafInfo::None,
        )
    }

    #[test]
    fn push_then_pop_round_trips_the_tree() {
        let mut pool = Pool::new();
        let mut stack = Stack::new(StateId(0));
        let v = VersionId(0);
        let t = leaf(&mut pool, 3);
        stack.push(&mut pool, v, t, false, StateId(1));
        assert_eq!(stack.top_state(v), StateId(1));
        assert_eq!(stack.top_position(v).byte, 3);

        let mut slices = stack.pop_count(&mut pool, v, 1);
        assert_eq!(slices.len(), 1);
        let slice = slices.remove(0);
        assert_eq!(slice.trees, vec![t]);
        assert_eq!(stack.top_state(v), StateId(0));
        tree_mod::release(&mut pool, t);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn copy_version_shares_the_head_until_it_diverges() {
        let mut pool = Pool::new();
        let mut stack = Stack::new(StateId(0));
        let v0 = VersionId(0);
        let t = leaf(&mut pool, 1);
        stack.push(&mut pool, v0, t, false, StateId(1));

        let v1 = stack.copy_version(v0);
        assert!(stack.can_merge(v0, v1));
        assert!(stack.merge(&mut pool, v0, v1));
        assert_eq!(stack.version_count(), 1);

        stack.pop_count(&mut pool, v0, 1);
        tree_mod::release(&mut pool, t);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn identical_shifts_from_two_versions_share_one_node() {
        let mut pool = Pool::new();
        let mut stack = Stack::new(StateId(0));
        let v0 = VersionId(0);
        let v1 = stack.copy_version(v0);
        // diverge, then reconverge by pushing the *same* subtree id at the
        // same state from the same predecessor.
        let t = leaf(&mut pool, 2);
        tree_mod::retain(&mut pool, t);
        stack.push(&mut pool, v0, t, false, StateId(2));
        stack.push(&mut pool, v1, t, false, StateId(2));
        assert!(stack.can_merge(v0, v1));

        stack.pop_count(&mut pool, v0, 1);
        stack.pop_count(&mut pool, v1, 1);
        tree_mod::release(&mut pool, t);
        assert_eq!(pool.live_count(), 0);
    }
}
