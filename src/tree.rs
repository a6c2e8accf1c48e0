// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component B: the subtree. `NodeData` is the payload stored in one pool
//! slot; `SubtreeId` (from [`crate::pool`]) is the handle everything else in
//! the crate passes around. Unlike `Rc<T>`, the refcount here is a plain
//! field mutated by `retain`/`release` — the spec calls for an explicit
//! slab-backed pool (§4.A) with a checkable "no marked slots" postcondition
//! (§8), which an `Rc`-based tree would hide behind the allocator.

use crate::language::Language;
use crate::pool::{Pool, SubtreeId};
use crate::types::{AliasInfo, Extent, FirstLeaf, Position, Symbol};

pub use crate::pool::SubtreeId as Subtree;

/// What a leaf (a node with no children) carries beyond the common fields.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafInfo {
    /// A leaf produced by the grammar's own lexer; nothing extra to carry.
    None,
    /// A leaf produced by an external scanner: its serialized state, so the
    /// scanner can be rewound to exactly this point on a later re-lex.
    External(Vec<u8>),
    /// A leaf denoting one unrecognized codepoint, skipped during recovery.
    Unrecognized(char),
}

/// Flags from spec §3. Kept as plain `bool` fields rather than a bitset:
/// there are only seven of them and the spec names each individually, so a
/// struct is more legible than packing them ourselves (unlike the `Vob`
/// bitmaps in [`crate::pool`], which really do want dense storage).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub visible: bool,
    pub named: bool,
    pub extra: bool,
    pub fragile_left: bool,
    pub fragile_right: bool,
    pub has_changes: bool,
    pub has_external_tokens: bool,
}

/// Parent back-pointer info, filled in once by [`crate::parser::populate_context`]
/// after a tree is accepted (see design note in spec §9: "build the tree
/// without parent pointers ... after acceptance walk the root once").
#[derive(Clone, Copy, Debug)]
pub struct Context {
    pub parent: SubtreeId,
    pub index_in_parent: u32,
    pub offset: Position,
}

/// One subtree, as stored in the pool.
#[derive(Clone, Debug)]
pub struct NodeData {
    pub symbol: Symbol,
    pub parse_state: StateOrNone,
    pub alias: Option<AliasInfo>,

    pub padding: Extent,
    pub size: Extent,

    pub children: Vec<SubtreeId>,
    pub visible_child_count: u32,
    pub named_child_count: u32,
    pub alias_sequence_id: Option<u32>,

    pub leaf_info: LeafInfo,

    pub ref_count: u32,
    pub dynamic_precedence: i32,
    pub error_cost: u32,

    pub flags: NodeFlags,

    pub first_leaf: FirstLeaf,
    pub bytes_scanned: u32,

    pub context: Option<Context>,
}

/// `parse_state` is `NONE` for fragile subtrees (invariant 4); kept as its
/// own type instead of bare `StateId` so a reader sees immediately that this
/// one field, uniquely, is allowed to be absent.
pub type StateOrNone = crate::types::StateId;

impl NodeData {
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn total_extent(&self) -> Extent {
        self.padding.add(self.size)
    }

    pub fn is_fragile(&self) -> bool {
        self.flags.fragile_left || self.flags.fragile_right
    }
}

/// Increments a subtree's refcount. Call this whenever a new owner (a stack
/// link, the lookahead register, the cache, a parent's `children` vector)
/// starts holding the id.
pub fn retain(pool: &mut Pool, id: SubtreeId) {
    pool.get_mut(id).ref_count += 1;
}

/// Decrements a subtree's refcount; at zero, releases its children (which
/// may cascade) and returns the slot to the pool.
pub fn release(pool: &mut Pool, id: SubtreeId) {
    let remaining = {
        let node = pool.get_mut(id);
        debug_assert!(node.ref_count > 0, "release of a subtree with ref_count 0");
        node.ref_count -= 1;
        node.ref_count
    };
    if remaining == 0 {
        let children = std::mem::take(&mut pool.get_mut(id).children);
        for child in children {
            release(pool, child);
        }
        pool.free(id);
    }
}

/// Builds a leaf subtree for a token the lexer just produced.
pub fn make_leaf(
    pool: &mut Pool,
    lang: &dyn Language,
    symbol: Symbol,
    padding: Extent,
    size: Extent,
    first_leaf: FirstLeaf,
    leaf_info: LeafInfo,
) -> SubtreeId {
    let meta = lang.symbol_metadata(symbol);
    let error_cost = if symbol == lang.error_symbol() { 1 } else { 0 };
    let data = NodeData {
        symbol,
        parse_state: StateOrNone::NONE,
        alias: None,
        padding,
        size,
        children: Vec::new(),
        visible_child_count: 0,
        named_child_count: 0,
        alias_sequence_id: None,
        leaf_info,
        ref_count: 1,
        dynamic_precedence: 0,
        error_cost,
        flags: NodeFlags {
            visible: meta.visible,
            named: meta.named,
            extra: false,
            fragile_left: false,
            fragile_right: false,
            has_changes: false,
            has_external_tokens: false,
        },
        first_leaf,
        bytes_scanned: size.bytes.max(1),
        context: None,
    };
    pool.allocate(data)
}

/// Builds an interior node from already-allocated children. Takes ownership
/// of the one reference each id in `children` already carries — callers that
/// still need a child afterward (e.g. to put it in two parents, as
/// [`make_copy`] does) must `retain` their own copy first.
/// `dynamic_precedence_increment` is the production's own precedence
/// contribution (dynamic precedence is otherwise inherited and summed from
/// descendants, per spec §4.B).
pub fn make_node(
    pool: &mut Pool,
    lang: &dyn Language,
    symbol: Symbol,
    parse_state: StateOrNone,
    children: Vec<SubtreeId>,
    dynamic_precedence_increment: i32,
    fragile: bool,
    alias: Option<AliasInfo>,
    alias_sequence_id: Option<u32>,
) -> SubtreeId {
    assert!(!children.is_empty(), "make_node requires at least one child");

    let mut padding = Extent::ZERO;
    let mut size = Extent::ZERO;
    let mut error_cost = 0u32;
    let mut dynamic_precedence = dynamic_precedence_increment;
    let mut visible_child_count = 0u32;
    let mut named_child_count = 0u32;
    let mut first_leaf: Option<FirstLeaf> = None;
    let mut has_external_tokens = false;

    for (i, &child) in children.iter().enumerate() {
        let c = pool.get(child);
        if i == 0 {
            padding = c.padding;
            size = c.size;
        } else {
            size = size.add(c.padding).add(c.size);
        }
        error_cost += c.error_cost;
        dynamic_precedence += c.dynamic_precedence;
        if c.flags.visible {
            visible_child_count += 1;
        }
        if c.flags.named {
            named_child_count += 1;
        }
        has_external_tokens |= c.flags.has_external_tokens;
        if first_leaf.is_none() && !c.flags.extra {
            first_leaf = Some(c.first_leaf);
        }
    }
    let first_child = pool.get(children[0]);
    let last_child = pool.get(*children.last().unwrap());
    let fragile_left = fragile || first_child.flags.fragile_left;
    let fragile_right = fragile || last_child.flags.fragile_right;
    let first_leaf = first_leaf.unwrap_or(FirstLeaf { symbol, lex_mode: Default::default() });

    let meta = lang.symbol_metadata(symbol);
    let data = NodeData {
        symbol,
        parse_state: if fragile_left || fragile_right {
            StateOrNone::NONE
        } else {
            parse_state
        },
        alias,
        padding,
        size,
        children,
        visible_child_count,
        named_child_count,
        alias_sequence_id,
        leaf_info: LeafInfo::None,
        ref_count: 1,
        dynamic_precedence,
        error_cost,
        flags: NodeFlags {
            visible: meta.visible,
            named: meta.named,
            extra: false,
            fragile_left,
            fragile_right,
            has_changes: false,
            has_external_tokens,
        },
        first_leaf,
        bytes_scanned: 0,
        context: None,
    };
    pool.allocate(data)
}

/// A shallow copy: children are shared (each gets one more refcount), not
/// deep-cloned. This is the "copy" half of the copy-on-write discipline
/// described in spec §9: whenever code needs to mutate a subtree that may
/// already be observed elsewhere (`ref_count > 1`), it calls `make_copy`
/// first and mutates the copy.
pub fn make_copy(pool: &mut Pool, id: SubtreeId) -> SubtreeId {
    let mut data = pool.get(id).clone();
    for &child in &data.children {
        retain(pool, child);
    }
    data.ref_count = 1;
    pool.allocate(data)
}

/// Copy-on-write: if `id` is uniquely owned, mutate `f` in place and return
/// `id`; otherwise `make_copy` first, release one reference to the original,
/// and mutate the copy. Used by the driver's "mark lookahead extra" step
/// before an `Accept` (spec §4.H) and anywhere else a subtree's flags need
/// changing after publication.
pub fn with_unique<F: FnOnce(&mut NodeData)>(pool: &mut Pool, id: SubtreeId, f: F) -> SubtreeId {
    if pool.get(id).ref_count == 1 {
        f(pool.get_mut(id));
        id
    } else {
        let copy = make_copy(pool, id);
        release(pool, id);
        f(pool.get_mut(copy));
        copy
    }
}

pub fn set_extra(pool: &mut Pool, id: SubtreeId, extra: bool) -> SubtreeId {
    with_unique(pool, id, |n| n.flags.extra = extra)
}

pub fn set_has_external_tokens(pool: &mut Pool, id: SubtreeId) -> SubtreeId {
    with_unique(pool, id, |n| n.flags.has_external_tokens = true)
}

/// Bumps a subtree's `error_cost` by `extra`, used when a token is shifted
/// unconditionally while recovering in `ERROR_STATE` (it wasn't itself
/// malformed, but accepting it outside its normal context still costs).
pub fn add_error_cost(pool: &mut Pool, id: SubtreeId, extra: u32) -> SubtreeId {
    with_unique(pool, id, |n| n.error_cost += extra)
}

/// Records how many bytes the lexer actually looked at while producing this
/// leaf, which may exceed the leaf's own `size` when the lexer peeked past
/// the token to decide it was done (spec §4.E). Always called on a
/// freshly-minted leaf (`ref_count == 1`), so no copy-on-write is needed.
pub fn set_bytes_scanned(pool: &mut Pool, id: SubtreeId, bytes_scanned: u32) {
    pool.get_mut(id).bytes_scanned = bytes_scanned;
}

/// Replaces a subtree's children wholesale, recomputing the aggregate
/// fields that depend on them. Used when breakdown re-derives a coarser
/// reused node's shape (spec §9: "see `replace_children`").
pub fn replace_children(
    pool: &mut Pool,
    lang: &dyn Language,
    id: SubtreeId,
    new_children: Vec<SubtreeId>,
) -> SubtreeId {
    let (symbol, parse_state, fragile, alias, alias_seq) = {
        let n = pool.get(id);
        (
            n.symbol,
            n.parse_state,
            n.is_fragile(),
            n.alias,
            n.alias_sequence_id,
        )
    };
    let old_children = std::mem::take(&mut pool.get_mut(id).children);
    for c in old_children {
        release(pool, c);
    }
    release(pool, id);
    make_node(
        pool, lang, symbol, parse_state, new_children, 0, fragile, alias, alias_seq,
    )
}

/// A leaf marking one skipped run of unrecognized input, produced when the
/// lexer exhausts its internal-lex / external-lex / error-lex attempts at a
/// given position (spec §4.E step 4).
pub fn make_error(
    pool: &mut Pool,
    lang: &dyn Language,
    padding: Extent,
    size: Extent,
    first_error_char: Option<char>,
    error_cost: u32,
) -> SubtreeId {
    let symbol = lang.error_symbol();
    let leaf_info = match first_error_char {
        Some(c) => LeafInfo::Unrecognized(c),
        None => LeafInfo::None,
    };
    let data = NodeData {
        symbol,
        parse_state: StateOrNone::NONE,
        alias: None,
        padding,
        size,
        children: Vec::new(),
        visible_child_count: 0,
        named_child_count: 0,
        alias_sequence_id: None,
        leaf_info,
        ref_count: 1,
        dynamic_precedence: 0,
        error_cost,
        flags: NodeFlags {
            visible: true,
            named: true,
            extra: false,
            fragile_left: false,
            fragile_right: false,
            has_changes: false,
            has_external_tokens: false,
        },
        first_leaf: FirstLeaf { symbol, lex_mode: Default::default() },
        bytes_scanned: size.bytes.max(1),
        context: None,
    };
    pool.allocate(data)
}

/// An interior `ERROR` node wrapping the subtrees skipped during recovery.
pub fn make_error_node(pool: &mut Pool, lang: &dyn Language, children: Vec<SubtreeId>) -> SubtreeId {
    if children.is_empty() {
        return make_error(pool, lang, Extent::ZERO, Extent::ZERO, None, 1);
    }
    let symbol = lang.error_symbol();
    make_node(pool, lang, symbol, StateOrNone::NONE, children, 0, true, None, None)
}

/// Total order used to deterministically break ties between otherwise
/// indistinguishable parses (`select_tree` in the driver).
pub fn compare(pool: &Pool, a: SubtreeId, b: SubtreeId) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let na = pool.get(a);
    let nb = pool.get(b);
    match na.symbol.cmp(&nb.symbol) {
        Ordering::Equal => {}
        other => return other,
    }
    match na.child_count().cmp(&nb.child_count()) {
        Ordering::Equal => {}
        other => return other,
    }
    for (&ca, &cb) in na.children.iter().zip(nb.children.iter()) {
        match compare(pool, ca, cb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Structural equality modulo identity: same symbol/alias/extents/leaf
/// payload, and recursively-equal children.
pub fn eq(pool: &Pool, a: SubtreeId, b: SubtreeId) -> bool {
    if a == b {
        return true;
    }
    let na = pool.get(a);
    let nb = pool.get(b);
    if na.symbol != nb.symbol
        || na.alias != nb.alias
        || na.padding != nb.padding
        || na.size != nb.size
        || na.child_count() != nb.child_count()
    {
        return false;
    }
    match (&na.leaf_info, &nb.leaf_info) {
        (LeafInfo::None, LeafInfo::None) => {}
        (LeafInfo::Unrecognized(x), LeafInfo::Unrecognized(y)) if x == y => {}
        (LeafInfo::External(x), LeafInfo::External(y)) if x == y => {}
        _ if na.is_leaf() && nb.is_leaf() => return false,
        _ => {}
    }
    na.children
        .iter()
        .zip(nb.children.iter())
        .all(|(&ca, &cb)| eq(pool, ca, cb))
}

/// Compares two external-token-state blobs; both absent counts as equal
/// (spec §4.B).
pub fn external_token_state_eq(a: Option<&[u8]>, b: Option<&[u8]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::language::tests::test_language;
    use crate::types::{FirstLeaf, LexMode};

    fn leaf(pool: &mut Pool, lang: &dyn Language, sym: u16, bytes: u32) -> SubtreeId {
        make_leaf(
            pool,
            lang,
            Symbol(sym),
            Extent::ZERO,
            Extent {
                bytes,
                chars: bytes,
                rows: 0,
                columns: bytes,
            },
            FirstLeaf {
                symbol: Symbol(sym),
                lex_mode: LexMode::default(),
            },
            LeafInfo::None,
        )
    }

    #[test]
    fn make_node_sums_byte_extents() {
        let lang = test_language();
        let mut pool = Pool::new();
        let a = leaf(&mut pool, &lang, 1, 3);
        let b = leaf(&mut pool, &lang, 2, 4);
        let node = make_node(
            &mut pool,
            &lang,
            Symbol(10),
            StateOrNone::from(0u16),
            vec![a, b],
            0,
            false,
            None,
            None,
        );
        let n = pool.get(node);
        assert_eq!(n.total_extent().bytes, 7);
        assert_eq!(n.child_count(), 2);
        release(&mut pool, node);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn release_is_recursive_and_frees_pool_slots() {
        let lang = test_language();
        let mut pool = Pool::new();
        let a = leaf(&mut pool, &lang, 1, 1);
        let b = leaf(&mut pool, &lang, 2, 1);
        let node = make_node(
            &mut pool,
            &lang,
            Symbol(10),
            StateOrNone::from(0u16),
            vec![a, b],
            0,
            false,
            None,
            None,
        );
        assert!(pool.live_count() >= 3);
        release(&mut pool, node);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn make_copy_shares_children() {
        let lang = test_language();
        let mut pool = Pool::new();
        let a = leaf(&mut pool, &lang, 1, 1);
        let node = make_node(
            &mut pool,
            &lang,
            Symbol(10),
            StateOrNone::from(0u16),
            vec![a],
            0,
            false,
            None,
            None,
        );
        let copy = make_copy(&mut pool, node);
        assert!(eq(&pool, node, copy));
        release(&mut pool, node);
        // the shared child is still alive via `copy`
        assert!(pool.live_count() >= 2);
        release(&mut pool, copy);
        assert_eq!(pool.live_count(), 0);
    }
}
