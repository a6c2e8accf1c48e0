// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component C: the reusable-node cursor. Walks a previous tree in byte
//! order during incremental re-parsing; together with the token cache
//! (component D), it's the only thing standing between a re-parse and
//! re-lexing the whole input from scratch.

use crate::pool::Pool;
use crate::tree::{LeafInfo, Subtree};
use crate::types::Position;

/// A position in a previous tree: the path from the root down to the
/// current node (`nodes[0]` is the root, `nodes.last()` is current), plus
/// the cumulative byte/point offset of that node's start.
pub struct Cursor {
    nodes: Vec<Subtree>,
    /// `indices[i]` is the child index of `nodes[i + 1]` within `nodes[i]`.
    indices: Vec<usize>,
    position: Position,
    last_external_token: Option<Vec<u8>>,
}

impl Cursor {
    pub fn new(root: Subtree) -> Self {
        Cursor {
            nodes: vec![root],
            indices: Vec::new(),
            position: Position::ZERO,
            last_external_token: None,
        }
    }

    /// The subtree at the cursor's current position, or `None` once the
    /// cursor has walked off the end of the tree.
    pub fn current(&self) -> Option<Subtree> {
        self.nodes.last().copied()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn last_external_token(&self) -> Option<&[u8]> {
        self.last_external_token.as_deref()
    }

    /// Descends into the current node's first child, leaving `position`
    /// unchanged (a node and its first child always start at the same
    /// offset, since the node's padding equals its first child's padding).
    /// Returns `false`, doing nothing, if the current node is a leaf.
    pub fn breakdown(&mut self, pool: &Pool) -> bool {
        let Some(cur) = self.current() else { return false };
        let node = pool.get(cur);
        if node.is_leaf() {
            return false;
        }
        self.nodes.push(node.children[0]);
        self.indices.push(0);
        true
    }

    /// Consumes the current node (advancing `position` past its full
    /// extent) and moves to the next sibling, unwinding to the next aunt
    /// as needed. Returns `false` if this walks the cursor off the tree.
    pub fn advance(&mut self, pool: &Pool) -> bool {
        let Some(cur) = self.current() else { return false };
        let node = pool.get(cur);
        self.position = self.position.advance(node.total_extent());
        if let LeafInfo::External(state) = &node.leaf_info {
            self.last_external_token = Some(state.clone());
        }
        self.move_to_next_sibling(pool)
    }

    /// Alias for [`Cursor::advance`], named to match spec vocabulary for
    /// the common case of skipping a leaf outright (no breakdown attempt).
    pub fn pop_leaf(&mut self, pool: &Pool) -> bool {
        self.advance(pool)
    }

    /// Unwinds one level without consuming anything — used when a
    /// `breakdown` turns out not to lead anywhere useful and the driver
    /// wants to retry reuse at the coarser, parent granularity.
    pub fn pop(&mut self) -> bool {
        if self.nodes.len() <= 1 {
            return false;
        }
        self.nodes.pop();
        self.indices.pop();
        true
    }

    fn move_to_next_sibling(&mut self, pool: &Pool) -> bool {
        loop {
            if self.nodes.len() <= 1 {
                self.nodes.clear();
                self.indices.clear();
                return false;
            }
            let parent = self.nodes[self.nodes.len() - 2];
            let idx = *self.indices.last().unwrap();
            let parent_node = pool.get(parent);
            if idx + 1 < parent_node.child_count() {
                let next = parent_node.children[idx + 1];
                *self.indices.last_mut().unwrap() = idx + 1;
                *self.nodes.last_mut().unwrap() = next;
                return true;
            }
            self.nodes.pop();
            self.indices.pop();
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::language::tests::test_language;
    use crate::tree::{self, StateOrNone};
    use crate::types::{Extent, FirstLeaf, LexMode, Symbol};

    fn leaf(pool: &mut Pool, lang: &dyn crate::language::Language, sym: u16, bytes: u32) -> Subtree {
        tree::make_leaf(
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
    fn walks_leaves_in_byte_order() {
        let lang = test_language();
        let mut pool = Pool::new();
        let a = leaf(&mut pool, &lang, 1, 2);
        let b = leaf(&mut pool, &lang, 2, 3);
        let root = tree::make_node(
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

        let mut cursor = Cursor::new(root);
        assert!(cursor.breakdown(&pool));
        assert_eq!(cursor.position().byte, 0);
        assert!(cursor.advance(&pool));
        assert_eq!(cursor.position().byte, 2);
        assert_eq!(cursor.current(), Some(b));
        assert!(!cursor.advance(&pool));
        assert!(cursor.is_exhausted());

        tree::release(&mut pool, root);
        assert_eq!(pool.live_count(), 0);
    }
}
