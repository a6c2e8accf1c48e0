// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component D: the token cache. A single slot remembering the last token
//! [`crate::lexer::lex`] produced, so that when several stack versions share
//! a lookahead position (the common case right after a shift) only the first
//! one actually calls the lexer.

use crate::tree::{self, Subtree};

/// `(byte_index, last_external_token, produced_token)`. Eviction is
/// implicit: a lookup at a different `(byte_index, last_external_token)`
/// pair is simply a miss, and [`TokenCache::store`] overwrites the slot.
pub struct TokenCache {
    slot: Option<Entry>,
}

struct Entry {
    byte_index: u32,
    last_external_token: Option<Vec<u8>>,
    produced_token: Subtree,
}

impl TokenCache {
    pub fn new() -> Self {
        TokenCache { slot: None }
    }

    /// Returns the cached token if it was produced from the same position
    /// with the same external-scanner state, bumping its refcount on the
    /// caller's behalf (the caller is about to adopt it as a lookahead).
    pub fn get(
        &self,
        pool: &mut crate::pool::Pool,
        byte_index: u32,
        last_external_token: Option<&[u8]>,
    ) -> Option<Subtree> {
        let entry = self.slot.as_ref()?;
        if entry.byte_index != byte_index
            || !tree::external_token_state_eq(entry.last_external_token.as_deref(), last_external_token)
        {
            return None;
        }
        tree::retain(pool, entry.produced_token);
        Some(entry.produced_token)
    }

    /// Replaces the cache slot, releasing whatever token it previously held.
    pub fn store(
        &mut self,
        pool: &mut crate::pool::Pool,
        byte_index: u32,
        last_external_token: Option<Vec<u8>>,
        produced_token: Subtree,
    ) {
        tree::retain(pool, produced_token);
        if let Some(old) = self.slot.take() {
            tree::release(pool, old.produced_token);
        }
        self.slot = Some(Entry {
            byte_index,
            last_external_token,
            produced_token,
        });
    }

    /// Drops the cached token, if any. Used when the driver discards a
    /// whole round's worth of lookahead state (e.g. on a hard reset).
    pub fn clear(&mut self, pool: &mut crate::pool::Pool) {
        if let Some(old) = self.slot.take() {
            tree::release(pool, old.produced_token);
        }
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TokenCache {
    fn drop(&mut self) {
        debug_assert!(
            self.slot.is_none(),
            "TokenCache dropped with a live entry; call clear() with the owning pool first"
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::language::tests::test_language;
    use crate::pool::Pool;
    use crate::tree::LeafInfo;
    use crate::types::{Extent, FirstLeaf, LexMode, Symbol};

    fn leaf(pool: &mut Pool) -> Subtree {
        let lang = test_language();
        tree::make_leaf(
            pool,
            &lang,
            Symbol(1),
            Extent::ZERO,
            Extent {
                bytes: 1,
                chars: 1,
                rows: 0,
                columns: 1,
            },
            FirstLeaf {
                symbol: Symbol(1),
                lex_mode: LexMode::default(),
            },
            LeafInfo::None,
        )
    }

    #[test]
    fn hits_on_matching_position_and_external_state() {
        let mut pool = Pool::new();
        let mut cache = TokenCache::new();
        let tok = leaf(&mut pool);
        cache.store(&mut pool, 5, None, tok);

        let hit = cache.get(&mut pool, 5, None);
        assert_eq!(hit, Some(tok));
        tree::release(&mut pool, hit.unwrap());

        assert!(cache.get(&mut pool, 6, None).is_none());
        assert!(cache.get(&mut pool, 5, Some(b"x")).is_none());

        cache.clear(&mut pool);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn store_evicts_previous_entry() {
        let mut pool = Pool::new();
        let mut cache = TokenCache::new();
        let first = leaf(&mut pool);
        let second = leaf(&mut pool);
        cache.store(&mut pool, 0, None, first);
        cache.store(&mut pool, 1, None, second);
        assert!(cache.get(&mut pool, 0, None).is_none());
        assert_eq!(cache.get(&mut pool, 1, None), Some(second));
        tree::release(&mut pool, second);
        cache.clear(&mut pool);
        assert_eq!(pool.live_count(), 0);
    }
}
