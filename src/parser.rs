// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component H: the parser driver. Ties every other component together —
//! the stack (G) supplies versions to advance, the lexer (E, backed by the
//! cursor C and cache D) supplies lookahead, the language table (F) supplies
//! actions, and the driver mutates the stack accordingly, round-robin over
//! every live version, until one version accepts or every version halts.

use std::collections::HashMap;

use crate::cache::TokenCache;
use crate::config::ParserConfig;
use crate::cursor::Cursor;
use crate::language::{Language, ParseAction};
use crate::lexer::{self, ExternalScanner};
use crate::logger::{LogType, Logger};
use crate::pool::Pool;
use crate::recovery::{self, RecoverOutcome};
use crate::stack::{Stack, VersionId};
use crate::tree::{self, Context, StateOrNone, Subtree};
use crate::types::{Point, Position, StateId, Symbol};

/// §1B: a finished parse. Holds only the accepted root; the `Language` it
/// was parsed against is a borrow the caller already has, not stored here.
pub struct Tree {
    root: Subtree,
}

impl Tree {
    pub fn root(&self) -> Subtree {
        self.root
    }

    pub fn root_node_state(&self, pool: &Pool) -> StateOrNone {
        pool.get(self.root).parse_state
    }

    /// Releases the root's strong reference, recursively freeing whatever
    /// this was the last owner of.
    pub fn release(self, pool: &mut Pool) {
        tree::release(pool, self.root);
    }
}

/// §1B: the edit record. The pass that walks a prior tree applying this
/// (setting `has_changes`, rewriting ancestor padding/size) is an external
/// collaborator; this crate only needs the record to exist as the shape of
/// a prior tree's "already edited" input to `parse`.
#[derive(Clone, Copy, Debug)]
pub struct Edit {
    pub start_byte: u32,
    pub old_end_byte: u32,
    pub new_end_byte: u32,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl Edit {
    /// Validates the byte-offset ordering an edit must satisfy before it is
    /// meaningful to the (external) application pass: both ends of the
    /// edited region start no earlier than `start_byte`.
    pub fn new(
        start_byte: u32,
        old_end_byte: u32,
        new_end_byte: u32,
        start_point: Point,
        old_end_point: Point,
        new_end_point: Point,
    ) -> Result<Edit, crate::error::EditError> {
        if old_end_byte < start_byte || new_end_byte < start_byte {
            return Err(crate::error::EditError::OutOfOrder { start_byte, old_end_byte, new_end_byte });
        }
        Ok(Edit {
            start_byte,
            old_end_byte,
            new_end_byte,
            start_point,
            old_end_point,
            new_end_point,
        })
    }
}

/// §1B: debug/trace counters returned alongside a finished tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseStats {
    pub bytes_lexed: u64,
    pub tokens_cache_hit: u64,
    pub tokens_lexed: u64,
    pub tokens_reused: u64,
    pub versions_created: u64,
    pub merges_performed: u64,
    pub max_live_version_count: usize,
}

/// Walks `root` once, post-order, filling in `context` on every descendant
/// (spec §9 "build the tree without parent pointers ... after acceptance
/// walk the root once").
pub fn populate_context(pool: &mut Pool, root: Subtree) {
    fn walk(pool: &mut Pool, node: Subtree, parent: Option<(Subtree, u32)>, offset: Position) {
        let ctx = parent.map(|(p, index_in_parent)| Context {
            parent: p,
            index_in_parent,
            offset,
        });
        pool.get_mut(node).context = ctx;
        let child_count = pool.get(node).child_count();
        let mut child_offset = offset.advance(pool.get(node).padding);
        for i in 0..child_count {
            let child = pool.get(node).children[i];
            walk(pool, child, Some((node, i as u32)), child_offset);
            child_offset = child_offset.advance(pool.get(child).total_extent());
        }
    }
    walk(pool, root, None, Position::ZERO);
}

/// Spec §4.H `select_tree`: deterministic choice among alternative parses
/// of the same input range. Returns whichever of `a`/`b` should survive;
/// the caller releases the loser.
pub(crate) fn select_tree(pool: &Pool, a: Subtree, b: Subtree) -> Subtree {
    let na = pool.get(a);
    let nb = pool.get(b);
    if na.error_cost != nb.error_cost {
        return if na.error_cost < nb.error_cost { a } else { b };
    }
    if na.dynamic_precedence != nb.dynamic_precedence {
        return if na.dynamic_precedence > nb.dynamic_precedence { a } else { b };
    }
    match tree::compare(pool, a, b) {
        std::cmp::Ordering::Greater => b,
        _ => a,
    }
}

struct ReduceCandidate {
    version: VersionId,
    parent: Subtree,
    extras: Vec<Subtree>,
    next_state: StateId,
}

/// Spec §4.H, the `Reduce` bullet. Always forks a fresh version off `v` via
/// `copy_version` — `v` itself is left untouched so the driver can still try
/// a `Shift`/`Accept` later in the same action list (step 4: "if any reduce
/// fired but none shifted/accepted/recovered, renumber the last reduction's
/// version back to v").
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute_reduce(
    pool: &mut Pool,
    lang: &dyn Language,
    stack: &mut Stack,
    v: VersionId,
    symbol: Symbol,
    child_count: u32,
    dyn_precedence: i32,
    alias_sequence_id: Option<u32>,
    fragile: bool,
    in_ambiguity: bool,
) -> VersionId {
    let multiple_versions = stack.version_count() > 1;
    let fork = stack.copy_version(v);
    let slices = stack.pop_count(pool, fork, child_count as usize);
    let multiple_slices = slices.len() > 1;
    let fragile_flag = fragile || in_ambiguity || multiple_slices || multiple_versions;

    let mut winner: Option<ReduceCandidate> = None;

    for slice in slices {
        let mut trees = slice.trees;
        let mut extras = Vec::new();
        while matches!(trees.last(), Some(&t) if pool.get(t).flags.extra) {
            extras.push(trees.pop().unwrap());
        }
        extras.reverse();
        assert!(
            !trees.is_empty(),
            "epsilon reductions (child_count producing zero non-extra children) are not \
             exercised by this table-driven core"
        );

        let state_after_pop = stack.top_state(slice.version);
        let next_state = lang.next_state(state_after_pop, symbol);
        let parent = tree::make_node(
            pool,
            lang,
            symbol,
            StateOrNone::from(next_state.0),
            trees,
            dyn_precedence,
            fragile_flag,
            None,
            alias_sequence_id,
        );
        let candidate = ReduceCandidate {
            version: slice.version,
            parent,
            extras,
            next_state,
        };

        winner = Some(match winner {
            None => candidate,
            Some(prev) => {
                if select_tree(pool, prev.parent, candidate.parent) == prev.parent {
                    tree::release(pool, candidate.parent);
                    for e in candidate.extras {
                        tree::release(pool, e);
                    }
                    stack.remove_version(pool, candidate.version);
                    prev
                } else {
                    tree::release(pool, prev.parent);
                    for e in prev.extras {
                        tree::release(pool, e);
                    }
                    stack.remove_version(pool, prev.version);
                    candidate
                }
            }
        });
    }

    let winner = winner.expect("pop_count always returns at least one slice");
    stack.push(pool, winner.version, winner.parent, false, winner.next_state);
    for extra in winner.extras {
        stack.push(pool, winner.version, extra, true, winner.next_state);
    }
    winner.version
}

/// Descends into the first child repeatedly while the subtree's stored
/// `parse_state` disagrees with `state`, releasing each superseded node and
/// retaining the child it exposes (spec §4.H "Break-down of interior
/// lookahead").
fn break_down_interior_lookahead(pool: &mut Pool, state: StateId, mut lookahead: Subtree) -> Subtree {
    loop {
        let n = pool.get(lookahead);
        if n.is_leaf() || n.parse_state == state {
            return lookahead;
        }
        let child = n.children[0];
        tree::retain(pool, child);
        let old = lookahead;
        lookahead = child;
        tree::release(pool, old);
    }
}

/// Descends all the way to a leaf, used before invoking recovery (spec
/// §4.H `Recover`: "break down lookahead to its first leaf").
fn break_down_to_leaf(pool: &mut Pool, mut lookahead: Subtree) -> Subtree {
    loop {
        let n = pool.get(lookahead);
        if n.is_leaf() {
            return lookahead;
        }
        let child = n.children[0];
        tree::retain(pool, child);
        let old = lookahead;
        lookahead = child;
        tree::release(pool, old);
    }
}

/// Whether `candidate` is reusable as the lookahead for `v` sitting in
/// `state` (spec §4.H `get_lookahead`, the rejection list).
fn reuse_is_acceptable(pool: &Pool, lang: &dyn Language, state: StateId, candidate: Subtree) -> bool {
    let n = pool.get(candidate);
    if n.flags.has_changes || n.symbol == lang.error_symbol() || n.is_fragile() {
        return false;
    }
    let (reusable, depends_on_lookahead) = lang.is_reusable(state, n.symbol);
    if !reusable {
        return false;
    }
    if depends_on_lookahead {
        // Only a large, error-free interior node is worth the risk of
        // reusing something whose shape could depend on what follows it.
        return !n.is_leaf() && n.error_cost == 0 && n.size.bytes > 0;
    }
    true
}

/// Spec §4.H `get_lookahead`: cursor, then cache, then the lexer, retrying
/// with a finer-grained cursor position on rejection.
#[allow(clippy::too_many_arguments)]
fn get_lookahead(
    pool: &mut Pool,
    lang: &dyn Language,
    scanner: Option<&mut dyn ExternalScanner>,
    input: &[u8],
    cursor: &mut Option<Cursor>,
    cache: &mut TokenCache,
    state: StateId,
    position: Position,
    stats: &mut ParseStats,
    logger: &mut Logger,
) -> Subtree {
    if let Some(c) = cursor.as_mut() {
        loop {
            match c.current() {
                Some(candidate) if c.position() == position => {
                    if reuse_is_acceptable(pool, lang, state, candidate) {
                        tree::retain(pool, candidate);
                        stats.tokens_reused += 1;
                        return candidate;
                    }
                    if !c.breakdown(pool) {
                        c.advance(pool);
                        break;
                    }
                }
                Some(_) => break,
                None => break,
            }
        }
    }

    let lex_mode = lang.lex_mode(state);
    let last_external = cursor.as_ref().and_then(|c| c.last_external_token().map(|b| b.to_vec()));
    if let Some(hit) = cache.get(pool, position.byte, last_external.as_deref()) {
        stats.tokens_cache_hit += 1;
        return hit;
    }

    let result = lexer::lex(
        pool,
        lang,
        scanner,
        input,
        position,
        lex_mode,
        state == lang.error_state(),
        1,
        logger,
    );
    stats.tokens_lexed += 1;
    stats.bytes_lexed += pool.get(result.leaf).total_extent().bytes as u64;
    cache.store(pool, position.byte, last_external, result.leaf);
    result.leaf
}

/// Spec §4.H `compare_versions` verdicts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CompareVerdict {
    TakeLeft,
    TakeRight,
    PreferLeft,
    PreferRight,
    None,
}

/// Spec §4.H `compare_versions`: (1) not-in-error beats in-error; (2) same
/// status, lower cost wins, `Take` if the gap (scaled by the winner's push
/// count) exceeds `max_cost_difference`, else `Prefer`; (3) otherwise `None`.
pub(crate) fn compare_versions(
    pool: &Pool,
    lang: &dyn Language,
    stack: &Stack,
    config: &ParserConfig,
    a: VersionId,
    b: VersionId,
) -> CompareVerdict {
    let penalty = recovery::discontinuity_penalty();
    let a_in_error = stack.top_state(a) == lang.error_state();
    let b_in_error = stack.top_state(b) == lang.error_state();
    let a_cost = stack.error_cost(pool, a, penalty);
    let b_cost = stack.error_cost(pool, b, penalty);

    if a_in_error != b_in_error {
        return if a_in_error {
            take_or_prefer(b_cost, a_cost, stack.push_count(b), config, CompareVerdict::TakeRight, CompareVerdict::PreferRight)
        } else {
            take_or_prefer(a_cost, b_cost, stack.push_count(a), config, CompareVerdict::TakeLeft, CompareVerdict::PreferLeft)
        };
    }

    if a_cost != b_cost {
        return if a_cost < b_cost {
            take_or_prefer(a_cost, b_cost, stack.push_count(a), config, CompareVerdict::TakeLeft, CompareVerdict::PreferLeft)
        } else {
            take_or_prefer(b_cost, a_cost, stack.push_count(b), config, CompareVerdict::TakeRight, CompareVerdict::PreferRight)
        };
    }

    CompareVerdict::None
}

fn take_or_prefer(
    winner_cost: u32,
    loser_cost: u32,
    winner_push_count: u32,
    config: &ParserConfig,
    take: CompareVerdict,
    prefer: CompareVerdict,
) -> CompareVerdict {
    let gap = loser_cost.saturating_sub(winner_cost) as u64 * (1 + winner_push_count as u64);
    if gap > config.max_cost_difference as u64 {
        take
    } else {
        prefer
    }
}

/// Spec §4.H `better_version_exists`: any other live version that would beat
/// `v` under `compare_versions`, or a finished tree already cheap enough.
pub(crate) fn better_version_exists(
    pool: &Pool,
    lang: &dyn Language,
    stack: &Stack,
    config: &ParserConfig,
    v: VersionId,
    finished_tree_cost: Option<u32>,
) -> bool {
    if let Some(finished_cost) = finished_tree_cost {
        let penalty = recovery::discontinuity_penalty();
        if finished_cost <= stack.error_cost(pool, v, penalty) {
            return true;
        }
    }
    stack.live_versions().into_iter().filter(|&other| other != v).any(|other| {
        matches!(
            compare_versions(pool, lang, stack, config, other, v),
            CompareVerdict::TakeLeft | CompareVerdict::PreferLeft
        )
    })
}

/// Spec §4.H `condense_stack`: drop halted versions, resolve every pair via
/// `compare_versions`, then truncate to `max_version_count`. Returns
/// `should_halt`.
///
/// The reference algorithm decrements both loop indices on certain verdicts;
/// the nested `while i < len`/`while j < i` shape below preserves that —
/// whichever index a removal invalidates is decremented so every remaining
/// pair is still compared exactly once (spec §9 open question).
pub(crate) fn condense_stack(
    pool: &mut Pool,
    lang: &dyn Language,
    stack: &mut Stack,
    config: &ParserConfig,
    finished_tree_cost: Option<u32>,
) -> bool {
    let mut versions: Vec<VersionId> = stack
        .live_versions()
        .into_iter()
        .filter(|&v| !stack.is_halted(v))
        .collect();
    for v in stack.live_versions() {
        if stack.is_halted(v) {
            stack.remove_version(pool, v);
        }
    }
    versions.retain(|&v| !stack.is_halted(v));

    let mut i = 1usize;
    while i < versions.len() {
        let mut j = 0usize;
        while j < i {
            let (a, b) = (versions[j], versions[i]);
            match compare_versions(pool, lang, stack, config, a, b) {
                CompareVerdict::TakeLeft => {
                    stack.remove_version(pool, b);
                    versions.remove(i);
                    i = i.wrapping_sub(1);
                    break;
                }
                CompareVerdict::TakeRight => {
                    stack.remove_version(pool, a);
                    versions.remove(j);
                    i -= 1;
                    j = j.wrapping_sub(1);
                }
                CompareVerdict::PreferLeft => {
                    if stack.merge(pool, a, b) {
                        versions.remove(i);
                        i = i.wrapping_sub(1);
                        break;
                    }
                }
                CompareVerdict::PreferRight => {
                    if stack.merge(pool, b, a) {
                        versions[j] = b;
                        versions.remove(i);
                        i = i.wrapping_sub(1);
                        break;
                    }
                }
                CompareVerdict::None => {
                    if stack.can_merge(a, b) {
                        stack.force_merge(pool, a, b);
                        versions.remove(i);
                        i = i.wrapping_sub(1);
                        break;
                    }
                }
            }
            j = j.wrapping_add(1);
        }
        i = i.wrapping_add(1);
    }

    while versions.len() > config.max_version_count {
        let extra = versions.pop().unwrap();
        stack.remove_version(pool, extra);
    }

    let all_in_error = versions.iter().all(|&v| stack.top_state(v) == lang.error_state());
    let finished_dominates = finished_tree_cost.is_some_and(|finished_cost| {
        let penalty = recovery::discontinuity_penalty();
        versions.iter().all(|&v| finished_cost < stack.error_cost(pool, v, penalty))
    });
    versions.is_empty() || all_in_error || finished_dominates
}

/// Spec §4.H `halt_parse`: the lexer advances straight to EOF, the
/// remaining bytes become a single error leaf wrapped in an ERROR node,
/// and EOF is accepted — producing a tree that still covers the whole
/// input even when the embedder asked to halt on the first error.
fn halt_parse(pool: &mut Pool, lang: &dyn Language, input: &[u8], position: Position) -> Subtree {
    let remaining = input.len() as u32 - position.byte;
    let size = crate::types::Extent {
        bytes: remaining,
        chars: remaining,
        rows: 0,
        columns: remaining,
    };
    let leaf = tree::make_error(pool, lang, crate::types::Extent::ZERO, size, None, remaining.max(1));
    tree::make_error_node(pool, lang, vec![leaf])
}

/// Bundles the mutable state one parse run needs (spec §9: "the `Parser`
/// record bundles all mutable state; multiple parsers may coexist").
/// Borrowed resources that only live for the duration of one `run` call
/// (the language table, the input buffer, an external scanner, the logger)
/// are threaded through as parameters instead of stored fields, so a
/// `Parser` itself carries no lifetime.
pub struct Parser {
    pool: Pool,
    stack: Stack,
    cache: TokenCache,
    cursor: Option<Cursor>,
    stats: ParseStats,
    finished_tree: Option<Subtree>,
}

impl Parser {
    /// The pool backing every subtree this parser has allocated. Exposed so
    /// a caller can release a finished [`Tree`] (whose `release` takes
    /// `&mut Pool`) and, in tests, check [`Pool::live_count`] for leaks.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn new() -> Self {
        Parser {
            pool: Pool::new(),
            stack: Stack::new(StateId::START),
            cache: TokenCache::new(),
            cursor: None,
            stats: ParseStats::default(),
            finished_tree: None,
        }
    }

    /// Spec §6 parse entry point: `parse(input, previous_tree_or_null,
    /// halt_on_error) → tree`.
    pub fn run(
        &mut self,
        lang: &dyn Language,
        input: &[u8],
        previous_tree: Option<&Tree>,
        mut scanner: Option<&mut dyn ExternalScanner>,
        config: ParserConfig,
        mut logger: Logger,
    ) -> (Tree, ParseStats) {
        self.cursor = previous_tree.map(|t| Cursor::new(t.root));
        if let Some(t) = previous_tree {
            tree::retain(&mut self.pool, t.root);
        }

        let mut last_seen_position: HashMap<VersionId, Position> = HashMap::new();

        loop {
            let live = self.stack.live_versions();
            self.stats.max_live_version_count = self.stats.max_live_version_count.max(live.len());

            if live.is_empty() {
                break;
            }
            if live.iter().all(|&v| self.stack.is_halted(v)) {
                break;
            }

            for v in live {
                if self.stack.is_halted(v) {
                    continue;
                }
                let state = self.stack.top_state(v);
                let position = self.stack.top_position(v);

                if config.halt_on_error && state == lang.error_state() {
                    let error_tree = halt_parse(&mut self.pool, lang, input, position);
                    self.accept_subtree(lang, error_tree);
                    self.stack.halt(v);
                    continue;
                }

                let more_than_one = self.stack.version_count() > 1;
                if more_than_one && last_seen_position.get(&v) == Some(&position) {
                    continue;
                }
                last_seen_position.insert(v, position);

                let lookahead = get_lookahead(
                    &mut self.pool,
                    lang,
                    scanner.as_deref_mut(),
                    input,
                    &mut self.cursor,
                    &mut self.cache,
                    state,
                    position,
                    &mut self.stats,
                    &mut logger,
                );
                let symbol = self.pool.get(lookahead).symbol;
                logger.log(LogType::Parse, || {
                    format!("state={} position={} symbol={:?}", state.0, position.byte, symbol.0)
                });

                self.step(lang, v, lookahead, symbol, state, &config);

                // Spec §4.G `record_summary`: append this version's
                // (position, state) to its trail whenever it's sitting in a
                // non-error state at the end of a turn, so a *later* error on
                // this same version has real history for `recover` to search
                // — recording `ERROR_STATE` itself would be useless, since
                // `recover` is trying to escape that state, not return to it.
                if self.stack.live_versions().contains(&v)
                    && !self.stack.is_halted(v)
                    && self.stack.top_state(v) != lang.error_state()
                {
                    self.stack.record_summary(v, config.max_summary_depth);
                }
            }

            let finished_cost = self.finished_tree.map(|t| self.pool.get(t).error_cost);
            let should_halt = condense_stack(&mut self.pool, lang, &mut self.stack, &config, finished_cost);
            if should_halt {
                break;
            }
        }

        let root = self.finished_tree.take().unwrap_or_else(|| {
            let position = Position::ZERO;
            halt_parse(&mut self.pool, lang, input, position)
        });
        populate_context(&mut self.pool, root);

        // The cursor never owns the references it walks past (it only
        // borrows ids out of the pool, see `cursor.rs`); the one reference
        // this call retained up front to keep `previous_tree`'s root alive
        // for the duration of the walk is released here now that the
        // cursor is done with it.
        if let Some(t) = previous_tree {
            tree::release(&mut self.pool, t.root());
        }
        self.cursor = None;
        self.cache.clear(&mut self.pool);

        (Tree { root }, self.stats)
    }

    /// Spec §4.H main loop steps 3-6 for one version's one turn.
    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        lang: &dyn Language,
        v: VersionId,
        lookahead: Subtree,
        symbol: Symbol,
        state: StateId,
        config: &ParserConfig,
    ) {
        let mut state = state;
        let mut actions = lang.actions(state, symbol).to_vec();

        // "Break-down of top-of-stack": if nothing matches, the top of the
        // stack may be a too-coarse reused interior subtree. Pop its pending
        // links, re-push their children one at a time (recomputing state via
        // `next_state` as we go), and retry the lookup at the finer state
        // this exposes before falling back to error handling.
        if actions.is_empty() && self.breakdown_top_of_stack(lang, v) {
            state = self.stack.top_state(v);
            actions = lang.actions(state, symbol).to_vec();
        }

        if actions.is_empty() {
            // Step 5: in ERROR_STATE, anything shifts — accumulate the
            // skipped token's cost and keep going rather than re-entering
            // `handle_error` (which would otherwise spin forever in a
            // version that's already recovering).
            if state == lang.error_state() {
                let bumped = tree::add_error_cost(&mut self.pool, lookahead, 1);
                self.stack.push(&mut self.pool, v, bumped, false, state);
                return;
            }
            // Step 6.
            tree::release(&mut self.pool, lookahead);
            let finished_cost = self.finished_tree.map(|t| self.pool.get(t).error_cost);
            recovery::handle_error(&mut self.pool, lang, &mut self.stack, config, v, finished_cost);
            return;
        }

        let in_ambiguity = actions.len() > 1;
        let mut reduce_fork: Option<VersionId> = None;
        let mut handled = false;

        for action in actions {
            match action {
                ParseAction::Shift { state: new_state, extra } => {
                    self.do_shift(lang, v, lookahead, new_state, extra, state);
                    handled = true;
                    break;
                }
                ParseAction::Accept => {
                    self.do_accept(lang, v, lookahead);
                    handled = true;
                    break;
                }
                ParseAction::Recover => {
                    self.do_recover(lang, v, lookahead, symbol, config);
                    handled = true;
                    break;
                }
                ParseAction::Reduce {
                    symbol: rsym,
                    child_count,
                    dyn_precedence,
                    alias_sequence_id,
                    fragile,
                    extra: _,
                } => {
                    let forked = execute_reduce(
                        &mut self.pool,
                        lang,
                        &mut self.stack,
                        v,
                        rsym,
                        child_count,
                        dyn_precedence,
                        alias_sequence_id,
                        fragile,
                        in_ambiguity,
                    );
                    reduce_fork = Some(forked);
                }
            }
        }

        if !handled {
            if let Some(forked) = reduce_fork {
                // Step 4: the reductions tried all forked away from `v`
                // without a shift/accept/recover firing; fold the winning
                // fork's state back onto `v`'s slot so next round resumes
                // from there, and release the now-unused lookahead.
                tree::release(&mut self.pool, lookahead);
                self.stack.renumber_version(&mut self.pool, forked, v);
            } else {
                tree::release(&mut self.pool, lookahead);
            }
        }
    }

    /// Spec §4.H "Break-down of top-of-stack": pops every pending link off
    /// `v`'s top, re-pushing each popped subtree's children one at a time at
    /// freshly computed states, converting an opportunistically-reused
    /// interior node back into the finer-grained parse the current lookahead
    /// needs. Returns whether anything actually changed.
    fn breakdown_top_of_stack(&mut self, lang: &dyn Language, v: VersionId) -> bool {
        let mut changed = false;
        while self.stack.top_is_pending(v) {
            let Some(subtree) = self.stack.pop_pending(&mut self.pool, v) else {
                break;
            };
            let children = self.pool.get(subtree).children.clone();
            let mut state = self.stack.top_state(v);
            for child in children {
                tree::retain(&mut self.pool, child);
                let sym = self.pool.get(child).symbol;
                state = lang.next_state(state, sym);
                self.stack.push(&mut self.pool, v, child, false, state);
            }
            tree::release(&mut self.pool, subtree);
            changed = true;
        }
        changed
    }

    fn do_shift(
        &mut self,
        lang: &dyn Language,
        v: VersionId,
        lookahead: Subtree,
        new_state: StateId,
        extra: bool,
        current_state: StateId,
    ) {
        let was_interior = self.pool.get(lookahead).child_count() > 0;
        let shifted = if was_interior {
            break_down_interior_lookahead(&mut self.pool, current_state, lookahead)
        } else {
            lookahead
        };
        if self.cursor.as_ref().is_some_and(|c| c.current() == Some(shifted)) {
            if let Some(c) = self.cursor.as_mut() {
                c.advance(&self.pool);
            }
        }
        // A broken-down lookahead may expose a different leading symbol than
        // the one the `Shift` action was looked up for; recompute the target
        // state from what's actually being pushed (spec §4.H "Break-down of
        // interior lookahead").
        let target_symbol = self.pool.get(shifted).symbol;
        let recomputed = if was_interior && shifted != lookahead {
            lang.next_state(current_state, target_symbol)
        } else {
            new_state
        };
        let state = if extra { current_state } else { recomputed };
        self.stack.push(&mut self.pool, v, shifted, false, state);
    }

    fn do_accept(&mut self, lang: &dyn Language, v: VersionId, lookahead: Subtree) {
        let lookahead = tree::set_extra(&mut self.pool, lookahead, true);
        let state = self.stack.top_state(v);
        self.stack.push(&mut self.pool, v, lookahead, false, state);

        for slice in self.stack.pop_all(&mut self.pool, v) {
            let mut children = slice.trees;
            let real_idx = children.iter().position(|&t| !self.pool.get(t).flags.extra);
            let root = match real_idx {
                None => {
                    for c in children {
                        tree::release(&mut self.pool, c);
                    }
                    self.stack.remove_version(&mut self.pool, slice.version);
                    continue;
                }
                Some(_) if children.len() == 1 => children.pop().unwrap(),
                Some(idx) => {
                    let root_symbol = self.pool.get(children[idx]).symbol;
                    tree::make_node(
                        &mut self.pool,
                        lang,
                        root_symbol,
                        StateOrNone::NONE,
                        children,
                        0,
                        true,
                        None,
                        None,
                    )
                }
            };
            self.accept_subtree(lang, root);
            self.stack.remove_version(&mut self.pool, slice.version);
        }
    }

    fn accept_subtree(&mut self, _lang: &dyn Language, candidate: Subtree) {
        match self.finished_tree.take() {
            None => self.finished_tree = Some(candidate),
            Some(existing) => {
                let winner = select_tree(&self.pool, existing, candidate);
                let loser = if winner == existing { candidate } else { existing };
                tree::release(&mut self.pool, loser);
                self.finished_tree = Some(winner);
            }
        }
    }

    fn do_recover(&mut self, lang: &dyn Language, v: VersionId, lookahead: Subtree, symbol: Symbol, config: &ParserConfig) {
        let is_eof = symbol == lang.eof_symbol();
        let leaf = break_down_to_leaf(&mut self.pool, lookahead);
        let leaf_symbol = self.pool.get(leaf).symbol;
        match recovery::recover(&mut self.pool, lang, &mut self.stack, config, v, leaf, leaf_symbol, is_eof) {
            RecoverOutcome::Resumed(_resumed) => {
                tree::release(&mut self.pool, leaf);
            }
            RecoverOutcome::AcceptErrorOnly(error_node) => {
                tree::release(&mut self.pool, leaf);
                self.accept_subtree(lang, error_node);
                self.stack.halt(v);
            }
            RecoverOutcome::ShiftIntoError => {
                let state = self.stack.top_state(v);
                let bumped = tree::add_error_cost(&mut self.pool, leaf, 1);
                self.stack.push(&mut self.pool, v, bumped, false, state);
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}
