// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Error recovery, the other half of component H. Grounded on the
//! Corchuelo-style cost search in `cpctplus.rs`, adapted from a single
//! linear `pstack` replay to this crate's graph-structured stack: instead
//! of astar over hypothetical repair sequences, recovery here leans on the
//! summary trail already recorded on the version's own spine and compares
//! candidates by the same three-weight cost formula.

use indexmap::IndexSet;

use crate::config::ParserConfig;
use crate::language::{Language, ParseAction};
use crate::pool::Pool;
use crate::stack::{Stack, VersionId};
use crate::tree::{self, Subtree};
use crate::types::{Extent, Position, Symbol};

/// What `recover` decided to do.
pub(crate) enum RecoverOutcome {
    /// A resumable state was found; `version` now sits at that state with
    /// an `ERROR` subtree marked extra pushed on top.
    Resumed(VersionId),
    /// No resumable state exists and the lookahead is EOF: `error_node` is
    /// a lone `ERROR` subtree that should become the whole tree's root.
    AcceptErrorOnly(Subtree),
    /// No resumable state exists; the caller should shift the lookahead
    /// into `ERROR_STATE` unconditionally and try again next round.
    ShiftIntoError,
}

/// Spec §4.H `do_potential_reductions`: tries every reduce action the
/// current state allows for any symbol, deduplicated by `(symbol,
/// child_count, dyn_precedence, alias_sequence_id)`, each as its own fork
/// of `v` (via [`crate::parser::execute_reduce`], which never mutates `v`
/// itself). Returns the fresh fork ids plus whether the state also offers
/// a `Shift` for some symbol.
pub(crate) fn do_potential_reductions(
    pool: &mut Pool,
    lang: &dyn Language,
    stack: &mut Stack,
    v: VersionId,
) -> (Vec<VersionId>, bool) {
    let state = stack.top_state(v);
    let mut seen = IndexSet::new();
    let mut forked = Vec::new();
    let mut has_shift = false;

    for sym in 0..lang.symbol_count() {
        let symbol = Symbol(sym as u16);
        for action in lang.actions(state, symbol) {
            match action {
                ParseAction::Shift { .. } => has_shift = true,
                ParseAction::Reduce {
                    symbol: rsym,
                    child_count,
                    dyn_precedence,
                    alias_sequence_id,
                    extra,
                    ..
                } if *child_count > 0 && !*extra => {
                    let key = (*rsym, *child_count, *dyn_precedence, *alias_sequence_id);
                    if seen.insert(key) {
                        let fork = crate::parser::execute_reduce(
                            pool,
                            lang,
                            stack,
                            v,
                            *rsym,
                            *child_count,
                            *dyn_precedence,
                            *alias_sequence_id,
                            true,
                            true,
                        );
                        forked.push(fork);
                    }
                }
                _ => {}
            }
        }
    }
    (forked, has_shift)
}

/// Spec §4.H `handle_error`. Halts `v` outright if another live version is
/// already strictly better; otherwise explores every admissible reduction
/// and folds the results into a fresh `ERROR_STATE` discontinuity on `v`.
///
/// The summary trail `recover` searches is *not* recorded here: by
/// definition `v` is already sitting in the state it failed to find an
/// action in, so the useful history is whatever the driver already recorded
/// at the end of each prior (non-error) round (see `Parser::run`) — folding
/// in `ERROR_STATE` itself here would only pollute the trail with an entry
/// `recover` could never usefully resume to.
pub(crate) fn handle_error(
    pool: &mut Pool,
    lang: &dyn Language,
    stack: &mut Stack,
    config: &ParserConfig,
    v: VersionId,
    finished_tree_cost: Option<u32>,
) {
    if crate::parser::better_version_exists(pool, lang, stack, config, v, finished_tree_cost) {
        stack.halt(v);
        return;
    }

    let (forked, _has_shift) = do_potential_reductions(pool, lang, stack, v);

    stack.push_error_discontinuity(pool, v, lang.error_state());
    for f in forked {
        stack.force_merge(pool, v, f);
    }
}

/// Spec §4.H `recover`. Walks `v`'s recorded summary trail looking for a
/// state that both accepts `lookahead_symbol` and whose resulting cost
/// isn't already beaten by some other live version.
pub(crate) fn recover(
    pool: &mut Pool,
    lang: &dyn Language,
    stack: &mut Stack,
    config: &ParserConfig,
    v: VersionId,
    lookahead: Subtree,
    lookahead_symbol: Symbol,
    is_eof: bool,
) -> RecoverOutcome {
    let current_position = stack.top_position(v);
    let current_total_pushes = stack.total_pushes(v);
    let summary = stack.get_summary(v);

    let mut best: Option<(u64, u32, crate::types::StateId)> = None;
    for entry in &summary {
        if lang.actions(entry.state, lookahead_symbol).is_empty() {
            continue;
        }
        let depth = current_total_pushes.saturating_sub(entry.total_pushes);
        let delta = delta_extent(entry.position, current_position);
        let cost = depth as u32 * config.error_cost_per_skipped_tree
            + delta.chars * config.error_cost_per_skipped_char
            + delta.rows * config.error_cost_per_skipped_line;
        if is_cost_dominated(pool, stack, v, cost) {
            continue;
        }
        if best.is_none_or(|(_, best_cost, _)| cost < best_cost) {
            best = Some((depth, cost, entry.state));
        }
    }

    if let Some((depth, _, target_state)) = best {
        let slices = stack.pop_count(pool, v, depth as usize);
        for slice in slices {
            if stack.top_state(slice.version) == target_state {
                let error_trailer = pop_error_trailer(pool, stack, slice.version);
                let mut combined = slice.trees;
                combined.extend(error_trailer);
                let error_node = tree::make_error_node(pool, lang, combined);
                let error_node = tree::set_extra(pool, error_node, true);
                stack.push(pool, slice.version, error_node, false, target_state);
                return RecoverOutcome::Resumed(slice.version);
            }
            for t in slice.trees {
                tree::release(pool, t);
            }
            stack.remove_version(pool, slice.version);
        }
    }

    if is_eof {
        tree::retain(pool, lookahead);
        let error_node = tree::make_error_node(pool, lang, vec![lookahead]);
        return RecoverOutcome::AcceptErrorOnly(error_node);
    }

    RecoverOutcome::ShiftIntoError
}

/// Pops links above (and including) the `ERROR_STATE` discontinuity,
/// collecting whatever accumulated on top of it (e.g. error leaves shifted
/// unconditionally by a previous failed recovery attempt, spec §4.H main
/// loop step 5), oldest-first.
fn pop_error_trailer(pool: &mut Pool, stack: &mut Stack, v: VersionId) -> Vec<Subtree> {
    let mut collected = Vec::new();
    loop {
        if stack.top_is_error_discontinuity(v) {
            stack.pop_error(pool, v);
            break;
        }
        if stack.top_is_root(v) {
            break;
        }
        let mut slices = stack.pop_count(pool, v, 1);
        debug_assert_eq!(slices.len(), 1, "popping a single link should not fan out here");
        let slice = slices.pop().unwrap();
        collected.extend(slice.trees);
    }
    collected.reverse();
    collected
}

/// Is `candidate_cost` already beaten by some other live version, making it
/// pointless to pursue (spec: "not dominated by an existing version")?
fn is_cost_dominated(pool: &Pool, stack: &Stack, v: VersionId, candidate_cost: u32) -> bool {
    stack
        .live_versions()
        .into_iter()
        .filter(|&other| other != v)
        .any(|other| stack.error_cost(pool, other, discontinuity_penalty()) <= candidate_cost)
}

/// The flat per-`ERROR_STATE`-crossing penalty `Stack::error_cost` adds.
/// The spec names three recovery-cost *weights* (tree/char/line) but no
/// separate discontinuity constant, so this reuses the per-skipped-tree
/// weight for that role too.
pub(crate) fn discontinuity_penalty() -> u32 {
    1
}

fn delta_extent(from: Position, to: Position) -> Extent {
    Extent {
        bytes: to.byte.saturating_sub(from.byte),
        // `Position` doesn't track a running char count (only `Extent`
        // does), so the byte delta stands in for it here; for ASCII-heavy
        // recovery regions these coincide, and this only feeds a cost
        // heuristic, not a correctness-sensitive count.
        chars: to.byte.saturating_sub(from.byte),
        rows: to.point.row.saturating_sub(from.point.row),
        columns: 0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::language::tests::test_language;
    use crate::pool::Pool;
    use crate::stack::Stack;
    use crate::types::StateId;

    #[test]
    fn do_potential_reductions_reports_shift_presence() {
        let lang = test_language();
        let mut pool = Pool::new();
        let mut stack = Stack::new(StateId(0));
        let v = VersionId(0);
        // `test_language` has no actions configured anywhere, so this
        // should report no forks and no shift.
        let (forked, has_shift) = do_potential_reductions(&mut pool, &lang, &mut stack, v);
        assert!(forked.is_empty());
        assert!(!has_shift);
    }

    #[test]
    fn is_cost_dominated_true_when_another_version_is_cheaper() {
        let mut pool = Pool::new();
        let mut stack = Stack::new(StateId(0));
        let v0 = VersionId(0);
        let v1 = stack.copy_version(v0);
        assert!(is_cost_dominated(&pool, &stack, v0, 5));
        stack.remove_version(&mut pool, v1);
    }
}
