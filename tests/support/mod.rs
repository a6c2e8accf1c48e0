// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Shared test fixtures: a tiny hand-built language (`a+`, left-recursive)
//! standing in for a generated grammar table, the way `cpctplus.rs`'s own
//! `#[cfg(test)]` scenarios hand-write small inline Yacc grammars rather than
//! pulling in a full language.
//!
//! Grammar (symbols: `A` = the byte `'a'`, `EOF`, `S` the only nonterminal):
//!
//! ```text
//! S -> A
//! S -> S A
//! ```
//!
//! States: `0` start, `1` just shifted an `A` from `0`, `2` goto after `S`
//! from `0`, `3` just shifted an `A` from `2`, `4` the designated
//! `ERROR_STATE`. Anything the lex function doesn't recognize as `'a'` or
//! end-of-input falls through to the built-in skip-one-codepoint path and
//! becomes an `ERROR` leaf, so arbitrary noise bytes are always accepted as
//! input without the grammar needing to know about them explicitly.

use glrpar::{AliasInfo, LexMode, ParseAction, StateId, Symbol, SymbolMetadata, TableLanguage};

pub const A: Symbol = Symbol(0);
pub const EOF: Symbol = Symbol(1);
pub const S: Symbol = Symbol(2);
pub const ERROR: Symbol = Symbol(3);
pub const SYMBOL_COUNT: usize = 4;

pub const START: StateId = StateId(0);
pub const AFTER_FIRST_A: StateId = StateId(1);
pub const AFTER_S: StateId = StateId(2);
pub const AFTER_EXTENDING_A: StateId = StateId(3);
pub const ERROR_STATE: StateId = StateId(4);
pub const STATE_COUNT: usize = 5;

/// Builds the `a+` language described above.
pub fn a_plus_language() -> TableLanguage {
    let mut actions: Vec<Vec<Vec<ParseAction>>> = vec![vec![Vec::new(); SYMBOL_COUNT]; STATE_COUNT];
    let mut reusable: Vec<Vec<(bool, bool)>> = vec![vec![(false, false); SYMBOL_COUNT]; STATE_COUNT];
    let mut goto: Vec<Vec<StateId>> = vec![vec![StateId::NONE; SYMBOL_COUNT]; STATE_COUNT];

    actions[START.idx()][A.idx()].push(ParseAction::Shift { state: AFTER_FIRST_A, extra: false });

    let reduce_s_from_a = ParseAction::Reduce {
        symbol: S,
        child_count: 1,
        dyn_precedence: 0,
        alias_sequence_id: None,
        fragile: false,
        extra: false,
    };
    actions[AFTER_FIRST_A.idx()][A.idx()].push(reduce_s_from_a.clone());
    actions[AFTER_FIRST_A.idx()][EOF.idx()].push(reduce_s_from_a);

    actions[AFTER_S.idx()][A.idx()].push(ParseAction::Shift { state: AFTER_EXTENDING_A, extra: false });
    actions[AFTER_S.idx()][EOF.idx()].push(ParseAction::Accept);

    let reduce_s_from_sa = ParseAction::Reduce {
        symbol: S,
        child_count: 2,
        dyn_precedence: 0,
        alias_sequence_id: None,
        fragile: false,
        extra: false,
    };
    actions[AFTER_EXTENDING_A.idx()][A.idx()].push(reduce_s_from_sa.clone());
    actions[AFTER_EXTENDING_A.idx()][EOF.idx()].push(reduce_s_from_sa);

    // Well-formedness per `Language`'s doc comment: ERROR_STATE must route
    // recognizable symbols (including EOF) through an explicit `Recover`
    // action so `recover`'s EOF escape is reachable.
    actions[ERROR_STATE.idx()][A.idx()].push(ParseAction::Recover);
    actions[ERROR_STATE.idx()][EOF.idx()].push(ParseAction::Recover);

    goto[START.idx()][S.idx()] = AFTER_S;
    goto[AFTER_S.idx()][S.idx()] = AFTER_S;

    for &s in &[START, AFTER_S] {
        reusable[s.idx()][A.idx()] = (true, false);
        reusable[s.idx()][EOF.idx()] = (true, false);
    }

    TableLanguage::new(
        STATE_COUNT,
        3,
        SYMBOL_COUNT,
        actions,
        reusable,
        goto,
        vec![LexMode::default(); STATE_COUNT],
        vec![None],
        vec![SymbolMetadata { visible: true, named: true }; SYMBOL_COUNT],
        Vec::<Vec<Option<AliasInfo>>>::new(),
        ERROR_STATE,
        ERROR,
        EOF,
        0,
        Box::new(|lexer, _lex_state| {
            if lexer.is_eof() {
                lexer.result_symbol = EOF;
                return true;
            }
            if lexer.lookahead() == Some('a') {
                lexer.advance();
                lexer.result_symbol = A;
                return true;
            }
            false
        }),
    )
}

/// A second fixture for the dynamic-precedence scenario: a reduce/reduce
/// conflict on a single shifted `A` at end-of-input, where the two competing
/// nonterminals (`T`, `U`) carry different `dyn_precedence`. Both complete
/// versions reach `Accept` with zero `error_cost`; `select_tree` must still
/// prefer the higher-precedence one.
pub mod ambiguous {
    use super::*;

    pub const A: Symbol = Symbol(0);
    pub const EOF: Symbol = Symbol(1);
    pub const T: Symbol = Symbol(2);
    pub const U: Symbol = Symbol(3);
    pub const ERROR: Symbol = Symbol(4);
    pub const SYMBOL_COUNT: usize = 5;

    pub const START: StateId = StateId(0);
    pub const AFTER_A: StateId = StateId(1);
    pub const AFTER_T: StateId = StateId(2);
    pub const AFTER_U: StateId = StateId(3);
    pub const ERROR_STATE: StateId = StateId(4);
    pub const STATE_COUNT: usize = 5;

    pub fn language() -> TableLanguage {
        let mut actions: Vec<Vec<Vec<ParseAction>>> = vec![vec![Vec::new(); SYMBOL_COUNT]; STATE_COUNT];
        let reusable: Vec<Vec<(bool, bool)>> = vec![vec![(false, false); SYMBOL_COUNT]; STATE_COUNT];
        let mut goto: Vec<Vec<StateId>> = vec![vec![StateId::NONE; SYMBOL_COUNT]; STATE_COUNT];

        actions[START.idx()][A.idx()].push(ParseAction::Shift { state: AFTER_A, extra: false });

        actions[AFTER_A.idx()][EOF.idx()].push(ParseAction::Reduce {
            symbol: T,
            child_count: 1,
            dyn_precedence: 1,
            alias_sequence_id: None,
            fragile: false,
            extra: false,
        });
        actions[AFTER_A.idx()][EOF.idx()].push(ParseAction::Reduce {
            symbol: U,
            child_count: 1,
            dyn_precedence: 5,
            alias_sequence_id: None,
            fragile: false,
            extra: false,
        });

        actions[AFTER_T.idx()][EOF.idx()].push(ParseAction::Accept);
        actions[AFTER_U.idx()][EOF.idx()].push(ParseAction::Accept);
        actions[ERROR_STATE.idx()][EOF.idx()].push(ParseAction::Recover);
        actions[ERROR_STATE.idx()][A.idx()].push(ParseAction::Recover);

        goto[START.idx()][T.idx()] = AFTER_T;
        goto[START.idx()][U.idx()] = AFTER_U;

        TableLanguage::new(
            STATE_COUNT,
            2,
            SYMBOL_COUNT,
            actions,
            reusable,
            goto,
            vec![LexMode::default(); STATE_COUNT],
            vec![None],
            vec![SymbolMetadata { visible: true, named: true }; SYMBOL_COUNT],
            Vec::<Vec<Option<AliasInfo>>>::new(),
            ERROR_STATE,
            ERROR,
            EOF,
            0,
            Box::new(|lexer, _lex_state| {
                if lexer.is_eof() {
                    lexer.result_symbol = EOF;
                    return true;
                }
                if lexer.lookahead() == Some('a') {
                    lexer.advance();
                    lexer.result_symbol = A;
                    return true;
                }
                false
            }),
        )
    }
}
