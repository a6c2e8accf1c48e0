// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component F: the language table interface. This crate does not compile
//! grammars into tables — that's `cfgrammar`/`lrtable`'s job, and it's out
//! of scope here (spec §1, "external collaborators") — it only *consults*
//! one through the narrow [`Language`] trait. [`TableLanguage`] is the one
//! concrete, in-memory implementation this crate ships, analogous to
//! `lrtable::StateTable` but populated directly rather than compiled from a
//! Yacc grammar.

use vob::Vob;

use crate::error::LanguageError;
use crate::lexer::LexerState;
use crate::types::{LexMode, Symbol, SymbolMetadata};
use crate::types::StateId;

/// One entry of the action table (spec §6, "ParseAction").
#[derive(Clone, Debug, PartialEq)]
pub enum ParseAction {
    Shift {
        state: StateId,
        extra: bool,
    },
    Reduce {
        symbol: Symbol,
        child_count: u32,
        dyn_precedence: i32,
        alias_sequence_id: Option<u32>,
        fragile: bool,
        extra: bool,
    },
    Accept,
    Recover,
}

/// Read-only accessor for everything the driver needs to know about the
/// compiled grammar: states, actions, lex modes, symbol metadata. An
/// implementation may be a thin wrapper over a `bincode`-deserialized blob,
/// hand-built in-memory tables (as `TableLanguage` is), or backed by
/// generated code that embeds tables as static arrays.
///
/// Well-formedness precondition: `actions(error_state(), eof_symbol())` must
/// include a `Recover` entry. The driver's only per-version anti-livelock
/// check (the main loop's "yield if position hasn't advanced and another
/// version shares it") only fires when more than one version is live; a lone
/// version stuck in `ERROR_STATE` at EOF (a zero-width lookahead) would
/// otherwise shift the same lookahead forever, since step 5 ("no action
/// matched and `state == ERROR_STATE`" ⇒ shift unconditionally) never by
/// itself reaches `recover`'s "no state works and lookahead is EOF ⇒ accept a
/// lone ERROR node" escape. Real generated tables are expected to route EOF
/// in `ERROR_STATE` through an explicit `Recover` action so that escape is
/// reached; table generation itself is out of this crate's scope.
pub trait Language {
    fn state_count(&self) -> usize;
    fn token_count(&self) -> usize;
    fn symbol_count(&self) -> usize;

    /// All actions for `(state, symbol)`, in the table's conflict order —
    /// the driver tries them in this order (spec §4.H step 3).
    fn actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction];

    /// `(is_reusable, depends_on_lookahead)` for a subtree of `symbol`
    /// offered for reuse while the parser is in `state`.
    fn is_reusable(&self, state: StateId, symbol: Symbol) -> (bool, bool);

    fn next_state(&self, state: StateId, symbol: Symbol) -> StateId;

    fn lex_mode(&self, state: StateId) -> LexMode;

    /// The bitvector of external tokens enabled in a given external lex
    /// state, or `None` if this language has no external scanner.
    fn enabled_external_tokens(&self, external_lex_state: u16) -> Option<&Vob>;

    fn symbol_metadata(&self, symbol: Symbol) -> SymbolMetadata;

    fn alias_sequence(&self, id: u32) -> &[Option<crate::types::AliasInfo>];

    /// Runs the generated internal tokenizer for `lex_state` against
    /// `lexer`'s current position. Returns `true` and leaves
    /// `lexer.result_symbol` set on success. Opaque per spec §1 — this
    /// crate only drives it (see [`crate::lexer`]), never implements it.
    fn lex(&self, lexer: &mut LexerState, lex_state: u16) -> bool;

    fn error_state(&self) -> StateId;
    fn error_symbol(&self) -> Symbol;
    fn eof_symbol(&self) -> Symbol;

    /// The lex state used while in `error_state`'s recovery mode (spec
    /// §4.E step 3: "switch to that mode and retry").
    fn error_lex_state(&self) -> u16;
}

/// A table-driven [`Language`] populated directly (not compiled from
/// source). `lex_fn` stands in for the generated tokenizer the real grammar
/// compiler would emit; tests and embedders that don't generate code can
/// supply a plain closure-backed one instead.
pub struct TableLanguage {
    state_count: usize,
    token_count: usize,
    symbol_count: usize,
    /// `actions[state][symbol]`.
    actions: Vec<Vec<Vec<ParseAction>>>,
    /// `reusable[state][symbol]`.
    reusable: Vec<Vec<(bool, bool)>>,
    /// `goto[state][symbol]`.
    goto: Vec<Vec<StateId>>,
    lex_modes: Vec<LexMode>,
    enabled_external_tokens: Vec<Option<Vob>>,
    symbol_metadata: Vec<SymbolMetadata>,
    alias_sequences: Vec<Vec<Option<crate::types::AliasInfo>>>,
    error_state: StateId,
    error_symbol: Symbol,
    eof_symbol: Symbol,
    error_lex_state: u16,
    lex_fn: Box<dyn Fn(&mut LexerState, u16) -> bool>,
}

impl TableLanguage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state_count: usize,
        token_count: usize,
        symbol_count: usize,
        actions: Vec<Vec<Vec<ParseAction>>>,
        reusable: Vec<Vec<(bool, bool)>>,
        goto: Vec<Vec<StateId>>,
        lex_modes: Vec<LexMode>,
        enabled_external_tokens: Vec<Option<Vob>>,
        symbol_metadata: Vec<SymbolMetadata>,
        alias_sequences: Vec<Vec<Option<crate::types::AliasInfo>>>,
        error_state: StateId,
        error_symbol: Symbol,
        eof_symbol: Symbol,
        error_lex_state: u16,
        lex_fn: Box<dyn Fn(&mut LexerState, u16) -> bool>,
    ) -> Self {
        TableLanguage {
            state_count,
            token_count,
            symbol_count,
            actions,
            reusable,
            goto,
            lex_modes,
            enabled_external_tokens,
            symbol_metadata,
            alias_sequences,
            error_state,
            error_symbol,
            eof_symbol,
            error_lex_state,
            lex_fn,
        }
    }

    #[cfg(feature = "serialize")]
    pub fn from_bytes(_bytes: &[u8]) -> Result<Self, LanguageError> {
        // The on-disk form mirrors `lrtable::StateTable`'s `serde` encoding:
        // a flat, serde-derived mirror struct decoded with `bincode` and
        // then expanded into this runtime shape. Embedders that generate
        // tables at build time are expected to provide their own
        // `SerializedLanguage` (see `crate::error::LanguageError`) rather
        // than this crate guessing a wire format for a table-generator it
        // doesn't implement.
        Err(LanguageError::Decode(
            "TableLanguage::from_bytes requires an embedder-supplied wire format".into(),
        ))
    }
}

impl Language for TableLanguage {
    fn state_count(&self) -> usize {
        self.state_count
    }

    fn token_count(&self) -> usize {
        self.token_count
    }

    fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    fn actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction] {
        self.actions
            .get(state.idx())
            .and_then(|row| row.get(symbol.idx()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn is_reusable(&self, state: StateId, symbol: Symbol) -> (bool, bool) {
        self.reusable
            .get(state.idx())
            .and_then(|row| row.get(symbol.idx()))
            .copied()
            .unwrap_or((false, false))
    }

    fn next_state(&self, state: StateId, symbol: Symbol) -> StateId {
        self.goto
            .get(state.idx())
            .and_then(|row| row.get(symbol.idx()))
            .copied()
            .unwrap_or(StateId::NONE)
    }

    fn lex_mode(&self, state: StateId) -> LexMode {
        self.lex_modes.get(state.idx()).copied().unwrap_or_default()
    }

    fn enabled_external_tokens(&self, external_lex_state: u16) -> Option<&Vob> {
        self.enabled_external_tokens
            .get(external_lex_state as usize)
            .and_then(|v| v.as_ref())
    }

    fn symbol_metadata(&self, symbol: Symbol) -> SymbolMetadata {
        self.symbol_metadata
            .get(symbol.idx())
            .copied()
            .unwrap_or(SymbolMetadata { visible: true, named: true })
    }

    fn alias_sequence(&self, id: u32) -> &[Option<crate::types::AliasInfo>] {
        self.alias_sequences
            .get(id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn lex(&self, lexer: &mut LexerState, lex_state: u16) -> bool {
        (self.lex_fn)(lexer, lex_state)
    }

    fn error_state(&self) -> StateId {
        self.error_state
    }

    fn error_symbol(&self) -> Symbol {
        self.error_symbol
    }

    fn eof_symbol(&self) -> Symbol {
        self.eof_symbol
    }

    fn error_lex_state(&self) -> u16 {
        self.error_lex_state
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// A minimal, hand-built `TableLanguage` for unit tests elsewhere in the
    /// crate that only need *a* language, not a specific grammar (mirrors
    /// `cpctplus.rs`'s small inline Yacc grammars, but built directly since
    /// this crate has no grammar compiler to hand them to).
    pub fn test_language() -> TableLanguage {
        TableLanguage::new(
            1,
            1,
            64,
            vec![vec![Vec::new(); 64]],
            vec![vec![(false, false); 64]],
            vec![vec![StateId::NONE; 64]],
            vec![LexMode::default()],
            vec![None],
            vec![SymbolMetadata { visible: true, named: true }; 64],
            vec![Vec::new()],
            StateId(u16::MAX),
            Symbol(63),
            Symbol(62),
            0,
            Box::new(|_lexer, _state| false),
        )
    }
}
