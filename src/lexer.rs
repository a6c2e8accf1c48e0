// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Component E: the lexer adapter. Drives the language's internal lex
//! function and, if present, an external scanner, to produce one leaf
//! [`crate::tree::Subtree`] per call. The internal lex function and the
//! external scanner's callbacks are themselves opaque per spec §1 ("the
//! specific lex function and external scanner implementations"); this
//! module only implements the *driving* policy of §4.E, not either
//! tokenizer.

use vob::Vob;

use crate::language::Language;
use crate::logger::{LogType, Logger};
use crate::pool::Pool;
use crate::tree::{self, LeafInfo, Subtree};
use crate::types::{Extent, FirstLeaf, LexMode, Point, Position, Symbol};

/// The vtable a generated internal lexer or an external scanner is driven
/// through (spec §6, "Input"). Holds a reference to the whole input buffer
/// plus the lexer's own cursor; `advance`/`mark_end` are the only mutators a
/// lex function needs.
pub struct LexerState<'a> {
    input: &'a [u8],
    start: Position,
    position: Position,
    token_end: Position,
    lookahead: Option<(char, u32)>,
    pub result_symbol: Symbol,
}

impl<'a> LexerState<'a> {
    fn new(input: &'a [u8], start: Position) -> Self {
        let mut s = LexerState {
            input,
            start,
            position: start,
            token_end: start,
            lookahead: None,
            result_symbol: Symbol(0),
        };
        s.lookahead = decode_at(input, start.byte as usize);
        s
    }

    /// The character under the cursor, or `None` at EOF.
    pub fn lookahead(&self) -> Option<char> {
        self.lookahead.map(|(c, _)| c)
    }

    pub fn is_eof(&self) -> bool {
        self.position.byte as usize >= self.input.len()
    }

    /// Consumes the lookahead character and loads the next one.
    pub fn advance(&mut self) {
        if let Some((c, len)) = self.lookahead {
            self.position.byte += len;
            if c == '\n' {
                self.position.point.row += 1;
                self.position.point.column = 0;
            } else {
                self.position.point.column += 1;
            }
        }
        self.token_end = self.position;
        self.lookahead = decode_at(self.input, self.position.byte as usize);
    }

    /// Fixes the end of the current token at the cursor's current position,
    /// excluding whatever lookahead character triggered the decision (the
    /// usual `mark_end` idiom in generated lexers).
    pub fn mark_end(&mut self) {
        self.token_end = self.position;
    }

    pub fn position(&self) -> Position {
        self.position
    }

    fn token_extent(&self) -> (Extent, Extent) {
        let padding = extent_between(self.start, self.token_start_floor());
        let size = extent_between(self.token_start_floor(), self.token_end);
        (padding, size)
    }

    fn token_start_floor(&self) -> Position {
        // Tokens begin where the lexer started scanning; leading bytes the
        // lexer skipped (whitespace consumed before recognizing a token)
        // become this leaf's padding instead of its size.
        self.start
    }

    fn bytes_touched(&self) -> u32 {
        self.position.byte.max(self.token_end.byte) - self.start.byte + if self.is_eof() { 0 } else { 1 }
    }
}

fn decode_at(input: &[u8], byte_offset: usize) -> Option<(char, u32)> {
    if byte_offset >= input.len() {
        return None;
    }
    match std::str::from_utf8(&input[byte_offset..]) {
        Ok(s) => s.chars().next().map(|c| (c, c.len_utf8() as u32)),
        Err(e) if e.valid_up_to() > 0 => {
            std::str::from_utf8(&input[byte_offset..byte_offset + e.valid_up_to()])
                .ok()
                .and_then(|s| s.chars().next())
                .map(|c| (c, c.len_utf8() as u32))
        }
        Err(_) => Some((char::REPLACEMENT_CHARACTER, 1)),
    }
}

fn extent_between(from: Position, to: Position) -> Extent {
    Extent {
        bytes: to.byte.saturating_sub(from.byte),
        chars: to.byte.saturating_sub(from.byte),
        rows: to.point.row.saturating_sub(from.point.row),
        columns: if to.point.row != from.point.row {
            to.point.column
        } else {
            to.point.column.saturating_sub(from.point.column)
        },
    }
}

/// A user-supplied tokenizer invoked only when the current lex mode enables
/// at least one external token (spec §4.E step 1). `create`/`destroy` in the
/// spec correspond to ordinary Rust construction and `Drop`.
pub trait ExternalScanner {
    /// Attempts to recognize one of the symbols marked `true` in
    /// `valid_symbols` (indexed by this scanner's own token numbering) at
    /// `lexer`'s current position. On success, sets `lexer.result_symbol`
    /// and returns `true` having advanced the lexer by at least one byte.
    fn scan(&mut self, lexer: &mut LexerState, valid_symbols: &Vob) -> bool;

    /// Serializes enough state to resume scanning from here later.
    fn serialize(&self) -> Vec<u8>;

    /// Restores state previously produced by `serialize`.
    fn deserialize(&mut self, buffer: &[u8]);
}

/// The result of one call to [`lex`]: the leaf subtree plus bookkeeping the
/// driver needs (did it come from the external scanner, how far it peeked).
pub struct LexResult {
    pub leaf: Subtree,
    pub used_external: bool,
}

/// Produces one leaf subtree starting at `position`, following the
/// procedure of spec §4.E.
#[allow(clippy::too_many_arguments)]
pub fn lex(
    pool: &mut Pool,
    lang: &dyn Language,
    scanner: Option<&mut dyn ExternalScanner>,
    input: &[u8],
    position: Position,
    lex_mode: LexMode,
    in_error_recovery: bool,
    error_cost_per_char: u32,
    logger: &mut Logger,
) -> LexResult {
    logger.log(LogType::Lex, || format!("lex position={}", position.byte));

    // Step 1: external scanner, if this lex mode enables any external
    // tokens and the embedder supplied one.
    if let (Some(scanner), Some(valid)) = (
        scanner,
        lang.enabled_external_tokens(lex_mode.external_lex_state),
    ) {
        let mut state = LexerState::new(input, position);
        if scanner.scan(&mut state, valid) && (in_error_recovery || state.position.byte > position.byte) {
            let (padding, size) = state.token_extent();
            let first_leaf = FirstLeaf {
                symbol: state.result_symbol,
                lex_mode,
            };
            let leaf = tree::make_leaf(
                pool,
                lang,
                state.result_symbol,
                padding,
                size,
                first_leaf,
                LeafInfo::External(scanner.serialize()),
            );
            let leaf = tree::set_has_external_tokens(pool, leaf);
            tree::set_bytes_scanned(pool, leaf, state.bytes_touched());
            return LexResult {
                leaf,
                used_external: true,
            };
        }
    }

    // Step 2: the internal, generated lex function.
    let mut state = LexerState::new(input, position);
    if lang.lex(&mut state, lex_mode.lex_state) {
        let (padding, size) = state.token_extent();
        let first_leaf = FirstLeaf {
            symbol: state.result_symbol,
            lex_mode,
        };
        let leaf = tree::make_leaf(pool, lang, state.result_symbol, padding, size, first_leaf, LeafInfo::None);
        tree::set_bytes_scanned(pool, leaf, state.bytes_touched());
        return LexResult {
            leaf,
            used_external: false,
        };
    }

    // Step 3: fall into error-recovery lex mode and retry once, unless
    // we're already there.
    if !in_error_recovery {
        let mut err_state = LexerState::new(input, position);
        if lang.lex(&mut err_state, lang.error_lex_state()) {
            let (padding, size) = err_state.token_extent();
            let first_leaf = FirstLeaf {
                symbol: err_state.result_symbol,
                lex_mode,
            };
            let leaf = tree::make_leaf(
                pool,
                lang,
                err_state.result_symbol,
                padding,
                size,
                first_leaf,
                LeafInfo::None,
            );
            tree::set_bytes_scanned(pool, leaf, err_state.bytes_touched());
            return LexResult {
                leaf,
                used_external: false,
            };
        }
    }

    // Step 4: nothing recognized anything — skip one codepoint (or, at
    // EOF, produce the builtin error leaf with zero width).
    let mut cursor = LexerState::new(input, position);
    let skipped = cursor.lookahead();
    if skipped.is_some() {
        cursor.advance();
    }
    let size = extent_between(position, cursor.position());
    let cost = error_cost_per_char.max(1) * size.chars.max(1);
    let leaf = tree::make_error(pool, lang, Extent::ZERO, size, skipped, cost);
    LexResult {
        leaf,
        used_external: false,
    }
}

/// Decodes the first Unicode scalar value at `byte_offset`, used by
/// generated internal lex functions that want to peek past the lexer's own
/// cursor. Standalone rather than a `LexerState` method because generated
/// code sometimes wants to look at raw buffer bytes (spec §6: "a UTF-8
/// decoding helper exposed by the lexer to language callbacks").
pub fn decode_utf8(input: &[u8], byte_offset: usize) -> Option<(char, u32)> {
    decode_at(input, byte_offset)
}

pub const EOF_POINT: Point = Point::ZERO;
