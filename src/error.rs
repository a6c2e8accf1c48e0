// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Hand-written error types, in the style of `cfgrammar`'s `FromYaccParserError`:
//! a plain `enum`, a manual `Display` impl, and `From` conversions, rather than
//! an error-derive crate. The core parser's main loop never returns a `Result`
//! (per the spec: syntax errors become `error_cost`, not exceptions) — these
//! types exist only at the narrow boundary where this crate itself can fail:
//! decoding a serialized language table.

use std::fmt;

/// Failure to construct a [`crate::language::TableLanguage`] from a serialized
/// blob (only reachable with the `serialize` feature enabled).
#[derive(Debug)]
pub enum LanguageError {
    /// The blob was not a valid encoding of a language table.
    Decode(String),
    /// The blob decoded, but described an internally inconsistent table
    /// (e.g. an action referencing a state past `state_count`).
    Inconsistent(String),
}

impl fmt::Display for LanguageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LanguageError::Decode(msg) => write!(f, "could not decode language table: {}", msg),
            LanguageError::Inconsistent(msg) => write!(f, "inconsistent language table: {}", msg),
        }
    }
}

impl std::error::Error for LanguageError {}

#[cfg(feature = "serialize")]
impl From<bincode::Error> for LanguageError {
    fn from(e: bincode::Error) -> Self {
        LanguageError::Decode(e.to_string())
    }
}

/// Failure to construct an [`crate::parser::Edit`]: the core trusts that an
/// `Edit` handed to `parse` is internally consistent (§6 treats the
/// edit-application pass itself as an external collaborator), but building
/// one from raw offsets is a boundary worth checking.
#[derive(Debug)]
pub enum EditError {
    /// `old_end_byte` preceded `start_byte`, or `new_end_byte` did.
    OutOfOrder { start_byte: u32, old_end_byte: u32, new_end_byte: u32 },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EditError::OutOfOrder { start_byte, old_end_byte, new_end_byte } => write!(
                f,
                "malformed edit: start_byte={} old_end_byte={} new_end_byte={} (expected start_byte <= old_end_byte and start_byte <= new_end_byte)",
                start_byte, old_end_byte, new_end_byte
            ),
        }
    }
}

impl std::error::Error for EditError {}
