// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! `glrpar`: the core incremental GLR parser of a general-purpose parser
//! runtime. Consumes an LR(1) parse table (with conflict actions) and
//! produces a concrete syntax tree, exploring ambiguous parses in parallel,
//! recovering from syntax errors, and reusing unchanged subtrees of a prior
//! tree on incremental re-parse.
//!
//! What this crate is *not*: a grammar compiler (see `cfgrammar`/`lrtable`
//! in the workspace this runtime is descended from), a lex-function or
//! external-scanner implementation (supplied by the embedder through
//! [`language::Language`] and [`lexer::ExternalScanner`]), or a query/cursor
//! API over a finished [`parser::Tree`] — all out of scope per the core's
//! own specification.
//!
//! Module layout mirrors `lrpar/src/lib/*.rs`: one file per concern, each
//! with its own `#[cfg(test)] mod test`.

pub mod cache;
pub mod config;
pub mod cursor;
pub mod error;
pub mod language;
pub mod lexer;
pub mod logger;
pub mod pool;
pub mod stack;
pub mod tree;
pub mod types;

mod parser;
mod recovery;

pub use config::ParserConfig;
pub use error::{EditError, LanguageError};
pub use language::{Language, ParseAction, TableLanguage};
pub use lexer::{ExternalScanner, LexerState};
pub use logger::{LogType, Logger};
pub use parser::{Edit, Parser, ParseStats, Tree};
pub use pool::Pool;
pub use tree::{NodeData, Subtree};
pub use types::{
    AliasInfo, Extent, FirstLeaf, LexMode, Point, Position, StateId, Symbol, SymbolMetadata,
};
