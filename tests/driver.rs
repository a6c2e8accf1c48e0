// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! End-to-end driver tests against the small hand-built languages in
//! `support` — the integration-level counterpart to each module's own
//! `#[cfg(test)]` unit tests, exercising `Parser::run` the way an embedder
//! actually calls it.

mod support;

use glrpar::{Parser, ParserConfig};

fn parse(lang: &glrpar::TableLanguage, input: &[u8]) -> (glrpar::Tree, glrpar::ParseStats, Parser) {
    let mut parser = Parser::new();
    let (tree, stats) = parser.run(lang, input, None, None, ParserConfig::default(), glrpar::Logger::none());
    (tree, stats, parser)
}

#[test]
fn shifts_and_reduces_a_plus() {
    let lang = support::a_plus_language();
    let (tree, _stats, mut parser) = parse(&lang, b"aaa");

    let root = tree.root();
    let node = parser.pool().get(root);
    assert_eq!(node.symbol, support::S);
    assert_eq!(node.error_cost, 0);

    tree.release(parser.pool_mut());
    assert_eq!(parser.pool().live_count(), 0);
}

#[test]
fn covers_the_whole_input() {
    let lang = support::a_plus_language();
    let input = b"aaaaa";
    let (tree, _stats, mut parser) = parse(&lang, input);

    let extent = parser.pool().get(tree.root()).total_extent();
    assert_eq!(extent.bytes as usize, input.len());

    tree.release(parser.pool_mut());
    assert_eq!(parser.pool().live_count(), 0);
}

#[test]
fn refcounts_are_sound_after_release() {
    let lang = support::a_plus_language();
    for input in [&b""[..], b"a", b"aa", b"aaaa", b"zzz", b"azaz"] {
        let (tree, _stats, mut parser) = parse(&lang, input);
        tree.release(parser.pool_mut());
        assert_eq!(
            parser.pool().live_count(),
            0,
            "leaked pool slots parsing {:?}",
            input
        );
    }
}

#[test]
fn parses_are_deterministic() {
    let lang = support::a_plus_language();
    let input = b"aaa";

    let (tree_a, _, mut parser_a) = parse(&lang, input);
    let (tree_b, _, mut parser_b) = parse(&lang, input);

    assert!(glrpar::tree::eq(parser_a.pool(), tree_a.root(), tree_b.root()));

    tree_a.release(parser_a.pool_mut());
    tree_b.release(parser_b.pool_mut());
    assert_eq!(parser_a.pool().live_count(), 0);
    assert_eq!(parser_b.pool().live_count(), 0);
}

#[test]
fn noise_bytes_never_stall_and_still_cover_the_input() {
    let lang = support::a_plus_language();
    for input in [&b""[..], b"\0\0\0", b"aa\0aa", b"\xff\xff\xff", b"a\0a\0a"] {
        let mut parser = Parser::new();
        let (tree, _stats) = parser.run(&lang, input, None, None, ParserConfig::default(), glrpar::Logger::none());
        let extent = parser.pool().get(tree.root()).total_extent();
        assert_eq!(extent.bytes as usize, input.len(), "didn't cover {:?}", input);
        tree.release(parser.pool_mut());
        assert_eq!(parser.pool().live_count(), 0);
    }
}

#[test]
fn empty_input_recovers_to_a_lone_error_tree() {
    let lang = support::a_plus_language();
    let (tree, _stats, mut parser) = parse(&lang, b"");
    let extent = parser.pool().get(tree.root()).total_extent();
    assert_eq!(extent.bytes, 0);
    tree.release(parser.pool_mut());
    assert_eq!(parser.pool().live_count(), 0);
}

#[test]
fn version_count_never_exceeds_the_configured_bound() {
    let lang = support::ambiguous::language();
    let mut parser = Parser::new();
    let config = ParserConfig::default();
    let (tree, stats) = parser.run(&lang, b"a", None, None, config, glrpar::Logger::none());
    assert!(stats.max_live_version_count <= config.max_version_count);
    tree.release(parser.pool_mut());
    assert_eq!(parser.pool().live_count(), 0);
}

#[test]
fn dynamic_precedence_picks_the_higher_precedence_parse() {
    let lang = support::ambiguous::language();
    let (tree, _stats, mut parser) = parse(&lang, b"a");

    let root = parser.pool().get(tree.root());
    assert_eq!(root.symbol, support::ambiguous::U, "higher dyn_precedence tree should win");
    assert_eq!(root.error_cost, 0);

    tree.release(parser.pool_mut());
    assert_eq!(parser.pool().live_count(), 0);
}

#[test]
fn reparsing_unchanged_input_reuses_tokens_via_the_cursor() {
    let lang = support::a_plus_language();
    let input = b"aaa";

    let mut parser = Parser::new();
    let (prev_tree, _stats) = parser.run(&lang, input, None, None, ParserConfig::default(), glrpar::Logger::none());
    let (next_tree, stats) = parser.run(&lang, input, Some(&prev_tree), None, ParserConfig::default(), glrpar::Logger::none());

    assert!(stats.tokens_reused > 0, "expected the cursor to reuse at least one token");

    prev_tree.release(parser.pool_mut());
    next_tree.release(parser.pool_mut());
    assert_eq!(parser.pool().live_count(), 0);
}
