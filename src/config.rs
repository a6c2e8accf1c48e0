// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0. See `types.rs` for the full text.

//! Tunable constants for the driver, grouped into one plain struct the way
//! `lrtable` exposes `RecoveryKind` rather than reading environment variables
//! or a config file — this is a library, and its only "configuration surface"
//! is the handful of literals the spec fixes in §4.H.

/// Driver tunables. The `Default` impl carries the spec's normative values.
#[derive(Clone, Copy, Debug)]
pub struct ParserConfig {
    /// Live parse-stack versions are truncated to this many after every round
    /// of `condense_stack`.
    pub max_version_count: usize,
    /// How many `(position, depth, state)` entries a version's summary trail
    /// retains; bounds the search space `recover` walks.
    pub max_summary_depth: usize,
    /// Per-skipped-subtree recovery cost weight (`Cskip_tree`).
    pub error_cost_per_skipped_tree: u32,
    /// Per-skipped-char recovery cost weight (`Cskip_char`).
    pub error_cost_per_skipped_char: u32,
    /// Per-skipped-line recovery cost weight (`Cskip_line`).
    pub error_cost_per_skipped_line: u32,
    /// `compare_versions` prefers rather than outright takes the winner
    /// unless the cost gap (scaled by the winner's push count) exceeds this.
    pub max_cost_difference: u32,
    /// If set, an unrecoverable parse produces a synthetic single-`ERROR`-node
    /// tree immediately instead of continuing to search for a repair.
    pub halt_on_error: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let error_cost_per_skipped_tree = 3;
        ParserConfig {
            max_version_count: 6,
            max_summary_depth: 16,
            error_cost_per_skipped_tree,
            error_cost_per_skipped_char: 1,
            error_cost_per_skipped_line: 1,
            max_cost_difference: 16 * error_cost_per_skipped_tree,
            halt_on_error: false,
        }
    }
}
