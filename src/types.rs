// Copyright (c) 2024 Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Small index newtypes shared across the crate, in the spirit of `cfgrammar`'s
//! `idxnewtype` module (`PIdx`, `RIdx`, `SIdx`, `TIdx`): every number that means
//! something different from a plain `usize` gets its own type so the compiler
//! stops us from mixing symbols, states and byte offsets by accident.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A grammar symbol: a token or a rule, 16 bits wide per the language table format.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Symbol(pub u16);

impl Symbol {
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl From<u16> for Symbol {
    fn from(v: u16) -> Self {
        Symbol(v)
    }
}

/// An LR automaton state. `StateId::NONE` marks a subtree built under
/// ambiguity whose shape may still change (see `fragile_left`/`fragile_right`
/// on `NodeData`) and is therefore not tied to any one state.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct StateId(pub u16);

impl StateId {
    pub const NONE: StateId = StateId(u16::MAX);
    pub const START: StateId = StateId(0);

    pub fn idx(self) -> usize {
        self.0 as usize
    }

    pub fn is_none(self) -> bool {
        self == StateId::NONE
    }
}

impl From<u16> for StateId {
    fn from(v: u16) -> Self {
        StateId(v)
    }
}

/// The lex automaton state plus the external-scanner state enabled at a
/// parser state, as returned by `Language::lex_mode`.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LexMode {
    pub lex_state: u16,
    pub external_lex_state: u16,
}

/// A row/column position, UTF-16-agnostic (this runtime counts raw chars, not
/// UTF-16 code units, matching the "chars" field of `Extent`).
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };
}

/// A cumulative offset into the input: byte index plus row/column.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Position {
    pub byte: u32,
    pub point: Point,
}

impl Position {
    pub const ZERO: Position = Position {
        byte: 0,
        point: Point::ZERO,
    };

    pub fn advance(mut self, extent: Extent) -> Position {
        self.byte += extent.bytes;
        self.point = add_point(self.point, extent.rows, extent.columns);
        self
    }
}

fn add_point(base: Point, rows: u32, columns: u32) -> Point {
    if rows > 0 {
        Point {
            row: base.row + rows,
            column: columns,
        }
    } else {
        Point {
            row: base.row,
            column: base.column + columns,
        }
    }
}

/// A span's length along three axes: bytes, chars, and a row/column extent.
/// Two extents compose the way two positions would if you walked one then
/// the other (`rows` accumulate, `columns` reset across a row boundary) —
/// see `Extent::add`.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Extent {
    pub bytes: u32,
    pub chars: u32,
    pub rows: u32,
    pub columns: u32,
}

impl Extent {
    pub const ZERO: Extent = Extent {
        bytes: 0,
        chars: 0,
        rows: 0,
        columns: 0,
    };

    /// Concatenates two extents end to end (as if the second immediately
    /// follows the first in the input).
    pub fn add(self, other: Extent) -> Extent {
        Extent {
            bytes: self.bytes + other.bytes,
            chars: self.chars + other.chars,
            rows: self.rows + other.rows,
            columns: if other.rows > 0 {
                other.columns
            } else {
                self.columns + other.columns
            },
        }
    }
}

/// The symbol and lex-mode of a subtree's first leaf, used for reuse
/// decisions during incremental parsing (spec §3, `first_leaf`).
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FirstLeaf {
    pub symbol: Symbol,
    pub lex_mode: LexMode,
}

/// Per-symbol metadata the language table exposes for tree construction:
/// whether the symbol is shown to a consumer at all, and whether it's named
/// (vs. an anonymous literal like `"+"`).
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SymbolMetadata {
    pub visible: bool,
    pub named: bool,
}

/// One entry of an alias sequence: renames a child occurrence without
/// changing the grammar symbol that actually matched.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AliasInfo {
    pub symbol: Symbol,
    pub is_named: bool,
}
