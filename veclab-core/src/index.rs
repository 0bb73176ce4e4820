// SPDX-License-Identifier: AGPL-3.0-or-later
// VecLab - Named Vector Data Engine
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Index Resolution
//!
//! Turns textual indices into positions against a store's current length.
//!
//! ## Index Grammar
//!
//! ```text
//! index  → "end" | "++end" | SPECIAL | INTEGER | EXPR
//! range  → index | index? ':' index?
//! ```
//!
//! Integer and expression indices are shifted by the store's offset before
//! bounds checking. Special indices ("min", "max", ...) resolve to a reducer
//! instead of a position and can only be read.
//!
//! Windows are explicit `(first, last)` values returned to the caller; the
//! store carries no selection state.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, VectorError};
use crate::stats;
use crate::store::VectorStore;

// ============================================================================
// Window
// ============================================================================

/// Half-open range of positions selected by an index or range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    /// Window covering `first..=last`
    pub fn inclusive(first: usize, last: usize) -> Self {
        Self {
            start: first,
            end: last + 1,
        }
    }

    /// Window covering all `length` elements
    pub fn full(length: usize) -> Self {
        Self {
            start: 0,
            end: length,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First selected position
    pub fn first(&self) -> usize {
        self.start
    }

    /// Last selected position; meaningless for an empty window
    pub fn last(&self) -> usize {
        self.end.saturating_sub(1)
    }

    /// Restrict to `[0, length)`
    pub fn clamp(self, length: usize) -> Self {
        let end = self.end.min(length);
        Self {
            start: self.start.min(end),
            end,
        }
    }
}

// ============================================================================
// Special Indices
// ============================================================================

/// Reducer evaluated in place of a numeric position
pub type Reducer = fn(&[f64]) -> f64;

/// Named read-only pseudo-index
#[derive(Clone, Copy)]
pub struct SpecialIndex {
    pub name: &'static str,
    pub reducer: Reducer,
}

impl SpecialIndex {
    /// Apply the reducer to a store's live values
    pub fn evaluate(&self, store: &VectorStore) -> f64 {
        (self.reducer)(store.values())
    }
}

impl fmt::Debug for SpecialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpecialIndex").field(&self.name).finish()
    }
}

impl PartialEq for SpecialIndex {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Registry of special index names
#[derive(Debug, Clone)]
pub struct SpecialIndexTable {
    entries: HashMap<&'static str, SpecialIndex>,
}

impl Default for SpecialIndexTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.install("min", stats::min);
        table.install("max", stats::max);
        table.install("mean", stats::mean);
        table.install("sum", stats::sum);
        table.install("prod", stats::product);
        table
    }
}

impl SpecialIndexTable {
    /// Table with no entries
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register or replace a special index
    pub fn install(&mut self, name: &'static str, reducer: Reducer) {
        self.entries.insert(name, SpecialIndex { name, reducer });
    }

    /// Remove a special index, returning whether it existed
    pub fn uninstall(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<SpecialIndex> {
        self.entries.get(name).copied()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Evaluates an index that is neither a keyword nor an integer literal
pub trait IndexEvaluator {
    /// Integer value of `text`, or `None` when it is not a valid expression
    fn evaluate_index(&self, text: &str) -> Option<i64>;
}

/// What an index token refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMode {
    /// Accept names from the special index table
    pub allow_special: bool,
    /// Accept `first:last` ranges
    pub allow_colon: bool,
    /// Reject positions at or past the current length
    pub check_upper: bool,
}

impl IndexMode {
    /// Positions only, no upper bound check
    pub const NONE: IndexMode = IndexMode {
        allow_special: false,
        allow_colon: false,
        check_upper: false,
    };

    /// Positions checked against the current length
    pub const CHECK: IndexMode = IndexMode {
        allow_special: false,
        allow_colon: false,
        check_upper: true,
    };

    /// Checked ranges without special indices
    pub const RANGE: IndexMode = IndexMode {
        allow_special: false,
        allow_colon: true,
        check_upper: true,
    };

    /// Everything
    pub const ALL: IndexMode = IndexMode {
        allow_special: true,
        allow_colon: true,
        check_upper: true,
    };
}

/// Resolved single index
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexTarget {
    Position(usize),
    Special(SpecialIndex),
}

/// Resolved range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeTarget {
    Window(Window),
    Special(SpecialIndex),
}

impl RangeTarget {
    /// The window, rejecting special indices as read-only targets
    pub fn writable(self, token: &str) -> Result<Window> {
        match self {
            RangeTarget::Window(w) => Ok(w),
            RangeTarget::Special(_) => Err(VectorError::ReadOnlyIndex(token.to_string())),
        }
    }
}

/// Resolves index tokens against a store
#[derive(Clone, Copy)]
pub struct IndexResolver<'a> {
    specials: &'a SpecialIndexTable,
    evaluator: Option<&'a dyn IndexEvaluator>,
}

impl<'a> IndexResolver<'a> {
    pub fn new(specials: &'a SpecialIndexTable) -> Self {
        Self {
            specials,
            evaluator: None,
        }
    }

    /// Fall back to `evaluator` for tokens that are not integer literals
    pub fn with_evaluator(mut self, evaluator: &'a dyn IndexEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Resolve a single index token
    pub fn resolve_one(
        &self,
        store: &VectorStore,
        token: &str,
        mode: IndexMode,
    ) -> Result<IndexTarget> {
        let length = store.len();

        if token == "end" {
            if length == 0 {
                return Err(VectorError::EmptyVector);
            }
            return Ok(IndexTarget::Position(length - 1));
        }
        if token == "++end" {
            return Ok(IndexTarget::Position(length));
        }
        if mode.allow_special
            && let Some(special) = self.specials.get(token)
        {
            return Ok(IndexTarget::Special(special));
        }

        let raw = match token.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => self
                .evaluator
                .and_then(|e| e.evaluate_index(token))
                .ok_or_else(|| VectorError::BadIndex(token.to_string()))?,
        };

        let value = raw
            .checked_sub(store.offset())
            .ok_or_else(|| VectorError::BadIndex(token.to_string()))?;
        if value < 0 {
            return Err(VectorError::IndexOutOfRange {
                token: token.to_string(),
            });
        }
        let position = value as usize;
        if mode.check_upper && position >= length {
            return Err(VectorError::IndexOutOfRange {
                token: token.to_string(),
            });
        }
        Ok(IndexTarget::Position(position))
    }

    /// Resolve a single index that must be a position
    pub fn resolve_position(
        &self,
        store: &VectorStore,
        token: &str,
        mode: IndexMode,
    ) -> Result<usize> {
        let mode = IndexMode {
            allow_special: false,
            ..mode
        };
        match self.resolve_one(store, token, mode)? {
            IndexTarget::Position(p) => Ok(p),
            IndexTarget::Special(_) => Err(VectorError::ReadOnlyIndex(token.to_string())),
        }
    }

    /// Resolve an index or `first:last` range
    pub fn resolve_range(
        &self,
        store: &VectorStore,
        token: &str,
        mode: IndexMode,
    ) -> Result<RangeTarget> {
        if mode.allow_colon
            && let Some((left, right)) = token.split_once(':')
        {
            let sides = IndexMode {
                allow_special: false,
                ..mode
            };
            let first = if left.is_empty() {
                0
            } else {
                self.resolve_position(store, left, sides)?
            };
            let last = if right.is_empty() {
                store.len().saturating_sub(1)
            } else {
                self.resolve_position(store, right, sides)?
            };
            if first > last {
                return Err(VectorError::InvalidRange(token.to_string()));
            }
            return Ok(RangeTarget::Window(Window::inclusive(first, last)));
        }

        match self.resolve_one(store, token, mode)? {
            IndexTarget::Position(p) => Ok(RangeTarget::Window(Window::inclusive(p, p))),
            IndexTarget::Special(s) => Ok(RangeTarget::Special(s)),
        }
    }

    /// Resolve a range that must select positions
    pub fn resolve_window(
        &self,
        store: &VectorStore,
        token: &str,
        mode: IndexMode,
    ) -> Result<Window> {
        let mode = IndexMode {
            allow_special: false,
            ..mode
        };
        self.resolve_range(store, token, mode)?.writable(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(values: &[f64]) -> VectorStore {
        VectorStore::from_values(values).unwrap()
    }

    struct Doubler;

    impl IndexEvaluator for Doubler {
        fn evaluate_index(&self, text: &str) -> Option<i64> {
            text.strip_prefix("2*")?.parse::<i64>().ok().map(|v| v * 2)
        }
    }

    #[test]
    fn test_keywords() {
        let table = SpecialIndexTable::default();
        let resolver = IndexResolver::new(&table);
        let s = store(&[1.0, 2.0, 3.0]);

        assert_eq!(
            resolver.resolve_one(&s, "end", IndexMode::ALL).unwrap(),
            IndexTarget::Position(2)
        );
        assert_eq!(
            resolver.resolve_one(&s, "++end", IndexMode::ALL).unwrap(),
            IndexTarget::Position(3)
        );
        assert!(matches!(
            resolver.resolve_one(&VectorStore::new(), "end", IndexMode::ALL),
            Err(VectorError::EmptyVector)
        ));
    }

    #[test]
    fn test_special_index_only_when_allowed() {
        let table = SpecialIndexTable::default();
        let resolver = IndexResolver::new(&table);
        let s = store(&[4.0, 1.0, 9.0]);

        match resolver.resolve_one(&s, "max", IndexMode::ALL).unwrap() {
            IndexTarget::Special(special) => assert_eq!(special.evaluate(&s), 9.0),
            other => panic!("expected special index, got {:?}", other),
        }
        assert!(matches!(
            resolver.resolve_one(&s, "max", IndexMode::CHECK),
            Err(VectorError::BadIndex(_))
        ));
        assert!(matches!(
            resolver
                .resolve_range(&s, "min", IndexMode::ALL)
                .unwrap()
                .writable("min"),
            Err(VectorError::ReadOnlyIndex(_))
        ));
    }

    #[test]
    fn test_offset_and_bounds() {
        let table = SpecialIndexTable::default();
        let resolver = IndexResolver::new(&table);
        let mut s = store(&[1.0, 2.0, 3.0]);
        s.set_offset(10);

        assert_eq!(
            resolver.resolve_position(&s, "11", IndexMode::CHECK).unwrap(),
            1
        );
        assert!(matches!(
            resolver.resolve_position(&s, "2", IndexMode::CHECK),
            Err(VectorError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            resolver.resolve_position(&s, "13", IndexMode::CHECK),
            Err(VectorError::IndexOutOfRange { .. })
        ));
        // Upper bound only checked on request
        assert_eq!(
            resolver.resolve_position(&s, "20", IndexMode::NONE).unwrap(),
            10
        );
    }

    #[test]
    fn test_ranges() {
        let table = SpecialIndexTable::default();
        let resolver = IndexResolver::new(&table);
        let s = store(&[0.0, 1.0, 2.0, 3.0, 4.0]);

        assert_eq!(
            resolver.resolve_window(&s, "1:3", IndexMode::RANGE).unwrap(),
            Window::inclusive(1, 3)
        );
        assert_eq!(
            resolver.resolve_window(&s, ":2", IndexMode::RANGE).unwrap(),
            Window::inclusive(0, 2)
        );
        assert_eq!(
            resolver.resolve_window(&s, "3:", IndexMode::RANGE).unwrap(),
            Window::inclusive(3, 4)
        );
        assert_eq!(
            resolver.resolve_window(&s, "2", IndexMode::RANGE).unwrap(),
            Window::inclusive(2, 2)
        );
        assert!(matches!(
            resolver.resolve_window(&s, "3:1", IndexMode::RANGE),
            Err(VectorError::InvalidRange(_))
        ));
        assert!(matches!(
            resolver.resolve_window(&s, "1:x", IndexMode::RANGE),
            Err(VectorError::BadIndex(_))
        ));
    }

    #[test]
    fn test_expression_fallback() {
        let table = SpecialIndexTable::default();
        let evaluator = Doubler;
        let resolver = IndexResolver::new(&table).with_evaluator(&evaluator);
        let s = store(&[0.0; 10]);

        assert_eq!(
            resolver.resolve_position(&s, "2*3", IndexMode::CHECK).unwrap(),
            6
        );
        assert!(matches!(
            resolver.resolve_position(&s, "oops", IndexMode::CHECK),
            Err(VectorError::BadIndex(_))
        ));
    }

    #[test]
    fn test_window_clamp() {
        let w = Window::inclusive(2, 9).clamp(5);
        assert_eq!(w, Window { start: 2, end: 5 });
        assert_eq!(Window::full(0).clamp(0).len(), 0);
        assert!(Window::inclusive(7, 8).clamp(3).is_empty());
    }
}
