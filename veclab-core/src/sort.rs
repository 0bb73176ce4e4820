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

//! Permutation Sort
//!
//! Multi-key sort over parallel columns. Instead of moving values, the
//! engine sorts an index array and then applies it to each column in
//! lock-step:
//!
//! ```text
//! columns[0]: [3 1 2]      permutation: [1 2 0]
//! columns[1]: [a b c]  ->  columns[0]:  [1 2 3]
//!                          columns[1]:  [b c a]
//! ```
//!
//! `permutation[i]` is the source position for output position `i`.
//!
//! ## Stability
//!
//! The index array is sorted with a stable sort, so rows that tie on every
//! key keep their original relative order. Comparator state lives in the
//! `SortSpec` passed to each call.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, VectorError};

/// User-supplied value comparator
pub type Comparator = Arc<dyn Fn(f64, f64) -> Ordering + Send + Sync>;

/// How two values of a key column compare
#[derive(Clone)]
pub enum CompareKind {
    /// Sign of `a - b`; NaN differences tie
    Double,
    /// Truncated integer comparison
    Long,
    /// Byte-wise comparison of the formatted values
    Ascii,
    /// Case-insensitive comparison of the formatted values with embedded
    /// digit runs compared numerically
    Dictionary,
    Custom(Comparator),
}

impl fmt::Debug for CompareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareKind::Double => write!(f, "Double"),
            CompareKind::Long => write!(f, "Long"),
            CompareKind::Ascii => write!(f, "Ascii"),
            CompareKind::Dictionary => write!(f, "Dictionary"),
            CompareKind::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl CompareKind {
    fn compare(&self, a: f64, b: f64) -> Ordering {
        match self {
            CompareKind::Double => {
                let delta = a - b;
                if delta < 0.0 {
                    Ordering::Less
                } else if delta > 0.0 {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            }
            CompareKind::Long => (a as i64).cmp(&(b as i64)),
            CompareKind::Ascii => a.to_string().cmp(&b.to_string()),
            CompareKind::Dictionary => dictionary_compare(&a.to_string(), &b.to_string()),
            CompareKind::Custom(cmp) => cmp(a, b),
        }
    }
}

/// One key of a multi-key sort
#[derive(Debug, Clone)]
pub struct SortKey {
    /// Index into the column list
    pub column: usize,
    pub kind: CompareKind,
    pub ascending: bool,
}

/// Ordered list of sort keys
#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key
    pub fn key(mut self, column: usize, kind: CompareKind, ascending: bool) -> Self {
        self.keys.push(SortKey {
            column,
            kind,
            ascending,
        });
        self
    }

    /// Numeric keys over `columns` columns in order, all in one direction
    pub fn by_columns(columns: usize, reverse: bool) -> Self {
        (0..columns).fold(Self::new(), |spec, c| {
            spec.key(c, CompareKind::Double, !reverse)
        })
    }
}

fn permute(columns: &[&[f64]], keys: &[SortKey], length: usize) -> Vec<usize> {
    let mut permutation: Vec<usize> = (0..length).collect();
    permutation.sort_by(|&a, &b| {
        for key in keys {
            let column = columns[key.column];
            let ord = key.kind.compare(column[a], column[b]);
            let ord = if key.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    permutation
}

/// Permutation sorting `columns[0]` ascending (or descending with
/// `reverse`), ties broken by the following columns.
pub fn build_permutation(columns: &[&[f64]], reverse: bool) -> Result<Vec<usize>> {
    build_permutation_with(columns, &SortSpec::by_columns(columns.len(), reverse))
}

/// Permutation over equal-length columns ordered by `spec`
pub fn build_permutation_with(columns: &[&[f64]], spec: &SortSpec) -> Result<Vec<usize>> {
    let Some(first) = columns.first() else {
        return Ok(Vec::new());
    };
    let length = first.len();
    if let Some(other) = columns.iter().find(|c| c.len() != length) {
        return Err(VectorError::LengthMismatch {
            left: length,
            right: other.len(),
        });
    }
    if let Some(key) = spec.keys.iter().find(|k| k.column >= columns.len()) {
        return Err(VectorError::BadIndex(format!("sort key column {}", key.column)));
    }
    Ok(permute(columns, &spec.keys, length))
}

/// Rearrange `values` so that `values[i]` becomes the old
/// `values[permutation[i]]`
pub fn apply_permutation(values: &mut [f64], permutation: &[usize]) -> Result<()> {
    if values.len() != permutation.len() {
        return Err(VectorError::LengthMismatch {
            left: values.len(),
            right: permutation.len(),
        });
    }
    if let Some(&bad) = permutation.iter().find(|&&p| p >= values.len()) {
        return Err(VectorError::BadIndex(bad.to_string()));
    }
    let scratch = values.to_vec();
    for (slot, &source) in values.iter_mut().zip(permutation) {
        *slot = scratch[source];
    }
    Ok(())
}

/// Sort `values` ascending in place
pub fn sort_in_place(values: &mut [f64]) {
    let permutation = {
        let view: &[f64] = values;
        permute(&[view], &SortSpec::by_columns(1, false).keys, view.len())
    };
    let scratch = values.to_vec();
    for (slot, source) in values.iter_mut().zip(permutation) {
        *slot = scratch[source];
    }
}

/// Rank statistics read off the sorted permutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatistic {
    Median,
    Q1,
    Q3,
}

/// Median or quartile of every element of `values`.
///
/// Returns `-f64::MAX` for an empty slice.
pub fn order_statistic(values: &[f64], kind: OrderStatistic) -> f64 {
    let n = values.len();
    if n == 0 {
        return -f64::MAX;
    }
    let permutation = permute(&[values], &SortSpec::by_columns(1, false).keys, n);
    let at = |rank: usize| values[permutation[rank]];
    let mid = (n - 1) / 2;

    match kind {
        OrderStatistic::Median => {
            if n % 2 == 1 {
                at(mid)
            } else {
                (at(mid) + at(mid + 1)) * 0.5
            }
        }
        OrderStatistic::Q1 => {
            if n < 4 {
                return at(0);
            }
            let q = mid / 2;
            if mid % 2 == 1 {
                at(q)
            } else {
                (at(q) + at(q + 1)) * 0.5
            }
        }
        OrderStatistic::Q3 => {
            if n < 4 {
                return at(n - 1);
            }
            let q = (n + mid) / 2;
            if mid % 2 == 1 {
                at(q)
            } else {
                (at(q) + at(q + 1)) * 0.5
            }
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn strip_zeros(digits: &[u8]) -> &[u8] {
    let start = digits
        .iter()
        .position(|&c| c != b'0')
        .unwrap_or(digits.len());
    &digits[start..]
}

/// Dictionary order: case-insensitive, digit runs compared as numbers.
///
/// Case only breaks ties, uppercase first.
pub fn dictionary_compare(a: &str, b: &str) -> Ordering {
    let (mut left, mut right) = (a.as_bytes(), b.as_bytes());
    let mut secondary = Ordering::Equal;

    loop {
        let (ca, cb) = match (left.first(), right.first()) {
            (None, None) => return secondary,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ca), Some(&cb)) => (ca, cb),
        };

        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let (da, rest_a) = split_digits(left);
            let (db, rest_b) = split_digits(right);
            let (na, nb) = (strip_zeros(da), strip_zeros(db));
            let ord = na.len().cmp(&nb.len()).then_with(|| na.cmp(nb));
            if ord != Ordering::Equal {
                return ord;
            }
            if secondary == Ordering::Equal {
                secondary = da.len().cmp(&db.len());
            }
            left = rest_a;
            right = rest_b;
            continue;
        }

        let (la, lb) = (ca.to_ascii_lowercase(), cb.to_ascii_lowercase());
        if la != lb {
            return la.cmp(&lb);
        }
        if secondary == Ordering::Equal && ca != cb {
            secondary = if ca.is_ascii_uppercase() {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        left = &left[1..];
        right = &right[1..];
    }
}
