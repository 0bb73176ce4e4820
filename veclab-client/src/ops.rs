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

//! Vector Operations
//!
//! `VectorOps` is the instance-command surface over a `VectorRegistry`.
//! Operations take the vector they act on as a `VectorHandle`; other
//! vectors are named by text so ranges like `y(0:9)` work everywhere.
//!
//! ## Notification
//!
//! Every mutating operation stages its input first, then changes each
//! affected vector through a single `VectorHandle::update`, so each
//! vector is marked changed exactly once per call.
//!
//! ## Index tokens
//!
//! Index arguments go through `IndexResolver` with the expression
//! evaluator as fallback, so `x.delete(&["end"])` and
//! `x.index_get("length(x) - 2")` both resolve.

use std::io::Read;
use std::str::FromStr;

use tracing::{debug, info};
use veclab_core::sort::{apply_permutation, build_permutation};
use veclab_core::{
    IndexMode, IndexResolver, NotifyMode, RangeTarget, Selection, VectorError, VectorHandle,
    VectorRegistry, VectorStore, Window,
};
use veclab_query::Evaluator;

use crate::binread::{BinaryReadOptions, read_records};
use crate::error::{ClientError, Result};

// ============================================================================
// Operation arguments
// ============================================================================

/// Values for `append` and `set`
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// A vector reference, optionally with a range: `y`, `y(2:end)`
    Vector(&'a str),
    /// Literal values
    Values(&'a [f64]),
}

/// End of a `sequence`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeqEnd {
    /// Keep the current length
    End,
    Value(f64),
}

/// `notify` sub-command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Mode(NotifyMode),
    /// Notify immediately, dropping any deferred notification
    Now,
    Cancel,
    Pending,
}

impl FromStr for NotifyAction {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let action = match s {
            "always" => NotifyAction::Mode(NotifyMode::Always),
            "never" => NotifyAction::Mode(NotifyMode::Never),
            "whenidle" => NotifyAction::Mode(NotifyMode::WhenIdle),
            "now" => NotifyAction::Now,
            "cancel" => NotifyAction::Cancel,
            "pending" => NotifyAction::Pending,
            _ => {
                return Err(ClientError::BadOption {
                    given: s.to_string(),
                    expected: "\"always\", \"never\", \"whenidle\", \"now\", \"cancel\", or \"pending\"",
                });
            }
        };
        Ok(action)
    }
}

/// Operator for the deprecated `arith` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }
    }
}

/// Right-hand side of `arith`
#[derive(Debug, Clone, Copy)]
pub enum ArithOperand<'a> {
    Vector(&'a str),
    Scalar(f64),
}

/// Closed interval test with an epsilon tolerance.
///
/// The value is normalized against `[min, max]`; a degenerate interval
/// matches values within `epsilon` of `max`.
pub fn in_range(value: f64, min: f64, max: f64, epsilon: f64) -> bool {
    let range = max - min;
    if range < epsilon {
        return (max - value).abs() < epsilon;
    }
    let norm = (value - min) / range;
    norm >= -epsilon && (norm - 1.0) < epsilon
}

// ============================================================================
// VectorOps
// ============================================================================

/// Instance operations over a registry
#[derive(Debug, Clone, Copy)]
pub struct VectorOps<'r> {
    registry: &'r VectorRegistry,
}

impl<'r> VectorOps<'r> {
    pub fn new(registry: &'r VectorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r VectorRegistry {
        self.registry
    }

    fn evaluator(&self) -> Evaluator<'r> {
        Evaluator::new(self.registry)
    }

    /// Existing vector by name, or a new one; never marks it changed
    fn target(&self, name: &str) -> Result<VectorHandle> {
        match self.registry.find(name) {
            Some(vector) => Ok(vector),
            None => Ok(self.registry.create(name)?.0),
        }
    }

    fn select(&self, text: &str) -> Result<Selection> {
        let evaluator = self.evaluator();
        Ok(self.registry.lookup_with(text, Some(&evaluator))?)
    }

    fn stage(&self, source: &Source<'_>) -> Result<Vec<f64>> {
        match source {
            Source::Vector(text) => Ok(self.select(text)?.values()),
            Source::Values(values) => Ok(values.to_vec()),
        }
    }

    /// Run `f` with a resolver bound to this registry and a read view of `vector`
    fn resolve<T>(
        &self,
        vector: &VectorHandle,
        f: impl FnOnce(&IndexResolver<'_>, &VectorStore) -> veclab_core::Result<T>,
    ) -> Result<T> {
        let evaluator = self.evaluator();
        let specials = self.registry.specials();
        let resolver = IndexResolver::new(&specials).with_evaluator(&evaluator);
        let guard = vector.read();
        Ok(f(&resolver, guard.store())?)
    }

    fn find(&self, name: &str) -> Result<VectorHandle> {
        self.registry
            .find(name)
            .ok_or_else(|| VectorError::NotFound(name.to_string()).into())
    }

    // ------------------------------------------------------------------------
    // Contents
    // ------------------------------------------------------------------------

    /// Concatenate `sources` onto the end of `dest`.
    ///
    /// Sources are staged in order. If one fails to resolve, the sources
    /// before it are still appended and the error is returned.
    pub fn append(&self, dest: &VectorHandle, sources: &[Source<'_>]) -> Result<usize> {
        let mut staged = Vec::with_capacity(sources.len());
        let mut failure = None;
        for source in sources {
            match self.stage(source) {
                Ok(values) => staged.push(values),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if !staged.is_empty() {
            dest.update(|store| {
                for values in &staged {
                    store.extend_from_slice(values)?;
                }
                Ok(())
            })?;
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(dest.len()),
        }
    }

    /// Delete the positions selected by `tokens`.
    ///
    /// With no tokens the vector itself is destroyed.
    pub fn delete(&self, vector: &VectorHandle, tokens: &[&str]) -> Result<usize> {
        if tokens.is_empty() {
            self.registry.destroy_handle(vector)?;
            return Ok(0);
        }

        let mask = self.resolve(vector, |resolver, store| {
            let mut mask = vec![false; store.len()];
            for token in tokens {
                let window = resolver
                    .resolve_window(store, token, IndexMode::RANGE)?
                    .clamp(store.len());
                mask[window.start..window.end].fill(true);
            }
            Ok(mask)
        })?;
        let remaining = vector.update(|store| store.delete_mask(&mask))?;
        debug!(vector = %vector.name(), remaining, "elements deleted");
        Ok(remaining)
    }

    /// Copy `vector` into each of `names`, creating them as needed
    pub fn dup(&self, vector: &VectorHandle, names: &[&str]) -> Result<()> {
        for name in names {
            let dest = self.target(name)?;
            if dest.ptr_eq(vector) {
                continue;
            }
            self.registry
                .duplicate(&dest, &Selection::full(vector.clone()))?;
        }
        Ok(())
    }

    /// Evaluate `text` and store the result in `vector`
    pub fn expr(&self, vector: &VectorHandle, text: &str) -> Result<usize> {
        Ok(self.evaluator().evaluate_into(text, vector)?)
    }

    /// Replace the contents with another vector's selection or a list
    pub fn set(&self, vector: &VectorHandle, source: Source<'_>) -> Result<usize> {
        match source {
            Source::Vector(text) => {
                let selection = self.select(text)?;
                self.registry.duplicate(vector, &selection)?;
            }
            Source::Values(values) => vector.update(|store| store.copy_from(values))?,
        }
        Ok(vector.len())
    }

    /// Interleave equal-length sources into `dest`: `dest[k*n + i] = src_i[k]`
    pub fn merge(&self, dest: &VectorHandle, sources: &[&str]) -> Result<usize> {
        let mut columns = Vec::with_capacity(sources.len());
        let mut expected = None;
        for name in sources {
            let selection = self.select(name)?;
            match expected {
                None => expected = Some(selection.len()),
                Some(length) if length != selection.len() => {
                    return Err(ClientError::InconsistentLength(selection.vector.name()));
                }
                Some(_) => {}
            }
            columns.push(selection.values());
        }

        let rows = expected.unwrap_or(0);
        let mut merged = Vec::with_capacity(rows * columns.len());
        for k in 0..rows {
            merged.extend(columns.iter().map(|column| column[k]));
        }
        dest.update(|store| store.copy_from(&merged))?;
        Ok(merged.len())
    }

    /// Deal the values round-robin onto the ends of `names`
    pub fn split(&self, vector: &VectorHandle, names: &[&str]) -> Result<()> {
        let parts = names.len();
        if parts == 0 {
            return Ok(());
        }
        let values = vector.values();
        if values.len() % parts != 0 {
            return Err(ClientError::UnevenSplit {
                name: vector.name(),
                length: values.len(),
                parts,
            });
        }

        for (i, name) in names.iter().enumerate() {
            let part: Vec<f64> = values.iter().skip(i).step_by(parts).copied().collect();
            self.target(name)?
                .update(|store| store.extend_from_slice(&part))?;
        }
        debug!(vector = %vector.name(), parts, "vector split");
        Ok(())
    }

    /// Linearly interpolate `density` points between each pair into `dest`
    pub fn populate(&self, vector: &VectorHandle, dest: &str, density: usize) -> Result<usize> {
        let dest = self.target(dest)?;
        let values = vector.values();
        let Some(&last) = values.last() else {
            return Ok(0);
        };
        if density < 1 {
            return Err(ClientError::BadDensity(density));
        }

        let overflow = VectorError::Allocation {
            requested: usize::MAX,
        };
        let steps = density.checked_add(1).ok_or(overflow.clone())?;
        let size = (values.len() - 1)
            .checked_mul(steps)
            .and_then(|n| n.checked_add(1))
            .ok_or(overflow)?;
        let mut filled = Vec::new();
        filled
            .try_reserve_exact(size)
            .map_err(|_| VectorError::Allocation { requested: size })?;
        for pair in values.windows(2) {
            let slice = (pair[1] - pair[0]) / steps as f64;
            filled.extend((0..steps).map(|j| pair[0] + slice * j as f64));
        }
        filled.push(last);

        dest.update(|store| store.copy_from(&filled))?;
        Ok(filled.len())
    }

    /// Fill with an arithmetic progression.
    ///
    /// Returns the number of values written; nothing changes when the
    /// progression is empty.
    pub fn sequence(
        &self,
        vector: &VectorHandle,
        start: f64,
        end: SeqEnd,
        step: f64,
    ) -> Result<usize> {
        let steps = match end {
            SeqEnd::End => vector.len() as i64,
            SeqEnd::Value(finish) => (((finish - start) / step) as i64).saturating_add(1),
        };
        if steps <= 0 {
            return Ok(0);
        }
        let steps = usize::try_from(steps).map_err(|_| VectorError::Allocation {
            requested: usize::MAX,
        })?;

        vector.update(|store| {
            store.change_length(steps)?;
            for (i, v) in store.values_mut().iter_mut().enumerate() {
                *v = start + step * i as f64;
            }
            Ok(())
        })?;
        Ok(steps)
    }

    /// Replace every value with a uniform sample from [0, 1)
    pub fn random_fill(&self, vector: &VectorHandle) -> Result<()> {
        vector.update(|store| {
            store
                .values_mut()
                .iter_mut()
                .for_each(|v| *v = rand::random::<f64>());
            Ok(())
        })?;
        Ok(())
    }

    /// Sort ascending, or descending with `reverse`.
    ///
    /// `companions` must have the same length; they break ties in order
    /// and are permuted alongside.
    pub fn sort(&self, vector: &VectorHandle, reverse: bool, companions: &[&str]) -> Result<()> {
        let mut targets = Vec::with_capacity(companions.len() + 1);
        targets.push(vector.clone());
        for name in companions {
            let companion = self.find(name)?;
            if companion.len() != vector.len() {
                return Err(ClientError::SizeMismatch {
                    name: companion.name(),
                    expected: vector.name(),
                });
            }
            targets.push(companion);
        }

        let columns: Vec<Vec<f64>> = targets.iter().map(VectorHandle::values).collect();
        let keys: Vec<&[f64]> = columns.iter().map(Vec::as_slice).collect();
        let permutation = build_permutation(&keys, reverse)?;

        for (i, target) in targets.iter().enumerate() {
            if targets[..i].iter().any(|seen| seen.ptr_eq(target)) {
                continue;
            }
            target.update(|store| apply_permutation(store.values_mut(), &permutation))?;
        }
        debug!(vector = %vector.name(), companions = companions.len(), reverse, "vector sorted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Indexing
    // ------------------------------------------------------------------------

    /// Values at an index, range or special index
    pub fn index_get(&self, vector: &VectorHandle, token: &str) -> Result<Vec<f64>> {
        self.resolve(vector, |resolver, store| {
            match resolver.resolve_range(store, token, IndexMode::ALL)? {
                RangeTarget::Special(special) => Ok(vec![special.evaluate(store)]),
                RangeTarget::Window(window) if window.first() >= store.len() => {
                    Err(VectorError::IndexOutOfRange {
                        token: token.to_string(),
                    })
                }
                RangeTarget::Window(window) => Ok(store.window(window).to_vec()),
            }
        })
    }

    /// Set every selected position to `value`; `++end` appends one
    pub fn index_set(&self, vector: &VectorHandle, token: &str, value: f64) -> Result<f64> {
        let window = self.resolve(vector, |resolver, store| {
            resolver
                .resolve_range(store, token, IndexMode::ALL)?
                .writable(token)
        })?;

        vector.update(|store| {
            if window.first() == store.len() {
                store.change_length(store.len() + 1)?;
            }
            store.replicate(window, value);
            Ok(())
        })?;
        Ok(value)
    }

    /// Values from `first` to `last`, reversed when `first > last`
    pub fn range(&self, vector: &VectorHandle, first: &str, last: &str) -> Result<Vec<f64>> {
        let (from, to) = self.resolve(vector, |resolver, store| {
            let length = store.len();
            let from = resolver.resolve_position(store, first, IndexMode::CHECK)?;
            let to = resolver.resolve_position(store, last, IndexMode::CHECK)?;
            for (position, token) in [(from, first), (to, last)] {
                if position >= length {
                    return Err(VectorError::IndexOutOfRange {
                        token: token.to_string(),
                    });
                }
            }
            Ok((from, to))
        })?;

        if from <= to {
            Ok(vector.window_values(Window::inclusive(from, to)))
        } else {
            let mut values = vector.window_values(Window::inclusive(to, from));
            values.reverse();
            Ok(values)
        }
    }

    pub fn length(&self, vector: &VectorHandle) -> usize {
        vector.len()
    }

    /// Resize, zero-filling new positions
    pub fn set_length(&self, vector: &VectorHandle, length: usize) -> Result<usize> {
        vector.update(|store| store.change_length(length))?;
        Ok(length)
    }

    pub fn offset(&self, vector: &VectorHandle) -> i64 {
        vector.offset()
    }

    pub fn set_offset(&self, vector: &VectorHandle, offset: i64) -> Result<i64> {
        vector.update(|store| {
            store.set_offset(offset);
            Ok(())
        })?;
        Ok(offset)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// User indices (position plus offset) of values in `[min, max]`.
    ///
    /// `max` defaults to `min`. A reversed interval matches nothing.
    pub fn search(&self, vector: &VectorHandle, min: f64, max: Option<f64>) -> Vec<i64> {
        let guard = vector.read();
        let store = guard.store();
        let offset = store.offset();
        self.matches(store.values(), min, max)
            .map(|(i, _)| i as i64 + offset)
            .collect()
    }

    /// Values in `[min, max]`, see `search`
    pub fn search_values(&self, vector: &VectorHandle, min: f64, max: Option<f64>) -> Vec<f64> {
        let values = vector.values();
        self.matches(&values, min, max).map(|(_, v)| v).collect()
    }

    fn matches<'v>(
        &self,
        values: &'v [f64],
        min: f64,
        max: Option<f64>,
    ) -> impl Iterator<Item = (usize, f64)> + 'v {
        let epsilon = self.registry.config().search_epsilon;
        let max = max.unwrap_or(min);
        let bogus = min - max >= epsilon;
        values
            .iter()
            .copied()
            .enumerate()
            .filter(move |&(_, v)| !bogus && in_range(v, min, max, epsilon))
    }

    /// Values rescaled to [0, 1] by the finite min and max.
    ///
    /// With `dest` the result is also stored in that vector.
    pub fn normalize(&self, vector: &VectorHandle, dest: Option<&str>) -> Result<Vec<f64>> {
        let (min, max, values) = {
            let mut guard = vector.write();
            let store = guard.store_mut();
            (store.min(), store.max(), store.values().to_vec())
        };
        let range = max - min;
        let normalized: Vec<f64> = values.iter().map(|v| (v - min) / range).collect();

        if let Some(name) = dest {
            self.target(name)?.update(|store| {
                store.copy_from(&normalized)?;
                store.update_range();
                Ok(())
            })?;
        }
        Ok(normalized)
    }

    /// Change or query notification behavior.
    ///
    /// Returns the pending flag for `Pending`, whether anything was
    /// cancelled for `Cancel`, and `false` otherwise.
    pub fn notify(&self, vector: &VectorHandle, action: NotifyAction) -> bool {
        match action {
            NotifyAction::Mode(mode) => {
                vector.set_notify_mode(mode);
                false
            }
            NotifyAction::Now => {
                vector.notify_now();
                false
            }
            NotifyAction::Cancel => vector.cancel_pending(),
            NotifyAction::Pending => vector.is_pending(),
        }
    }

    // ------------------------------------------------------------------------
    // I/O
    // ------------------------------------------------------------------------

    /// Read binary records from `reader` into `vector`.
    ///
    /// Values are written from `options.at` (default: the current end),
    /// growing the vector as needed. Returns the number of records read.
    pub fn binary_read<R: Read>(
        &self,
        vector: &VectorHandle,
        reader: &mut R,
        options: &BinaryReadOptions,
    ) -> Result<usize> {
        let at = match &options.at {
            Some(token) => {
                let position = self.resolve(vector, |resolver, store| {
                    let position = resolver.resolve_position(store, token, IndexMode::NONE)?;
                    if position > store.len() {
                        return Err(VectorError::IndexOutOfRange {
                            token: token.clone(),
                        });
                    }
                    Ok(position)
                })?;
                Some(position)
            }
            None => None,
        };

        let values = read_records(
            reader,
            options.format,
            options.swap,
            options.count,
            self.registry.config().binary_chunk_records,
        )?;

        vector.update(|store| {
            let start = at.unwrap_or(store.len());
            let end = start + values.len();
            if end > store.len() {
                store.change_length(end)?;
            }
            store.values_mut()[start..end].copy_from_slice(&values);
            Ok(())
        })?;
        info!(vector = %vector.name(), records = values.len(), format = %options.format, "binary read");
        Ok(values.len())
    }

    /// Element-wise `vector OP operand`, returned without storing
    #[deprecated(note = "use `expr`")]
    pub fn arith(
        &self,
        vector: &VectorHandle,
        op: ArithOp,
        operand: ArithOperand<'_>,
    ) -> Result<Vec<f64>> {
        let values = vector.values();
        match operand {
            ArithOperand::Scalar(scalar) => {
                Ok(values.iter().map(|&v| op.apply(v, scalar)).collect())
            }
            ArithOperand::Vector(text) => {
                let other = self.select(text)?.values();
                if other.len() != values.len() {
                    return Err(VectorError::LengthMismatch {
                        left: values.len(),
                        right: other.len(),
                    }
                    .into());
                }
                Ok(values
                    .iter()
                    .zip(&other)
                    .map(|(&a, &b)| op.apply(a, b))
                    .collect())
            }
        }
    }
}
