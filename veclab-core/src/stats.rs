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

//! Vector Reducers
//!
//! Scalar summaries over the finite subsequence of a slice. NaN and
//! infinite entries are skipped by everything here except the order
//! statistics, which rank every element.

use crate::sort::{OrderStatistic, order_statistic};
use crate::store::finite_extent;

#[inline]
fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

pub fn min(values: &[f64]) -> f64 {
    finite_extent(values).0
}

pub fn max(values: &[f64]) -> f64 {
    finite_extent(values).1
}

pub fn sum(values: &[f64]) -> f64 {
    finite(values).sum()
}

pub fn product(values: &[f64]) -> f64 {
    finite(values).product()
}

/// Number of finite values
pub fn count(values: &[f64]) -> f64 {
    finite(values).count() as f64
}

/// NaN when there are no finite values
pub fn mean(values: &[f64]) -> f64 {
    let (total, n) = finite(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    total / n as f64
}

/// Sample variance (n-1 denominator), 0 with fewer than two values
pub fn variance(values: &[f64]) -> f64 {
    let mean = mean(values);
    let (acc, n) = finite(values).fold((0.0, 0usize), |(acc, n), v| {
        let dx = v - mean;
        (acc + dx * dx, n + 1)
    });
    if n < 2 {
        return 0.0;
    }
    acc / (n - 1) as f64
}

pub fn std_deviation(values: &[f64]) -> f64 {
    let var = variance(values);
    if var > 0.0 { var.sqrt() } else { 0.0 }
}

/// Mean absolute deviation (n denominator), 0 with fewer than two values
pub fn avg_deviation(values: &[f64]) -> f64 {
    let mean = mean(values);
    let (acc, n) = finite(values).fold((0.0, 0usize), |(acc, n), v| {
        (acc + (v - mean).abs(), n + 1)
    });
    if n < 2 {
        return 0.0;
    }
    acc / n as f64
}

/// Third standardized moment.
///
/// Deviations are taken as absolute values before cubing, so the result
/// is never negative.
pub fn skew(values: &[f64]) -> f64 {
    let mean = mean(values);
    let (var, skew, n) = finite(values).fold((0.0, 0.0, 0usize), |(var, skew, n), v| {
        let diff = (v - mean).abs();
        let diffsq = diff * diff;
        (var + diffsq, skew + diffsq * diff, n + 1)
    });
    if n < 2 {
        return 0.0;
    }
    let var = var / (n - 1) as f64;
    skew / (n as f64 * var * var.sqrt())
}

/// Fisher excess kurtosis, 0 for constant or tiny inputs
pub fn kurtosis(values: &[f64]) -> f64 {
    let mean = mean(values);
    let (var, kurt, n) = finite(values).fold((0.0, 0.0, 0usize), |(var, kurt, n), v| {
        let diff = v - mean;
        let diffsq = diff * diff;
        (var + diffsq, kurt + diffsq * diffsq, n + 1)
    });
    if n < 2 {
        return 0.0;
    }
    let var = var / (n - 1) as f64;
    if var == 0.0 {
        return 0.0;
    }
    kurt / (n as f64 * var * var) - 3.0
}

/// Count of finite values exactly equal to zero
pub fn zeros(values: &[f64]) -> f64 {
    finite(values).filter(|&v| v == 0.0).count() as f64
}

pub fn median(values: &[f64]) -> f64 {
    order_statistic(values, OrderStatistic::Median)
}

pub fn q1(values: &[f64]) -> f64 {
    order_statistic(values, OrderStatistic::Q1)
}

pub fn q3(values: &[f64]) -> f64 {
    order_statistic(values, OrderStatistic::Q3)
}
