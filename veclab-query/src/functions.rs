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

//! Math Functions
//!
//! Functions callable as `name(expr)`. Each takes exactly one argument
//! and has one of three shapes:
//!
//! | Shape     | Effect                                         |
//! |-----------|------------------------------------------------|
//! | Component | maps every finite entry, leaves others alone   |
//! | Vector    | rewrites the whole vector (`sort`, `norm`)     |
//! | Scalar    | reduces the vector to one value                |

use std::fmt;

use veclab_core::VectorError;
use veclab_core::sort::sort_in_place;
use veclab_core::stats;
use veclab_core::store::finite_extent;

/// How a function consumes its argument
#[derive(Clone, Copy)]
pub enum FunctionKind {
    Component(fn(f64) -> f64),
    Vector(fn(&mut Vec<f64>)),
    Scalar(fn(&[f64]) -> f64),
}

/// A named math function
#[derive(Clone, Copy)]
pub struct MathFunction {
    pub name: &'static str,
    pub kind: FunctionKind,
}

impl fmt::Debug for MathFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.kind {
            FunctionKind::Component(_) => "component",
            FunctionKind::Vector(_) => "vector",
            FunctionKind::Scalar(_) => "scalar",
        };
        write!(f, "MathFunction({}, {})", self.name, shape)
    }
}

impl PartialEq for MathFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl MathFunction {
    /// Apply to `values`, failing on any non-finite result
    pub fn apply(&self, mut values: Vec<f64>) -> Result<Vec<f64>, VectorError> {
        match self.kind {
            FunctionKind::Component(f) => {
                for v in values.iter_mut().filter(|v| v.is_finite()) {
                    let result = f(*v);
                    if !result.is_finite() {
                        return Err(VectorError::from_non_finite(result));
                    }
                    *v = result;
                }
                Ok(values)
            }
            FunctionKind::Vector(f) => {
                f(&mut values);
                Ok(values)
            }
            FunctionKind::Scalar(f) => Ok(vec![f(&values)]),
        }
    }
}

/// Round half away from zero
pub fn round(v: f64) -> f64 {
    if v < 0.0 {
        (v - 0.5).ceil()
    } else {
        (v + 0.5).floor()
    }
}

/// Floored remainder; zero when `y` is zero
pub fn fmod(x: f64, y: f64) -> f64 {
    if y == 0.0 {
        return 0.0;
    }
    x - (x / y).floor() * y
}

fn random(_: f64) -> f64 {
    rand::random::<f64>()
}

/// Rescale to [0, 1] by the finite extent
fn normalize(values: &mut Vec<f64>) {
    let (min, max) = finite_extent(values.as_slice());
    let range = max - min;
    for v in values.iter_mut() {
        *v = (*v - min) / range;
    }
}

fn sort(values: &mut Vec<f64>) {
    sort_in_place(values);
}

macro_rules! component {
    ($name:literal, $f:expr) => {
        MathFunction {
            name: $name,
            kind: FunctionKind::Component($f),
        }
    };
}

macro_rules! scalar {
    ($name:literal, $f:expr) => {
        MathFunction {
            name: $name,
            kind: FunctionKind::Scalar($f),
        }
    };
}

/// Every built-in function
pub static FUNCTIONS: &[MathFunction] = &[
    component!("abs", f64::abs),
    component!("acos", f64::acos),
    component!("asin", f64::asin),
    component!("atan", f64::atan),
    component!("ceil", f64::ceil),
    component!("cos", f64::cos),
    component!("cosh", f64::cosh),
    component!("exp", f64::exp),
    component!("floor", f64::floor),
    component!("log", f64::ln),
    component!("log10", f64::log10),
    component!("random", random),
    component!("round", round),
    component!("sin", f64::sin),
    component!("sinh", f64::sinh),
    component!("sqrt", f64::sqrt),
    component!("tan", f64::tan),
    component!("tanh", f64::tanh),
    MathFunction {
        name: "norm",
        kind: FunctionKind::Vector(normalize),
    },
    MathFunction {
        name: "sort",
        kind: FunctionKind::Vector(sort),
    },
    scalar!("adev", stats::avg_deviation),
    scalar!("kurtosis", stats::kurtosis),
    scalar!("length", stats::count),
    scalar!("max", stats::max),
    scalar!("mean", stats::mean),
    scalar!("median", stats::median),
    scalar!("min", stats::min),
    scalar!("nz", stats::zeros),
    scalar!("prod", stats::product),
    scalar!("q1", stats::q1),
    scalar!("q3", stats::q3),
    scalar!("sdev", stats::std_deviation),
    scalar!("skew", stats::skew),
    scalar!("sum", stats::sum),
    scalar!("var", stats::variance),
];

/// Look up a built-in by name
pub fn lookup(name: &str) -> Option<&'static MathFunction> {
    FUNCTIONS.iter().find(|f| f.name == name)
}
