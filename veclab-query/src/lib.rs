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

//! VecLab Query
//!
//! Vector expressions over a `VectorRegistry`:
//!
//! ```text
//! "x(1:3) * 2 + mean(y)"
//!        |
//!     Parser ──► Expr ──► Evaluator ──► Vec<f64>
//!                            |
//!                   VectorRegistry::lookup_with
//! ```
//!
//! - **parser**: precedence-climbing parser over `+ - * / % ^ << >>`,
//!   comparisons, `&& || !` and the function table
//! - **eval**: scalar/vector broadcasting with a step budget
//! - **functions**: component-wise, whole-vector and reducing functions
//! - **substitute**: hook for `$var`, `[cmd]`, `"..."` and `{...}` operands

pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod substitute;

pub use error::{ExprError, Result};
pub use eval::{Evaluator, apply_binary};
pub use functions::{FUNCTIONS, FunctionKind, MathFunction};
pub use parser::{BinaryOp, Expr, UnaryOp, parse};
pub use substitute::{LiteralSubstitution, Substitution, SubstitutionKind};

use veclab_core::VectorRegistry;

/// Evaluate `text` against `registry` with literal substitution
pub fn evaluate(registry: &VectorRegistry, text: &str) -> Result<Vec<f64>> {
    Evaluator::new(registry).evaluate(text)
}
