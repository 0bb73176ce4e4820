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

//! Vector Expression Evaluator
//!
//! Walks an `Expr` tree against a `VectorRegistry`. Every value is a
//! vector; a length-1 vector acts as a scalar.
//!
//! ## Broadcasting
//!
//! ```text
//! left  right   result
//! n     1       left[i]  OP s        (checked first, so 1 OP 1 lands here)
//! 1     n       s OP right[i]        (operand order kept: 10 - v)
//! n     n       left[i]  OP right[i]
//! n     m       LengthMismatch
//! ```
//!
//! Shifts rotate the left vector and need a scalar on the right. After
//! evaluation any NaN or infinity in the result is reported as a domain
//! or range error.

use std::cell::Cell;

use tracing::trace;
use veclab_core::{IndexEvaluator, VectorError, VectorHandle, VectorRegistry};

use crate::error::{ExprError, Result};
use crate::functions::fmod;
use crate::parser::{BinaryOp, Expr, UnaryOp, parse};
use crate::substitute::{LiteralSubstitution, Substitution, SubstitutionKind};

/// Expression evaluator bound to a registry
pub struct Evaluator<'r> {
    registry: &'r VectorRegistry,
    substitution: &'r dyn Substitution,
    /// Maximum evaluation steps per top-level expression
    max_steps: usize,
    steps: Cell<usize>,
    depth: Cell<usize>,
}

impl<'r> Evaluator<'r> {
    /// Evaluator with literal substitution and the registry's step limit
    pub fn new(registry: &'r VectorRegistry) -> Self {
        Self {
            registry,
            substitution: &LiteralSubstitution,
            max_steps: registry.config().max_eval_steps,
            steps: Cell::new(0),
            depth: Cell::new(0),
        }
    }

    /// Route `$`, `[]`, `""` and `{}` operands through `substitution`
    pub fn with_substitution(mut self, substitution: &'r dyn Substitution) -> Self {
        self.substitution = substitution;
        self
    }

    /// Create with custom step limit
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Parse and evaluate `text`
    pub fn evaluate(&self, text: &str) -> Result<Vec<f64>> {
        let expr = parse(text)?;
        self.evaluate_expr(&expr)
    }

    /// Evaluate a parsed expression and reject non-finite results
    pub fn evaluate_expr(&self, expr: &Expr) -> Result<Vec<f64>> {
        let depth = self.depth.get();
        if depth == 0 {
            self.steps.set(0);
        }
        self.depth.set(depth + 1);
        let result = self.eval(expr);
        self.depth.set(depth);

        let values = result?;
        if let Some(&bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(VectorError::from_non_finite(bad).into());
        }
        trace!(length = values.len(), steps = self.steps.get(), "expression evaluated");
        Ok(values)
    }

    /// Evaluate `text` and store the result in `dest`
    pub fn evaluate_into(&self, text: &str, dest: &VectorHandle) -> Result<usize> {
        let values = self.evaluate(text)?;
        dest.update(|store| store.copy_from(&values))?;
        Ok(values.len())
    }

    fn step(&self) -> Result<()> {
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        if steps > self.max_steps {
            return Err(ExprError::Timeout(self.max_steps));
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr) -> Result<Vec<f64>> {
        self.step()?;

        match expr {
            Expr::Literal(n) => Ok(vec![*n]),

            Expr::Vector(text) => self.vector(text),

            Expr::Substitution { kind, text } => {
                let expanded = self.substitution.substitute(*kind, text).map_err(|reason| {
                    ExprError::Substitution {
                        kind: *kind,
                        text: text.clone(),
                        reason,
                    }
                })?;
                self.parse_string(*kind, &expanded)
            }

            Expr::UnaryOp { op, expr } => {
                let mut values = self.eval(expr)?;
                match op {
                    UnaryOp::Neg => values.iter_mut().for_each(|v| *v = -*v),
                    UnaryOp::Not => values.iter_mut().for_each(|v| *v = bool_value(*v == 0.0)),
                }
                Ok(values)
            }

            Expr::BinaryOp { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(apply_binary(*op, left, right)?)
            }

            Expr::FnCall { function, arg } => {
                let values = self.eval(arg)?;
                Ok(function.apply(values)?)
            }
        }
    }

    fn vector(&self, text: &str) -> Result<Vec<f64>> {
        let selection = self.registry.lookup_with(text, Some(self))?;
        Ok(selection.values())
    }

    /// Substituted text becomes a scalar or a vector reference
    fn parse_string(&self, kind: SubstitutionKind, text: &str) -> Result<Vec<f64>> {
        if let Ok(value) = text.trim().parse::<f64>() {
            return Ok(vec![value]);
        }
        let reference = text.trim_start();
        if reference.is_empty() {
            return Err(ExprError::Substitution {
                kind,
                text: text.to_string(),
                reason: "empty value".to_string(),
            });
        }
        self.vector(reference)
    }
}

impl IndexEvaluator for Evaluator<'_> {
    fn evaluate_index(&self, text: &str) -> Option<i64> {
        let values = self.evaluate(text).ok()?;
        match values.as_slice() {
            [value] => Some(value.trunc() as i64),
            _ => None,
        }
    }
}

// ============================================================================
// Broadcasting
// ============================================================================

#[inline]
fn bool_value(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[inline]
fn truthy(v: f64) -> bool {
    v != 0.0
}

/// Element operation for every non-shift operator
fn scalar_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => fmod(a, b),
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Pow => a.powf(b),
        BinaryOp::Lt => bool_value(a < b),
        BinaryOp::Gt => bool_value(a > b),
        BinaryOp::Le => bool_value(a <= b),
        BinaryOp::Ge => bool_value(a >= b),
        BinaryOp::Eq => bool_value(a == b),
        BinaryOp::Ne => bool_value(a != b),
        BinaryOp::And => bool_value(truthy(a) && truthy(b)),
        BinaryOp::Or => bool_value(truthy(a) || truthy(b)),
        BinaryOp::Shl | BinaryOp::Shr => a,
    }
}

fn zero_component(values: &[f64]) -> std::result::Result<(), VectorError> {
    match values.iter().position(|&v| v == 0.0) {
        Some(index) => Err(VectorError::DivideByZeroComponent { index }),
        None => Ok(()),
    }
}

/// Combine two operands under the broadcasting rules
pub fn apply_binary(
    op: BinaryOp,
    mut left: Vec<f64>,
    right: Vec<f64>,
) -> std::result::Result<Vec<f64>, VectorError> {
    if let [scalar] = right[..] {
        if op.is_shift() {
            let length = left.len();
            if length > 0 {
                let offset = (scalar as i64) % length as i64;
                if offset > 0 {
                    let offset = offset as usize;
                    match op {
                        BinaryOp::Shl => left.rotate_left(offset),
                        _ => left.rotate_right(offset),
                    }
                }
            }
            return Ok(left);
        }
        if op == BinaryOp::Div && scalar == 0.0 {
            return Err(VectorError::DivideByZero);
        }
        left.iter_mut().for_each(|v| *v = scalar_op(op, *v, scalar));
        return Ok(left);
    }

    if op.is_shift() {
        return Err(VectorError::ShiftOperand);
    }
    if op == BinaryOp::Div {
        zero_component(&right)?;
    }

    if let [scalar] = left[..] {
        return Ok(right.into_iter().map(|v| scalar_op(op, scalar, v)).collect());
    }

    if left.len() != right.len() {
        return Err(VectorError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    left.iter_mut()
        .zip(&right)
        .for_each(|(l, &r)| *l = scalar_op(op, *l, r));
    Ok(left)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veclab_core::EngineConfig;

    fn registry_with(vectors: &[(&str, &[f64])]) -> VectorRegistry {
        let registry = VectorRegistry::new(EngineConfig::default());
        for (name, values) in vectors {
            let (v, _) = registry.create(name).unwrap();
            v.update(|s| s.copy_from(values)).unwrap();
        }
        registry
    }

    #[test]
    fn test_scalar_arithmetic() {
        let registry = registry_with(&[]);
        let eval = Evaluator::new(&registry);
        assert_eq!(eval.evaluate("1 + 2 * 3").unwrap(), vec![7.0]);
        assert_eq!(eval.evaluate("2 ^ 3").unwrap(), vec![8.0]);
        assert_eq!(eval.evaluate("-7 % 3").unwrap(), vec![2.0]);
        assert_eq!(eval.evaluate("!0 + !5").unwrap(), vec![1.0]);
        assert_eq!(eval.evaluate("1 < 2 || 0").unwrap(), vec![1.0]);
    }

    #[test]
    fn test_broadcast_keeps_operand_order() {
        let registry = registry_with(&[("v", &[1.0, 2.0, 4.0][..])]);
        let eval = Evaluator::new(&registry);
        assert_eq!(eval.evaluate("10 - v").unwrap(), vec![9.0, 8.0, 6.0]);
        assert_eq!(eval.evaluate("v - 10").unwrap(), vec![-9.0, -8.0, -6.0]);
        assert_eq!(eval.evaluate("8 / v").unwrap(), vec![8.0, 4.0, 2.0]);
        assert_eq!(eval.evaluate("2 <= v").unwrap(), vec![0.0, 1.0, 1.0]);
        assert_eq!(eval.evaluate("v * v").unwrap(), vec![1.0, 4.0, 16.0]);
    }

    #[test]
    fn test_division_errors() {
        let registry = registry_with(&[("a", &[4.0, 0.0, 8.0][..]), ("b", &[1.0, 2.0][..])]);
        let eval = Evaluator::new(&registry);
        assert_eq!(
            eval.evaluate("a / 0"),
            Err(ExprError::Vector(VectorError::DivideByZero))
        );
        assert_eq!(
            eval.evaluate("8 / a"),
            Err(ExprError::Vector(VectorError::DivideByZeroComponent { index: 1 }))
        );
        assert_eq!(
            eval.evaluate("a / a"),
            Err(ExprError::Vector(VectorError::DivideByZeroComponent { index: 1 }))
        );
        assert!(matches!(
            eval.evaluate("a + b"),
            Err(ExprError::Vector(VectorError::LengthMismatch { left: 3, right: 2 }))
        ));
    }

    #[test]
    fn test_shifts() {
        let registry = registry_with(&[("v", &[1.0, 2.0, 3.0, 4.0][..])]);
        let eval = Evaluator::new(&registry);
        assert_eq!(eval.evaluate("v << 1").unwrap(), vec![2.0, 3.0, 4.0, 1.0]);
        assert_eq!(eval.evaluate("v >> 5").unwrap(), vec![4.0, 1.0, 2.0, 3.0]);
        assert_eq!(eval.evaluate("v << -1").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            eval.evaluate("v << v"),
            Err(ExprError::Vector(VectorError::ShiftOperand))
        );
        assert_eq!(
            eval.evaluate("1 << v"),
            Err(ExprError::Vector(VectorError::ShiftOperand))
        );
    }

    #[test]
    fn test_ranges_and_functions() {
        let registry = registry_with(&[("x", &[5.0, 1.0, 4.0, 2.0][..])]);
        let eval = Evaluator::new(&registry);
        assert_eq!(eval.evaluate("x(1:2)").unwrap(), vec![1.0, 4.0]);
        assert_eq!(eval.evaluate("sum(x)").unwrap(), vec![12.0]);
        assert_eq!(eval.evaluate("sort(x)").unwrap(), vec![1.0, 2.0, 4.0, 5.0]);
        assert_eq!(eval.evaluate("x - mean(x)").unwrap(), vec![2.0, -2.0, 1.0, -1.0]);
        assert_eq!(eval.evaluate("x(1+1)").unwrap(), vec![4.0]);
    }

    #[test]
    fn test_non_finite_results() {
        let registry = registry_with(&[]);
        let eval = Evaluator::new(&registry);
        assert_eq!(
            eval.evaluate("0 ^ -1"),
            Err(ExprError::Vector(VectorError::Range {
                kind: veclab_core::RangeKind::Overflow
            }))
        );
        assert_eq!(
            eval.evaluate("(-1) ^ 0.5"),
            Err(ExprError::Vector(VectorError::Domain))
        );
    }

    #[test]
    fn test_substitution() {
        let registry = registry_with(&[("v", &[1.0, 2.0][..])]);
        let mut vars = std::collections::HashMap::new();
        vars.insert("n".to_string(), "3".to_string());
        vars.insert("name".to_string(), "v".to_string());
        let eval = Evaluator::new(&registry).with_substitution(&vars);

        assert_eq!(eval.evaluate("$n * 2").unwrap(), vec![6.0]);
        assert_eq!(eval.evaluate("$name + 1").unwrap(), vec![2.0, 3.0]);
        assert_eq!(eval.evaluate("{v(1)}").unwrap(), vec![2.0]);
        assert!(matches!(eval.evaluate("$missing"), Err(ExprError::Substitution { .. })));
        assert!(matches!(
            eval.evaluate("{v(1) junk}"),
            Err(ExprError::Vector(VectorError::TrailingChars(_)))
        ));
    }

    #[test]
    fn test_step_limit() {
        let registry = registry_with(&[]);
        let eval = Evaluator::new(&registry).with_max_steps(4);
        assert_eq!(eval.evaluate("1 + 1").unwrap(), vec![2.0]);
        assert_eq!(eval.evaluate("1 + 1 + 1 + 1"), Err(ExprError::Timeout(4)));
    }

    #[test]
    fn test_evaluate_into() {
        let registry = registry_with(&[("x", &[1.0, 2.0][..])]);
        let (y, _) = registry.create("y").unwrap();
        let eval = Evaluator::new(&registry);
        assert_eq!(eval.evaluate_into("x * 3", &y).unwrap(), 2);
        assert_eq!(y.values(), vec![3.0, 6.0]);
    }
}
