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

//! Error types for VecLab core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error("can't allocate {requested} vector elements")]
    Allocation { requested: usize },

    #[error("buffer holds {capacity} elements but length {length} was requested")]
    BufferTooSmall { length: usize, capacity: usize },

    #[error("range \"end\" is invalid: vector is empty")]
    EmptyVector,

    #[error("can't set special index \"{0}\"")]
    ReadOnlyIndex(String),

    #[error("bad index \"{0}\"")]
    BadIndex(String),

    #[error("index \"{token}\" is out of range")]
    IndexOutOfRange { token: String },

    #[error("invalid range \"{0}\"")]
    InvalidRange(String),

    #[error("invalid vector name \"{name}\": character '{ch}' at position {position}")]
    InvalidName {
        name: String,
        ch: char,
        position: usize,
    },

    #[error("vector name can't be empty")]
    EmptyName,

    #[error("can't find vector \"{0}\"")]
    NotFound(String),

    #[error("extra characters after vector name \"{0}\"")]
    TrailingChars(String),

    #[error("vectors are different lengths ({left} and {right})")]
    LengthMismatch { left: usize, right: usize },

    #[error("divide by zero")]
    DivideByZero,

    #[error("can't divide by 0.0 vector component at index {index}")]
    DivideByZeroComponent { index: usize },

    #[error("second shift operand must be scalar")]
    ShiftOperand,

    #[error("domain error: argument not in valid range")]
    Domain,

    #[error("floating-point value too {kind} to represent")]
    Range { kind: RangeKind },

    #[error("vector \"{0}\" is protected and can't be destroyed")]
    ProtectedEntity(String),

    #[error("bad name pattern \"{pattern}\": {reason}")]
    BadPattern { pattern: String, reason: String },

    #[error("bad vector specification \"{0}\"")]
    BadSpecification(String),
}

impl VectorError {
    /// True for both scalar and component division failures
    pub fn is_divide_by_zero(&self) -> bool {
        matches!(
            self,
            VectorError::DivideByZero | VectorError::DivideByZeroComponent { .. }
        )
    }

    /// Classify a non-finite arithmetic result.
    ///
    /// NaN is a domain error, infinities overflow, and a zero reported
    /// alongside a range failure is an underflow.
    pub fn from_non_finite(value: f64) -> Self {
        if value.is_nan() {
            VectorError::Domain
        } else {
            let kind = if value == 0.0 {
                RangeKind::Underflow
            } else {
                RangeKind::Overflow
            };
            VectorError::Range { kind }
        }
    }
}

/// Direction of a floating-point range failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Overflow,
    Underflow,
}

impl std::fmt::Display for RangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeKind::Overflow => write!(f, "large"),
            RangeKind::Underflow => write!(f, "small"),
        }
    }
}

pub type Result<T> = std::result::Result<T, VectorError>;
