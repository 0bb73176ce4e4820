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

//! Expression errors

use thiserror::Error;
use veclab_core::VectorError;

use crate::substitute::SubstitutionKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error("unexpected character '{0}' in expression")]
    UnexpectedChar(char),

    #[error("invalid number \"{0}\"")]
    InvalidNumber(String),

    #[error("bad operator \"{0}\"")]
    BadOperator(String),

    #[error("missing operand")]
    MissingOperand,

    #[error("unmatched parentheses in expression \"{0}\"")]
    UnmatchedParen(String),

    #[error("syntax error in expression \"{0}\"")]
    Syntax(String),

    #[error("math function \"{0}\" takes exactly one argument")]
    Arity(String),

    #[error("missing close-{0} in expression")]
    Unterminated(char),

    #[error("can't substitute {kind} \"{text}\": {reason}")]
    Substitution {
        kind: SubstitutionKind,
        text: String,
        reason: String,
    },

    #[error("evaluation exceeded {0} steps")]
    Timeout(usize),
}

pub type Result<T> = std::result::Result<T, ExprError>;
