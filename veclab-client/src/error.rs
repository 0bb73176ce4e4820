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

//! Error types for vector operations

use thiserror::Error;
use veclab_core::VectorError;
use veclab_query::ExprError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Engine errors
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Expression errors
    #[error(transparent)]
    Expr(#[from] ExprError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Populate density below one
    #[error("bad density \"{0}\"")]
    BadDensity(usize),

    /// Source length not divisible by the number of parts
    #[error("can't split vector \"{name}\" of length {length} into {parts} even parts")]
    UnevenSplit {
        name: String,
        length: usize,
        parts: usize,
    },

    /// Merge sources with different selected lengths
    #[error("vector \"{0}\" has inconsistent length")]
    InconsistentLength(String),

    /// Sort companion of the wrong size
    #[error("vector \"{name}\" is not the same size as \"{expected}\"")]
    SizeMismatch { name: String, expected: String },

    /// Unknown binary record format
    #[error("unknown binary format \"{format}\": {reason}")]
    BadFormat { format: String, reason: &'static str },

    /// Byte stream ended inside a record
    #[error("error reading channel: short read ({bytes} bytes, record size {size})")]
    ShortRead { bytes: usize, size: usize },

    /// Unknown option word
    #[error("bad qualifier \"{given}\": should be {expected}")]
    BadOption {
        given: String,
        expected: &'static str,
    },
}

impl ClientError {
    /// The engine error underneath, if any
    pub fn vector_error(&self) -> Option<&VectorError> {
        match self {
            ClientError::Vector(e) | ClientError::Expr(ExprError::Vector(e)) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
