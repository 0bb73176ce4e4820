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

//! VecLab Client
//!
//! Instance operations over named vectors.
//!
//! ```rust,ignore
//! use veclab_client::{SeqEnd, VectorOps};
//! use veclab_core::{EngineConfig, VectorRegistry};
//!
//! let registry = VectorRegistry::new(EngineConfig::default());
//! let ops = VectorOps::new(&registry);
//! let (x, _) = registry.create("x")?;
//! ops.sequence(&x, 0.0, SeqEnd::Value(4.0), 1.0)?;
//! ops.delete(&x, &["1:2"])?;
//! assert_eq!(x.values(), vec![0.0, 3.0, 4.0]);
//! ```

pub mod binread;
pub mod error;
pub mod ops;

pub use binread::{BinaryFormat, BinaryReadOptions, read_records};
pub use error::{ClientError, Result};
pub use ops::{ArithOp, ArithOperand, NotifyAction, SeqEnd, Source, VectorOps, in_range};
