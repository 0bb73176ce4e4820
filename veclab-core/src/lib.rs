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

//! VecLab Core
//!
//! Shared, mutable, notification-driven arrays of doubles.
//!
//! # Core Components
//!
//! - **VectorStore**: resizable storage with power-of-two growth from 64
//! - **IndexResolver**: `end`, `++end`, special indices and `first:last` ranges
//! - **ClientRegistry**: subscribers with never / always / when-idle delivery
//! - **VectorRegistry**: namespace-scoped table of named vectors
//! - **Sort**: stable multi-key permutation sort and order statistics
//!
//! # Example
//!
//! ```rust,ignore
//! use veclab_core::{EngineConfig, VectorRegistry};
//!
//! let registry = VectorRegistry::new(EngineConfig::default());
//! let (x, _) = registry.create("x(5)")?;
//! x.update(|store| {
//!     store.values_mut().copy_from_slice(&[3.0, 1.0, 4.0, 1.0, 5.0]);
//!     Ok(())
//! })?;
//! let sel = registry.lookup("x(1:3)")?;
//! assert_eq!(sel.values(), vec![1.0, 4.0, 1.0]);
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod name;
pub mod notify;
pub mod registry;
pub mod sort;
pub mod stats;
pub mod store;

pub use config::EngineConfig;
pub use error::{RangeKind, Result, VectorError};
pub use index::{
    IndexEvaluator, IndexMode, IndexResolver, IndexTarget, RangeTarget, Reducer, SpecialIndex,
    SpecialIndexTable, Window,
};
pub use name::{VectorName, is_vector_char};
pub use notify::{
    Client, ClientRegistry, Dispatch, IdleQueue, IdleScheduler, IdleTask, NotifyCallback,
    NotifyKind, NotifyMode, TaskHandle,
};
pub use registry::{AUTO_NAME, Selection, Vector, VectorHandle, VectorRegistry};
pub use sort::{
    CompareKind, OrderStatistic, SortKey, SortSpec, apply_permutation, build_permutation,
    build_permutation_with, order_statistic,
};
pub use store::{BufferSource, Deallocator, Ownership, VectorStore};
