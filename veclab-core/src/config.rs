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

//! Engine Configuration
//!
//! Tunables shared by the registry, the expression evaluator and the
//! operations layer. Loaded from JSON by the command-line tools; library
//! users usually start from `EngineConfig::default()`.

use serde::{Deserialize, Serialize};

use crate::notify::NotifyMode;

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Notification mode assigned to newly created vectors
    pub default_notify: NotifyMode,
    /// Prefix for names generated by `#auto`
    pub auto_name_prefix: String,
    /// Records per read when a binary read has no explicit count
    pub binary_chunk_records: usize,
    /// Maximum AST nodes visited per expression evaluation
    pub max_eval_steps: usize,
    /// Tolerance used by range searches
    pub search_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_notify: NotifyMode::WhenIdle,
            auto_name_prefix: "vector".to_string(),
            binary_chunk_records: 1024,
            max_eval_steps: 10_000,
            search_epsilon: f64::EPSILON,
        }
    }
}

impl EngineConfig {
    /// Config with a specific notification default
    pub fn with_notify(mut self, mode: NotifyMode) -> Self {
        self.default_notify = mode;
        self
    }

    pub fn with_auto_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.auto_name_prefix = prefix.into();
        self
    }

    /// Records per chunk for unbounded binary reads; zero reads one at a time
    pub fn with_binary_chunk_records(mut self, records: usize) -> Self {
        self.binary_chunk_records = records;
        self
    }

    pub fn with_max_eval_steps(mut self, steps: usize) -> Self {
        self.max_eval_steps = steps;
        self
    }

    pub fn with_search_epsilon(mut self, epsilon: f64) -> Self {
        self.search_epsilon = epsilon;
        self
    }
}
