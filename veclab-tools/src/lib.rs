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

//! VecLab command-line support
//!
//! Argument types and helpers shared by the `veclab` binary.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use veclab_core::{EngineConfig, VectorRegistry};

/// `name=v1,v2,...` vector definition from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDef {
    pub name: String,
    pub values: Vec<f64>,
}

impl FromStr for VectorDef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((name, list)) = s.split_once('=') else {
            bail!("expected name=v1,v2,... but got \"{s}\"");
        };
        if name.is_empty() {
            bail!("missing vector name in \"{s}\"");
        }
        let values = list
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<f64>()
                    .with_context(|| format!("bad value \"{item}\" for vector \"{name}\""))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }
}

impl VectorDef {
    /// Create or overwrite the vector in `registry`
    pub fn define(&self, registry: &VectorRegistry) -> Result<()> {
        let (vector, _) = registry
            .create(&self.name)
            .with_context(|| format!("failed to create vector \"{}\"", self.name))?;
        vector.update(|store| store.copy_from(&self.values))?;
        Ok(())
    }
}

/// Load an `EngineConfig` from JSON, or the defaults without a path
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

/// Space-separated values, shortest round-trip form
pub fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
