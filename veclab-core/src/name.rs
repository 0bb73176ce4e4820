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

//! Namespace-Qualified Vector Names
//!
//! Every vector lives in a namespace. Names are written the way a script
//! would write them:
//!
//! ```text
//! x            -> current namespace, falls back to global on lookup
//! ::x          -> global namespace only
//! ::geo::x     -> namespace "geo" only
//! geo::x       -> "geo" relative to the current namespace
//! ```
//!
//! A `VectorName` can only be built through validation, so the registry
//! never stores a key with characters a lookup could not scan back.

use std::fmt;

use crate::error::{Result, VectorError};

/// Separator between namespace segments
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Characters allowed in a vector name
#[inline]
pub fn is_vector_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | ':' | '@' | '.')
}

// ============================================================================
// VectorName
// ============================================================================

/// A validated, namespace-resolved vector name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VectorName {
    /// Namespace path without leading separator; empty is global
    namespace: String,
    tail: String,
    /// True when the text named its namespace explicitly
    explicit: bool,
}

impl VectorName {
    /// Parse `text` relative to the `current` namespace
    pub fn parse(text: &str, current: &str) -> Result<Self> {
        let current = current.trim_start_matches(NAMESPACE_SEPARATOR);
        let (namespace, tail, explicit) = match text.rsplit_once(NAMESPACE_SEPARATOR) {
            Some((ns, tail)) => {
                let namespace = if let Some(absolute) = ns.strip_prefix(NAMESPACE_SEPARATOR) {
                    absolute.to_string()
                } else if ns.is_empty() {
                    String::new()
                } else if current.is_empty() {
                    ns.to_string()
                } else {
                    format!("{current}{NAMESPACE_SEPARATOR}{ns}")
                };
                (namespace, tail, true)
            }
            None => (current.to_string(), text, false),
        };

        Self::validate(text, tail)?;
        Ok(Self {
            namespace,
            tail: tail.to_string(),
            explicit,
        })
    }

    fn validate(text: &str, tail: &str) -> Result<()> {
        if tail.is_empty() {
            return Err(VectorError::EmptyName);
        }
        let offset = text.len() - tail.len();
        for (i, ch) in tail.char_indices() {
            if !is_vector_char(ch) {
                return Err(VectorError::InvalidName {
                    name: text.to_string(),
                    ch,
                    position: offset + i,
                });
            }
        }
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn tail(&self) -> &str {
        &self.tail
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn is_global(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Fully qualified key, e.g. `::x` or `::geo::x`
    pub fn qualified(&self) -> String {
        qualify(&self.namespace, &self.tail)
    }

    /// The same tail placed in the global namespace
    pub fn in_global(&self) -> Self {
        Self {
            namespace: String::new(),
            tail: self.tail.clone(),
            explicit: true,
        }
    }
}

impl fmt::Display for VectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

fn qualify(namespace: &str, tail: &str) -> String {
    if namespace.is_empty() {
        format!("{NAMESPACE_SEPARATOR}{tail}")
    } else {
        format!("{NAMESPACE_SEPARATOR}{namespace}{NAMESPACE_SEPARATOR}{tail}")
    }
}

/// Normalize a namespace path; `::` and the empty string are global
pub fn normalize_namespace(path: &str) -> Result<String> {
    let trimmed = path.trim_start_matches(NAMESPACE_SEPARATOR);
    for segment in trimmed.split(NAMESPACE_SEPARATOR) {
        if trimmed.is_empty() {
            break;
        }
        if segment.is_empty() {
            return Err(VectorError::EmptyName);
        }
        if let Some((i, ch)) = segment.char_indices().find(|(_, c)| !is_vector_char(*c)) {
            return Err(VectorError::InvalidName {
                name: path.to_string(),
                ch,
                position: i,
            });
        }
    }
    Ok(trimmed.to_string())
}
