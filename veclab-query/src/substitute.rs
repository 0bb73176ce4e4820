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

//! Host Text Substitution
//!
//! `$var`, `[cmd]`, `"quoted"` and `{braced}` operands are handed to the
//! embedding host, and the text it returns is read back as a number or a
//! vector reference.

use std::collections::HashMap;
use std::fmt;

/// Which bracket form produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstitutionKind {
    /// `$name` or `$name(index)`
    Variable,
    /// `[script]`
    Command,
    /// `"text"`
    Quoted,
    /// `{text}`
    Braced,
}

impl fmt::Display for SubstitutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubstitutionKind::Variable => "variable",
            SubstitutionKind::Command => "command",
            SubstitutionKind::Quoted => "quoted string",
            SubstitutionKind::Braced => "braced string",
        };
        f.write_str(name)
    }
}

/// Host hook expanding substitution operands
pub trait Substitution {
    /// Expand `text` (the contents between the delimiters, or the
    /// variable name without `$`).
    fn substitute(&self, kind: SubstitutionKind, text: &str) -> Result<String, String>;
}

/// Quotes and braces expand to their literal contents; variables and
/// commands are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralSubstitution;

impl Substitution for LiteralSubstitution {
    fn substitute(&self, kind: SubstitutionKind, text: &str) -> Result<String, String> {
        match kind {
            SubstitutionKind::Quoted | SubstitutionKind::Braced => Ok(text.to_string()),
            SubstitutionKind::Variable => Err("no such variable".to_string()),
            SubstitutionKind::Command => Err("commands are not available".to_string()),
        }
    }
}

/// Variables from a map, literal quotes and braces
impl Substitution for HashMap<String, String> {
    fn substitute(&self, kind: SubstitutionKind, text: &str) -> Result<String, String> {
        match kind {
            SubstitutionKind::Variable => self
                .get(text)
                .cloned()
                .ok_or_else(|| "no such variable".to_string()),
            _ => LiteralSubstitution.substitute(kind, text),
        }
    }
}
