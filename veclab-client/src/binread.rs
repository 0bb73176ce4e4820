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

//! Binary Record Reader
//!
//! Decodes fixed-width numeric records from a byte stream into doubles.
//!
//! ## Formats
//!
//! | Format | Record                  |
//! |--------|-------------------------|
//! | `i1`..`i8` | signed integer, 1/2/4/8 bytes   |
//! | `u1`..`u8` | unsigned integer, 1/2/4/8 bytes |
//! | `r4`, `r8` | IEEE float, 4/8 bytes           |
//!
//! Records are read in host byte order; `swap` reverses each record.
//! The stream must end on a record boundary.

use std::fmt;
use std::io::{ErrorKind, Read};
use std::str::FromStr;

use byteorder::{ByteOrder, NativeEndian};
use tracing::debug;
use veclab_core::VectorError;

use crate::error::{ClientError, Result};

#[cfg(target_endian = "little")]
type SwappedEndian = byteorder::BigEndian;
#[cfg(target_endian = "big")]
type SwappedEndian = byteorder::LittleEndian;

/// Record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryFormat {
    I1,
    I2,
    I4,
    I8,
    U1,
    U2,
    U4,
    U8,
    R4,
    #[default]
    R8,
}

impl BinaryFormat {
    /// Record size in bytes
    pub fn size(self) -> usize {
        match self {
            BinaryFormat::I1 | BinaryFormat::U1 => 1,
            BinaryFormat::I2 | BinaryFormat::U2 => 2,
            BinaryFormat::I4 | BinaryFormat::U4 | BinaryFormat::R4 => 4,
            BinaryFormat::I8 | BinaryFormat::U8 | BinaryFormat::R8 => 8,
        }
    }

    fn decode<B: ByteOrder>(self, record: &[u8]) -> f64 {
        match self {
            BinaryFormat::I1 => f64::from(record[0] as i8),
            BinaryFormat::U1 => f64::from(record[0]),
            BinaryFormat::I2 => f64::from(B::read_i16(record)),
            BinaryFormat::U2 => f64::from(B::read_u16(record)),
            BinaryFormat::I4 => f64::from(B::read_i32(record)),
            BinaryFormat::U4 => f64::from(B::read_u32(record)),
            BinaryFormat::I8 => B::read_i64(record) as f64,
            BinaryFormat::U8 => B::read_u64(record) as f64,
            BinaryFormat::R4 => f64::from(B::read_f32(record)),
            BinaryFormat::R8 => B::read_f64(record),
        }
    }
}

impl FromStr for BinaryFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = |reason| ClientError::BadFormat {
            format: s.to_string(),
            reason,
        };
        let mut chars = s.chars();
        let kind = chars
            .next()
            .ok_or_else(|| bad("should be i#, r# or u# (where # is size in bytes)"))?
            .to_ascii_lowercase();
        let size: usize = chars
            .as_str()
            .parse()
            .map_err(|_| bad("incorrect byte size"))?;

        let format = match (kind, size) {
            ('i', 1) => BinaryFormat::I1,
            ('i', 2) => BinaryFormat::I2,
            ('i', 4) => BinaryFormat::I4,
            ('i', 8) => BinaryFormat::I8,
            ('u', 1) => BinaryFormat::U1,
            ('u', 2) => BinaryFormat::U2,
            ('u', 4) => BinaryFormat::U4,
            ('u', 8) => BinaryFormat::U8,
            ('r', 4) => BinaryFormat::R4,
            ('r', 8) => BinaryFormat::R8,
            ('i' | 'u' | 'r', _) => return Err(bad("no native type of that size")),
            _ => return Err(bad("should be i#, r# or u# (where # is size in bytes)")),
        };
        Ok(format)
    }
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            BinaryFormat::I1 | BinaryFormat::I2 | BinaryFormat::I4 | BinaryFormat::I8 => 'i',
            BinaryFormat::U1 | BinaryFormat::U2 | BinaryFormat::U4 | BinaryFormat::U8 => 'u',
            BinaryFormat::R4 | BinaryFormat::R8 => 'r',
        };
        write!(f, "{kind}{}", self.size())
    }
}

/// Options for `VectorOps::binary_read`
#[derive(Debug, Clone, Default)]
pub struct BinaryReadOptions {
    pub format: BinaryFormat,
    /// Reverse the bytes of every record
    pub swap: bool,
    /// Index token to start writing at; the current end when `None`
    pub at: Option<String>,
    /// Number of records to read; 0 reads to end of stream
    pub count: usize,
}

impl BinaryReadOptions {
    pub fn new(format: BinaryFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn swap(mut self, swap: bool) -> Self {
        self.swap = swap;
        self
    }

    pub fn at(mut self, token: impl Into<String>) -> Self {
        self.at = Some(token.into());
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Decode records from `reader`.
///
/// Reads in chunks of `chunk_records` until end of stream, or until
/// `count` records have been decoded when `count > 0`.
pub fn read_records<R: Read>(
    reader: &mut R,
    format: BinaryFormat,
    swap: bool,
    count: usize,
    chunk_records: usize,
) -> Result<Vec<f64>> {
    let size = format.size();
    let chunk = match count {
        0 => chunk_records.max(1),
        n => n.min(chunk_records.max(1)),
    };
    let capacity = chunk
        .checked_mul(size)
        .ok_or(VectorError::Allocation { requested: chunk })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| VectorError::Allocation { requested: chunk })?;
    buf.resize(capacity, 0u8);
    let mut values = Vec::new();

    loop {
        let wanted = match count {
            0 => chunk,
            n => (n - values.len()).min(chunk),
        };
        let window = &mut buf[..wanted * size];
        let bytes = fill(reader, window)?;
        if bytes % size != 0 {
            return Err(ClientError::ShortRead { bytes, size });
        }
        let records = &buf[..bytes];
        if swap && size > 1 {
            values.extend(records.chunks_exact(size).map(|r| format.decode::<SwappedEndian>(r)));
        } else {
            values.extend(records.chunks_exact(size).map(|r| format.decode::<NativeEndian>(r)));
        }
        if bytes < wanted * size || (count > 0 && values.len() >= count) {
            break;
        }
    }

    debug!(format = %format, swap, records = values.len(), "binary records decoded");
    Ok(values)
}
