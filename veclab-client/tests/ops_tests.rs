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

//! Vector Operation Tests
//!
//! End-to-end coverage of `VectorOps` against a registry:
//!
//! 1. **Scenarios**: sequence, expression, order statistic and delete on
//!    one vector; search with offsets.
//! 2. **Reshaping**: append, merge, split, populate, sort with companions.
//! 3. **Indexing**: `++end` growth, special indices, reversed ranges.
//! 4. **Notification**: each operation marks its vector changed once.
//! 5. **Binary import**: real files through `tempfile`.

use std::io::{Cursor, Write};

use byteorder::{NativeEndian, WriteBytesExt};
use proptest::prelude::*;
use support::Recorder;
use veclab_client::{
    BinaryFormat, BinaryReadOptions, ClientError, NotifyAction, SeqEnd, Source, VectorOps,
};
use veclab_core::sort::{OrderStatistic, order_statistic};
use veclab_core::{EngineConfig, NotifyMode, VectorError, VectorHandle, VectorRegistry};

mod support {
    use std::sync::{Arc, Mutex};
    use veclab_core::{NotifyCallback, NotifyKind};

    /// Collects notifications delivered to one client
    #[derive(Clone, Default)]
    pub struct Recorder(Arc<Mutex<Vec<NotifyKind>>>);

    impl Recorder {
        pub fn callback(&self) -> NotifyCallback {
            let seen = self.0.clone();
            Arc::new(move |kind: NotifyKind| seen.lock().unwrap().push(kind))
        }

        pub fn count(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }
}

struct Fixture {
    registry: VectorRegistry,
}

impl Fixture {
    fn new() -> Self {
        Self {
            registry: VectorRegistry::new(EngineConfig::default().with_notify(NotifyMode::Always)),
        }
    }

    fn ops(&self) -> VectorOps<'_> {
        VectorOps::new(&self.registry)
    }

    fn vector(&self, name: &str, values: &[f64]) -> VectorHandle {
        let (vector, _) = self.registry.create(name).unwrap();
        vector.update(|store| store.copy_from(values)).unwrap();
        vector
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_sequence_expr_median_delete() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let (x, _) = fx.registry.create("x").unwrap();

    assert_eq!(ops.sequence(&x, 0.0, SeqEnd::Value(4.0), 1.0).unwrap(), 5);
    assert_eq!(x.values(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);

    let (y, _) = fx.registry.create("y").unwrap();
    ops.expr(&y, "x * 2").unwrap();
    assert_eq!(y.values(), vec![0.0, 2.0, 4.0, 6.0, 8.0]);

    assert_eq!(order_statistic(&x.values(), OrderStatistic::Median), 2.0);

    assert_eq!(ops.delete(&x, &["1:2"]).unwrap(), 3);
    assert_eq!(x.values(), vec![0.0, 3.0, 4.0]);
}

#[test]
fn test_search_indices_and_values() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0, 2.0, 2.0, 3.0]);

    assert_eq!(ops.search(&x, 2.0, Some(2.0)), vec![1, 2]);
    assert_eq!(ops.search(&x, 2.0, None), vec![1, 2]);
    assert_eq!(ops.search_values(&x, 1.5, Some(3.0)), vec![2.0, 2.0, 3.0]);
    assert!(ops.search(&x, 3.0, Some(1.0)).is_empty());

    ops.set_offset(&x, 10).unwrap();
    assert_eq!(ops.search(&x, 3.0, None), vec![13]);
}

#[test]
fn test_sequence_end_keeps_length() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[9.0, 9.0, 9.0]);

    assert_eq!(ops.sequence(&x, 1.0, SeqEnd::End, 0.5).unwrap(), 3);
    assert_eq!(x.values(), vec![1.0, 1.5, 2.0]);

    assert_eq!(ops.sequence(&x, 5.0, SeqEnd::Value(1.0), 1.0).unwrap(), 0);
    assert_eq!(x.values(), vec![1.0, 1.5, 2.0]);
}

#[test]
fn test_delete_without_indices_destroys() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0]);

    ops.delete(&x, &[]).unwrap();
    assert!(!fx.registry.exists("x"));
    assert!(x.is_destroyed());
}

// ============================================================================
// Reshaping
// ============================================================================

#[test]
fn test_append_sources() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0, 2.0]);
    fx.vector("y", &[5.0, 6.0, 7.0]);

    let length = ops
        .append(&x, &[Source::Vector("y(1:2)"), Source::Values(&[8.0])])
        .unwrap();
    assert_eq!(length, 5);
    assert_eq!(x.values(), vec![1.0, 2.0, 6.0, 7.0, 8.0]);

    ops.append(&x, &[Source::Vector("x")]).unwrap();
    assert_eq!(x.len(), 10);
}

#[test]
fn test_append_keeps_earlier_sources_on_failure() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0]);

    let result = ops.append(&x, &[Source::Values(&[2.0]), Source::Vector("missing")]);
    assert!(matches!(
        result.as_ref().map_err(ClientError::vector_error),
        Err(Some(VectorError::NotFound(_)))
    ));
    assert_eq!(x.values(), vec![1.0, 2.0]);
}

#[test]
fn test_merge_interleaves() {
    let fx = Fixture::new();
    let ops = fx.ops();
    fx.vector("a", &[1.0, 2.0, 3.0]);
    fx.vector("b", &[10.0, 20.0, 30.0]);
    fx.vector("short", &[0.0]);
    let (m, _) = fx.registry.create("m").unwrap();

    assert_eq!(ops.merge(&m, &["a", "b"]).unwrap(), 6);
    assert_eq!(m.values(), vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);

    assert!(matches!(
        ops.merge(&m, &["a", "short"]),
        Err(ClientError::InconsistentLength(_))
    ));
}

#[test]
fn test_split_round_robin() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    fx.vector("odd", &[0.0]);

    ops.split(&x, &["odd", "even"]).unwrap();
    assert_eq!(fx.registry.lookup("odd").unwrap().values(), vec![0.0, 1.0, 3.0, 5.0]);
    assert_eq!(fx.registry.lookup("even").unwrap().values(), vec![2.0, 4.0, 6.0]);

    assert!(matches!(
        ops.split(&x, &["a", "b", "c", "d"]),
        Err(ClientError::UnevenSplit { length: 6, parts: 4, .. })
    ));
}

#[test]
fn test_populate_density() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[0.0, 3.0, 6.0]);

    assert_eq!(ops.populate(&x, "dense", 2).unwrap(), 7);
    assert_eq!(
        fx.registry.lookup("dense").unwrap().values(),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
    assert!(matches!(ops.populate(&x, "dense", 0), Err(ClientError::BadDensity(0))));

    let empty = fx.vector("empty", &[]);
    assert_eq!(ops.populate(&empty, "nothing", 0).unwrap(), 0);
}

#[test]
fn test_populate_oversized_density() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[0.0, 1.0]);

    for density in [usize::MAX, usize::MAX / 8] {
        let err = ops.populate(&x, "dense", density).unwrap_err();
        assert!(matches!(err.vector_error(), Some(VectorError::Allocation { .. })));
    }
    assert_eq!(x.values(), vec![0.0, 1.0]);
}

#[test]
fn test_sort_with_companions() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let keys = fx.vector("keys", &[3.0, 1.0, 2.0, 1.0]);
    let tags = fx.vector("tags", &[30.0, 11.0, 20.0, 10.0]);
    fx.vector("bad", &[1.0]);

    ops.sort(&keys, false, &["tags"]).unwrap();
    assert_eq!(keys.values(), vec![1.0, 1.0, 2.0, 3.0]);
    assert_eq!(tags.values(), vec![10.0, 11.0, 20.0, 30.0]);

    ops.sort(&keys, true, &[]).unwrap();
    assert_eq!(keys.values(), vec![3.0, 2.0, 1.0, 1.0]);

    assert!(matches!(
        ops.sort(&keys, false, &["bad"]),
        Err(ClientError::SizeMismatch { .. })
    ));
}

#[test]
fn test_set_from_self_and_list() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0, 2.0, 3.0, 4.0]);

    ops.set(&x, Source::Vector("x(1:2)")).unwrap();
    assert_eq!(x.values(), vec![2.0, 3.0]);

    ops.set(&x, Source::Values(&[7.0])).unwrap();
    assert_eq!(x.values(), vec![7.0]);
}

#[test]
fn test_dup_and_normalize() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[2.0, 4.0, 6.0]);

    ops.dup(&x, &["copy", "x"]).unwrap();
    assert_eq!(fx.registry.lookup("copy").unwrap().values(), vec![2.0, 4.0, 6.0]);

    let normalized = ops.normalize(&x, Some("unit")).unwrap();
    assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    assert_eq!(fx.registry.lookup("unit").unwrap().values(), normalized);
}

#[test]
fn test_random_fill_unit_interval() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[0.0; 64]);

    ops.random_fill(&x).unwrap();
    assert!(x.values().iter().all(|v| (0.0..1.0).contains(v)));
}

#[test]
#[allow(deprecated)]
fn test_arith_returns_values() {
    use veclab_client::{ArithOp, ArithOperand};

    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0, 2.0]);
    fx.vector("y", &[10.0, 20.0]);
    fx.vector("z", &[1.0]);

    assert_eq!(
        ops.arith(&x, ArithOp::Sub, ArithOperand::Scalar(1.0)).unwrap(),
        vec![0.0, 1.0]
    );
    assert_eq!(
        ops.arith(&x, ArithOp::Mul, ArithOperand::Vector("y")).unwrap(),
        vec![10.0, 40.0]
    );
    assert!(ops.arith(&x, ArithOp::Add, ArithOperand::Vector("z")).is_err());
    assert_eq!(x.values(), vec![1.0, 2.0]);
}

// ============================================================================
// Indexing
// ============================================================================

#[test]
fn test_index_get_and_set() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[5.0, 1.0, 9.0]);

    assert_eq!(ops.index_get(&x, "end").unwrap(), vec![9.0]);
    assert_eq!(ops.index_get(&x, "0:1").unwrap(), vec![5.0, 1.0]);
    assert_eq!(ops.index_get(&x, "max").unwrap(), vec![9.0]);
    assert_eq!(ops.index_get(&x, "length(x) - 2").unwrap(), vec![1.0]);
    assert!(ops.index_get(&x, "++end").is_err());

    ops.index_set(&x, "++end", 4.0).unwrap();
    assert_eq!(x.values(), vec![5.0, 1.0, 9.0, 4.0]);
    ops.index_set(&x, "1:2", 0.0).unwrap();
    assert_eq!(x.values(), vec![5.0, 0.0, 0.0, 4.0]);

    assert!(matches!(
        ops.index_set(&x, "min", 1.0).as_ref().map_err(ClientError::vector_error),
        Err(Some(VectorError::ReadOnlyIndex(_)))
    ));
}

#[test]
fn test_range_reverses() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0, 2.0, 3.0, 4.0]);

    assert_eq!(ops.range(&x, "1", "3").unwrap(), vec![2.0, 3.0, 4.0]);
    assert_eq!(ops.range(&x, "3", "1").unwrap(), vec![4.0, 3.0, 2.0]);
    assert!(ops.range(&x, "0", "4").is_err());
}

#[test]
fn test_length_and_offset() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0, 2.0]);

    ops.set_length(&x, 4).unwrap();
    assert_eq!(ops.length(&x), 4);
    assert_eq!(x.values(), vec![1.0, 2.0, 0.0, 0.0]);

    ops.set_offset(&x, -2).unwrap();
    assert_eq!(ops.offset(&x), -2);
    assert_eq!(ops.index_get(&x, "-1").unwrap(), vec![2.0]);
}

// ============================================================================
// Notification
// ============================================================================

#[test]
fn test_each_operation_notifies_once() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[3.0, 1.0, 2.0]);
    let recorder = Recorder::default();
    let _client = x.subscribe(Some(recorder.callback()));

    ops.append(&x, &[Source::Values(&[4.0]), Source::Values(&[5.0])]).unwrap();
    assert_eq!(recorder.count(), 1);

    ops.delete(&x, &["0", "1"]).unwrap();
    assert_eq!(recorder.count(), 2);

    ops.sort(&x, false, &[]).unwrap();
    assert_eq!(recorder.count(), 3);

    ops.search(&x, 1.0, None);
    ops.range(&x, "0", "1").unwrap();
    assert_eq!(recorder.count(), 3);
}

#[test]
fn test_notify_actions() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0]);
    let recorder = Recorder::default();
    let _client = x.subscribe(Some(recorder.callback()));

    ops.notify(&x, "whenidle".parse().unwrap());
    ops.set_length(&x, 2).unwrap();
    assert!(ops.notify(&x, NotifyAction::Pending));
    assert!(ops.notify(&x, NotifyAction::Cancel));
    assert!(!ops.notify(&x, NotifyAction::Pending));
    fx.registry.run_idle();
    assert_eq!(recorder.count(), 0);

    ops.notify(&x, NotifyAction::Now);
    assert_eq!(recorder.count(), 1);

    ops.notify(&x, NotifyAction::Mode(NotifyMode::Never));
    ops.set_length(&x, 3).unwrap();
    fx.registry.run_idle();
    assert_eq!(recorder.count(), 1);
}

// ============================================================================
// Binary import
// ============================================================================

fn write_f64s(values: &[f64]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for &v in values {
        file.write_f64::<NativeEndian>(v).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_binary_read_file() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0]);
    let file = write_f64s(&[2.5, -3.0, 8.0]);

    let mut reader = std::fs::File::open(file.path()).unwrap();
    let read = ops
        .binary_read(&x, &mut reader, &BinaryReadOptions::new(BinaryFormat::R8))
        .unwrap();
    assert_eq!(read, 3);
    assert_eq!(x.values(), vec![1.0, 2.5, -3.0, 8.0]);
}

#[test]
fn test_binary_read_at_and_count() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[0.0, 0.0, 0.0]);
    let bytes: Vec<u8> = vec![1, 2, 3, 4, 5];

    let options = BinaryReadOptions::new(BinaryFormat::U1).at("1").count(2);
    assert_eq!(ops.binary_read(&x, &mut Cursor::new(&bytes), &options).unwrap(), 2);
    assert_eq!(x.values(), vec![0.0, 1.0, 2.0]);

    let options = BinaryReadOptions::new(BinaryFormat::U1).at("2");
    ops.binary_read(&x, &mut Cursor::new(&bytes), &options).unwrap();
    assert_eq!(x.values(), vec![0.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

    let options = BinaryReadOptions::new(BinaryFormat::U1).at("99");
    assert!(ops.binary_read(&x, &mut Cursor::new(&bytes), &options).is_err());
}

#[test]
fn test_binary_read_count_past_end_of_stream() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[1.0]);
    let mut bytes = Vec::new();
    bytes.write_f64::<NativeEndian>(4.0).unwrap();

    let options = BinaryReadOptions::new(BinaryFormat::R8).count(usize::MAX / 4);
    assert_eq!(ops.binary_read(&x, &mut Cursor::new(&bytes), &options).unwrap(), 1);
    assert_eq!(x.values(), vec![1.0, 4.0]);
}

#[test]
fn test_binary_read_short_record() {
    let fx = Fixture::new();
    let ops = fx.ops();
    let x = fx.vector("x", &[]);
    let bytes = vec![0u8; 6];

    let options = BinaryReadOptions::new(BinaryFormat::I4);
    assert!(matches!(
        ops.binary_read(&x, &mut Cursor::new(&bytes), &options),
        Err(ClientError::ShortRead { bytes: 6, size: 4 })
    ));
    assert!(x.is_empty());
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_split_then_merge_restores(
        parts in 1usize..5,
        base in prop::collection::vec(-1000i32..1000, 1..40),
    ) {
        let length = base.len() / parts * parts;
        prop_assume!(length > 0);
        let values: Vec<f64> = base[..length].iter().map(|&v| f64::from(v)).collect();

        let fx = Fixture::new();
        let ops = fx.ops();
        let x = fx.vector("x", &values);
        let names: Vec<String> = (0..parts).map(|i| format!("part{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        ops.split(&x, &names).unwrap();
        let (merged, _) = fx.registry.create("merged").unwrap();
        ops.merge(&merged, &names).unwrap();
        prop_assert_eq!(merged.values(), values);
    }

    #[test]
    fn prop_populate_keeps_originals(
        base in prop::collection::vec(-1000i32..1000, 2..20),
        density in 1usize..6,
    ) {
        let values: Vec<f64> = base.iter().map(|&v| f64::from(v)).collect();
        let fx = Fixture::new();
        let ops = fx.ops();
        let x = fx.vector("x", &values);

        let size = ops.populate(&x, "dense", density).unwrap();
        prop_assert_eq!(size, (values.len() - 1) * (density + 1) + 1);

        let dense = fx.registry.lookup("dense").unwrap().values();
        for (i, &v) in values.iter().enumerate() {
            prop_assert!((dense[i * (density + 1)] - v).abs() < 1e-9);
        }
    }
}
