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

//! Property tests for storage growth, range caching and sorting.

use proptest::prelude::*;
use veclab_core::store::DEF_ARRAY_SIZE;
use veclab_core::{VectorStore, apply_permutation, build_permutation};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Capacity stays a power-of-two multiple of the baseline and covers length
    #[test]
    fn test_growth_invariant(lengths in prop::collection::vec(0usize..5000, 1..20)) {
        let mut store = VectorStore::new();
        for length in lengths {
            store.change_length(length).unwrap();
            prop_assert_eq!(store.len(), length);
            if length == 0 {
                continue;
            }
            let capacity = store.capacity();
            prop_assert!(capacity >= length);
            prop_assert_eq!(capacity % DEF_ARRAY_SIZE, 0);
            prop_assert!((capacity / DEF_ARRAY_SIZE).is_power_of_two());
        }
    }

    /// Values that survive a shrink come back unchanged after regrowth
    #[test]
    fn test_shrink_then_grow_keeps_prefix(
        values in prop::collection::vec(-1e6f64..1e6, 1..300),
        cut in 0usize..300,
    ) {
        let cut = cut.min(values.len());
        let mut store = VectorStore::from_values(&values).unwrap();
        store.change_length(cut).unwrap();
        store.change_length(values.len()).unwrap();

        prop_assert_eq!(&store.values()[..cut], &values[..cut]);
        prop_assert!(store.values()[cut..].iter().all(|&v| v == 0.0));
    }

    /// Two range updates without mutation agree
    #[test]
    fn test_update_range_idempotent(values in prop::collection::vec(prop::num::f64::ANY, 0..200)) {
        let mut store = VectorStore::from_values(&values).unwrap();
        store.update_range();
        let first = store.cached_range();
        store.update_range();
        let second = store.cached_range();
        prop_assert!(first.0 == second.0 || (first.0.is_nan() && second.0.is_nan()));
        prop_assert!(first.1 == second.1 || (first.1.is_nan() && second.1.is_nan()));
    }

    /// Applying the ascending permutation sorts; reverse sorts descending
    #[test]
    fn test_permutation_sorts(values in prop::collection::vec(-1e9f64..1e9, 0..500)) {
        let perm = build_permutation(&[values.as_slice()], false).unwrap();
        let mut sorted = values.clone();
        apply_permutation(&mut sorted, &perm).unwrap();
        prop_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

        let perm = build_permutation(&[values.as_slice()], true).unwrap();
        let mut reversed = values.clone();
        apply_permutation(&mut reversed, &perm).unwrap();
        prop_assert!(reversed.windows(2).all(|w| w[0] >= w[1]));
    }

    /// Equal keys keep their original relative order
    #[test]
    fn test_permutation_is_stable(keys in prop::collection::vec(0u8..4, 0..200)) {
        let keys: Vec<f64> = keys.into_iter().map(f64::from).collect();
        let perm = build_permutation(&[keys.as_slice()], false).unwrap();
        for pair in perm.windows(2) {
            if keys[pair[0]] == keys[pair[1]] {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}

#[test]
fn test_secondary_key_breaks_ties() {
    let primary = [1.0, 0.0, 1.0, 0.0];
    let secondary = [9.0, 8.0, 7.0, 6.0];
    let perm = build_permutation(&[&primary[..], &secondary[..]], false).unwrap();
    assert_eq!(perm, vec![3, 1, 2, 0]);
}
