// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::HashSet;

use amq::MembershipFilter;
use amq::bloom::BlockedBloomFilter;
use amq::bloom::BlockedBloomFilterBuilder;
use amq::error::ErrorKind;
use amq::hash::SplitMix64;
use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;
use googletest::prelude::lt;
use googletest::prelude::near;

#[test]
fn test_no_false_negatives_and_fpr_near_target() {
    let keys: Vec<u64> = SplitMix64::seeded(7).take(100_000).collect();
    let mut filter = BlockedBloomFilter::new(100_000, 0.01).unwrap();
    for &key in &keys {
        filter.insert(key);
    }
    assert!(keys.iter().all(|&key| filter.contains(key)));

    let stored: HashSet<u64> = keys.iter().copied().collect();
    let probes = SplitMix64::seeded(8)
        .filter(|key| !stored.contains(key))
        .take(200_000);
    let fpr = filter.measured_fpr(probes);
    assert_that!(fpr, near(0.01, 0.01));
    assert_that!(fpr, lt(0.02));
}

#[test]
fn test_insert_is_idempotent() {
    let mut filter = BlockedBloomFilter::new(1_000, 0.01).unwrap();
    filter.insert(42);
    let once = filter.clone();
    filter.insert(42);

    assert_eq!(filter, once);
    assert_that!(filter.bits_set(), eq(once.bits_set()));
}

#[test]
fn test_contains_and_insert() {
    let mut filter = BlockedBloomFilter::new(1_000, 0.01).unwrap();
    assert!(!filter.contains_and_insert(5));
    assert!(filter.contains_and_insert(5));
}

#[test]
fn test_sizing() {
    let filter = BlockedBloomFilter::new(1_000, 0.01).unwrap();
    assert_that!(filter.num_hashes(), eq(7));
    assert_that!(filter.num_blocks(), eq(19));
    assert_that!(filter.byte_size(), eq(19 * 64));

    let tiny = BlockedBloomFilter::new(1, 0.5).unwrap();
    assert_that!(tiny.num_blocks(), eq(1));
}

#[test]
fn test_default_seeds() {
    let mut default = BlockedBloomFilter::new(1_000, 0.01).unwrap();
    let mut explicit = BlockedBloomFilterBuilder::with_accuracy(1_000, 0.01)
        .block_seed(0x1234_5678_9abc_def0)
        .bit_seed(0xfedc_ba98_7654_3210)
        .build()
        .unwrap();
    for key in 0..100 {
        default.insert(key);
        explicit.insert(key);
    }
    assert_eq!(default, explicit);
}

#[test]
fn test_clear() {
    let mut filter = BlockedBloomFilter::new(1_000, 0.01).unwrap();
    filter.insert(1);
    assert!(!filter.is_empty());
    filter.clear();
    assert!(filter.is_empty());
    assert!(!filter.contains(1));
}

#[test]
fn test_invalid_arguments() {
    let err = BlockedBloomFilter::new(0, 0.01).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    for fpr in [0.0, 1.0, -0.1, f64::NAN] {
        let err = BlockedBloomFilter::new(1_000, fpr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_that!(err.to_string(), contains_substring("InvalidArgument"));
    }
}
