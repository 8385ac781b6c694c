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

use amq::MembershipFilter;
use amq::bloom::BlockedBloomFilter;
use amq::cuckoo::CuckooFilter;
use amq::hash::SplitMix64;
use amq::hash::item_key;
use amq::quotient::QuotientFilter;
use amq::xor::XorFilter;
use googletest::assert_that;
use googletest::prelude::eq;
use googletest::prelude::gt;
use googletest::prelude::lt;

const NUM_KEYS: usize = 20_000;

fn keys() -> Vec<u64> {
    SplitMix64::seeded(41).take(NUM_KEYS).collect()
}

fn check_filter<F: MembershipFilter>(filter: &F, keys: &[u64], max_fpr: f64) {
    assert!(keys.iter().all(|&key| filter.contains(key)));
    let fpr = filter.measured_fpr(SplitMix64::seeded(42).take(100_000));
    assert_that!(fpr, lt(max_fpr));
    assert_that!(filter.bits_per_key(keys.len()), gt(0.0));
}

#[test]
fn test_all_filters_share_the_contract() {
    let keys = keys();

    let mut bloom = BlockedBloomFilter::new(NUM_KEYS as u64, 0.01).unwrap();
    let mut cuckoo = CuckooFilter::new(NUM_KEYS as u64, 12).unwrap();
    let mut quotient = QuotientFilter::new(15, 10).unwrap();
    for &key in &keys {
        bloom.insert(key);
        cuckoo.insert(key).unwrap();
        quotient.insert(key).unwrap();
    }
    let xor = XorFilter::builder().build(&keys).unwrap();

    check_filter(&bloom, &keys, 0.02);
    check_filter(&cuckoo, &keys, 0.005);
    check_filter(&quotient, &keys, 0.005);
    check_filter(&xor, &keys, 0.01);
}

#[test]
fn test_measured_fpr_without_probes() {
    let filter = BlockedBloomFilter::new(10, 0.01).unwrap();
    assert_that!(filter.measured_fpr(std::iter::empty()), eq(0.0));
    assert_that!(filter.bits_per_key(0), eq(0.0));
}

#[test]
fn test_item_keys_feed_filters() {
    let words = ["apple", "banana", "cherry"];
    let mut filter = CuckooFilter::new(100, 16).unwrap();
    for word in words {
        filter.insert(item_key(word)).unwrap();
    }
    assert!(words.iter().all(|word| filter.contains(item_key(word))));
    assert_that!(item_key("apple"), eq(item_key("apple")));
    assert_ne!(item_key("apple"), item_key("banana"));
}
