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

//! Approximate membership query filters.
//!
//! Four space-efficient set representations answering "is key K possibly in
//! the set?" with a bounded false positive probability and no false
//! negatives:
//!
//! - [`bloom::BlockedBloomFilter`]: cache-blocked Bloom filter, insert only.
//! - [`cuckoo::CuckooFilter`]: bucketized cuckoo filter with an overflow stash,
//!   supports deletion.
//! - [`quotient::QuotientFilter`]: quotient filter with run/cluster metadata,
//!   supports deletion.
//! - [`xor::XorFilter`]: static xor filter built once from a complete key set.
//!
//! All filters are fixed-capacity for their whole lifetime, keep no global
//! state, and take every tunable (seeds, rates, bit widths) as an explicit
//! construction parameter. None of them synchronizes internally: mutation
//! needs `&mut self`, so sharing a filter between threads requires an external
//! lock around writers.
//!
//! # Usage
//!
//! ```rust
//! use amq::cuckoo::CuckooFilter;
//!
//! let mut filter = CuckooFilter::new(1_000, 12).unwrap();
//! filter.insert(42).unwrap();
//! assert!(filter.contains(42));
//!
//! filter.delete(42).unwrap();
//! assert!(!filter.contains(42));
//! assert!(filter.byte_size() > 0);
//! ```

pub mod bloom;
pub mod cuckoo;
pub mod error;
pub mod hash;
pub mod quotient;
pub mod xor;

mod common;
mod filter;

pub use self::filter::MembershipFilter;
