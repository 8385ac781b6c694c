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

//! Blocked Bloom filter for probabilistic set membership testing.
//!
//! A blocked Bloom filter splits its bit array into cache-line sized blocks of
//! 512 bits. Every key is routed to exactly one block and sets all of its `k`
//! probe bits inside that block, so a query touches a single cache line.
//!
//! # Usage
//!
//! ```rust
//! use amq::bloom::BlockedBloomFilter;
//!
//! let mut filter = BlockedBloomFilter::new(10_000, 0.01).unwrap();
//! filter.insert(42);
//!
//! assert!(filter.contains(42));
//! ```
//!
//! # Notes
//!
//! - There is no delete: bits are only ever set.
//! - The size is fixed at construction from the expected item count and the
//!   target false positive rate.

mod filter;

pub use self::filter::BLOCK_BITS;
pub use self::filter::BLOCK_BYTES;
pub use self::filter::BlockedBloomFilter;
pub use self::filter::BlockedBloomFilterBuilder;
