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

//! Cuckoo filter implementation for probabilistic set membership testing.
//!
//! A cuckoo filter stores short fingerprints in a table of 4-slot buckets.
//! Every key has two candidate buckets; the second is derived from the first
//! and the fingerprint alone, so a stored fingerprint can be moved to its
//! alternate bucket without knowing its key. When both buckets are full,
//! resident fingerprints are kicked to their alternate buckets, up to a fixed
//! number of kicks. Keys that still find no room go to a small stash that
//! keeps the raw key.
//!
//! # Usage
//!
//! ```rust
//! use amq::cuckoo::CuckooFilter;
//!
//! let mut filter = CuckooFilter::new(10_000, 16).unwrap();
//! for key in 0..10_000 {
//!     filter.insert(key).unwrap();
//! }
//! assert!(filter.contains(1234));
//!
//! filter.delete(1234).unwrap();
//! assert_eq!(filter.len(), 9_999);
//! ```

mod bucket;
mod filter;
mod stash;

pub use self::bucket::BUCKET_SIZE;
pub use self::filter::CuckooFilter;
pub use self::filter::CuckooFilterBuilder;
pub use self::filter::CuckooStats;
pub use self::filter::InsertOutcome;
