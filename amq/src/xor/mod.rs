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

//! Xor filter implementation for probabilistic set membership testing.
//!
//! Xor filters are immutable, space-efficient structures with no false
//! negatives. Construction maps each key to three distinct slots and peels
//! the resulting hypergraph: a slot touched by exactly one remaining key
//! determines that key's fingerprint, so the key is removed and the process
//! repeats. Fingerprints are then assigned in reverse peel order.
//!
//! # Usage
//!
//! ```rust
//! use amq::xor::XorFilter;
//!
//! let keys: Vec<u64> = (0..10_000).collect();
//! let filter = XorFilter::builder().build(&keys).unwrap();
//!
//! assert!(filter.contains(42));
//! ```
//!
//! # Notes
//!
//! - Duplicate keys are removed before construction.
//! - Xor filters are immutable once built.

mod builder;
mod filter;

pub use self::builder::XorFilterBuilder;
pub use self::filter::XorFilter;
