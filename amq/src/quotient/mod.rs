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

//! Quotient filter implementation for probabilistic set membership testing.
//!
//! A quotient filter is a compact open-addressing hash table. Each key is
//! hashed and split into a quotient (the slot address, its "home") and a
//! remainder (the value stored). Remainders sharing a home form a sorted
//! *run*; runs are packed into contiguous *clusters* and pushed right of
//! their home when needed. Three flags per slot recover the layout:
//!
//! - `occupied`: some stored key has this slot as its home
//! - `continuation`: the remainder here is not the first one of its run
//! - `shifted`: the remainder here is not in its home slot
//!
//! # Usage
//!
//! ```rust
//! use amq::quotient::QuotientFilter;
//!
//! let mut filter = QuotientFilter::new(10, 8).unwrap();
//! filter.insert(42).unwrap();
//! assert!(filter.contains(42));
//!
//! filter.delete(42).unwrap();
//! assert!(!filter.contains(42));
//! ```

mod filter;
mod slot;

pub use self::filter::QuotientFilter;
pub use self::filter::QuotientFilterBuilder;
