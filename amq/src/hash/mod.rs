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

//! Hashing primitives shared by every filter.
//!
//! All filters derive their pseudo-independent values from the SplitMix64
//! finalizer: a key is XORed with a per-purpose salt and passed through
//! [`mix`]. The mixer is fast and has full avalanche, but it is not
//! cryptographically strong.
//!
//! Filters take 64-bit keys. Arbitrary hashable items can be turned into keys
//! with [`item_key`].

mod item;

pub use self::item::DEFAULT_ITEM_SEED;
pub use self::item::item_key;
pub use self::item::item_key_with_seed;

/// Increment of the SplitMix64 running state (the 64-bit golden ratio).
pub const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Advances the running `state` and returns the mixed output.
///
/// # Examples
///
/// ```
/// use amq::hash::mix;
///
/// let mut state = 0;
/// let first = mix(&mut state);
/// let second = mix(&mut state);
/// assert_ne!(first, second);
/// ```
#[inline]
pub fn mix(state: &mut u64) -> u64 {
    *state = state.wrapping_add(GOLDEN_GAMMA);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Hashes `key` under `salt`; equivalent to `mix` over `key ^ salt`.
#[inline]
pub fn hash(key: u64, salt: u64) -> u64 {
    let mut state = key ^ salt;
    mix(&mut state)
}

/// A seeded stream of pseudo-random 64-bit values.
///
/// Handy for generating key sets for filters; the same seed always yields
/// the same sequence.
///
/// # Examples
///
/// ```
/// use amq::hash::SplitMix64;
///
/// let keys: Vec<u64> = SplitMix64::seeded(7).take(3).collect();
/// let again: Vec<u64> = SplitMix64::seeded(7).take(3).collect();
/// assert_eq!(keys, again);
/// ```
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    /// Creates a stream starting at `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Returns the next value of the stream.
    pub fn next_u64(&mut self) -> u64 {
        mix(&mut self.state)
    }
}

impl Iterator for SplitMix64 {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.next_u64())
    }
}
