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

use crate::MembershipFilter;
use crate::hash::hash;
use crate::xor::XorFilterBuilder;

// Decouples the slot hash from other users of the same seed.
const SLOT_SALT: u64 = 0xd6e8_feb8_6659_fd93;
const THIRD_SLOT_OFFSET: u32 = 0x9e37_79b9;

/// Static xor filter with up to 16-bit fingerprints.
///
/// Every build key `x` satisfies
/// `F[h0(x)] ^ F[h1(x)] ^ F[h2(x)] == fingerprint(x)`, so lookups never
/// produce false negatives. The false positive rate is about
/// `2^-fingerprint_bits`.
///
/// # Examples
///
/// ```
/// use amq::xor::XorFilter;
///
/// let keys: Vec<u64> = (0..10_000).collect();
/// let filter = XorFilter::builder().build(&keys).unwrap();
///
/// assert!(filter.contains(42));
/// assert_eq!(filter.len(), 10_000);
/// assert_eq!(filter.num_slots(), 13_032);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorFilter {
    seed: u64,
    fingerprint_bits: u32,
    num_keys: usize,
    fingerprints: Vec<u16>,
}

impl XorFilter {
    /// Creates a builder for xor filters.
    pub fn builder() -> XorFilterBuilder {
        XorFilterBuilder::default()
    }

    pub(super) fn from_parts(
        seed: u64,
        fingerprint_bits: u32,
        num_keys: usize,
        fingerprints: Vec<u16>,
    ) -> Self {
        Self {
            seed,
            fingerprint_bits,
            num_keys,
            fingerprints,
        }
    }

    /// Returns `true` if the filter probably contains the specified key.
    ///
    /// There are no false negatives, but false positives are possible.
    pub fn contains(&self, key: u64) -> bool {
        let h = slot_hash(key, self.seed);
        let [h0, h1, h2] = slots(h, self.fingerprints.len());
        fingerprint(h, self.fingerprint_bits)
            == self.fingerprints[h0] ^ self.fingerprints[h1] ^ self.fingerprints[h2]
    }

    /// Returns the number of distinct keys the filter was built from.
    pub fn len(&self) -> usize {
        self.num_keys
    }

    /// Returns true if the filter was built from no keys.
    pub fn is_empty(&self) -> bool {
        self.num_keys == 0
    }

    /// Returns the number of fingerprint slots.
    pub fn num_slots(&self) -> usize {
        self.fingerprints.len()
    }

    /// Returns the seed of the construction attempt that succeeded.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the fingerprint width in bits.
    pub fn fingerprint_bits(&self) -> u32 {
        self.fingerprint_bits
    }

    /// Returns the size of the fingerprint array in bytes.
    pub fn byte_size(&self) -> usize {
        self.fingerprints.len() * size_of::<u16>()
    }
}

impl MembershipFilter for XorFilter {
    fn contains(&self, key: u64) -> bool {
        XorFilter::contains(self, key)
    }

    fn byte_size(&self) -> usize {
        XorFilter::byte_size(self)
    }
}

#[inline]
pub(super) fn slot_hash(key: u64, seed: u64) -> u64 {
    hash(key, seed.rotate_left(32) ^ SLOT_SALT)
}

/// Maps a hash to three pairwise distinct slots in `0..m`.
///
/// Requires `m >= 3`.
#[inline]
pub(super) fn slots(h: u64, m: usize) -> [usize; 3] {
    let a = h as u32;
    let b = (h >> 32) as u32;
    let c = (a ^ b).rotate_left(11).wrapping_add(THIRD_SLOT_OFFSET);

    let h0 = a as usize % m;
    let mut h1 = b as usize % m;
    let mut h2 = c as usize % m;
    if h1 == h0 {
        h1 = (h1 + 1) % m;
    }
    while h2 == h0 || h2 == h1 {
        h2 = (h2 + 2) % m;
    }
    [h0, h1, h2]
}

/// Returns the non-zero `bits` wide fingerprint of a hash.
#[inline]
pub(super) fn fingerprint(h: u64, bits: u32) -> u16 {
    let mask = ((1u32 << bits) - 1) as u16;
    ((h ^ (h >> 32)) as u16 & mask).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_distinct_and_in_range() {
        for m in [3, 4, 64, 65, 1_000] {
            for key in 0..2_000 {
                let [h0, h1, h2] = slots(slot_hash(key, 0), m);
                assert!(h0 < m && h1 < m && h2 < m);
                assert_ne!(h0, h1);
                assert_ne!(h0, h2);
                assert_ne!(h1, h2);
            }
        }
    }

    #[test]
    fn test_fingerprint_is_non_zero_and_masked() {
        for bits in [1, 4, 8, 16] {
            for key in 0..1_000 {
                let fp = fingerprint(slot_hash(key, 7), bits);
                assert_ne!(fp, 0);
                assert!(u32::from(fp) < (1 << bits));
            }
        }
        assert_eq!(fingerprint(0, 8), 1);
    }

    #[test]
    fn test_empty_filter_contains_nothing() {
        let filter = XorFilter::builder().build(&[]).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.num_slots(), 64);
        assert_eq!(filter.byte_size(), 128);
        assert!((0..10_000).all(|key| !filter.contains(key)));
    }
}
