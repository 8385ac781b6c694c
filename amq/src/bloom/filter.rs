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

use log::debug;

use crate::MembershipFilter;
use crate::common::filled_vec;
use crate::error::Error;
use crate::hash::hash;

/// Width of one block in bytes (one cache line).
pub const BLOCK_BYTES: usize = 64;
/// Width of one block in bits.
pub const BLOCK_BITS: usize = BLOCK_BYTES * 8;

const WORDS_PER_BLOCK: usize = BLOCK_BYTES / 8;
const MIN_NUM_HASHES: u32 = 1;
const MAX_NUM_HASHES: u32 = 16;

const DEFAULT_BLOCK_SEED: u64 = 0x1234_5678_9abc_def0;
const DEFAULT_BIT_SEED: u64 = 0xfedc_ba98_7654_3210;

type Block = [u64; WORDS_PER_BLOCK];

/// A cache-blocked Bloom filter over 64-bit keys.
///
/// Provides fast membership queries with:
/// - No false negatives (inserted keys always return `true`)
/// - A false positive rate fixed by the construction parameters
/// - One block (cache line) touched per operation
///
/// Use [`BlockedBloomFilterBuilder`] for custom seeds.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedBloomFilter {
    /// Salt of the hash that selects a block
    block_seed: u64,
    /// Salt of the hash that seeds the probe sequence inside a block
    bit_seed: u64,
    /// Probe bits per key (k)
    num_hashes: u32,
    expected_items: u64,
    target_fpr: f64,
    /// Count of bits set to 1 (for statistics)
    num_bits_set: u64,
    blocks: Vec<Block>,
}

impl BlockedBloomFilter {
    /// Creates a filter sized for `expected_items` keys at `target_fpr`, with
    /// the default seeds.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `expected_items` is 0 or `target_fpr` is not in (0, 1), and
    /// [`ErrorKind::OutOfMemory`](crate::error::ErrorKind::OutOfMemory) if the
    /// blocks cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::bloom::BlockedBloomFilter;
    ///
    /// let filter = BlockedBloomFilter::new(1_000, 0.01).unwrap();
    /// assert_eq!(filter.num_hashes(), 7);
    /// ```
    pub fn new(expected_items: u64, target_fpr: f64) -> Result<Self, Error> {
        BlockedBloomFilterBuilder::with_accuracy(expected_items, target_fpr).build()
    }

    /// Returns a builder sized for `expected_items` keys at `target_fpr`.
    pub fn builder(expected_items: u64, target_fpr: f64) -> BlockedBloomFilterBuilder {
        BlockedBloomFilterBuilder::with_accuracy(expected_items, target_fpr)
    }

    /// Inserts a key. Inserting the same key twice has no further effect.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::bloom::BlockedBloomFilter;
    ///
    /// let mut filter = BlockedBloomFilter::new(100, 0.01).unwrap();
    /// filter.insert(7);
    /// filter.insert(7);
    /// assert!(filter.contains(7));
    /// ```
    pub fn insert(&mut self, key: u64) {
        let (block, probes) = self.locate(key);
        let mut newly_set = 0;
        let block = &mut self.blocks[block];
        for bit in probes {
            let (word, mask) = word_and_mask(bit);
            if block[word] & mask == 0 {
                block[word] |= mask;
                newly_set += 1;
            }
        }
        self.num_bits_set += newly_set;
    }

    /// Tests whether a key is possibly in the set.
    ///
    /// Returns:
    /// - `true`: the key was **possibly** inserted (or false positive)
    /// - `false`: the key was **definitely not** inserted
    pub fn contains(&self, key: u64) -> bool {
        let (block, mut probes) = self.locate(key);
        let block = &self.blocks[block];
        probes.all(|bit| {
            let (word, mask) = word_and_mask(bit);
            block[word] & mask != 0
        })
    }

    /// Tests and inserts a key in a single operation.
    ///
    /// Returns whether the key was possibly already in the set before insertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::bloom::BlockedBloomFilter;
    ///
    /// let mut filter = BlockedBloomFilter::new(100, 0.01).unwrap();
    /// assert!(!filter.contains_and_insert(42));
    /// assert!(filter.contains_and_insert(42));
    /// ```
    pub fn contains_and_insert(&mut self, key: u64) -> bool {
        let was_present = self.contains(key);
        if !was_present {
            self.insert(key);
        }
        was_present
    }

    /// Resets the filter to its initial empty state, keeping its size.
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            *block = [0; WORDS_PER_BLOCK];
        }
        self.num_bits_set = 0;
    }

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.num_bits_set == 0
    }

    /// Returns the number of 512-bit blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of probe bits set per key (k).
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Returns the expected item count the filter was sized for.
    pub fn expected_items(&self) -> u64 {
        self.expected_items
    }

    /// Returns the target false positive rate the filter was sized for.
    pub fn target_fpr(&self) -> f64 {
        self.target_fpr
    }

    /// Returns the total number of bits.
    pub fn capacity_bits(&self) -> u64 {
        (self.blocks.len() * BLOCK_BITS) as u64
    }

    /// Returns the number of bits set to 1.
    pub fn bits_set(&self) -> u64 {
        self.num_bits_set
    }

    /// Returns the fraction of bits set.
    pub fn load_factor(&self) -> f64 {
        self.num_bits_set as f64 / self.capacity_bits() as f64
    }

    /// Estimates the current false positive probability as `load^k`.
    ///
    /// Assumes bits are spread uniformly across blocks.
    pub fn estimated_fpp(&self) -> f64 {
        self.load_factor().powi(self.num_hashes as i32)
    }

    /// Returns the memory held by the block array in bytes.
    pub fn byte_size(&self) -> usize {
        self.blocks.len() * BLOCK_BYTES
    }

    /// Selects the block of `key` and its probe sequence inside that block.
    fn locate(&self, key: u64) -> (usize, Probes) {
        let h1 = hash(key, self.block_seed);
        let h2 = hash(key, self.bit_seed);

        let block = (h1 % self.blocks.len() as u64) as usize;
        let probes = Probes {
            next: h2 as u32,
            step: ((h2 >> 32) as u32) | 1,
            remaining: self.num_hashes,
        };
        (block, probes)
    }
}

/// Bit positions `(low32(h2) + i * step) mod 512` for `i` in `0..k`.
///
/// `step` is odd, so no position repeats within one block.
struct Probes {
    next: u32,
    step: u32,
    remaining: u32,
}

impl Iterator for Probes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let bit = self.next as usize % BLOCK_BITS;
        self.next = self.next.wrapping_add(self.step);
        Some(bit)
    }
}

impl MembershipFilter for BlockedBloomFilter {
    fn contains(&self, key: u64) -> bool {
        BlockedBloomFilter::contains(self, key)
    }

    fn byte_size(&self) -> usize {
        BlockedBloomFilter::byte_size(self)
    }
}

#[inline]
fn word_and_mask(bit: usize) -> (usize, u64) {
    (bit / 64, 1u64 << (bit % 64))
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for creating [`BlockedBloomFilter`] instances.
///
/// # Examples
///
/// ```
/// use amq::bloom::BlockedBloomFilterBuilder;
///
/// let filter = BlockedBloomFilterBuilder::with_accuracy(10_000, 0.001)
///     .block_seed(1)
///     .bit_seed(2)
///     .build()
///     .unwrap();
/// assert!(filter.num_blocks() > 0);
/// ```
#[derive(Debug, Clone)]
pub struct BlockedBloomFilterBuilder {
    expected_items: u64,
    target_fpr: f64,
    block_seed: u64,
    bit_seed: u64,
}

impl BlockedBloomFilterBuilder {
    /// Creates a builder for `expected_items` keys at `target_fpr`.
    ///
    /// The parameters are validated by [`build()`](Self::build).
    pub fn with_accuracy(expected_items: u64, target_fpr: f64) -> Self {
        Self {
            expected_items,
            target_fpr,
            block_seed: DEFAULT_BLOCK_SEED,
            bit_seed: DEFAULT_BIT_SEED,
        }
    }

    /// Sets the salt of the block-selecting hash.
    pub fn block_seed(mut self, seed: u64) -> Self {
        self.block_seed = seed;
        self
    }

    /// Sets the salt of the hash that drives the in-block probe sequence.
    pub fn bit_seed(mut self, seed: u64) -> Self {
        self.bit_seed = seed;
        self
    }

    /// Builds the filter with a zeroed block array.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// for a zero item count or a rate outside (0, 1), and
    /// [`ErrorKind::OutOfMemory`](crate::error::ErrorKind::OutOfMemory) if the
    /// allocation fails.
    pub fn build(self) -> Result<BlockedBloomFilter, Error> {
        if self.expected_items == 0 {
            return Err(Error::invalid_argument("expected_items must be greater than 0"));
        }
        if !(self.target_fpr > 0.0 && self.target_fpr < 1.0) {
            return Err(
                Error::invalid_argument("target_fpr must be between 0.0 and 1.0 (exclusive)")
                    .with_context("target_fpr", self.target_fpr),
            );
        }

        let num_bits = Self::suggest_num_bits(self.expected_items, self.target_fpr);
        let num_hashes = Self::suggest_num_hashes(self.expected_items, num_bits);
        let num_blocks = usize::try_from(num_bits.div_ceil(BLOCK_BITS as u64))
            .map_err(|_| {
                Error::invalid_argument("blocked bloom filter too large")
                    .with_context("num_bits", num_bits)
            })?
            .max(1);

        let blocks = filled_vec("bloom blocks", num_blocks, [0; WORDS_PER_BLOCK])?;
        debug!(
            "blocked bloom filter: {} items at fpr {} -> {} blocks, k = {}",
            self.expected_items, self.target_fpr, num_blocks, num_hashes
        );

        Ok(BlockedBloomFilter {
            block_seed: self.block_seed,
            bit_seed: self.bit_seed,
            num_hashes,
            expected_items: self.expected_items,
            target_fpr: self.target_fpr,
            num_bits_set: 0,
            blocks,
        })
    }

    /// Suggests the number of bits for `expected_items` keys at `fpr`.
    ///
    /// Formula: `m = ceil(-n * ln(p) / ln(2)^2)`, at least one block.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::bloom::BlockedBloomFilterBuilder;
    ///
    /// let bits = BlockedBloomFilterBuilder::suggest_num_bits(1000, 0.01);
    /// assert_eq!(bits, 9586);
    /// ```
    pub fn suggest_num_bits(expected_items: u64, fpr: f64) -> u64 {
        let n = expected_items as f64;
        let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let bits = (-n * fpr.ln() / ln2_squared).ceil() as u64;
        bits.max(BLOCK_BITS as u64)
    }

    /// Suggests the number of probe bits per key given the bit count.
    ///
    /// Formula: `k = round((m / n) * ln(2))`, clamped to `[1, 16]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::bloom::BlockedBloomFilterBuilder;
    ///
    /// assert_eq!(BlockedBloomFilterBuilder::suggest_num_hashes(1000, 9586), 7);
    /// assert_eq!(BlockedBloomFilterBuilder::suggest_num_hashes(10, 1 << 20), 16);
    /// ```
    pub fn suggest_num_hashes(expected_items: u64, num_bits: u64) -> u32 {
        let k = (num_bits as f64 / expected_items as f64 * std::f64::consts::LN_2).round();
        (k as u32).clamp(MIN_NUM_HASHES, MAX_NUM_HASHES)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_builder_with_accuracy() {
        let filter = BlockedBloomFilter::new(1000, 0.01).unwrap();
        assert_eq!(filter.num_hashes(), 7);
        // 9586 bits round up to 19 blocks
        assert_eq!(filter.num_blocks(), 19);
        assert_eq!(filter.byte_size(), 19 * BLOCK_BYTES);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_small_filter_has_one_block() {
        let filter = BlockedBloomFilter::new(1, 0.5).unwrap();
        assert_eq!(filter.num_blocks(), 1);
        assert_eq!(filter.num_hashes(), MAX_NUM_HASHES);
    }

    #[test]
    fn test_insert_and_contains() {
        let mut filter = BlockedBloomFilter::new(100, 0.01).unwrap();
        assert!(!filter.contains(1));
        filter.insert(1);
        assert!(filter.contains(1));
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_probes_stay_in_one_block() {
        let mut filter = BlockedBloomFilter::new(10_000, 0.01).unwrap();
        filter.insert(12345);

        let touched = filter
            .blocks
            .iter()
            .filter(|block| block.iter().any(|&w| w != 0))
            .count();
        assert_eq!(touched, 1);
        assert!(filter.bits_set() <= u64::from(filter.num_hashes()));
    }

    #[test]
    fn test_probe_sequence_is_distinct() {
        let filter = BlockedBloomFilter::new(10_000, 0.0001).unwrap();
        for key in 0..1000 {
            let (_, probes) = filter.locate(key);
            let mut probes: Vec<usize> = probes.collect();
            probes.sort_unstable();
            probes.dedup();
            assert_eq!(probes.len(), filter.num_hashes() as usize);
        }
    }

    #[test]
    fn test_clear() {
        let mut filter = BlockedBloomFilter::new(100, 0.01).unwrap();
        filter.insert(5);
        filter.clear();
        assert!(filter.is_empty());
        assert!(!filter.contains(5));
    }

    #[test]
    fn test_statistics() {
        let mut filter = BlockedBloomFilter::new(1000, 0.01).unwrap();
        assert_eq!(filter.load_factor(), 0.0);
        assert_eq!(filter.estimated_fpp(), 0.0);

        for key in 0..1000 {
            filter.insert(key);
        }
        assert!(filter.load_factor() > 0.0 && filter.load_factor() < 1.0);
        assert!(filter.estimated_fpp() > 0.0);
    }

    #[test]
    fn test_invalid_arguments() {
        assert_eq!(
            BlockedBloomFilter::new(0, 0.01).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            BlockedBloomFilter::new(100, 1.5).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            BlockedBloomFilter::new(100, f64::NAN).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_huge_filter_is_rejected() {
        let err = BlockedBloomFilter::new(u64::MAX, 1e-9).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidArgument | ErrorKind::OutOfMemory
        ));
    }
}
