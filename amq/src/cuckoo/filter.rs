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
use log::warn;

use crate::MembershipFilter;
use crate::common::filled_vec;
use crate::common::vec_with_capacity;
use crate::cuckoo::bucket::BUCKET_SIZE;
use crate::cuckoo::bucket::Bucket;
use crate::cuckoo::stash::Stash;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::hash;

const DEFAULT_MAX_KICKS: usize = 500;
const DEFAULT_STASH_CAPACITY: usize = 16;
const DEFAULT_TARGET_LOAD: f64 = 0.85;
const DEFAULT_SEED: u64 = 0;
const MAX_FINGERPRINT_BITS: u32 = 32;

// Multiplier that spreads a fingerprint over the bucket index bits.
const ALT_INDEX_MULTIPLIER: usize = 0x5bd1_e995;

/// Where an inserted key ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The fingerprint was placed in one of the key's buckets, possibly after
    /// relocating other fingerprints.
    Table,
    /// The relocation chain was exhausted and the key went to the stash.
    Stash,
}

/// Running counters for capacity and load diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CuckooStats {
    /// Number of `insert` calls.
    pub insert_calls: u64,
    /// Inserts whose relocation chain hit the kick limit.
    pub insert_failures: u64,
    /// Fingerprints evicted during relocation.
    pub kicks: u64,
    /// Slots inspected while inserting. Stash migration on delete is not
    /// counted.
    pub probes: u64,
    /// Keys placed in the stash.
    pub stash_inserts: u64,
}

enum Relocation {
    Placed,
    Exhausted,
}

/// A cuckoo filter over 64-bit keys with 4-slot buckets and an overflow stash.
///
/// The filter supports deletion. Inserting a key twice stores two copies of
/// its fingerprint, and each `delete` removes one.
///
/// # Examples
///
/// ```
/// use amq::cuckoo::CuckooFilter;
/// use amq::cuckoo::InsertOutcome;
///
/// let mut filter = CuckooFilter::new(1_000, 12).unwrap();
/// assert_eq!(filter.insert(7).unwrap(), InsertOutcome::Table);
/// assert!(filter.contains(7));
/// assert_eq!(filter.stats().insert_calls, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CuckooFilter {
    seed: u64,
    fingerprint_bits: u32,
    fingerprint_mask: u32,
    max_kicks: usize,
    len: usize,
    buckets: Vec<Bucket>,
    stash: Stash,
    stats: CuckooStats,
    // (bucket, slot) of every eviction in the current kick chain.
    path: Vec<(usize, usize)>,
}

impl CuckooFilter {
    /// Creates a filter for about `expected_items` keys with
    /// `fingerprint_bits` wide fingerprints and the default tunables.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] unless
    /// `1 <= fingerprint_bits <= 32`, and [`ErrorKind::OutOfMemory`] if the
    /// table cannot be allocated.
    pub fn new(expected_items: u64, fingerprint_bits: u32) -> Result<Self, Error> {
        CuckooFilterBuilder::new(expected_items, fingerprint_bits).build()
    }

    /// Returns a builder for a filter with the given size hint and
    /// fingerprint width.
    pub fn builder(expected_items: u64, fingerprint_bits: u32) -> CuckooFilterBuilder {
        CuckooFilterBuilder::new(expected_items, fingerprint_bits)
    }

    /// Inserts a key.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsertFailed`] if relocation is exhausted and the
    /// stash is full. The filter contents are then unchanged.
    pub fn insert(&mut self, key: u64) -> Result<InsertOutcome, Error> {
        self.stats.insert_calls += 1;
        let (fingerprint, i1, i2) = self.locate(key);

        let (placed, probes) = self.place_without_kick(fingerprint, i1, i2);
        self.stats.probes += probes;
        if placed {
            self.len += 1;
            return Ok(InsertOutcome::Table);
        }

        if let Relocation::Placed = self.relocate(i1, fingerprint) {
            self.len += 1;
            return Ok(InsertOutcome::Table);
        }

        self.stats.insert_failures += 1;
        if self.stash.push(key, fingerprint) {
            self.stats.stash_inserts += 1;
            self.len += 1;
            debug!(
                "cuckoo filter stashed key after {} kicks ({} of {} stash slots used)",
                self.max_kicks,
                self.stash.len(),
                self.stash.capacity()
            );
            return Ok(InsertOutcome::Stash);
        }

        warn!(
            "cuckoo filter insert failed with {} items in {} slots",
            self.len,
            self.capacity_slots()
        );
        Err(Error::new(
            ErrorKind::InsertFailed,
            "no room in candidate buckets after relocation and the stash is full",
        )
        .with_context("len", self.len)
        .with_context("max_kicks", self.max_kicks))
    }

    /// Tests whether a key is possibly in the set.
    pub fn contains(&self, key: u64) -> bool {
        let (fingerprint, i1, i2) = self.locate(key);
        self.buckets[i1].contains(fingerprint)
            || self.buckets[i2].contains(fingerprint)
            || self.stash.contains_key(key)
    }

    /// Deletes one copy of a key.
    ///
    /// The stash is searched first since it matches keys exactly. Otherwise
    /// the fingerprint is removed from a candidate bucket, and the freed slot
    /// lets one stashed key move back into the table when one of its buckets
    /// has room.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if neither the stash nor the key's
    /// buckets hold it.
    pub fn delete(&mut self, key: u64) -> Result<(), Error> {
        if self.stash.remove_key(key) {
            self.len -= 1;
            return Ok(());
        }

        let (fingerprint, i1, i2) = self.locate(key);
        if self.buckets[i1].remove(fingerprint) || self.buckets[i2].remove(fingerprint) {
            self.len -= 1;
            self.migrate_from_stash();
            return Ok(());
        }

        Err(Error::new(
            ErrorKind::NotFound,
            "key is not in the cuckoo filter",
        ))
    }

    /// Removes every key and resets the statistics.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = Bucket::default();
        }
        self.stash.clear();
        self.stats = CuckooStats::default();
        self.len = 0;
    }

    /// Returns the number of stored keys, stash included.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the filter stores nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of buckets (a power of two).
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of fingerprint slots in the table.
    pub fn capacity_slots(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    /// Returns the number of keys held in the stash.
    pub fn stash_len(&self) -> usize {
        self.stash.len()
    }

    /// Returns the number of stash slots.
    pub fn stash_capacity(&self) -> usize {
        self.stash.capacity()
    }

    /// Returns the fraction of table slots in use.
    pub fn load_factor(&self) -> f64 {
        (self.len - self.stash.len()) as f64 / self.capacity_slots() as f64
    }

    /// Returns the fingerprint width in bits.
    pub fn fingerprint_bits(&self) -> u32 {
        self.fingerprint_bits
    }

    /// Returns the maximum number of kicks per insert.
    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    /// Returns the hash seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the running insert statistics.
    pub fn stats(&self) -> &CuckooStats {
        &self.stats
    }

    /// Returns the memory held by the table and the stash in bytes.
    pub fn byte_size(&self) -> usize {
        self.capacity_slots() * size_of::<u32>()
            + self.stash.capacity() * (size_of::<u64>() + size_of::<u32>())
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    /// Returns the non-zero fingerprint and both candidate buckets of `key`.
    fn locate(&self, key: u64) -> (u32, usize, usize) {
        let h = hash(key, self.seed);
        let fingerprint = ((h >> 32) as u32 & self.fingerprint_mask).max(1);
        let i1 = h as usize & (self.buckets.len() - 1);
        let i2 = self.alt_index(i1, fingerprint);
        (fingerprint, i1, i2)
    }

    /// Returns the other candidate bucket of `fingerprint` stored at `index`.
    ///
    /// Applying it twice yields `index` again.
    #[inline]
    fn alt_index(&self, index: usize, fingerprint: u32) -> usize {
        (index ^ (fingerprint as usize).wrapping_mul(ALT_INDEX_MULTIPLIER))
            & (self.buckets.len() - 1)
    }

    /// Places `fingerprint` in the first free slot of `i1` or `i2`.
    ///
    /// Returns whether it was placed and the number of slots inspected.
    fn place_without_kick(&mut self, fingerprint: u32, i1: usize, i2: usize) -> (bool, u64) {
        let mut probes = 0;
        for index in [i1, i2] {
            match self.buckets[index].try_insert(fingerprint) {
                Some(slot) => return (true, probes + slot as u64 + 1),
                None => probes += BUCKET_SIZE as u64,
            }
        }
        (false, probes)
    }

    /// Evicts fingerprints along a chain starting at bucket `start` until one
    /// lands in a free slot or the kick limit is reached.
    ///
    /// On exhaustion every eviction is reverted, leaving the table exactly as
    /// it was.
    fn relocate(&mut self, start: usize, fingerprint: u32) -> Relocation {
        self.path.clear();
        let mut index = start;
        let mut carry = fingerprint;

        for kick in 0..self.max_kicks {
            let victim = kick % BUCKET_SIZE;
            carry = self.buckets[index].swap(victim, carry);
            self.path.push((index, victim));
            self.stats.kicks += 1;

            index = self.alt_index(index, carry);
            match self.buckets[index].try_insert(carry) {
                Some(slot) => {
                    self.stats.probes += slot as u64 + 1;
                    self.path.clear();
                    return Relocation::Placed;
                }
                None => self.stats.probes += BUCKET_SIZE as u64,
            }
        }

        for &(index, victim) in self.path.iter().rev() {
            carry = self.buckets[index].swap(victim, carry);
        }
        self.path.clear();
        debug_assert_eq!(carry, fingerprint);
        Relocation::Exhausted
    }

    /// Moves the first stashed key whose buckets have room back into the
    /// table.
    fn migrate_from_stash(&mut self) {
        let candidate = self.stash.entries().iter().position(|entry| {
            let h = hash(entry.key, self.seed);
            let i1 = h as usize & (self.buckets.len() - 1);
            let i2 = self.alt_index(i1, entry.fingerprint);
            self.buckets[i1].len() < BUCKET_SIZE || self.buckets[i2].len() < BUCKET_SIZE
        });

        if let Some(position) = candidate {
            let entry = self.stash.swap_remove(position);
            let (fingerprint, i1, i2) = self.locate(entry.key);
            let (placed, _) = self.place_without_kick(fingerprint, i1, i2);
            debug_assert!(placed);
        }
    }
}

impl MembershipFilter for CuckooFilter {
    fn contains(&self, key: u64) -> bool {
        CuckooFilter::contains(self, key)
    }

    fn byte_size(&self) -> usize {
        CuckooFilter::byte_size(self)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for creating [`CuckooFilter`] instances.
///
/// # Examples
///
/// ```
/// use amq::cuckoo::CuckooFilterBuilder;
///
/// let filter = CuckooFilterBuilder::new(100_000, 16)
///     .seed(42)
///     .max_kicks(200)
///     .stash_capacity(32)
///     .build()
///     .unwrap();
/// assert_eq!(filter.num_buckets(), 32_768);
/// assert_eq!(filter.stash_capacity(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct CuckooFilterBuilder {
    expected_items: u64,
    fingerprint_bits: u32,
    seed: u64,
    max_kicks: usize,
    stash_capacity: usize,
    target_load: f64,
}

impl CuckooFilterBuilder {
    /// Creates a builder for about `expected_items` keys.
    pub fn new(expected_items: u64, fingerprint_bits: u32) -> Self {
        Self {
            expected_items,
            fingerprint_bits,
            seed: DEFAULT_SEED,
            max_kicks: DEFAULT_MAX_KICKS,
            stash_capacity: DEFAULT_STASH_CAPACITY,
            target_load: DEFAULT_TARGET_LOAD,
        }
    }

    /// Sets the hash seed (default: 0).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the relocation limit per insert (default: 500).
    pub fn max_kicks(mut self, max_kicks: usize) -> Self {
        self.max_kicks = max_kicks;
        self
    }

    /// Sets the number of stash slots (default: 16). Zero disables the stash.
    pub fn stash_capacity(mut self, stash_capacity: usize) -> Self {
        self.stash_capacity = stash_capacity;
        self
    }

    /// Sets the table load used for sizing (default: 0.85).
    pub fn target_load(mut self, target_load: f64) -> Self {
        self.target_load = target_load;
        self
    }

    /// Builds the filter with an empty table and stash.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] for a fingerprint width outside
    /// `1..=32` or a target load outside (0, 1], and
    /// [`ErrorKind::OutOfMemory`] if the allocation fails.
    pub fn build(self) -> Result<CuckooFilter, Error> {
        if self.fingerprint_bits == 0 || self.fingerprint_bits > MAX_FINGERPRINT_BITS {
            return Err(Error::invalid_argument(format!(
                "fingerprint_bits must be between 1 and {MAX_FINGERPRINT_BITS}"
            ))
            .with_context("fingerprint_bits", self.fingerprint_bits));
        }
        if !(self.target_load > 0.0 && self.target_load <= 1.0) {
            return Err(Error::invalid_argument(
                "target_load must be in (0.0, 1.0]",
            )
            .with_context("target_load", self.target_load));
        }

        let num_buckets = Self::suggest_num_buckets(self.expected_items, self.target_load)
            .ok_or_else(|| {
                Error::invalid_argument("cuckoo filter too large")
                    .with_context("expected_items", self.expected_items)
            })?;
        let buckets = filled_vec("cuckoo buckets", num_buckets, Bucket::default())?;
        let stash = Stash::new(
            vec_with_capacity("cuckoo stash", self.stash_capacity)?,
            self.stash_capacity,
        );
        let path = vec_with_capacity("cuckoo kick path", self.max_kicks)?;
        debug!(
            "cuckoo filter: {} buckets, {} bit fingerprints, {} stash slots",
            num_buckets, self.fingerprint_bits, self.stash_capacity
        );

        let fingerprint_mask = if self.fingerprint_bits == MAX_FINGERPRINT_BITS {
            u32::MAX
        } else {
            (1u32 << self.fingerprint_bits) - 1
        };

        Ok(CuckooFilter {
            seed: self.seed,
            fingerprint_bits: self.fingerprint_bits,
            fingerprint_mask,
            max_kicks: self.max_kicks,
            len: 0,
            buckets,
            stash,
            stats: CuckooStats::default(),
            path,
        })
    }

    /// Suggests the bucket count: the next power of two of
    /// `expected_items / (4 * target_load)`, at least 1.
    ///
    /// Returns `None` if the count does not fit in `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::cuckoo::CuckooFilterBuilder;
    ///
    /// assert_eq!(CuckooFilterBuilder::suggest_num_buckets(1000, 0.85), Some(512));
    /// assert_eq!(CuckooFilterBuilder::suggest_num_buckets(0, 0.85), Some(1));
    /// ```
    pub fn suggest_num_buckets(expected_items: u64, target_load: f64) -> Option<usize> {
        let wanted = (expected_items as f64 / (BUCKET_SIZE as f64 * target_load)).ceil();
        if wanted >= usize::MAX as f64 {
            return None;
        }
        (wanted as usize).max(1).checked_next_power_of_two()
    }
}

// ============================================================================
// Tests
// ============================================================================
