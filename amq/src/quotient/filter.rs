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

use std::mem::size_of;

use log::debug;

use crate::MembershipFilter;
use crate::common::filled_vec;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::hash;
use crate::quotient::slot::Entry;
use crate::quotient::slot::Slot;

const MAX_QUOTIENT_BITS: u32 = 32;
const MAX_REMAINDER_BITS: u32 = 16;
const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.95;
const DEFAULT_SEED: u64 = 0;

/// A quotient filter over 64-bit keys.
///
/// The table has `2^quotient_bits` slots, each storing a `remainder_bits`
/// wide remainder plus three metadata flags. Insertions that would push the
/// load factor past the ceiling (0.95 by default) are rejected with
/// [`ErrorKind::FilterFull`].
///
/// # Examples
///
/// ```
/// use amq::quotient::QuotientFilter;
///
/// let mut filter = QuotientFilter::new(8, 8).unwrap();
/// for key in 0..100 {
///     filter.insert(key).unwrap();
/// }
/// assert_eq!(filter.len(), 100);
/// assert!(filter.contains(99));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QuotientFilter {
    seed: u64,
    quotient_bits: u32,
    remainder_bits: u32,
    max_load_factor: f64,
    len: usize,
    slots: Vec<Slot>,
}

impl QuotientFilter {
    /// Creates a filter with `2^quotient_bits` slots of `remainder_bits` each.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] unless `1 <= quotient_bits <= 32`
    /// and `1 <= remainder_bits <= 16`, and [`ErrorKind::OutOfMemory`] if the
    /// slot array cannot be allocated.
    pub fn new(quotient_bits: u32, remainder_bits: u32) -> Result<Self, Error> {
        QuotientFilterBuilder::new(quotient_bits, remainder_bits).build()
    }

    /// Returns a builder for a filter with the given bit widths.
    pub fn builder(quotient_bits: u32, remainder_bits: u32) -> QuotientFilterBuilder {
        QuotientFilterBuilder::new(quotient_bits, remainder_bits)
    }

    /// Inserts a key.
    ///
    /// A key that is already present (or whose fingerprint collides with a
    /// present key) is accepted without change.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::FilterFull`] if storing one more key would exceed
    /// the load factor ceiling. The filter is left unchanged.
    pub fn insert(&mut self, key: u64) -> Result<(), Error> {
        let (home, remainder) = self.split(key);
        if self.contains_fingerprint(home, remainder) {
            return Ok(());
        }
        if (self.len + 1) as f64 > self.max_load_factor * self.slots.len() as f64 {
            debug!("quotient filter full at {} of {} slots", self.len, self.slots.len());
            return Err(Error::new(ErrorKind::FilterFull, "quotient filter is full")
                .with_context("len", self.len)
                .with_context("capacity", self.slots.len()));
        }

        if self.slots[home].is_empty() {
            let slot = &mut self.slots[home];
            slot.set_occupied(true);
            slot.put(Entry {
                remainder,
                continuation: false,
                shifted: false,
            });
            self.len += 1;
            return Ok(());
        }

        let had_run = self.slots[home].is_occupied();
        self.slots[home].set_occupied(true);
        let run_start = self.find_run_start(home);

        // Keep the run sorted: land before the first larger remainder, or
        // right after the run's last slot.
        let mut pos = run_start;
        if had_run {
            loop {
                if self.slots[pos].remainder() > remainder {
                    break;
                }
                pos = self.next(pos);
                if !self.slots[pos].is_continuation() {
                    break;
                }
            }
        }

        let becomes_head = pos == run_start;
        self.insert_entry(
            pos,
            Entry {
                remainder,
                continuation: !becomes_head,
                shifted: pos != home,
            },
        );
        if had_run && becomes_head {
            // The previous head now follows the new one.
            let old_head = self.next(pos);
            self.slots[old_head].set_continuation(true);
        }

        self.len += 1;
        Ok(())
    }

    /// Tests whether a key is possibly in the set.
    ///
    /// Keys whose home slot is not occupied are rejected without touching any
    /// other slot.
    pub fn contains(&self, key: u64) -> bool {
        let (home, remainder) = self.split(key);
        self.contains_fingerprint(home, remainder)
    }

    /// Deletes a key.
    ///
    /// Deleting a key removes its fingerprint, so a different key sharing the
    /// same fingerprint is removed along with it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if the key is not stored.
    pub fn delete(&mut self, key: u64) -> Result<(), Error> {
        let (home, remainder) = self.split(key);
        let not_found = || Error::new(ErrorKind::NotFound, "key is not in the quotient filter");

        if !self.slots[home].is_occupied() {
            return Err(not_found());
        }

        let run_start = self.find_run_start(home);
        let mut pos = run_start;
        loop {
            let current = self.slots[pos].remainder();
            if current == remainder {
                break;
            }
            if current > remainder {
                return Err(not_found());
            }
            pos = self.next(pos);
            if !self.slots[pos].is_continuation() {
                return Err(not_found());
            }
        }

        let was_head = pos == run_start;
        let run_continues = self.slots[self.next(pos)].is_continuation();
        if was_head && !run_continues {
            self.slots[home].set_occupied(false);
        }
        self.remove_entry(pos, home, was_head);

        self.len -= 1;
        Ok(())
    }

    /// Removes every key, keeping the table size.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
        self.len = 0;
    }

    /// Returns the number of stored fingerprints.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the filter stores nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots (`2^quotient_bits`).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the fraction of slots holding a remainder.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.slots.len() as f64
    }

    /// Returns the load factor above which inserts are rejected.
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Returns the number of address bits.
    pub fn quotient_bits(&self) -> u32 {
        self.quotient_bits
    }

    /// Returns the number of bits stored per remainder.
    pub fn remainder_bits(&self) -> u32 {
        self.remainder_bits
    }

    /// Returns the hash seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the memory held by the slot array in bytes.
    pub fn byte_size(&self) -> usize {
        self.slots.len() * size_of::<Slot>()
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    /// Splits the hash of `key` into its home slot and a non-zero remainder.
    fn split(&self, key: u64) -> (usize, u16) {
        let h = hash(key, self.seed);
        let home = (h & (self.slots.len() as u64 - 1)) as usize;
        let mask = (1u64 << self.remainder_bits) - 1;
        let remainder = ((h >> self.quotient_bits) & mask) as u16;
        (home, remainder.max(1))
    }

    fn contains_fingerprint(&self, home: usize, remainder: u16) -> bool {
        if !self.slots[home].is_occupied() {
            return false;
        }

        let mut pos = self.find_run_start(home);
        loop {
            let current = self.slots[pos].remainder();
            if current == remainder {
                return true;
            }
            if current > remainder {
                return false;
            }
            pos = self.next(pos);
            if !self.slots[pos].is_continuation() {
                return false;
            }
        }
    }

    #[inline]
    fn next(&self, index: usize) -> usize {
        (index + 1) & (self.slots.len() - 1)
    }

    #[inline]
    fn prev(&self, index: usize) -> usize {
        index.wrapping_sub(1) & (self.slots.len() - 1)
    }

    /// Walks back from `home` to the unshifted slot that starts its cluster.
    fn find_cluster_start(&self, home: usize) -> usize {
        let mut index = home;
        while self.slots[index].is_shifted() {
            index = self.prev(index);
        }
        index
    }

    /// Locates the first slot of the run belonging to `home`.
    ///
    /// `home` must be marked occupied. For a run that does not exist yet this
    /// is the slot where it has to begin.
    fn find_run_start(&self, home: usize) -> usize {
        let mut bucket = self.find_cluster_start(home);
        let mut run = bucket;
        while bucket != home {
            // skip the run of `bucket`
            loop {
                run = self.next(run);
                if !self.slots[run].is_continuation() {
                    break;
                }
            }
            // advance to the next home that owns a run
            loop {
                bucket = self.next(bucket);
                if self.slots[bucket].is_occupied() {
                    break;
                }
            }
        }
        run
    }

    /// Returns the next occupied home after `home`.
    fn next_occupied(&self, home: usize) -> usize {
        let mut index = self.next(home);
        while !self.slots[index].is_occupied() {
            index = self.next(index);
        }
        index
    }

    /// Stores `entry` at `pos`, shifting every following entry of the
    /// cluster right by one until an empty slot absorbs the cascade.
    fn insert_entry(&mut self, pos: usize, entry: Entry) {
        let mut carry = entry;
        let mut index = pos;
        loop {
            let displaced = self.slots[index].entry();
            self.slots[index].put(carry);
            match displaced {
                None => return,
                Some(mut displaced) => {
                    displaced.shifted = true;
                    carry = displaced;
                    index = self.next(index);
                }
            }
        }
    }

    /// Removes the entry at `pos` of the run of `home`, pulling the rest of
    /// the cluster left by one.
    ///
    /// Entries stop moving at an empty slot or at an entry already in its
    /// home. Each moved run head is matched with its home, so its `shifted`
    /// flag is cleared once it lands there.
    fn remove_entry(&mut self, pos: usize, home: usize, was_head: bool) {
        let mut run_home = home;
        let mut promote = was_head;
        let mut index = pos;
        loop {
            let next = self.next(index);
            let Some(mut moved) = self.slots[next].entry().filter(|e| e.shifted) else {
                self.slots[index].clear_entry();
                return;
            };

            if !moved.continuation {
                run_home = self.next_occupied(run_home);
            } else if promote {
                // first remaining entry of the run becomes its head
                moved.continuation = false;
            }
            promote = false;
            moved.shifted = index != run_home;

            self.slots[index].put(moved);
            index = next;
        }
    }
}

impl MembershipFilter for QuotientFilter {
    fn contains(&self, key: u64) -> bool {
        QuotientFilter::contains(self, key)
    }

    fn byte_size(&self) -> usize {
        QuotientFilter::byte_size(self)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for creating [`QuotientFilter`] instances.
///
/// # Examples
///
/// ```
/// use amq::quotient::QuotientFilterBuilder;
///
/// let quotient_bits = QuotientFilterBuilder::suggest_quotient_bits(10_000, 0.75);
/// let filter = QuotientFilterBuilder::new(quotient_bits, 12)
///     .seed(7)
///     .max_load_factor(0.9)
///     .build()
///     .unwrap();
/// assert_eq!(filter.capacity(), 1 << 14);
/// ```
#[derive(Debug, Clone)]
pub struct QuotientFilterBuilder {
    quotient_bits: u32,
    remainder_bits: u32,
    seed: u64,
    max_load_factor: f64,
}

impl QuotientFilterBuilder {
    /// Creates a builder with the given address and remainder bit widths.
    pub fn new(quotient_bits: u32, remainder_bits: u32) -> Self {
        Self {
            quotient_bits,
            remainder_bits,
            seed: DEFAULT_SEED,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }

    /// Sets the hash seed (default: 0).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the load factor above which inserts fail (default: 0.95).
    pub fn max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    /// Builds the filter with a zeroed slot array.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] for out-of-range bit widths or a
    /// load factor ceiling outside (0, 1), and [`ErrorKind::OutOfMemory`] if
    /// the allocation fails.
    pub fn build(self) -> Result<QuotientFilter, Error> {
        if self.quotient_bits == 0 || self.quotient_bits > MAX_QUOTIENT_BITS {
            return Err(Error::invalid_argument(format!(
                "quotient_bits must be between 1 and {MAX_QUOTIENT_BITS}"
            ))
            .with_context("quotient_bits", self.quotient_bits));
        }
        if self.remainder_bits == 0 || self.remainder_bits > MAX_REMAINDER_BITS {
            return Err(Error::invalid_argument(format!(
                "remainder_bits must be between 1 and {MAX_REMAINDER_BITS}"
            ))
            .with_context("remainder_bits", self.remainder_bits));
        }
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(Error::invalid_argument(
                "max_load_factor must be between 0.0 and 1.0 (exclusive)",
            )
            .with_context("max_load_factor", self.max_load_factor));
        }

        let num_slots = usize::try_from(1u64 << self.quotient_bits).map_err(|_| {
            Error::invalid_argument("quotient filter too large")
                .with_context("quotient_bits", self.quotient_bits)
        })?;
        let slots = filled_vec("quotient filter slots", num_slots, Slot::default())?;
        debug!(
            "quotient filter: {} slots, {} remainder bits",
            num_slots, self.remainder_bits
        );

        Ok(QuotientFilter {
            seed: self.seed,
            quotient_bits: self.quotient_bits,
            remainder_bits: self.remainder_bits,
            max_load_factor: self.max_load_factor,
            len: 0,
            slots,
        })
    }

    /// Suggests the smallest quotient width whose table holds
    /// `expected_items` at `target_load`.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::quotient::QuotientFilterBuilder;
    ///
    /// assert_eq!(QuotientFilterBuilder::suggest_quotient_bits(768, 0.75), 10);
    /// assert_eq!(QuotientFilterBuilder::suggest_quotient_bits(769, 0.75), 11);
    /// ```
    pub fn suggest_quotient_bits(expected_items: u64, target_load: f64) -> u32 {
        let slots = (expected_items as f64 / target_load).ceil().max(2.0);
        slots.log2().ceil() as u32
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::collections::VecDeque;

    use super::*;
    use crate::hash::SplitMix64;

    impl QuotientFilter {
        /// Checks every layout invariant of the table.
        fn assert_well_formed(&self) {
            let n = self.slots.len();
            let empty = (0..n)
                .find(|&i| self.slots[i].is_empty())
                .expect("the table keeps at least one empty slot");

            let mut entries = 0;
            let mut pending_homes = VecDeque::new();
            let mut last_remainder = 0;
            for step in 1..=n {
                let index = (empty + step) % n;
                let slot = self.slots[index];
                if slot.is_occupied() {
                    pending_homes.push_back(index);
                }
                match slot.entry() {
                    None => {
                        assert!(
                            pending_homes.is_empty(),
                            "cluster ended before the runs of {pending_homes:?}"
                        );
                    }
                    Some(entry) => {
                        entries += 1;
                        if entry.continuation {
                            assert!(entry.shifted, "continuation at {index} is not shifted");
                            assert!(
                                entry.remainder > last_remainder,
                                "run is not sorted at {index}"
                            );
                        } else {
                            let home = pending_homes
                                .pop_front()
                                .unwrap_or_else(|| panic!("run head at {index} has no home"));
                            assert_eq!(entry.shifted, index != home, "shifted flag at {index}");
                        }
                        last_remainder = entry.remainder;
                    }
                }
            }
            assert_eq!(entries, self.len);
        }
    }

    /// Keys with pairwise distinct fingerprints, so the filter must agree
    /// exactly with a set of keys.
    fn distinct_fingerprint_keys(filter: &QuotientFilter, count: usize, seed: u64) -> Vec<u64> {
        let mut seen = HashSet::new();
        SplitMix64::seeded(seed)
            .filter(|&key| seen.insert(filter.split(key)))
            .take(count)
            .collect()
    }

    #[test]
    fn test_insert_query_delete() {
        let mut filter = QuotientFilter::new(6, 8).unwrap();
        filter.insert(10).unwrap();
        assert!(filter.contains(10));
        assert_eq!(filter.len(), 1);

        filter.delete(10).unwrap();
        assert!(!filter.contains(10));
        assert!(filter.is_empty());
        assert!(filter.slots.iter().all(|s| *s == Slot::default()));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut filter = QuotientFilter::new(6, 8).unwrap();
        filter.insert(10).unwrap();
        filter.insert(10).unwrap();
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_shared_home_forms_sorted_run() {
        let mut filter = QuotientFilter::new(4, 12).unwrap();
        let keys: Vec<u64> = distinct_fingerprint_keys(&filter, 2000, 1)
            .into_iter()
            .filter(|&k| filter.split(k).0 == 3)
            .take(5)
            .collect();
        assert_eq!(keys.len(), 5);

        for &key in &keys {
            filter.insert(key).unwrap();
            filter.assert_well_formed();
        }
        for &key in &keys {
            assert!(filter.contains(key));
        }
        let run: Vec<u16> = (3..8).map(|i| filter.slots[i].remainder()).collect();
        let mut sorted = run.clone();
        sorted.sort_unstable();
        assert_eq!(run, sorted);
    }

    #[test]
    fn test_runs_wrap_around_table_end() {
        let mut filter = QuotientFilter::new(3, 12).unwrap();
        let last = filter.capacity() - 1;
        let keys: Vec<u64> = distinct_fingerprint_keys(&filter, 4000, 2)
            .into_iter()
            .filter(|&k| filter.split(k).0 >= last - 1)
            .take(7)
            .collect();

        for &key in &keys {
            filter.insert(key).unwrap();
            filter.assert_well_formed();
        }
        assert!(filter.slots[0].is_shifted());
        for &key in &keys {
            assert!(filter.contains(key));
        }
        for &key in keys.iter().rev() {
            filter.delete(key).unwrap();
            filter.assert_well_formed();
            assert!(!filter.contains(key));
        }
        assert!(filter.slots.iter().all(|s| *s == Slot::default()));
    }

    #[test]
    fn test_delete_missing_key() {
        let mut filter = QuotientFilter::new(6, 8).unwrap();
        filter.insert(1).unwrap();
        let err = filter.delete(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_randomized_operations_agree_with_reference() {
        let mut filter = QuotientFilter::new(9, 10).unwrap();
        let pool = distinct_fingerprint_keys(&filter, 1200, 3);
        let mut reference = HashSet::new();
        let mut ops = SplitMix64::seeded(4);

        for round in 0..20_000 {
            let key = pool[(ops.next_u64() % pool.len() as u64) as usize];
            match ops.next_u64() % 4 {
                0 | 1 => match filter.insert(key) {
                    Ok(()) => {
                        reference.insert(key);
                    }
                    Err(err) => {
                        assert_eq!(err.kind(), ErrorKind::FilterFull);
                        assert!(!reference.contains(&key));
                    }
                },
                2 => {
                    let result = filter.delete(key);
                    assert_eq!(result.is_ok(), reference.remove(&key));
                }
                _ => assert_eq!(filter.contains(key), reference.contains(&key)),
            }
            assert_eq!(filter.len(), reference.len());

            if round % 500 == 0 {
                filter.assert_well_formed();
                for key in &pool {
                    assert_eq!(filter.contains(*key), reference.contains(key));
                }
            }
        }
    }

    #[test]
    fn test_fill_to_ceiling_then_drain() {
        let mut filter = QuotientFilter::new(8, 10).unwrap();
        let pool = distinct_fingerprint_keys(&filter, 400, 5);
        let ceiling = (0.95 * filter.capacity() as f64) as usize;

        let mut stored = Vec::new();
        for &key in &pool {
            match filter.insert(key) {
                Ok(()) => stored.push(key),
                Err(err) => {
                    assert_eq!(err.kind(), ErrorKind::FilterFull);
                    break;
                }
            }
        }
        assert_eq!(stored.len(), ceiling);
        assert!(filter.load_factor() <= 0.95);
        filter.assert_well_formed();

        let extra = pool[stored.len()];
        assert_eq!(filter.insert(extra).unwrap_err().kind(), ErrorKind::FilterFull);
        filter.assert_well_formed();
        for &key in &pool {
            assert_eq!(filter.contains(key), stored.contains(&key));
        }

        for &key in &stored {
            filter.delete(key).unwrap();
        }
        filter.assert_well_formed();
        assert!(filter.is_empty());
        assert!(filter.slots.iter().all(|s| *s == Slot::default()));
    }

    #[test]
    fn test_remainder_is_never_zero() {
        let filter = QuotientFilter::new(4, 1).unwrap();
        for key in 0..1000 {
            assert_ne!(filter.split(key).1, 0);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        for (q, r) in [(0, 8), (33, 8), (8, 0), (8, 17)] {
            let err = QuotientFilter::new(q, r).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        let err = QuotientFilter::builder(8, 8)
            .max_load_factor(1.0)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_byte_size() {
        let filter = QuotientFilter::new(10, 8).unwrap();
        assert_eq!(filter.byte_size(), 1024 * size_of::<Slot>());
    }
}
