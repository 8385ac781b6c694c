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

use crate::common::filled_vec;
use crate::common::vec_with_capacity;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::xor::XorFilter;
use crate::xor::filter::fingerprint;
use crate::xor::filter::slot_hash;
use crate::xor::filter::slots;

const DEFAULT_FINGERPRINT_BITS: u32 = 8;
const DEFAULT_SEED: u64 = 0;
const DEFAULT_MAX_ATTEMPTS: u32 = 50;
const MAX_FINGERPRINT_BITS: u32 = 16;
const MIN_SLOTS: usize = 64;
const EXTRA_SLOTS: usize = 32;
const ATTEMPT_SEED_STEP: u64 = 0x9e37_79b9;

/// Builder for creating xor filters.
///
/// Duplicate keys are removed before construction.
///
/// # Examples
///
/// ```
/// use amq::xor::XorFilter;
///
/// let keys: Vec<u64> = (0..10_000).collect();
/// let filter = XorFilter::builder()
///     .fingerprint_bits(16)
///     .seed(42)
///     .max_attempts(25)
///     .build(&keys)
///     .unwrap();
///
/// assert!(filter.contains(9999));
/// assert_eq!(filter.fingerprint_bits(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct XorFilterBuilder {
    fingerprint_bits: u32,
    seed: u64,
    max_attempts: u32,
}

impl Default for XorFilterBuilder {
    fn default() -> Self {
        Self {
            fingerprint_bits: DEFAULT_FINGERPRINT_BITS,
            seed: DEFAULT_SEED,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl XorFilterBuilder {
    /// Sets the fingerprint width in bits (default: 8).
    ///
    /// The false positive rate is about `2^-fingerprint_bits`.
    pub fn fingerprint_bits(mut self, fingerprint_bits: u32) -> Self {
        self.fingerprint_bits = fingerprint_bits;
        self
    }

    /// Sets the base hash seed (default: 0).
    ///
    /// Attempt `t` hashes with `seed + t * 0x9e3779b9`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the maximum number of construction attempts (default: 50).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Builds a filter from the provided keys.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`] if the fingerprint width is
    /// outside `1..=16` or `max_attempts` is 0, [`ErrorKind::BuildFailed`] if
    /// no attempt could peel the key set, and [`ErrorKind::OutOfMemory`] if a
    /// buffer cannot be allocated.
    pub fn build(self, keys: &[u64]) -> Result<XorFilter, Error> {
        if self.fingerprint_bits == 0 || self.fingerprint_bits > MAX_FINGERPRINT_BITS {
            return Err(Error::invalid_argument(format!(
                "fingerprint_bits must be between 1 and {MAX_FINGERPRINT_BITS}"
            ))
            .with_context("fingerprint_bits", self.fingerprint_bits));
        }
        if self.max_attempts == 0 {
            return Err(Error::invalid_argument("max_attempts must be at least 1"));
        }

        let keys = distinct_keys(keys)?;
        if keys.len() > u32::MAX as usize {
            return Err(Error::invalid_argument("too many keys for an xor filter")
                .with_context("keys", keys.len()));
        }
        let num_slots = compute_num_slots(keys.len())?;
        debug!(
            "xor filter: {} keys, {} slots, {} bit fingerprints",
            keys.len(),
            num_slots,
            self.fingerprint_bits
        );

        let mut peeler = Peeler::new(keys.len(), num_slots)?;
        for attempt in 0..self.max_attempts {
            let seed = self
                .seed
                .wrapping_add(u64::from(attempt).wrapping_mul(ATTEMPT_SEED_STEP));
            if peeler.peel(&keys, seed) {
                let fingerprints = peeler.assign(self.fingerprint_bits)?;
                debug!("xor filter built on attempt {}", attempt + 1);
                return Ok(XorFilter::from_parts(
                    seed,
                    self.fingerprint_bits,
                    keys.len(),
                    fingerprints,
                ));
            }
            debug!(
                "xor filter attempt {} peeled {} of {} keys",
                attempt + 1,
                peeler.stack.len(),
                keys.len()
            );
        }

        warn!("xor filter construction failed after {} attempts", self.max_attempts);
        Err(Error::new(
            ErrorKind::BuildFailed,
            "failed to construct xor filter; no attempt peeled every key",
        )
        .with_context("attempts", self.max_attempts)
        .with_context("keys", keys.len()))
    }
}

/// Returns `m = ceil(1.30 * n) + 32`, at least 64.
fn compute_num_slots(num_keys: usize) -> Result<usize, Error> {
    num_keys
        .checked_mul(13)
        .map(|scaled| scaled.div_ceil(10))
        .and_then(|base| base.checked_add(EXTRA_SLOTS))
        .map(|m| m.max(MIN_SLOTS))
        .ok_or_else(|| {
            Error::invalid_argument("key set too large for an xor filter")
                .with_context("keys", num_keys)
        })
}

fn distinct_keys(keys: &[u64]) -> Result<Vec<u64>, Error> {
    let mut distinct = vec_with_capacity("xor keys", keys.len())?;
    distinct.extend_from_slice(keys);
    distinct.sort_unstable();
    distinct.dedup();
    Ok(distinct)
}

#[derive(Debug, Default, Clone, Copy)]
struct Node {
    degree: u32,
    // XOR of the indices of the keys hashed to this slot.
    xormask: u32,
}

/// Scratch space for peeling the 3-uniform hypergraph whose vertices are slots
/// and whose edges are keys. Buffers are reused across attempts.
struct Peeler {
    hashes: Vec<u64>,
    nodes: Vec<Node>,
    queue: Vec<usize>,
    // (slot, key index) in peel order.
    stack: Vec<(usize, u32)>,
}

impl Peeler {
    fn new(num_keys: usize, num_slots: usize) -> Result<Self, Error> {
        Ok(Self {
            hashes: vec_with_capacity("xor hashes", num_keys)?,
            nodes: filled_vec("xor nodes", num_slots, Node::default())?,
            queue: vec_with_capacity("xor peel queue", num_slots)?,
            stack: vec_with_capacity("xor peel stack", num_keys)?,
        })
    }

    /// Returns true if every key was peeled.
    fn peel(&mut self, keys: &[u64], seed: u64) -> bool {
        let m = self.nodes.len();
        self.hashes.clear();
        self.queue.clear();
        self.stack.clear();
        self.nodes.fill(Node::default());

        for (index, &key) in keys.iter().enumerate() {
            let h = slot_hash(key, seed);
            self.hashes.push(h);
            for slot in slots(h, m) {
                let node = &mut self.nodes[slot];
                node.degree += 1;
                node.xormask ^= index as u32;
            }
        }

        self.queue.extend(
            self.nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.degree == 1)
                .map(|(slot, _)| slot),
        );

        let mut head = 0;
        while head < self.queue.len() {
            let slot = self.queue[head];
            head += 1;
            if self.nodes[slot].degree != 1 {
                continue;
            }
            let index = self.nodes[slot].xormask;
            self.stack.push((slot, index));

            for other in slots(self.hashes[index as usize], m) {
                let node = &mut self.nodes[other];
                node.degree -= 1;
                node.xormask ^= index;
                if node.degree == 1 {
                    self.queue.push(other);
                }
            }
        }

        self.stack.len() == keys.len()
    }

    /// Assigns fingerprints in reverse peel order after a successful peel.
    fn assign(&self, fingerprint_bits: u32) -> Result<Vec<u16>, Error> {
        let m = self.nodes.len();
        let mut fingerprints = filled_vec("xor fingerprints", m, 0u16)?;
        for &(slot, index) in self.stack.iter().rev() {
            let h = self.hashes[index as usize];
            let [h0, h1, h2] = slots(h, m);
            // The peeled slot is still zero, so this XORs the other two.
            fingerprints[slot] = fingerprint(h, fingerprint_bits)
                ^ fingerprints[h0]
                ^ fingerprints[h1]
                ^ fingerprints[h2];
        }
        Ok(fingerprints)
    }
}
