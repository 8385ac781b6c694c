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

/// Number of fingerprint slots per bucket.
pub const BUCKET_SIZE: usize = 4;

const EMPTY: u32 = 0;

/// A group of fingerprint slots. A zero fingerprint marks a free slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct Bucket {
    slots: [u32; BUCKET_SIZE],
}

impl Bucket {
    pub(super) fn contains(&self, fingerprint: u32) -> bool {
        self.slots.contains(&fingerprint)
    }

    /// Stores `fingerprint` in the first free slot and returns that slot.
    pub(super) fn try_insert(&mut self, fingerprint: u32) -> Option<usize> {
        let slot = self.slots.iter().position(|&fp| fp == EMPTY)?;
        self.slots[slot] = fingerprint;
        Some(slot)
    }

    /// Frees one slot holding `fingerprint`.
    pub(super) fn remove(&mut self, fingerprint: u32) -> bool {
        match self.slots.iter().position(|&fp| fp == fingerprint) {
            Some(slot) => {
                self.slots[slot] = EMPTY;
                true
            }
            None => false,
        }
    }

    /// Replaces the fingerprint in `slot`, returning the previous one.
    pub(super) fn swap(&mut self, slot: usize, fingerprint: u32) -> u32 {
        std::mem::replace(&mut self.slots[slot], fingerprint)
    }

    pub(super) fn len(&self) -> usize {
        self.slots.iter().filter(|&&fp| fp != EMPTY).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_fills_up() {
        let mut bucket = Bucket::default();
        for fp in 1..=BUCKET_SIZE as u32 {
            assert_eq!(bucket.try_insert(fp), Some(fp as usize - 1));
        }
        assert_eq!(bucket.try_insert(99), None);
        assert_eq!(bucket.len(), BUCKET_SIZE);

        assert!(bucket.remove(2));
        assert!(!bucket.remove(2));
        assert_eq!(bucket.try_insert(99), Some(1));
        assert!(bucket.contains(99));
    }

    #[test]
    fn test_swap_returns_previous() {
        let mut bucket = Bucket::default();
        bucket.try_insert(5);
        assert_eq!(bucket.swap(0, 6), 5);
        assert_eq!(bucket.swap(0, 5), 6);
    }
}
