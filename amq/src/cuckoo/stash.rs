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

/// Overflow storage for keys the table could not place.
///
/// Entries keep the raw key: a stashed item has no deterministic bucket, so
/// lookups compare keys exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Stash {
    capacity: usize,
    entries: Vec<StashEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct StashEntry {
    pub(super) key: u64,
    pub(super) fingerprint: u32,
}

impl Stash {
    pub(super) fn new(entries: Vec<StashEntry>, capacity: usize) -> Self {
        debug_assert!(entries.is_empty());
        Self { capacity, entries }
    }

    pub(super) fn push(&mut self, key: u64, fingerprint: u32) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push(StashEntry { key, fingerprint });
        true
    }

    pub(super) fn contains_key(&self, key: u64) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub(super) fn remove_key(&mut self, key: u64) -> bool {
        match self.entries.iter().position(|entry| entry.key == key) {
            Some(index) => {
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub(super) fn entries(&self) -> &[StashEntry] {
        &self.entries
    }

    pub(super) fn swap_remove(&mut self, index: usize) -> StashEntry {
        self.entries.swap_remove(index)
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stash_capacity() {
        let mut stash = Stash::new(Vec::with_capacity(2), 2);
        assert!(stash.push(1, 10));
        assert!(stash.push(2, 20));
        assert!(!stash.push(3, 30));
        assert!(stash.contains_key(2));
        assert!(!stash.contains_key(3));

        assert!(stash.remove_key(1));
        assert!(!stash.remove_key(1));
        assert_eq!(stash.len(), 1);
        assert_eq!(stash.entries()[0].key, 2);
    }

    #[test]
    fn test_disabled_stash() {
        let mut stash = Stash::new(Vec::new(), 0);
        assert!(!stash.push(1, 10));
        assert_eq!(stash.len(), 0);
    }
}
