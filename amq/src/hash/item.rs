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

use std::hash::Hash;

/// Seed used by [`item_key`].
pub const DEFAULT_ITEM_SEED: u32 = 9001;

/// Derives a 64-bit filter key from any hashable item with MurmurHash3.
///
/// # Examples
///
/// ```
/// use amq::hash::item_key;
///
/// assert_eq!(item_key("apple"), item_key("apple"));
/// assert_ne!(item_key("apple"), item_key("grape"));
/// ```
pub fn item_key<T: Hash + ?Sized>(item: &T) -> u64 {
    item_key_with_seed(item, DEFAULT_ITEM_SEED)
}

/// Same as [`item_key`] with an explicit MurmurHash3 seed.
pub fn item_key_with_seed<T: Hash + ?Sized>(item: &T, seed: u32) -> u64 {
    let mut hasher = mur3::Hasher128::with_seed(seed);
    item.hash(&mut hasher);
    let (lo, _hi) = hasher.finish128();
    lo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_key_depends_on_seed() {
        let a = item_key_with_seed(&[1u8, 2, 3], 1);
        let b = item_key_with_seed(&[1u8, 2, 3], 2);
        assert_ne!(a, b);
        assert_eq!(a, item_key_with_seed(&[1u8, 2, 3], 1));
    }

    #[test]
    fn test_item_key_for_strings() {
        let keys: Vec<u64> = (0..100).map(|i| item_key(&format!("value_{i}"))).collect();
        let mut dedup = keys.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), keys.len());
    }
}
