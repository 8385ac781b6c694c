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

/// Operations shared by every filter in this crate.
///
/// Lets callers such as benchmark drivers and capacity planners work with any
/// filter through a single interface.
pub trait MembershipFilter {
    /// Returns `true` if `key` is possibly in the set, `false` if it is
    /// definitely not.
    fn contains(&self, key: u64) -> bool;

    /// Returns the memory held by the filter's tables, in bytes.
    fn byte_size(&self) -> usize;

    /// Returns the fraction of `probes` reported as present.
    ///
    /// With probes disjoint from the stored keys this is the empirical false
    /// positive rate.
    ///
    /// # Examples
    ///
    /// ```
    /// use amq::MembershipFilter;
    /// use amq::bloom::BlockedBloomFilter;
    ///
    /// let mut filter = BlockedBloomFilter::new(1_000, 0.01).unwrap();
    /// for key in 0..1_000 {
    ///     filter.insert(key);
    /// }
    /// let fpr = filter.measured_fpr(1_000_000..1_100_000);
    /// assert!(fpr < 0.05);
    /// ```
    fn measured_fpr<I>(&self, probes: I) -> f64
    where
        I: IntoIterator<Item = u64>,
        Self: Sized,
    {
        let mut total = 0u64;
        let mut hits = 0u64;
        for key in probes {
            total += 1;
            if self.contains(key) {
                hits += 1;
            }
        }
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Returns the storage cost in bits per stored key.
    fn bits_per_key(&self, num_keys: usize) -> f64 {
        if num_keys == 0 {
            return 0.0;
        }
        (self.byte_size() * 8) as f64 / num_keys as f64
    }
}
