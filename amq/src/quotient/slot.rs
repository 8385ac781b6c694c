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

const OCCUPIED: u8 = 0b001;
const CONTINUATION: u8 = 0b010;
const SHIFTED: u8 = 0b100;

/// The movable part of a slot: a remainder together with its position flags.
///
/// `occupied` is not part of an entry because it describes the slot as a
/// home address, not the remainder stored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Entry {
    pub(super) remainder: u16,
    pub(super) continuation: bool,
    pub(super) shifted: bool,
}

/// One slot of the table. A remainder of 0 marks the slot as holding no entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct Slot {
    flags: u8,
    remainder: u16,
}

impl Slot {
    pub(super) fn is_occupied(&self) -> bool {
        self.flags & OCCUPIED != 0
    }

    pub(super) fn set_occupied(&mut self, occupied: bool) {
        self.set_flag(OCCUPIED, occupied);
    }

    pub(super) fn is_continuation(&self) -> bool {
        self.flags & CONTINUATION != 0
    }

    pub(super) fn set_continuation(&mut self, continuation: bool) {
        self.set_flag(CONTINUATION, continuation);
    }

    pub(super) fn is_shifted(&self) -> bool {
        self.flags & SHIFTED != 0
    }

    pub(super) fn is_empty(&self) -> bool {
        self.remainder == 0
    }

    pub(super) fn remainder(&self) -> u16 {
        self.remainder
    }

    pub(super) fn entry(&self) -> Option<Entry> {
        if self.is_empty() {
            return None;
        }
        Some(Entry {
            remainder: self.remainder,
            continuation: self.is_continuation(),
            shifted: self.is_shifted(),
        })
    }

    /// Stores `entry`, leaving the `occupied` flag untouched.
    pub(super) fn put(&mut self, entry: Entry) {
        debug_assert_ne!(entry.remainder, 0);
        self.remainder = entry.remainder;
        self.set_flag(CONTINUATION, entry.continuation);
        self.set_flag(SHIFTED, entry.shifted);
    }

    /// Removes the entry, leaving the `occupied` flag untouched.
    pub(super) fn clear_entry(&mut self) {
        self.remainder = 0;
        self.flags &= OCCUPIED;
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }
}
