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

use crate::error::Error;

/// Allocates a vector of `len` copies of `value`, reporting allocator
/// exhaustion as [`ErrorKind::OutOfMemory`](crate::error::ErrorKind::OutOfMemory)
/// instead of aborting.
pub(crate) fn filled_vec<T: Clone>(
    what: &'static str,
    len: usize,
    value: T,
) -> Result<Vec<T>, Error> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)
        .map_err(|err| Error::out_of_memory(what, len, err))?;
    vec.resize(len, value);
    Ok(vec)
}

/// Allocates an empty vector that can hold `len` items without reallocating.
pub(crate) fn vec_with_capacity<T>(what: &'static str, len: usize) -> Result<Vec<T>, Error> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)
        .map_err(|err| Error::out_of_memory(what, len, err))?;
    Ok(vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_filled_vec() {
        let vec = filled_vec("words", 16, 0u64).unwrap();
        assert_eq!(vec.len(), 16);
        assert!(vec.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_filled_vec_exhausted() {
        let err = filled_vec("words", usize::MAX, 0u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    }
}
