// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Utility functions for merging entry streams.

use crate::errors::ScanError;
use crate::Entry;

/// Comparator function for sorting entry results by key.
///
/// Returns `true` if `r1` should be placed before `r2` in the sorted order.
pub fn by_key(r1: &Result<Entry, ScanError>, r2: &Result<Entry, ScanError>) -> bool {
    match (r1, r2) {
        (Ok((k1, _)), Ok((k2, _))) => k1 <= k2,
        // If there is an error, just yield them in order.
        // It's the caller's responsibility to handle the error.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::key::CompositeKey;

    fn entry(k: &str) -> Result<Entry, ScanError> {
        Ok((CompositeKey::from(k), vec![]))
    }

    #[test]
    fn test_by_key() {
        assert!(by_key(&entry("a"), &entry("b")));
        assert!(!by_key(&entry("b"), &entry("a")));
        assert!(by_key(&entry("a"), &entry("a")));
    }

    #[test]
    fn test_by_key_with_errors() {
        let err = || -> Result<Entry, ScanError> {
            Err(io::Error::new(io::ErrorKind::Other, "test error").into())
        };

        assert!(by_key(&err(), &entry("a")));
        assert!(by_key(&entry("a"), &err()));
        assert!(by_key(&err(), &err()));
    }
}
