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

//! Composite keys and the contiguous key range handed to storage.

use std::fmt;
use std::ops::Bound;
use std::ops::RangeBounds;

use crate::bound_codec::SEPARATOR;
use crate::errors::ScanError;

/// Several field values joined by [`SEPARATOR`] into one physical key.
///
/// Ordering is code-point ordering of the joined string, which is the same as the
/// byte ordering of its UTF-8 encoding, i.e., the order the storage sorts keys in.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Build a key from already encoded field values.
    ///
    /// A value containing [`SEPARATOR`] would corrupt field boundaries; this is a caller bug.
    pub fn from_fields<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut s = String::new();
        for (i, v) in values.into_iter().enumerate() {
            let v = v.as_ref();
            debug_assert!(!v.contains(SEPARATOR), "field value contains separator: {:?}", v);

            if i > 0 {
                s.push(SEPARATOR);
            }
            s.push_str(v);
        }
        Self(s)
    }

    /// Decode a storage key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScanError> {
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(Self(s.to_string())),
            Err(_) => Err(ScanError::InvalidKeyEncoding {
                key: bytes.to_vec(),
            }),
        }
    }

    /// Split into field values.
    ///
    /// A key written before a field was added has fewer values than the field list;
    /// the missing trailing fields are simply absent.
    pub fn fields(&self) -> Vec<&str> {
        self.0.split(SEPARATOR).collect()
    }

    /// The shortest leading part of this key, in whole fields, that sorts after `other`.
    ///
    /// A key sorts before every key that extends it with more fields.
    pub fn shortest_prefix_after(&self, other: &CompositeKey) -> Option<CompositeKey> {
        let fields = self.fields();
        (1..=fields.len())
            .map(|n| CompositeKey::from_fields(&fields[..n]))
            .find(|prefix| prefix > other)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for CompositeKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CompositeKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for CompositeKey {
    /// Display fields joined with `|`, since the separator itself is not printable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.fields().iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// The single contiguous key range a storage cursor is positioned over.
///
/// Only the first field's bound is guaranteed to be precise at this level: a linear
/// range can not encode several dimensions. Bounds of later fields are enforced by
/// the skip-scan cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    pub start: Bound<CompositeKey>,
    pub end: Bound<CompositeKey>,
}

impl ScanRange {
    pub fn new(start: Bound<CompositeKey>, end: Bound<CompositeKey>) -> Self {
        Self { start, end }
    }

    pub fn full() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// Whether `key` is before the end of this range.
    pub fn is_before_end(&self, key: &CompositeKey) -> bool {
        match &self.end {
            Bound::Included(end) => key <= end,
            Bound::Excluded(end) => key < end,
            Bound::Unbounded => true,
        }
    }

    /// The part of this range starting at `key`, sharing the end.
    pub fn starting_at(&self, key: CompositeKey) -> Self {
        Self::new(Bound::Included(key), self.end.clone())
    }

    /// The part of this range strictly after `key`, sharing the end.
    pub fn starting_after(&self, key: CompositeKey) -> Self {
        Self::new(Bound::Excluded(key), self.end.clone())
    }

    /// Split into `[start, at)` and `[at, end)` for scanning in parallel.
    ///
    /// Returns `None` if `at` is not inside this range.
    pub fn split_at(&self, at: CompositeKey) -> Option<(Self, Self)> {
        if !self.contains(&at) {
            return None;
        }

        let left = Self::new(self.start.clone(), Bound::Excluded(at.clone()));
        let right = self.starting_at(at);
        Some((left, right))
    }
}

impl RangeBounds<CompositeKey> for ScanRange {
    fn start_bound(&self) -> Bound<&CompositeKey> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&CompositeKey> {
        self.end.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_from_fields_and_back() {
        let k = CompositeKey::from_fields(["05", "ff"]);
        assert_eq!(k.as_str(), "05\u{10FFFF}ff");
        assert_eq!(k.fields(), vec!["05", "ff"]);
        assert_eq!(k.to_string(), "05|ff");
    }

    #[test]
    fn test_shortest_prefix_after() {
        let target = CompositeKey::from_fields(["06", "00", "10"]);
        let after = |fields: &[&str]| {
            target
                .shortest_prefix_after(&CompositeKey::from_fields(fields))
                .map(|k| k.to_string())
        };

        assert_eq!(after(&["05", "ff"]), Some("06".to_string()));
        assert_eq!(after(&["06"]), Some("06|00".to_string()));
        assert_eq!(after(&["06", "00", "0f"]), Some("06|00|10".to_string()));
        assert_eq!(after(&["06", "00", "10"]), None);
    }

    #[test]
    fn test_short_key_has_fewer_fields() {
        let k = CompositeKey::from("05");
        assert_eq!(k.fields(), vec!["05"]);
    }

    #[test]
    fn test_separator_sorts_after_data() {
        // A longer value sorts before the shorter value it extends when more fields follow.
        let short = CompositeKey::from_fields(["abc", "x"]);
        let long = CompositeKey::from_fields(["abcd", "x"]);
        assert!(long < short);

        // Without trailing fields a key sorts before every key extending it.
        assert!(CompositeKey::from("abc") < short);
    }

    #[test]
    fn test_from_bytes() {
        let k = CompositeKey::from_bytes("a\u{10FFFF}b".as_bytes()).unwrap();
        assert_eq!(k.fields(), vec!["a", "b"]);

        let err = CompositeKey::from_bytes(&[0x61, 0xff]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidKeyEncoding { .. }));
    }

    #[test]
    fn test_is_before_end() {
        let r = ScanRange::new(Bound::Unbounded, Bound::Excluded(CompositeKey::from("m")));
        assert!(r.is_before_end(&CompositeKey::from("l")));
        assert!(!r.is_before_end(&CompositeKey::from("m")));

        let r = ScanRange::new(Bound::Unbounded, Bound::Included(CompositeKey::from("m")));
        assert!(r.is_before_end(&CompositeKey::from("m")));
        assert!(!r.is_before_end(&CompositeKey::from("m\u{0}")));

        assert!(ScanRange::full().is_before_end(&CompositeKey::from("\u{10FFFE}")));
    }

    #[test]
    fn test_split_at() {
        let r = ScanRange::new(
            Bound::Included(CompositeKey::from("b")),
            Bound::Excluded(CompositeKey::from("y")),
        );

        let (left, right) = r.split_at(CompositeKey::from("m")).unwrap();
        assert_eq!(
            left,
            ScanRange::new(
                Bound::Included(CompositeKey::from("b")),
                Bound::Excluded(CompositeKey::from("m"))
            )
        );
        assert_eq!(
            right,
            ScanRange::new(
                Bound::Included(CompositeKey::from("m")),
                Bound::Excluded(CompositeKey::from("y"))
            )
        );

        assert!(r.split_at(CompositeKey::from("a")).is_none());
        assert!(r.split_at(CompositeKey::from("y")).is_none());
    }
}
