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

//! Provides a simple in-memory sorted store and its [`StorageCursor`].
//!
//! The [`MemStore`] keeps keys in a [`BTreeMap`] and counts the seeks and advances issued
//! by its cursors. It's primarily intended for testing and demonstration purposes.

use std::collections::BTreeMap;
use std::io;
use std::ops::Bound;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::warn;

use crate::cursor::StorageCursor;
use crate::key::CompositeKey;
use crate::key::ScanRange;

type Data = BTreeMap<Vec<u8>, Vec<u8>>;

/// Seeks and advances issued by all cursors of one [`MemStore`].
#[derive(Debug, Default)]
pub struct AccessStats {
    seeks: AtomicU64,
    advances: AtomicU64,
}

impl AccessStats {
    pub fn seeks(&self) -> u64 {
        self.seeks.load(Ordering::Relaxed)
    }

    pub fn advances(&self) -> u64 {
        self.advances.load(Ordering::Relaxed)
    }
}

/// A sorted in-memory key-value store.
///
/// # Examples
///
/// ```
/// use skip_scan::impls::mem_store::MemStore;
/// use skip_scan::StorageCursor;
/// use skip_scan::ScanRange;
///
/// let mut store = MemStore::new();
/// store.insert(b"a".to_vec(), b"1".to_vec());
///
/// let mut cursor = store.cursor();
/// cursor.seek(&ScanRange::full()).unwrap();
/// assert_eq!(cursor.current_key(), b"a");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    data: Arc<Data>,
    stats: Arc<AccessStats>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, replacing its value if it exists.
    ///
    /// Cursors created before the insert keep seeing the previous snapshot.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        Arc::make_mut(&mut self.data).insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn stats(&self) -> &AccessStats {
        &self.stats
    }

    /// Create an unpositioned cursor over the current snapshot.
    pub fn cursor(&self) -> MemCursor {
        MemCursor {
            data: self.data.clone(),
            stats: self.stats.clone(),
            end: Bound::Unbounded,
            current: None,
        }
    }
}

/// A [`StorageCursor`] over a [`MemStore`] snapshot.
#[derive(Debug, Clone)]
pub struct MemCursor {
    data: Arc<Data>,
    stats: Arc<AccessStats>,

    /// End of the range last sought.
    end: Bound<Vec<u8>>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl MemCursor {
    fn first_in(&self, start: Bound<Vec<u8>>) -> Option<(Vec<u8>, Vec<u8>)> {
        let end = self.end.clone();
        if is_empty_range(&start, &end) {
            return None;
        }

        self.data
            .range((start, end))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl StorageCursor for MemCursor {
    fn seek(&mut self, range: &ScanRange) -> Result<(), io::Error> {
        self.stats.seeks.fetch_add(1, Ordering::Relaxed);

        self.end = to_bytes(&range.end);
        self.current = self.first_in(to_bytes(&range.start));
        Ok(())
    }

    fn advance(&mut self) -> Result<(), io::Error> {
        let Some((key, _)) = self.current.take() else {
            warn!("MemCursor::advance() called on an unpositioned cursor");
            return Ok(());
        };

        self.stats.advances.fetch_add(1, Ordering::Relaxed);

        self.current = self.first_in(Bound::Excluded(key));
        Ok(())
    }

    fn has_current(&self) -> bool {
        self.current.is_some()
    }

    fn current_key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| k.as_slice()).unwrap_or_default()
    }

    fn current_value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| v.as_slice()).unwrap_or_default()
    }

    fn duplicate(&self) -> Self {
        Self {
            data: self.data.clone(),
            stats: self.stats.clone(),
            end: Bound::Unbounded,
            current: None,
        }
    }
}

fn to_bytes(b: &Bound<CompositeKey>) -> Bound<Vec<u8>> {
    match b {
        Bound::Included(k) => Bound::Included(k.as_bytes().to_vec()),
        Bound::Excluded(k) => Bound::Excluded(k.as_bytes().to_vec()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// `BTreeMap::range()` panics on these instead of returning nothing.
fn is_empty_range(start: &Bound<Vec<u8>>, end: &Bound<Vec<u8>>) -> bool {
    match (start, end) {
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s) | Bound::Excluded(s), Bound::Included(e) | Bound::Excluded(e)) => {
            s >= e
        }
        _ => false,
    }
}
