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

//! A cursor yielding only the keys of a [`RangeSpec`], skipping over gaps by seeking.

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use log::debug;
use log::trace;
use log::warn;

use crate::bounds_checker::is_in_range;
use crate::config::ScanConfig;
use crate::cursor::StorageCursor;
use crate::errors::ScanError;
use crate::key::CompositeKey;
use crate::key::ScanRange;
use crate::range_spec::RangeSpec;
use crate::seek_advancer::next_probe;
use crate::seek_advancer::Probe;
use crate::Entry;
use crate::EntryStream;

/// Lifecycle of a [`SkipScanCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Not positioned at an in-range key yet.
    Seeking,

    /// Positioned at an in-range key.
    Positioned,

    /// No more keys: the storage range is consumed, no later key can match, or the scan
    /// failed.
    Exhausted,
}

/// Drives a [`StorageCursor`] over the keys that satisfy every field bound of a
/// [`RangeSpec`].
///
/// The storage cursor only sees the merged composite [`ScanRange`]. Keys inside it that
/// violate a later field's bound are either stepped over, or, after
/// [`ScanConfig::seek_threshold`] consecutive misses, skipped with a seek to the next key
/// that could match.
///
/// Keys are yielded in non-decreasing order and never revisited.
pub struct SkipScanCursor<C> {
    spec: Arc<RangeSpec>,
    storage: C,
    config: ScanConfig,

    /// The range last sought; `None` before the first seek.
    range: Option<ScanRange>,
    state: CursorState,
    current: Option<Entry>,

    /// The storage cursor was duplicated and has to be re-positioned after `current`.
    reseek_pending: bool,
    seeks: u64,

    /// An error met while advancing inside `Iterator::next()`, returned by the next call.
    deferred_error: Option<ScanError>,
}

impl<C> fmt::Debug for SkipScanCursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipScanCursor")
            .field("attribute", &self.spec.attribute())
            .field("range", &self.range)
            .field("state", &self.state)
            .field("current", &self.current.as_ref().map(|(k, _)| k.to_string()))
            .field("seeks", &self.seeks)
            .finish()
    }
}

impl<C> SkipScanCursor<C>
where C: StorageCursor
{
    pub fn new(spec: Arc<RangeSpec>, storage: C) -> Self {
        Self::with_config(spec, storage, ScanConfig::default())
    }

    pub fn with_config(spec: Arc<RangeSpec>, storage: C, config: ScanConfig) -> Self {
        Self {
            spec,
            storage,
            config,
            range: None,
            state: CursorState::Seeking,
            current: None,
            reseek_pending: false,
            seeks: 0,
            deferred_error: None,
        }
    }

    /// Position at the first in-range key of `range`.
    ///
    /// `range` is usually [`RangeSpec::scan_range`] or a part of it.
    pub fn seek(&mut self, range: &ScanRange) -> Result<(), ScanError> {
        self.range = Some(range.clone());
        self.state = CursorState::Seeking;
        self.current = None;
        self.reseek_pending = false;

        let res = self.seek_storage(range).and_then(|_| self.find_in_range());
        self.fail_closed(res)
    }

    /// Position at the first in-range key of the whole composite scan range.
    pub fn seek_all(&mut self) -> Result<(), ScanError> {
        let range = self.spec.scan_range().clone();
        self.seek(&range)
    }

    /// Move to the next in-range key.
    ///
    /// Does nothing if the cursor is exhausted.
    pub fn advance(&mut self) -> Result<(), ScanError> {
        if self.state == CursorState::Exhausted {
            return Ok(());
        }

        let res = self.advance_storage().and_then(|_| {
            if self.state == CursorState::Exhausted {
                return Ok(());
            }
            self.find_in_range()
        });
        self.fail_closed(res)
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn has_current(&self) -> bool {
        self.state == CursorState::Positioned
    }

    /// The current in-range entry, if positioned.
    pub fn current(&self) -> Option<&Entry> {
        self.current.as_ref()
    }

    /// Number of seeks issued to the storage cursor, including the initial one.
    pub fn seek_count(&self) -> u64 {
        self.seeks
    }

    pub fn spec(&self) -> &Arc<RangeSpec> {
        &self.spec
    }

    /// Return an independent cursor at the same position.
    ///
    /// The copy shares the range spec, and re-positions its own storage cursor right
    /// after the current key on its first advance.
    pub fn duplicate(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            storage: self.storage.duplicate(),
            config: self.config.clone(),
            range: self.range.clone(),
            state: self.state,
            current: self.current.clone(),
            reseek_pending: self.state == CursorState::Positioned,
            seeks: 0,
            deferred_error: None,
        }
    }

    /// Convert into a stream of in-range entries, starting with the current entry.
    ///
    /// An unpositioned cursor seeks the whole composite scan range first.
    pub fn into_stream(self) -> EntryStream
    where C: Send + 'static {
        futures::stream::iter(self).boxed()
    }

    fn seek_storage(&mut self, range: &ScanRange) -> Result<(), ScanError> {
        self.storage.seek(range)?;
        self.seeks += 1;
        Ok(())
    }

    fn advance_storage(&mut self) -> Result<(), ScanError> {
        if !self.reseek_pending {
            self.storage.advance()?;
            return Ok(());
        }

        self.reseek_pending = false;

        let after = match (&self.range, &self.current) {
            (Some(range), Some((key, _))) => range.starting_after(key.clone()),
            _ => {
                self.exhaust();
                return Ok(());
            }
        };
        self.seek_storage(&after)
    }

    /// Move the storage cursor forward until it is at an in-range key or no such key
    /// remains.
    fn find_in_range(&mut self) -> Result<(), ScanError> {
        let mut misses = 0;

        // The last seek target. Only a leading part of it can be in range before it.
        let mut target: Option<CompositeKey> = None;

        loop {
            if !self.storage.has_current() {
                self.exhaust();
                return Ok(());
            }

            let key = CompositeKey::from_bytes(self.storage.current_key())?;

            if is_in_range(&key, &self.spec) {
                let value = self.storage.current_value().to_vec();
                self.current = Some((key, value));
                self.state = CursorState::Positioned;
                return Ok(());
            }

            if let Some(t) = target.take().filter(|t| key < *t) {
                if !self.skip_to(&key, &t)? {
                    return Ok(());
                }
                target = Some(t);
                continue;
            }

            if misses < self.config.seek_threshold {
                misses += 1;
                self.storage.advance()?;
                continue;
            }
            misses = 0;

            let probe = next_probe(&key, &self.spec).inspect_err(|e| {
                warn!(
                    "{}: can not compute seek target after {}: {}",
                    self.spec.attribute(),
                    key,
                    e
                );
            })?;

            match probe {
                Probe::Seek(t) => {
                    if !self.skip_to(&key, &t)? {
                        return Ok(());
                    }
                    target = Some(t);
                }
                Probe::Exhausted => {
                    debug!("{}: no key after {} can match", self.spec.attribute(), key);
                    self.exhaust();
                    return Ok(());
                }
                Probe::Step => {
                    self.storage.advance()?;
                }
            }
        }
    }

    /// Seek to the shortest leading part of `target` that sorts after `key`.
    ///
    /// A key with fewer fields than `target` sorts before it and may be in range. Returns
    /// `false` and exhausts the cursor if that part is beyond the scan range.
    fn skip_to(&mut self, key: &CompositeKey, target: &CompositeKey) -> Result<bool, ScanError> {
        let next = target
            .shortest_prefix_after(key)
            .unwrap_or_else(|| target.clone());

        let range = self
            .range
            .as_ref()
            .filter(|r| r.is_before_end(&next))
            .map(|r| r.starting_at(next.clone()));

        let Some(range) = range else {
            debug!(
                "{}: seek target {} is beyond the scan range",
                self.spec.attribute(),
                next
            );
            self.exhaust();
            return Ok(false);
        };

        trace!("{}: re-seek from {} to {}", self.spec.attribute(), key, next);
        self.seek_storage(&range)?;
        Ok(true)
    }

    fn exhaust(&mut self) {
        if self.state != CursorState::Exhausted {
            debug!(
                "{}: skip-scan exhausted after {} seeks",
                self.spec.attribute(),
                self.seeks
            );
        }
        self.state = CursorState::Exhausted;
        self.current = None;
    }

    /// A failed scan does not yield any more keys.
    fn fail_closed(&mut self, res: Result<(), ScanError>) -> Result<(), ScanError> {
        if res.is_err() {
            self.exhaust();
        }
        res
    }
}

impl<C> Iterator for SkipScanCursor<C>
where C: StorageCursor
{
    type Item = Result<Entry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.deferred_error.take() {
            return Some(Err(e));
        }

        if self.state == CursorState::Seeking && self.range.is_none() {
            if let Err(e) = self.seek_all() {
                return Some(Err(e));
            }
        }

        if self.state != CursorState::Positioned {
            return None;
        }

        let entry = self.current.clone()?;

        if let Err(e) = self.advance() {
            self.deferred_error = Some(e);
        }

        Some(Ok(entry))
    }
}
