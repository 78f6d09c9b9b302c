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

use std::io;

use crate::key::ScanRange;

/// A sorted key-value cursor provided by the underlying storage engine.
///
/// Keys are visited in ascending byte order. The skip-scan cursor only ever moves a
/// storage cursor forward, either by [`advance`](Self::advance) or by seeking to a
/// range that starts after the current key.
pub trait StorageCursor {
    /// Position at the first key in `range`.
    ///
    /// After a seek the cursor yields only keys within `range`.
    fn seek(&mut self, range: &ScanRange) -> Result<(), io::Error>;

    /// Move to the next key in the range last sought.
    fn advance(&mut self) -> Result<(), io::Error>;

    /// Whether the cursor is positioned at a key.
    fn has_current(&self) -> bool;

    /// The current key. Only valid if [`has_current`](Self::has_current) returns `true`.
    fn current_key(&self) -> &[u8];

    /// The current value. Only valid if [`has_current`](Self::has_current) returns `true`.
    fn current_value(&self) -> &[u8];

    /// Return an independent cursor over the same data.
    ///
    /// The position of the returned cursor is unspecified until it is sought.
    fn duplicate(&self) -> Self
    where Self: Sized;
}
