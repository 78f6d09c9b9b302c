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

use serde::Deserialize;
use serde::Serialize;

use crate::bound_merger::MergeMode;

/// Configuration of a skip-scan.
///
/// `seek_threshold` is read by the cursor. `transition_millis` only affects how the
/// range spec is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of consecutive out-of-range keys stepped over with `advance()` before the
    /// cursor computes a seek target (default: 10).
    ///
    /// Stepping is cheaper than seeking when matches are dense. `0` seeks on the first
    /// out-of-range key.
    pub seek_threshold: usize,

    /// Millisecond timestamp before which data was written with fully inclusive
    /// composite bounds (default: none).
    ///
    /// The cursor does not read it. It only selects the [`MergeMode`] returned by
    /// [`ScanConfig::merge_mode`], which the caller passes to `BoundMerger::new()` when
    /// building the `RangeSpec` of a scan.
    pub transition_millis: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            seek_threshold: 10,
            transition_millis: None,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of out-of-range keys stepped over before seeking
    pub fn seek_threshold(mut self, n: usize) -> Self {
        self.seek_threshold = n;
        self
    }

    /// Set the transition timestamp of the legacy fully-inclusive encoding
    pub fn transition_millis(mut self, millis: u64) -> Self {
        self.transition_millis = Some(millis);
        self
    }

    /// The merge mode for a scan whose time range starts at `scan_start_millis`.
    pub fn merge_mode(&self, scan_start_millis: u64) -> MergeMode {
        match self.transition_millis {
            Some(t) if scan_start_millis < t => MergeMode::FullyInclusive,
            _ => MergeMode::Standard,
        }
    }
}
