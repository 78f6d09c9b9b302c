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

//! Run one skip-scan as several sub-scans and merge their output.

use std::sync::Arc;

use futures_util::StreamExt;
use stream_more::KMerge;

use crate::cursor::SkipScanCursor;
use crate::cursor::StorageCursor;
use crate::key::CompositeKey;
use crate::key::ScanRange;
use crate::range_spec::RangeSpec;
use crate::util;
use crate::EntryStream;

/// Merge key-ordered entry streams into one key-ordered stream.
///
/// Errors are passed through in the position they are met.
pub fn merge_sorted(streams: impl IntoIterator<Item = EntryStream>) -> EntryStream {
    let mut kmerge = KMerge::by(util::by_key);

    for strm in streams {
        kmerge = kmerge.merge(strm);
    }

    kmerge.boxed()
}

/// Split the composite scan range of `spec` at `split_points` and return one stream per
/// part, each driven by a duplicate of `storage`.
///
/// Split points outside the range, or not in ascending order, are ignored.
pub fn split_scan<C>(
    spec: Arc<RangeSpec>,
    storage: &C,
    split_points: impl IntoIterator<Item = CompositeKey>,
) -> Vec<EntryStream>
where
    C: StorageCursor + Send + 'static,
{
    let mut parts: Vec<ScanRange> = vec![];
    let mut rest = spec.scan_range().clone();

    for at in split_points {
        if let Some((left, right)) = rest.split_at(at) {
            parts.push(left);
            rest = right;
        }
    }
    parts.push(rest);

    parts
        .into_iter()
        .map(|range| sub_scan(spec.clone(), storage.duplicate(), range))
        .collect()
}

fn sub_scan<C>(spec: Arc<RangeSpec>, storage: C, range: ScanRange) -> EntryStream
where C: StorageCursor + Send + 'static {
    let mut cursor = SkipScanCursor::new(spec, storage);

    match cursor.seek(&range) {
        Ok(()) => cursor.into_stream(),
        Err(e) => futures::stream::iter([Err(e)]).boxed(),
    }
}
