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

//! # Skip Scan
//!
//! Multi-dimensional range scans over composite keys in a sorted key-value store.
//!
//! A composite key joins the values of several fields with a separator that sorts after
//! every data character. A sorted store can only bound such keys by one contiguous
//! range, which is precise for the first field only. The skip-scan cursor walks that
//! range, rejects keys that violate a later field's bound, and seeks over runs of such
//! keys instead of visiting them one by one.
//!
//! ## Core Components
//!
//! - [`build_range_spec`]: Merge per-field constraints into a [`RangeSpec`]
//! - [`RangeSpec`]: Per-field bounds and the merged composite [`ScanRange`]
//! - [`SkipScanCursor`]: Drives a [`StorageCursor`] over the in-range keys
//! - [`bound_codec`]: Fail-closed increment and decrement of bound strings
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use skip_scan::build_range_spec;
//! use skip_scan::impls::mem_store::MemStore;
//! use skip_scan::CompositeKey;
//! use skip_scan::FieldConstraint;
//! use skip_scan::FieldSpec;
//! use skip_scan::SkipScanCursor;
//!
//! # fn main() -> Result<(), skip_scan::ScanError> {
//! let mut store = MemStore::new();
//! for (a, b) in [("01", "10"), ("01", "99"), ("02", "12")] {
//!     store.insert(CompositeKey::from_fields([a, b]).as_bytes(), b"v".to_vec());
//! }
//!
//! let spec = build_range_spec(
//!     "a_b",
//!     &[
//!         FieldConstraint::ge("a", "01"),
//!         FieldConstraint::le("a", "02"),
//!         FieldConstraint::lt("b", "20"),
//!     ],
//!     vec![FieldSpec::hex("a"), FieldSpec::hex("b")],
//! )?;
//!
//! let cursor = SkipScanCursor::new(Arc::new(spec), store.cursor());
//! for entry in cursor {
//!     let (key, _value) = entry?;
//!     assert_ne!(key.to_string(), "01|99");
//! }
//! # Ok(())
//! # }
//! ```

pub mod bound_codec;
pub mod bound_merger;
pub mod bounds_checker;
pub mod config;
pub mod constraint;
pub mod cursor;
pub mod errors;
pub mod field;
pub mod impls;
pub mod key;
pub mod range_spec;
pub mod seek_advancer;
pub mod stream;
pub mod util;


use futures_util::stream::BoxStream;

pub use crate::bound_merger::build_range_spec;
pub use crate::bound_merger::BoundMerger;
pub use crate::bound_merger::MergeMode;
pub use crate::bounds_checker::is_in_range;
pub use crate::config::ScanConfig;
pub use crate::constraint::FieldConstraint;
pub use crate::constraint::RelOp;
pub use crate::cursor::CursorState;
pub use crate::cursor::SkipScanCursor;
pub use crate::cursor::StorageCursor;
pub use crate::errors::BoundError;
pub use crate::errors::ScanError;
pub use crate::field::FieldSpec;
pub use crate::key::CompositeKey;
pub use crate::key::ScanRange;
pub use crate::range_spec::FieldBound;
pub use crate::range_spec::RangeSpec;
pub use crate::seek_advancer::next_probe;
pub use crate::seek_advancer::Probe;

/// An in-range key and its value.
pub type Entry = (CompositeKey, Vec<u8>);

/// A boxed stream that yields in-range entries or a [`ScanError`].
/// The stream is 'static so that sub-scans can be moved to other tasks.
pub type EntryStream = BoxStream<'static, Result<Entry, ScanError>>;
