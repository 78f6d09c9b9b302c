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

//! Decide whether a composite key satisfies every per-field bound.
//!
//! Two rules turn the bounds of a [`RangeSpec`] into the bounds that are actually
//! compared against, see [`effective_bounds`]:
//!
//! - **Collapse**: if `lower == upper` and only one of them is exclusive, both are
//!   inclusive. A pinned point can not be half-open.
//! - **Terminal**: the bounds of one side form a chain over the leading fields. Only the
//!   last entry of the chain may be exclusive; earlier entries only select the composite
//!   family a key belongs to and are compared inclusively.

use std::ops::Bound;

use crate::key::CompositeKey;
use crate::range_spec::FieldBound;
use crate::range_spec::RangeSpec;

/// Returns `true` if every field present in `key` is within its bound.
///
/// Fields absent from a short key are vacuously satisfied; values beyond the field list
/// are ignored. Fields are checked from the least significant one.
pub fn is_in_range(key: &CompositeKey, spec: &RangeSpec) -> bool {
    let values = key.fields();
    let n = values.len().min(spec.len());

    for i in (0..n).rev() {
        if !spec.key_bound(i, values.len()).contains(values[i]) {
            return false;
        }
    }

    true
}

/// Apply the collapse rule and then the terminal rule to `bounds`.
pub(crate) fn effective_bounds(bounds: &[FieldBound]) -> Vec<FieldBound> {
    let mut effective = bounds.iter().map(collapse).collect::<Vec<_>>();

    let lower_chain = effective
        .iter()
        .take_while(|b| b.lower != Bound::Unbounded)
        .count();
    let upper_chain = effective
        .iter()
        .take_while(|b| b.upper != Bound::Unbounded)
        .count();

    for b in effective.iter_mut().take(lower_chain.saturating_sub(1)) {
        b.lower = inclusive(std::mem::replace(&mut b.lower, Bound::Unbounded));
    }
    for b in effective.iter_mut().take(upper_chain.saturating_sub(1)) {
        b.upper = inclusive(std::mem::replace(&mut b.upper, Bound::Unbounded));
    }

    effective
}

fn collapse(b: &FieldBound) -> FieldBound {
    match (&b.lower, &b.upper) {
        (Bound::Included(lo), Bound::Excluded(hi)) | (Bound::Excluded(lo), Bound::Included(hi))
            if lo == hi =>
        {
            FieldBound::point(lo)
        }
        _ => b.clone(),
    }
}

fn inclusive(b: Bound<String>) -> Bound<String> {
    match b {
        Bound::Excluded(v) => Bound::Included(v),
        other => other,
    }
}
