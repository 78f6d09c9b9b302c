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

//! The immutable, scan-scoped description of a composite range predicate.

use std::collections::BTreeSet;
use std::ops::Bound;

use serde::Deserialize;
use serde::Serialize;

use crate::bound_merger;
use crate::bounds_checker;
use crate::errors::ScanError;
use crate::field::FieldSpec;
use crate::key::CompositeKey;
use crate::key::ScanRange;

/// The lower and upper bound of one component field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBound {
    pub lower: Bound<String>,
    pub upper: Bound<String>,
}

impl Default for FieldBound {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl FieldBound {
    pub fn new(lower: Bound<String>, upper: Bound<String>) -> Self {
        Self { lower, upper }
    }

    pub fn unbounded() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// A pinned point: `lower == upper`, both inclusive.
    pub fn point(value: impl ToString) -> Self {
        let v = value.to_string();
        Self::new(Bound::Included(v.clone()), Bound::Included(v))
    }

    /// Inclusive on both ends.
    pub fn between(lower: impl ToString, upper: impl ToString) -> Self {
        Self::new(
            Bound::Included(lower.to_string()),
            Bound::Included(upper.to_string()),
        )
    }

    pub fn with_lower(mut self, lower: Bound<String>) -> Self {
        self.lower = lower;
        self
    }

    pub fn with_upper(mut self, upper: Bound<String>) -> Self {
        self.upper = upper;
        self
    }

    /// `value` precedes the lower bound.
    pub fn is_below_lower(&self, value: &str) -> bool {
        match &self.lower {
            Bound::Included(lo) => value < lo.as_str(),
            Bound::Excluded(lo) => value <= lo.as_str(),
            Bound::Unbounded => false,
        }
    }

    /// `value` is beyond the upper bound.
    pub fn is_above_upper(&self, value: &str) -> bool {
        match &self.upper {
            Bound::Included(hi) => value > hi.as_str(),
            Bound::Excluded(hi) => value >= hi.as_str(),
            Bound::Unbounded => false,
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        !self.is_below_lower(value) && !self.is_above_upper(value)
    }

    /// Whether no value can satisfy both bounds.
    pub(crate) fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
            (Bound::Included(lo), Bound::Excluded(hi))
            | (Bound::Excluded(lo), Bound::Included(hi))
            | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
            _ => false,
        }
    }
}

/// Ordered field list and per-field bounds of one composite attribute.
///
/// Built once per scan and shared read-only by every cursor of that scan, typically
/// through an `Arc<RangeSpec>`.
///
/// Besides the bounds as given, it keeps the *effective* bounds the in-range check and
/// the seek computation apply (see [`bounds_checker`]) and the single contiguous
/// [`ScanRange`] that is handed to storage.
#[derive(Debug, Clone)]
pub struct RangeSpec {
    attribute: String,
    fields: Vec<FieldSpec>,
    bounds: Vec<FieldBound>,
    effective: Vec<FieldBound>,

    /// The bound of the first field for keys that carry only the first field, if it
    /// differs from the effective one.
    single_field: Option<FieldBound>,
    scan_range: ScanRange,
}

impl RangeSpec {
    /// Build a range spec from bounds that are positionally aligned with `fields`.
    pub fn new(
        attribute: impl ToString,
        fields: Vec<FieldSpec>,
        bounds: Vec<FieldBound>,
    ) -> Result<Self, ScanError> {
        let attribute = attribute.to_string();

        if fields.is_empty() {
            return Err(ScanError::invalid_range_spec(&attribute, "no fields"));
        }

        if fields.len() != bounds.len() {
            return Err(ScanError::invalid_range_spec(
                &attribute,
                format!("{} fields but {} bounds", fields.len(), bounds.len()),
            ));
        }

        let mut names = BTreeSet::new();
        for f in fields.iter() {
            if !names.insert(f.name()) {
                return Err(ScanError::invalid_range_spec(
                    &attribute,
                    format!("duplicate field {:?}", f.name()),
                ));
            }
        }

        let effective = bounds_checker::effective_bounds(&bounds);

        for (f, b) in fields.iter().zip(effective.iter()) {
            if b.is_empty() {
                return Err(ScanError::invalid_range_spec(
                    &attribute,
                    format!(
                        "field {:?}: lower bound {:?} is above upper bound {:?}",
                        f.name(),
                        b.lower,
                        b.upper
                    ),
                ));
            }
        }

        let scan_range = bound_merger::composite_scan_range(&fields, &effective);

        if let (Bound::Included(s) | Bound::Excluded(s), Bound::Included(e) | Bound::Excluded(e)) =
            (&scan_range.start, &scan_range.end)
        {
            if s > e {
                return Err(ScanError::invalid_range_spec(
                    &attribute,
                    format!("merged lower bound {} is above merged upper bound {}", s, e),
                ));
            }
        }

        Ok(Self {
            attribute,
            fields,
            bounds,
            effective,
            single_field: None,
            scan_range,
        })
    }

    /// Admit keys that carry only the first field from `lower` on, inclusively, and
    /// start the storage range there.
    ///
    /// Such keys were written before the attribute became composite. Keys with more
    /// values are still checked against the effective bounds.
    pub(crate) fn with_single_field_lower(mut self, lower: String) -> Self {
        self.scan_range.start = Bound::Included(CompositeKey::from_fields([lower.as_str()]));

        let first = &self.effective[0];
        if first.is_below_lower(&lower) {
            self.single_field = Some(first.clone().with_lower(Bound::Included(lower)));
        }
        self
    }

    /// Name of the composite attribute.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn bounds(&self) -> &[FieldBound] {
        &self.bounds
    }

    /// Number of component fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The merged composite range to position the storage cursor over.
    pub fn scan_range(&self) -> &ScanRange {
        &self.scan_range
    }

    pub(crate) fn field(&self, i: usize) -> &FieldSpec {
        &self.fields[i]
    }

    /// The bound field `i` of a key with `key_len` values is checked against.
    pub(crate) fn key_bound(&self, i: usize, key_len: usize) -> &FieldBound {
        match &self.single_field {
            Some(b) if i == 0 && key_len == 1 => b,
            _ => &self.effective[i],
        }
    }

    /// The widest bound of field `i` over keys of any length.
    pub(crate) fn seek_bound(&self, i: usize) -> &FieldBound {
        match &self.single_field {
            Some(b) if i == 0 => b,
            _ => &self.effective[i],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn inc(s: &str) -> Bound<String> {
        Bound::Included(s.to_string())
    }

    fn exc(s: &str) -> Bound<String> {
        Bound::Excluded(s.to_string())
    }

    #[test]
    fn test_field_bound_checks() {
        let b = FieldBound::new(exc("02"), inc("09"));
        assert!(b.is_below_lower("01"));
        assert!(b.is_below_lower("02"));
        assert!(b.contains("03"));
        assert!(b.contains("09"));
        assert!(b.is_above_upper("0a"));

        assert!(FieldBound::unbounded().contains(""));
        assert!(FieldBound::point("x").contains("x"));
    }

    #[test]
    fn test_field_bound_json() -> anyhow::Result<()> {
        let b: FieldBound =
            serde_json::from_str(r#"{"lower": {"Excluded": "02"}, "upper": "Unbounded"}"#)?;
        assert_eq!(b, FieldBound::unbounded().with_lower(exc("02")));

        assert_eq!(
            serde_json::to_string(&FieldBound::point("05"))?,
            r#"{"lower":{"Included":"05"},"upper":{"Included":"05"}}"#
        );
        Ok(())
    }

    #[test]
    fn test_field_bound_is_empty() {
        assert!(FieldBound::between("b", "a").is_empty());
        assert!(FieldBound::new(exc("a"), exc("a")).is_empty());
        assert!(!FieldBound::point("a").is_empty());
        assert!(!FieldBound::new(inc("a"), Bound::Unbounded).is_empty());
    }

    #[test]
    fn test_new_rejects_misaligned_bounds() {
        let res = RangeSpec::new("attr", vec![FieldSpec::fixed("a")], vec![]);
        assert!(matches!(res, Err(ScanError::InvalidRangeSpec { .. })));

        let res = RangeSpec::new("attr", vec![], vec![]);
        assert!(matches!(res, Err(ScanError::InvalidRangeSpec { .. })));
    }

    #[test]
    fn test_new_rejects_duplicate_field() {
        let res = RangeSpec::new(
            "attr",
            vec![FieldSpec::fixed("a"), FieldSpec::fixed("a")],
            vec![FieldBound::unbounded(), FieldBound::unbounded()],
        );
        assert!(matches!(res, Err(ScanError::InvalidRangeSpec { .. })));
    }

    #[test]
    fn test_new_rejects_lower_above_upper() {
        let res = RangeSpec::new("attr", vec![FieldSpec::fixed("a")], vec![
            FieldBound::between("09", "01"),
        ]);
        let err = res.unwrap_err();
        assert!(err.to_string().contains("\"a\""), "{}", err);
    }

    #[test]
    fn test_collapsed_point_is_not_empty() {
        // `>= "05"` and `< "05"` pin the field to "05".
        let spec = RangeSpec::new("attr", vec![FieldSpec::fixed("a")], vec![FieldBound::new(
            inc("05"),
            exc("05"),
        )])
        .unwrap();

        assert_eq!(spec.seek_bound(0), &FieldBound::point("05"));
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(
                Bound::Included(CompositeKey::from("05")),
                Bound::Excluded(CompositeKey::from("06"))
            )
        );
    }

    #[test]
    fn test_accessors() {
        let spec = RangeSpec::new(
            "attr",
            vec![FieldSpec::fixed("a"), FieldSpec::variable("b")],
            vec![FieldBound::point("01"), FieldBound::unbounded()],
        )
        .unwrap();

        assert_eq!(spec.attribute(), "attr");
        assert_eq!(spec.len(), 2);
        assert!(!spec.is_empty());
        assert_eq!(spec.fields()[1].name(), "b");
        assert_eq!(spec.bounds()[0], FieldBound::point("01"));
    }
}
