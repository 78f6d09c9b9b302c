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

//! Merge per-field relational constraints into per-field bounds and one composite range.
//!
//! The lower bound and the upper bound are merged independently. Each forms a chain over
//! the leading constrained fields, in composite-key order:
//!
//! - A strict term (`>` for the lower chain, `<` for the upper chain) is turned into an
//!   inclusive one by stepping the literal with the field's successor or predecessor, if
//!   the field is fixed-length and the step keeps the length.
//! - If that is not possible for a term that is not the last of its chain, the term stays
//!   exclusive, becomes the last contributing term, and the fields after it are left
//!   unconstrained for this side.
//! - Constraints after an unconstrained field do not join the chain. They are kept as
//!   per-field bounds that only the skip-scan enforces.
//!
//! The composite range handed to storage is built from the chains by
//! [`composite_scan_range`].

use std::ops::Bound;

use log::debug;

use crate::bound_codec;
use crate::constraint::FieldConstraint;
use crate::constraint::RelOp;
use crate::errors::BoundError;
use crate::errors::ScanError;
use crate::field::FieldSpec;
use crate::key::CompositeKey;
use crate::key::ScanRange;
use crate::range_spec::FieldBound;
use crate::range_spec::RangeSpec;

/// How keys written before the attribute became composite are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    #[default]
    Standard,

    /// For data written before the attribute became composite.
    ///
    /// Such rows carry only the first field. For them the first field's lower term is
    /// inclusive at its literal, regardless of the operator, and the storage range starts
    /// at that literal. Rows with more fields are checked as in [`MergeMode::Standard`].
    FullyInclusive,
}

/// Build a [`RangeSpec`] with [`MergeMode::Standard`].
pub fn build_range_spec(
    attribute_name: impl ToString,
    ordered_field_constraints: &[FieldConstraint],
    field_specs: Vec<FieldSpec>,
) -> Result<RangeSpec, ScanError> {
    BoundMerger::default().build(attribute_name, ordered_field_constraints, field_specs)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoundMerger {
    mode: MergeMode,
}

impl BoundMerger {
    pub fn new(mode: MergeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    pub fn build(
        &self,
        attribute_name: impl ToString,
        constraints: &[FieldConstraint],
        field_specs: Vec<FieldSpec>,
    ) -> Result<RangeSpec, ScanError> {
        let attribute = attribute_name.to_string();
        let (lowers, uppers) = collect_terms(&attribute, constraints, &field_specs)?;

        let single_field_lower = match (self.mode, lowers.first()) {
            (MergeMode::FullyInclusive, Some(Bound::Included(v) | Bound::Excluded(v))) => {
                Some(v.clone())
            }
            _ => None,
        };

        let bounds = merge_terms(&attribute, &field_specs, lowers, uppers)?;
        let spec = RangeSpec::new(attribute, field_specs, bounds)?;

        match single_field_lower {
            Some(lower) => Ok(spec.with_single_field_lower(lower)),
            None => Ok(spec),
        }
    }

    /// Merge `constraints` into one [`FieldBound`] per field of `fields`.
    ///
    /// Several constraints on the same field are combined by keeping the tightest term
    /// of each side. The merge mode does not change per-field bounds.
    pub fn merge(
        &self,
        attribute: &str,
        constraints: &[FieldConstraint],
        fields: &[FieldSpec],
    ) -> Result<Vec<FieldBound>, ScanError> {
        let (lowers, uppers) = collect_terms(attribute, constraints, fields)?;
        merge_terms(attribute, fields, lowers, uppers)
    }
}

/// The tightest lower and upper term of each field.
fn collect_terms(
    attribute: &str,
    constraints: &[FieldConstraint],
    fields: &[FieldSpec],
) -> Result<(Vec<Bound<String>>, Vec<Bound<String>>), ScanError> {
    let mut lowers = vec![Bound::Unbounded; fields.len()];
    let mut uppers = vec![Bound::Unbounded; fields.len()];

    for c in constraints {
        let Some(pos) = fields.iter().position(|f| f.name() == c.field) else {
            return Err(ScanError::invalid_range_spec(
                attribute,
                format!("constraint `{}` references unknown field {:?}", c, c.field),
            ));
        };

        if c.op.is_lower() {
            let prev = std::mem::replace(&mut lowers[pos], Bound::Unbounded);
            lowers[pos] = tighter_lower(prev, lower_term(c.op, &c.literal));
        }
        if c.op.is_upper() {
            let prev = std::mem::replace(&mut uppers[pos], Bound::Unbounded);
            uppers[pos] = tighter_upper(prev, upper_term(c.op, &c.literal));
        }
    }

    Ok((lowers, uppers))
}

fn merge_terms(
    attribute: &str,
    fields: &[FieldSpec],
    lowers: Vec<Bound<String>>,
    uppers: Vec<Bound<String>>,
) -> Result<Vec<FieldBound>, ScanError> {
    let lowers = merge_chain(attribute, fields, lowers, Side::Lower)?;
    let uppers = merge_chain(attribute, fields, uppers, Side::Upper)?;

    let bounds = lowers
        .into_iter()
        .zip(uppers)
        .map(|(lower, upper)| FieldBound::new(lower, upper))
        .collect();

    Ok(bounds)
}

fn merge_chain(
    attribute: &str,
    fields: &[FieldSpec],
    mut terms: Vec<Bound<String>>,
    side: Side,
) -> Result<Vec<Bound<String>>, ScanError> {
    let stepped = terms
        .iter()
        .zip(fields)
        .map(|(t, f)| match t {
            Bound::Excluded(literal) => side.step_inward(f, literal).map_err(|e| {
                ScanError::invalid_range_spec(
                    attribute,
                    format!("{} bound of field {:?}: {}", side, f.name(), e),
                )
            }),
            _ => Ok(None),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let chain_len = terms.iter().take_while(|t| **t != Bound::Unbounded).count();

    for (i, stepped) in stepped.into_iter().enumerate().take(chain_len) {
        let Bound::Excluded(literal) = &terms[i] else {
            continue;
        };

        if let Some(stepped) = stepped {
            terms[i] = Bound::Included(stepped);
            continue;
        }

        let is_last = i + 1 == chain_len;
        if !is_last {
            debug!(
                "{}: {} bound of field {:?} stays exclusive at {:?}; later fields are unconstrained for this bound",
                attribute,
                side,
                fields[i].name(),
                literal
            );

            for t in terms.iter_mut().skip(i + 1) {
                *t = Bound::Unbounded;
            }
            break;
        }
    }

    Ok(terms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

impl Side {
    /// Step a strict literal one unit into the range, if the field allows it without
    /// changing the literal's length.
    ///
    /// A literal outside the field's domain is an error.
    fn step_inward(&self, field: &FieldSpec, literal: &str) -> Result<Option<String>, BoundError> {
        if !field.is_fixed_length() {
            return Ok(None);
        }

        let stepped = match self {
            Side::Lower => field.successor(literal),
            Side::Upper => field.predecessor(literal),
        };

        match stepped {
            Ok(s) if s.chars().count() == literal.chars().count() => Ok(Some(s)),
            Ok(_) | Err(BoundError::Exhausted { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Lower => write!(f, "lower"),
            Side::Upper => write!(f, "upper"),
        }
    }
}

fn lower_term(op: RelOp, literal: &str) -> Bound<String> {
    match op {
        RelOp::Gt => Bound::Excluded(literal.to_string()),
        _ => Bound::Included(literal.to_string()),
    }
}

fn upper_term(op: RelOp, literal: &str) -> Bound<String> {
    match op {
        RelOp::Lt => Bound::Excluded(literal.to_string()),
        _ => Bound::Included(literal.to_string()),
    }
}

/// The greater of two lower bounds; on a tie the exclusive one.
fn tighter_lower(a: Bound<String>, b: Bound<String>) -> Bound<String> {
    match (&a, &b) {
        (Bound::Unbounded, _) => b,
        (_, Bound::Unbounded) => a,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            if x > y || (x == y && matches!(a, Bound::Excluded(_))) {
                a
            } else {
                b
            }
        }
    }
}

/// The smaller of two upper bounds; on a tie the exclusive one.
fn tighter_upper(a: Bound<String>, b: Bound<String>) -> Bound<String> {
    match (&a, &b) {
        (Bound::Unbounded, _) => b,
        (_, Bound::Unbounded) => a,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            if x < y || (x == y && matches!(a, Bound::Excluded(_))) {
                a
            } else {
                b
            }
        }
    }
}

/// Build the contiguous storage range from the effective per-field bounds.
///
/// The start joins the lower chain and is inclusive if the last term is. The end joins
/// the upper chain; if its last term is inclusive, the end becomes the exclusive
/// increment of that term, so that keys extending the bound with more fields stay inside.
/// If the increment is exhausted the end is unbounded.
///
/// The separator sorts after every data character, so a variable-length value sorts
/// after its extensions once more fields follow. The lower chain therefore ends at the
/// first variable-length field, and the upper chain ends before it: a proper prefix of the
/// upper term is within the bound but sorts after the joined term.
pub(crate) fn composite_scan_range(fields: &[FieldSpec], effective: &[FieldBound]) -> ScanRange {
    let mut lower_chain = vec![];
    for (b, f) in effective.iter().zip(fields) {
        let Some(v) = bound_value(&b.lower) else {
            break;
        };
        lower_chain.push(v);
        if !f.is_fixed_length() {
            break;
        }
    }
    let upper_chain = effective
        .iter()
        .zip(fields)
        .map_while(|(b, f)| bound_value(&b.upper).filter(|_| f.is_fixed_length()))
        .collect::<Vec<_>>();

    let start = match last_of(effective, lower_chain.len()).map(|b| &b.lower) {
        Some(Bound::Included(_)) => Bound::Included(CompositeKey::from_fields(&lower_chain)),
        Some(Bound::Excluded(_)) => Bound::Excluded(CompositeKey::from_fields(&lower_chain)),
        _ => Bound::Unbounded,
    };

    let end = match last_of(effective, upper_chain.len()).map(|b| &b.upper) {
        Some(Bound::Excluded(_)) => Bound::Excluded(CompositeKey::from_fields(&upper_chain)),
        Some(Bound::Included(last)) => match bound_codec::increment(last) {
            Ok(next) => {
                let mut values = upper_chain[..upper_chain.len() - 1].to_vec();
                values.push(next.as_str());
                Bound::Excluded(CompositeKey::from_fields(values))
            }
            Err(e) => {
                debug!("composite upper bound is unbounded: {}", e);
                Bound::Unbounded
            }
        },
        _ => Bound::Unbounded,
    };

    ScanRange::new(start, end)
}

/// The last bound of a chain of `chain_len` leading fields.
fn last_of(effective: &[FieldBound], chain_len: usize) -> Option<&FieldBound> {
    chain_len.checked_sub(1).and_then(|i| effective.get(i))
}

fn bound_value(b: &Bound<String>) -> Option<&str> {
    match b {
        Bound::Included(v) | Bound::Excluded(v) => Some(v.as_str()),
        Bound::Unbounded => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bounds_checker::is_in_range;
    use crate::constraint::FieldConstraint as C;

    fn inc(s: &str) -> Bound<String> {
        Bound::Included(s.to_string())
    }

    fn exc(s: &str) -> Bound<String> {
        Bound::Excluded(s.to_string())
    }

    fn key_inc(fields: &[&str]) -> Bound<CompositeKey> {
        Bound::Included(CompositeKey::from_fields(fields))
    }

    fn key_exc(fields: &[&str]) -> Bound<CompositeKey> {
        Bound::Excluded(CompositeKey::from_fields(fields))
    }

    #[test]
    fn test_single_eq() -> anyhow::Result<()> {
        let spec = build_range_spec("attr", &[C::eq("a", "0202")], vec![FieldSpec::hex("a")])?;

        assert_eq!(spec.bounds(), &[FieldBound::point("0202")]);
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_inc(&["0202"]), key_exc(&["0203"]))
        );
        Ok(())
    }

    #[test]
    fn test_strict_terms_on_fixed_fields_become_inclusive() -> anyhow::Result<()> {
        let spec = build_range_spec(
            "attr",
            &[C::gt("a", "02"), C::le("a", "05"), C::lt("b", "0d")],
            vec![FieldSpec::hex("a"), FieldSpec::hex("b")],
        )?;

        assert_eq!(spec.bounds(), &[
            FieldBound::new(inc("03"), inc("05")),
            FieldBound::new(Bound::Unbounded, inc("0c")),
        ]);
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_inc(&["03"]), key_exc(&["05", "0d"]))
        );
        Ok(())
    }

    #[test]
    fn test_strict_last_term_on_variable_field_stays_exclusive() -> anyhow::Result<()> {
        let spec = build_range_spec(
            "attr",
            &[C::gt("a", "02"), C::le("a", "05"), C::lt("b", "0d")],
            vec![FieldSpec::hex("a"), FieldSpec::variable("b")],
        )?;

        assert_eq!(spec.bounds(), &[
            FieldBound::new(inc("03"), inc("05")),
            FieldBound::new(Bound::Unbounded, exc("0d")),
        ]);
        // "05|0" is in range but sorts after "05|0d": the end stops before field "b".
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_inc(&["03"]), key_exc(&["06"]))
        );
        assert!(spec
            .scan_range()
            .is_before_end(&CompositeKey::from_fields(["05", "0"])));
        Ok(())
    }

    #[test]
    fn test_variable_field_ends_lower_chain() -> anyhow::Result<()> {
        let spec = build_range_spec(
            "attr",
            &[C::ge("a", "ab"), C::le("a", "c"), C::ge("b", "01")],
            vec![FieldSpec::variable("a"), FieldSpec::hex("b")],
        )?;

        // "abc|00" is in range but sorts before "ab|01": the start ends at field "a".
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_inc(&["ab"]), Bound::Unbounded)
        );
        Ok(())
    }

    #[test]
    fn test_two_field_lower_chain() -> anyhow::Result<()> {
        let spec = build_range_spec(
            "attr",
            &[C::gt("a", "02"), C::ge("b", "05")],
            vec![FieldSpec::hex("a"), FieldSpec::hex("b")],
        )?;

        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_inc(&["03", "05"]), Bound::Unbounded)
        );
        Ok(())
    }

    #[test]
    fn test_rejected_conversion_truncates_chain() -> anyhow::Result<()> {
        let spec = build_range_spec(
            "attr",
            &[C::gt("a", "m"), C::ge("b", "05"), C::le("b", "09")],
            vec![FieldSpec::variable("a"), FieldSpec::hex("b")],
        )?;

        assert_eq!(spec.bounds(), &[
            FieldBound::new(exc("m"), Bound::Unbounded),
            FieldBound::new(Bound::Unbounded, inc("09")),
        ]);
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_exc(&["m"]), Bound::Unbounded)
        );
        Ok(())
    }

    #[test]
    fn test_exhausted_conversion_truncates_chain() -> anyhow::Result<()> {
        let spec = build_range_spec(
            "attr",
            &[C::gt("a", "ff"), C::ge("b", "01")],
            vec![FieldSpec::hex("a"), FieldSpec::hex("b")],
        )?;

        assert_eq!(spec.bounds(), &[
            FieldBound::new(exc("ff"), Bound::Unbounded),
            FieldBound::unbounded(),
        ]);
        Ok(())
    }

    #[test]
    fn test_length_changing_step_is_rejected() -> anyhow::Result<()> {
        let decimal = FieldSpec::fixed_with(
            "n",
            |v: &str| Ok((v.parse::<u64>().unwrap_or_default() + 1).to_string()),
            |v: &str| Ok((v.parse::<u64>().unwrap_or_default().saturating_sub(1)).to_string()),
        );

        let spec = build_range_spec("attr", &[C::gt("n", "9")], vec![decimal.clone()])?;
        assert_eq!(spec.bounds(), &[FieldBound::new(exc("9"), Bound::Unbounded)]);

        let spec = build_range_spec("attr", &[C::gt("n", "7")], vec![decimal])?;
        assert_eq!(spec.bounds(), &[FieldBound::new(inc("8"), Bound::Unbounded)]);
        Ok(())
    }

    #[test]
    fn test_fully_inclusive_mode_admits_single_field_keys() -> anyhow::Result<()> {
        let merger = BoundMerger::new(MergeMode::FullyInclusive);
        assert_eq!(merger.mode(), MergeMode::FullyInclusive);

        let spec = merger.build(
            "attr",
            &[C::gt("a", "02"), C::gt("b", "05"), C::lt("a", "09")],
            vec![FieldSpec::hex("a"), FieldSpec::hex("b")],
        )?;

        assert_eq!(spec.bounds(), &[
            FieldBound::new(inc("03"), inc("08")),
            FieldBound::new(inc("06"), Bound::Unbounded),
        ]);
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_inc(&["02"]), key_exc(&["09"]))
        );

        let key = |fields: &[&str]| CompositeKey::from_fields(fields);
        assert!(is_in_range(&key(&["02"]), &spec));
        assert!(!is_in_range(&key(&["02", "07"]), &spec));
        assert!(is_in_range(&key(&["03", "07"]), &spec));
        assert!(!is_in_range(&key(&["01"]), &spec));
        Ok(())
    }

    #[test]
    fn test_strict_literal_outside_domain_is_rejected() {
        let fields = || vec![FieldSpec::hex("a"), FieldSpec::hex("b")];

        let res = build_range_spec("a_b", &[C::eq("a", "01"), C::gt("b", "zz")], fields());
        let err = res.unwrap_err();
        assert!(matches!(err, ScanError::InvalidRangeSpec { .. }), "{}", err);
        assert!(err.to_string().contains("\"b\""), "{}", err);
        assert!(err.to_string().contains("\"zz\""), "{}", err);

        // Also after an unconstrained field, where only the scan would step it.
        let res = build_range_spec("a_b", &[C::lt("b", "0x")], fields());
        assert!(matches!(res, Err(ScanError::InvalidRangeSpec { .. })));
    }

    #[test]
    fn test_tightest_term_wins() -> anyhow::Result<()> {
        let fields = vec![FieldSpec::variable("a")];

        let spec = build_range_spec(
            "attr",
            &[C::gt("a", "b"), C::ge("a", "d"), C::le("a", "x"), C::lt("a", "y")],
            fields.clone(),
        )?;
        assert_eq!(spec.bounds(), &[FieldBound::new(inc("d"), inc("x"))]);

        let spec = build_range_spec(
            "attr",
            &[C::ge("a", "d"), C::gt("a", "d"), C::lt("a", "x"), C::le("a", "x")],
            fields,
        )?;
        assert_eq!(spec.bounds(), &[FieldBound::new(exc("d"), exc("x"))]);
        Ok(())
    }

    #[test]
    fn test_gap_keeps_later_field_out_of_composite_range() -> anyhow::Result<()> {
        let spec = build_range_spec(
            "attr",
            &[C::ge("a", "01"), C::le("c", "05")],
            vec![FieldSpec::hex("a"), FieldSpec::hex("b"), FieldSpec::hex("c")],
        )?;

        assert_eq!(spec.bounds(), &[
            FieldBound::new(inc("01"), Bound::Unbounded),
            FieldBound::unbounded(),
            FieldBound::new(Bound::Unbounded, inc("05")),
        ]);
        assert_eq!(
            spec.scan_range(),
            &ScanRange::new(key_inc(&["01"]), Bound::Unbounded)
        );
        Ok(())
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let res = build_range_spec("attr", &[C::eq("zzz", "1")], vec![FieldSpec::hex("a")]);

        let err = res.unwrap_err();
        assert!(matches!(err, ScanError::InvalidRangeSpec { .. }));
        assert!(err.to_string().contains("\"zzz\""), "{}", err);
    }

    #[test]
    fn test_contradicting_terms_are_rejected() {
        let res = build_range_spec("attr", &[C::eq("a", "02"), C::eq("a", "01")], vec![
            FieldSpec::hex("a"),
        ]);
        assert!(matches!(res, Err(ScanError::InvalidRangeSpec { .. })));

        let res = build_range_spec("attr", &[C::gt("a", "m"), C::lt("a", "m")], vec![
            FieldSpec::variable("a"),
        ]);
        assert!(matches!(res, Err(ScanError::InvalidRangeSpec { .. })));
    }

    #[test]
    fn test_unbounded_upper_when_increment_is_exhausted() {
        let got = composite_scan_range(&[FieldSpec::fixed("a")], &[FieldBound::new(
            Bound::Unbounded,
            inc("\u{10FFFE}"),
        )]);
        assert_eq!(got, ScanRange::full());
    }
}
