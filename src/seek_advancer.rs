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

//! Compute the next key worth seeking to after a key that is out of range.
//!
//! Fields are visited from the least significant one, carrying an "increment needed"
//! flag toward more significant fields, like incrementing a mixed-radix odometer:
//!
//! | field value                          | new value            | less significant | carry |
//! |--------------------------------------|----------------------|------------------|-------|
//! | below lower bound                    | lower bound          | reset to lower   | clear |
//! | above upper bound                    | lower bound          | reset to lower   | set   |
//! | in range, carry, successor in range  | successor            | reset to lower   | clear |
//! | in range, carry, successor above     | lower bound          | reset to lower   | keep  |
//! | in range, no carry                   | unchanged            | unchanged        | -     |
//!
//! The probe is the new values joined, truncated at the first field without a
//! determined value, e.g., a reset to an unbounded lower bound.
//!
//! A variable-length value is never stepped. A variable-length field sorts a value
//! *after* all of its extensions, because the separator is greater than any data
//! character; so after a variable-length field is moved the probe ends there, and a
//! carry into a variable-length field seeks past every key sharing its current value.

use crate::bound_codec;
use crate::errors::BoundError;
use crate::errors::ScanError;
use crate::key::CompositeKey;
use crate::range_spec::FieldBound;
use crate::range_spec::RangeSpec;

/// Where the cursor should go after a key that is out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Re-seek to this key. It is strictly greater than the key it was computed from and
    /// no in-range key lies between the two.
    Seek(CompositeKey),

    /// No key after the current one can be in range.
    Exhausted,

    /// There is no safe target to skip to; advance to the next key.
    Step,
}

/// The value a field position takes in the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot<'a> {
    /// The current key's value.
    Kept(&'a str),

    /// A new value. With `last`, the probe ends after it.
    Set { value: String, last: bool },

    /// Undetermined; the probe ends before it.
    Open,
}

/// Computes the smallest key greater than `key` that could still be in range.
///
/// Fails only if a fixed-length field must step past an exclusive lower bound that is
/// the end of its domain.
pub fn next_probe(key: &CompositeKey, spec: &RangeSpec) -> Result<Probe, ScanError> {
    let values = key.fields();
    let n = values.len().min(spec.len());

    let mut slots = values[..n].iter().map(|v| Slot::Kept(*v)).collect::<Vec<_>>();
    let mut carry = false;

    for i in (0..n).rev() {
        let field = spec.field(i);
        let bound = spec.seek_bound(i);
        let value = values[i];

        if bound.is_below_lower(value) {
            let ends_key = i + 1 == values.len();
            let Some(target) = lower_target(spec, i, value, ends_key)? else {
                return Ok(Probe::Step);
            };
            slots[i] = target;
            reset_less_significant(spec, &mut slots, i)?;
            carry = false;
        } else if bound.is_above_upper(value) {
            // A proper prefix of a variable-length value sorts after it.
            if !field.is_fixed_length() && has_proper_prefix_in(bound, value) {
                return Ok(Probe::Step);
            }
            slots[i] = reset_slot(spec, i)?;
            reset_less_significant(spec, &mut slots, i)?;
            carry = true;
        } else if carry {
            // Less significant positions were reset when the carry was set.
            if field.is_fixed_length() {
                match field.successor(value) {
                    Ok(next) if !bound.is_above_upper(&next) => {
                        slots[i] = Slot::Set {
                            value: next,
                            last: false,
                        };
                        carry = false;
                    }
                    Ok(_) | Err(BoundError::Exhausted { .. }) => {
                        slots[i] = reset_slot(spec, i)?;
                    }
                    // A stored value outside the domain has no known successor.
                    Err(BoundError::InvalidDomainValue { .. }) => return Ok(Probe::Step),
                }
            } else {
                let Ok(past) = bound_codec::increment(value) else {
                    return Ok(Probe::Step);
                };
                slots[i] = Slot::Set {
                    value: past,
                    last: true,
                };
                carry = false;
            }
        }
    }

    if carry {
        return Ok(Probe::Exhausted);
    }

    let probe = assemble(&slots);
    if probe > *key {
        Ok(Probe::Seek(probe))
    } else {
        Ok(Probe::Step)
    }
}

/// The first value at or after `value` that satisfies the lower bound of field `i`.
///
/// `ends_key` tells whether `value` is the last value of the key. Returns `None` if no
/// safe value exists.
fn lower_target<'a>(
    spec: &RangeSpec,
    i: usize,
    value: &str,
    ends_key: bool,
) -> Result<Option<Slot<'a>>, ScanError> {
    let field = spec.field(i);

    if field.is_fixed_length() {
        return reset_slot(spec, i).map(Some);
    }

    let Some(lower) = bound_str(&spec.seek_bound(i).lower) else {
        return Ok(None);
    };

    // Followed by more fields, an extension of `value` sorts before `value` and has
    // already been passed. At the end of the key it sorts after it.
    let target = if lower > value && (ends_key || !lower.starts_with(value)) {
        lower.to_string()
    } else if ends_key {
        return Ok(None);
    } else {
        match bound_codec::increment(value) {
            Ok(past) => past,
            Err(_) => return Ok(None),
        }
    };

    Ok(Some(Slot::Set {
        value: target,
        last: true,
    }))
}

/// The smallest value of field `i` that satisfies its lower bound.
fn reset_slot<'a>(spec: &RangeSpec, i: usize) -> Result<Slot<'a>, ScanError> {
    let field = spec.field(i);
    let fixed = field.is_fixed_length();

    let slot = match &spec.seek_bound(i).lower {
        std::ops::Bound::Unbounded => Slot::Open,
        std::ops::Bound::Included(lo) => Slot::Set {
            value: lo.clone(),
            last: !fixed,
        },
        std::ops::Bound::Excluded(lo) if fixed => {
            let next = field
                .successor(lo)
                .map_err(|e| ScanError::bound_exhausted(spec.attribute(), field.name(), e))?;
            Slot::Set {
                value: next,
                last: false,
            }
        }
        std::ops::Bound::Excluded(lo) => Slot::Set {
            value: lo.clone(),
            last: true,
        },
    };

    Ok(slot)
}

fn reset_less_significant(
    spec: &RangeSpec,
    slots: &mut [Slot<'_>],
    i: usize,
) -> Result<(), ScanError> {
    for (j, slot) in slots.iter_mut().enumerate().skip(i + 1) {
        *slot = reset_slot(spec, j)?;
    }
    Ok(())
}

fn has_proper_prefix_in(bound: &FieldBound, value: &str) -> bool {
    value
        .char_indices()
        .any(|(end, _)| bound.contains(&value[..end]))
}

fn bound_str(b: &std::ops::Bound<String>) -> Option<&str> {
    match b {
        std::ops::Bound::Included(v) | std::ops::Bound::Excluded(v) => Some(v.as_str()),
        std::ops::Bound::Unbounded => None,
    }
}

fn assemble(slots: &[Slot<'_>]) -> CompositeKey {
    let mut values = Vec::with_capacity(slots.len());

    for slot in slots {
        match slot {
            Slot::Kept(v) => values.push(*v),
            Slot::Set { value, last } => {
                values.push(value.as_str());
                if *last {
                    break;
                }
            }
            Slot::Open => break,
        }
    }

    CompositeKey::from_fields(values)
}
