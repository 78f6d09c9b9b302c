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

//! Per-field metadata of a composite attribute.

use std::fmt;
use std::sync::Arc;

use crate::bound_codec;
use crate::errors::BoundError;

/// Steps a fixed-length field value by one unit of its domain.
pub type StepFn = Arc<dyn Fn(&str) -> Result<String, BoundError> + Send + Sync>;

/// Describes one component field of a composite attribute.
///
/// A field is either variable-length, whose values can only be bounded, or fixed-length
/// with a discrete domain that can be stepped with a successor/predecessor function.
/// A fixed-length field without explicit step functions is stepped with
/// [`bound_codec::increment`] and [`bound_codec::decrement`].
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    fixed_length: bool,
    successor: Option<StepFn>,
    predecessor: Option<StepFn>,
}

impl FieldSpec {
    /// A variable-length field: only ever replaced wholesale by a bound value.
    pub fn variable(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            fixed_length: false,
            successor: None,
            predecessor: None,
        }
    }

    /// A fixed-length field stepped with code-point arithmetic.
    pub fn fixed(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            fixed_length: true,
            successor: None,
            predecessor: None,
        }
    }

    /// A fixed-length field with a custom discrete domain.
    ///
    /// Both functions must preserve the value length, except that they fail at the
    /// ends of the domain.
    pub fn fixed_with<S, P>(name: impl ToString, successor: S, predecessor: P) -> Self
    where
        S: Fn(&str) -> Result<String, BoundError> + Send + Sync + 'static,
        P: Fn(&str) -> Result<String, BoundError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            fixed_length: true,
            successor: Some(Arc::new(successor)),
            predecessor: Some(Arc::new(predecessor)),
        }
    }

    /// A zero-padded lowercase hexadecimal counter, e.g., `"00"` to `"ff"`.
    pub fn hex(name: impl ToString) -> Self {
        Self::fixed_with(name, hex_successor, hex_predecessor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_fixed_length(&self) -> bool {
        self.fixed_length
    }

    /// The next value of the domain after `value`.
    ///
    /// Only meaningful for fixed-length fields; a variable-length value has no successor.
    pub fn successor(&self, value: &str) -> Result<String, BoundError> {
        debug_assert!(self.fixed_length, "successor of variable-length field {}", self.name);

        match &self.successor {
            Some(f) => f(value),
            None => bound_codec::increment(value),
        }
    }

    /// The previous value of the domain before `value`.
    pub fn predecessor(&self, value: &str) -> Result<String, BoundError> {
        debug_assert!(self.fixed_length, "predecessor of variable-length field {}", self.name);

        match &self.predecessor {
            Some(f) => f(value),
            None => bound_codec::decrement(value),
        }
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("fixed_length", &self.fixed_length)
            .field("custom_domain", &self.successor.is_some())
            .finish()
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Successor of a zero-padded lowercase hexadecimal value, keeping its width.
pub fn hex_successor(value: &str) -> Result<String, BoundError> {
    hex_step(value, true)
}

/// Predecessor of a zero-padded lowercase hexadecimal value, keeping its width.
pub fn hex_predecessor(value: &str) -> Result<String, BoundError> {
    hex_step(value, false)
}

fn hex_step(value: &str, up: bool) -> Result<String, BoundError> {
    let mut digits = value
        .bytes()
        .map(|b| hex_digit(b).ok_or_else(|| invalid_hex(value)))
        .collect::<Result<Vec<u8>, _>>()?;

    if digits.is_empty() {
        return Err(invalid_hex(value));
    }

    for d in digits.iter_mut().rev() {
        if up && *d < 15 {
            *d += 1;
            return Ok(digits.iter().map(|d| HEX_DIGITS[*d as usize] as char).collect());
        }
        if !up && *d > 0 {
            *d -= 1;
            return Ok(digits.iter().map(|d| HEX_DIGITS[*d as usize] as char).collect());
        }
        *d = if up { 0 } else { 15 };
    }

    Err(BoundError::exhausted(value))
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

fn invalid_hex(value: &str) -> BoundError {
    BoundError::InvalidDomainValue {
        value: value.to_string(),
        domain: "hex",
    }
}
