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

//! Code-point arithmetic on string bounds.
//!
//! A bound is treated as a fixed-width number whose digits are Unicode scalar values.
//! [`increment`] and [`decrement`] step it by one unit while keeping the number of
//! code points unchanged, carrying into earlier code points on overflow.
//!
//! The data domain ends at [`MAX_DATA_CHAR`], one below [`SEPARATOR`], so stepping a
//! field value never produces a separator.

use crate::errors::BoundError;

/// Delimits field values in a composite key.
///
/// It sorts after every valid data character, so field boundaries never blend
/// under lexicographic comparison.
pub const SEPARATOR: char = '\u{10FFFF}';

/// The greatest code point a field value may contain.
pub const MAX_DATA_CHAR: char = '\u{10FFFE}';

/// The smallest code point a field value may contain.
pub const MIN_DATA_CHAR: char = '\u{0}';

/// Returns the smallest string of the same code-point length that is greater than `bound`.
///
/// Fails with [`BoundError::Exhausted`] if every code point is already [`MAX_DATA_CHAR`]
/// or `bound` is empty.
pub fn increment(bound: &str) -> Result<String, BoundError> {
    step(bound, next_char, MIN_DATA_CHAR)
}

/// Returns the greatest string of the same code-point length that is less than `bound`.
///
/// Fails with [`BoundError::Exhausted`] if every code point is already [`MIN_DATA_CHAR`]
/// or `bound` is empty.
pub fn decrement(bound: &str) -> Result<String, BoundError> {
    step(bound, prev_char, MAX_DATA_CHAR)
}

/// Step the last code point with `f`; on overflow reset it to `wrap` and carry leftward.
fn step(bound: &str, f: fn(char) -> Option<char>, wrap: char) -> Result<String, BoundError> {
    let mut chars = bound.chars().collect::<Vec<_>>();

    for c in chars.iter_mut().rev() {
        match f(*c) {
            Some(stepped) => {
                *c = stepped;
                return Ok(chars.into_iter().collect());
            }
            None => *c = wrap,
        }
    }

    Err(BoundError::exhausted(bound))
}

fn next_char(c: char) -> Option<char> {
    if c >= MAX_DATA_CHAR {
        return None;
    }
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        _ => char::from_u32(c as u32 + 1),
    }
}

fn prev_char(c: char) -> Option<char> {
    match c {
        MIN_DATA_CHAR => None,
        '\u{E000}' => Some('\u{D7FF}'),
        // A separator in a bound counts as the top of the domain.
        SEPARATOR => Some(MAX_DATA_CHAR),
        _ => char::from_u32(c as u32 - 1),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_increment() {
        assert_eq!(increment("02").unwrap(), "03");
        assert_eq!(increment("0202").unwrap(), "0203");
        assert_eq!(increment("a").unwrap(), "b");
        assert_eq!(increment("\u{D7FF}").unwrap(), "\u{E000}");
    }

    #[test]
    fn test_increment_carries_into_previous_code_point() {
        assert_eq!(increment("a\u{10FFFE}").unwrap(), "b\u{0}");
        assert_eq!(
            increment("a\u{10FFFE}\u{10FFFE}").unwrap(),
            "b\u{0}\u{0}"
        );
    }

    #[test]
    fn test_increment_exhausted() {
        assert_eq!(
            increment("\u{10FFFE}\u{10FFFE}"),
            Err(BoundError::exhausted("\u{10FFFE}\u{10FFFE}"))
        );
        assert_eq!(increment(""), Err(BoundError::exhausted("")));
    }

    #[test]
    fn test_increment_never_produces_separator() {
        let got = increment("x\u{10FFFD}").unwrap();
        assert_eq!(got, "x\u{10FFFE}");
        assert!(!got.contains(SEPARATOR));
    }

    #[test]
    fn test_decrement() {
        assert_eq!(decrement("0d").unwrap(), "0c");
        assert_eq!(decrement("b").unwrap(), "a");
        assert_eq!(decrement("\u{E000}").unwrap(), "\u{D7FF}");
        assert_eq!(decrement("b\u{0}").unwrap(), "a\u{10FFFE}");
    }

    #[test]
    fn test_decrement_exhausted() {
        assert_eq!(
            decrement("\u{0}\u{0}"),
            Err(BoundError::exhausted("\u{0}\u{0}"))
        );
        assert_eq!(decrement(""), Err(BoundError::exhausted("")));
    }

    #[test]
    fn test_step_preserves_code_point_length() {
        for s in ["a", "zz", "0\u{10FFFE}", "\u{D7FF}\u{10FFFE}"] {
            let up = increment(s).unwrap();
            assert_eq!(up.chars().count(), s.chars().count(), "increment {:?}", s);
            assert!(up.as_str() > s);
        }
    }

    fn data_string() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![
                Just(MIN_DATA_CHAR),
                Just(MAX_DATA_CHAR),
                Just('\u{D7FF}'),
                Just('\u{E000}'),
                proptest::char::range('0', 'z'),
            ],
            1..5,
        )
        .prop_map(|cs| cs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn increment_then_decrement_is_identity(s in data_string()) {
            match increment(&s) {
                Ok(up) => {
                    prop_assert!(up > s);
                    prop_assert_eq!(decrement(&up).unwrap(), s);
                }
                Err(e) => {
                    prop_assert!(s.chars().all(|c| c == MAX_DATA_CHAR));
                    prop_assert_eq!(e, BoundError::exhausted(&s));
                }
            }
        }

        #[test]
        fn decrement_then_increment_is_identity(s in data_string()) {
            match decrement(&s) {
                Ok(down) => {
                    prop_assert!(down < s);
                    prop_assert_eq!(increment(&down).unwrap(), s);
                }
                Err(_) => prop_assert!(s.chars().all(|c| c == MIN_DATA_CHAR)),
            }
        }
    }
}
