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

//! Relational constraints on component fields, as supplied by the query planner.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A relational operator comparing a field with a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl RelOp {
    /// Whether this operator bounds a field from below.
    pub fn is_lower(&self) -> bool {
        matches!(self, RelOp::Eq | RelOp::Gt | RelOp::Ge)
    }

    /// Whether this operator bounds a field from above.
    pub fn is_upper(&self) -> bool {
        matches!(self, RelOp::Eq | RelOp::Lt | RelOp::Le)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, RelOp::Gt | RelOp::Lt)
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Eq => "==",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
        };
        write!(f, "{}", s)
    }
}

/// `field <op> literal`, one term of a composite predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConstraint {
    pub field: String,
    pub op: RelOp,
    pub literal: String,
}

impl FieldConstraint {
    pub fn new(field: impl ToString, op: RelOp, literal: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            op,
            literal: literal.to_string(),
        }
    }

    pub fn eq(field: impl ToString, literal: impl ToString) -> Self {
        Self::new(field, RelOp::Eq, literal)
    }

    pub fn gt(field: impl ToString, literal: impl ToString) -> Self {
        Self::new(field, RelOp::Gt, literal)
    }

    pub fn ge(field: impl ToString, literal: impl ToString) -> Self {
        Self::new(field, RelOp::Ge, literal)
    }

    pub fn lt(field: impl ToString, literal: impl ToString) -> Self {
        Self::new(field, RelOp::Lt, literal)
    }

    pub fn le(field: impl ToString, literal: impl ToString) -> Self {
        Self::new(field, RelOp::Le, literal)
    }
}

impl fmt::Display for FieldConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.field, self.op, self.literal)
    }
}
