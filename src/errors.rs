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

//! Error types for bound arithmetic and skip-scanning.

use std::io;

/// Error of the pure bound arithmetic, without any scan context attached.
#[derive(Clone, PartialEq, Eq, thiserror::Error, Debug)]
pub enum BoundError {
    /// The bound can not be stepped without changing its length.
    ///
    /// Every code point is already at the end of the domain, or the bound is empty.
    #[error("BoundExhausted: can not step {bound:?} without changing its length")]
    Exhausted { bound: String },

    /// The value does not belong to the domain of a fixed-length field.
    #[error("InvalidDomainValue: {value:?} is not a valid {domain} value")]
    InvalidDomainValue { value: String, domain: &'static str },
}

impl BoundError {
    pub fn exhausted(bound: impl ToString) -> Self {
        Self::Exhausted {
            bound: bound.to_string(),
        }
    }
}

/// Error returned by range spec construction and by a running skip-scan.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// A fixed-length field can not represent the successor a seek requires.
    ///
    /// This is a schema or configuration problem and is never retried.
    #[error("BoundExhausted: field {field:?} of composite attribute {attribute:?}: {source}")]
    BoundExhausted {
        attribute: String,
        field: String,
        #[source]
        source: BoundError,
    },

    /// The constraints can not be turned into a range spec.
    #[error("InvalidRangeSpec: composite attribute {attribute:?}: {reason}")]
    InvalidRangeSpec { attribute: String, reason: String },

    /// A storage key is not valid UTF-8 and can not be split into fields.
    #[error("InvalidKeyEncoding: storage key {key:?} is not valid UTF-8")]
    InvalidKeyEncoding { key: Vec<u8> },

    /// The underlying storage cursor failed.
    #[error("Storage: {0}")]
    Storage(#[from] io::Error),
}

impl ScanError {
    pub fn invalid_range_spec(attribute: impl ToString, reason: impl ToString) -> Self {
        Self::InvalidRangeSpec {
            attribute: attribute.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn bound_exhausted(
        attribute: impl ToString,
        field: impl ToString,
        source: BoundError,
    ) -> Self {
        Self::BoundExhausted {
            attribute: attribute.to_string(),
            field: field.to_string(),
            source,
        }
    }

    /// Whether retrying the scan could succeed.
    ///
    /// Only storage failures may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanError::Storage(_))
    }
}

impl From<ScanError> for io::Error {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Storage(io_err) => io_err,
            ScanError::InvalidRangeSpec { .. } => io::Error::new(io::ErrorKind::InvalidInput, e),
            ScanError::BoundExhausted { .. } | ScanError::InvalidKeyEncoding { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
        }
    }
}
