// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error surface of the COPY codec.
//!
//! Decode errors carry the absolute byte offset into the input stream and,
//! where one exists, the path of the field being decoded (`col`,
//! `col.nested1`, `col[].nested2`). Encode errors carry the offset into the
//! output buffer at the point of failure. Errors are never caught
//! internally; any failure aborts the stream.

use arrow::error::ArrowError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CopyError>;

#[derive(Debug, Error)]
pub enum CopyError {
    /// The stream does not start with the 11-byte `PGCOPY` signature.
    #[error("not a PostgreSQL binary COPY stream (bad signature at offset {offset})")]
    BadSignature { offset: usize },

    /// A header flag bit is set that this codec does not implement.
    #[error("unsupported COPY header flags {flags:#010x}")]
    UnsupportedFlag { flags: u32 },

    /// The cursor was exhausted before a required number of bytes.
    #[error(
        "unexpected end of stream at offset {offset}: needed {needed} bytes, {remaining} remain"
    )]
    ShortRead {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A tuple's field count disagrees with the declared record type.
    #[error("{path}: tuple has {actual} fields, expected {expected} (offset {offset})")]
    FieldCountMismatch {
        path: String,
        expected: usize,
        actual: i64,
        offset: usize,
    },

    /// A fixed-width value arrived with the wrong payload length.
    #[error("{path}: expected a {expected}-byte value, field length is {actual} (offset {offset})")]
    LengthMismatch {
        path: String,
        expected: usize,
        actual: i64,
        offset: usize,
    },

    /// No mapping exists between the named type and the columnar type set.
    #[error("{path}: no mapping for type {name}")]
    UnsupportedType { path: String, name: String },

    /// An embedded OID disagrees with the declared child type.
    #[error("{path}: embedded oid {actual} does not match declared oid {expected} (offset {offset})")]
    OidMismatch {
        path: String,
        expected: u32,
        actual: u32,
        offset: usize,
    },

    /// A malformed decimal string (encode) or an impossible digit/weight
    /// combination (decode).
    #[error("{path}: malformed numeric: {message} (offset {offset})")]
    NumericFormat {
        path: String,
        message: String,
        offset: usize,
    },

    /// An array header inconsistent with its payload.
    #[error("{path}: invalid array header: {message} (offset {offset})")]
    ArrayShape {
        path: String,
        message: String,
        offset: usize,
    },

    /// A payload byte pattern outside the type's value domain.
    #[error("{path}: {message} (offset {offset})")]
    InvalidValue {
        path: String,
        message: String,
        offset: usize,
    },

    /// An operation was invoked outside its lifecycle state, or on an
    /// instance that previously failed.
    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_offset_and_path() {
        let err = CopyError::LengthMismatch {
            path: "col.nested1".to_string(),
            expected: 4,
            actual: 2,
            offset: 37,
        };
        let msg = err.to_string();
        assert!(msg.contains("col.nested1"));
        assert!(msg.contains("offset 37"));

        let err = CopyError::ShortRead {
            offset: 19,
            needed: 8,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "unexpected end of stream at offset 19: needed 8 bytes, 3 remain"
        );
    }

    #[test]
    fn test_arrow_error_passthrough() {
        let err: CopyError = ArrowError::ComputeError("nope".to_string()).into();
        assert!(matches!(err, CopyError::Arrow(_)));
    }
}
