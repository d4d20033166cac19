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

//! COPY stream reader.
//!
//! A [`CopyStreamReader`] turns one binary COPY stream into one Arrow record
//! batch. It is single-use: construct it from the record's
//! [`PostgresType`], consume the header, consume records until the trailer,
//! then take the batch:
//!
//! ```
//! use arrow_pgcopy::{CopyStreamReader, Cursor, PostgresType, PostgresTypeId};
//!
//! # let data: Vec<u8> = {
//! #     let mut v = arrow_pgcopy::MAGIC.to_vec();
//! #     v.extend_from_slice(&[0; 8]);
//! #     v.extend_from_slice(&[0xff, 0xff]);
//! #     v
//! # };
//! let root = PostgresType::record(vec![("col", PostgresType::new(PostgresTypeId::Int4))]);
//! let mut reader = CopyStreamReader::new(root).unwrap();
//! let mut cursor = Cursor::new(&data);
//! reader.read_header(&mut cursor).unwrap();
//! while reader.read_record(&mut cursor).unwrap() {}
//! let batch = reader.finish().unwrap();
//! ```
//!
//! A failed read poisons the reader; subsequent calls report the stored
//! failure instead of resynchronizing, because a COPY stream cannot be
//! re-entered mid-tuple.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{CopyError, Result};
use crate::field::{read_sized, FieldReader};
use crate::types::PostgresType;
use crate::wire::Cursor;
use crate::MAGIC;

enum ReaderState {
    Initialized,
    HeaderConsumed,
    Finished,
    Finalized,
    Failed(String),
}

pub struct CopyStreamReader {
    schema: SchemaRef,
    columns: Vec<FieldReader>,
    rows: usize,
    state: ReaderState,
}

impl CopyStreamReader {
    /// Infers the output schema and builds the field reader tree for the
    /// given record type.
    pub fn new(root: PostgresType) -> Result<Self> {
        let schema = Arc::new(root.infer_schema()?);
        let mut columns = Vec::with_capacity(root.field_count());
        for (name, child) in root.fields() {
            columns.push(FieldReader::new(child, name.clone())?);
        }
        Ok(Self {
            schema,
            columns,
            rows: 0,
            state: ReaderState::Initialized,
        })
    }

    /// The Arrow schema of the batch this reader builds.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn rows_read(&self) -> usize {
        self.rows
    }

    /// Verifies the signature, rejects unknown flags and skips the header
    /// extension area.
    pub fn read_header(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        match &self.state {
            ReaderState::Initialized => {}
            ReaderState::Failed(msg) => return Err(previous_failure(msg)),
            _ => {
                return Err(CopyError::InvalidState(
                    "the COPY header was already consumed".to_string(),
                ))
            }
        }
        match self.read_header_inner(cur) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = ReaderState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn read_header_inner(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        let at = cur.position();
        if cur.take(MAGIC.len())? != MAGIC {
            return Err(CopyError::BadSignature { offset: at });
        }
        let flags = cur.read_u32()?;
        if flags != 0 {
            return Err(CopyError::UnsupportedFlag { flags });
        }
        let extension = cur.read_u32()?;
        cur.advance(extension as usize)?;
        debug!("consumed COPY header ({extension} extension bytes)");
        self.state = ReaderState::HeaderConsumed;
        Ok(())
    }

    /// Consumes one tuple and appends it to the column builders. Returns
    /// `Ok(false)` once the end-of-stream trailer is reached.
    pub fn read_record(&mut self, cur: &mut Cursor<'_>) -> Result<bool> {
        match &self.state {
            ReaderState::HeaderConsumed => {}
            ReaderState::Finished => return Ok(false),
            ReaderState::Initialized => {
                return Err(CopyError::InvalidState(
                    "read_header must be called before read_record".to_string(),
                ))
            }
            ReaderState::Finalized => {
                return Err(CopyError::InvalidState(
                    "the reader was already finalized".to_string(),
                ))
            }
            ReaderState::Failed(msg) => return Err(previous_failure(msg)),
        }
        match self.read_record_inner(cur) {
            Ok(more) => Ok(more),
            Err(e) => {
                self.state = ReaderState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn read_record_inner(&mut self, cur: &mut Cursor<'_>) -> Result<bool> {
        let at = cur.position();
        let nfields = cur.read_i16()?;
        if nfields == -1 {
            self.state = ReaderState::Finished;
            debug!("reached COPY trailer after {} rows", self.rows);
            return Ok(false);
        }
        if nfields as i64 != self.columns.len() as i64 {
            return Err(CopyError::FieldCountMismatch {
                path: "row".to_string(),
                expected: self.columns.len(),
                actual: nfields as i64,
                offset: at,
            });
        }
        for column in &mut self.columns {
            let len = cur.read_length()?;
            if len == -1 {
                column.append_null();
            } else {
                read_sized(column, cur, len)?;
            }
        }
        self.rows += 1;
        Ok(true)
    }

    /// Hands over the accumulated batch. Valid only after the trailer; the
    /// reader cannot be used afterwards.
    pub fn finish(&mut self) -> Result<RecordBatch> {
        match &self.state {
            ReaderState::Finished => {}
            ReaderState::Failed(msg) => return Err(previous_failure(msg)),
            _ => {
                return Err(CopyError::InvalidState(
                    "finish is only valid after the end-of-stream trailer".to_string(),
                ))
            }
        }
        self.state = ReaderState::Finalized;
        let mut arrays = Vec::with_capacity(self.columns.len());
        for column in &mut self.columns {
            arrays.push(column.finish()?);
        }
        Ok(RecordBatch::try_new(self.schema.clone(), arrays)?)
    }
}

fn previous_failure(msg: &str) -> CopyError {
    CopyError::InvalidState(format!("the reader previously failed: {msg}"))
}

/// Reads a whole in-memory COPY stream into a record batch.
pub fn read_from_binary(data: &[u8], root: &PostgresType) -> Result<RecordBatch> {
    let mut reader = CopyStreamReader::new(root.clone())?;
    let mut cur = Cursor::new(data);
    reader.read_header(&mut cur)?;
    while reader.read_record(&mut cur)? {}
    reader.finish()
}
