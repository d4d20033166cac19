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

//! COPY stream writer.
//!
//! A [`CopyStreamWriter`] turns one record batch into one binary COPY
//! stream. The PostgreSQL type of each column is derived from the Arrow
//! schema. Where the derivation is ambiguous (an Arrow `Utf8` column can be
//! `text` or `numeric` on the server), construct the writer through
//! [`CopyStreamWriter::with_type`] with an explicit descriptor.
//!
//! The writer emits the end-of-stream trailer itself once all rows are
//! written; transports that send the trailer on their own can truncate the
//! final two bytes.

use arrow::array::ArrayRef;
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::error::{CopyError, Result};
use crate::field::FieldWriter;
use crate::types::{PostgresType, PostgresTypeId};
use crate::wire::put_i16;
use crate::MAGIC;

#[derive(Debug)]
enum WriterState {
    Initialized,
    HeaderWritten,
    TrailerWritten,
    Failed(String),
}

#[derive(Debug)]
pub struct CopyStreamWriter {
    columns: Vec<FieldWriter>,
    num_rows: usize,
    row: usize,
    state: WriterState,
}

impl CopyStreamWriter {
    /// Binds a writer to a batch, deriving the PostgreSQL record type from
    /// the batch schema.
    pub fn new(batch: &RecordBatch) -> Result<Self> {
        let root = PostgresType::from_data_type(&DataType::Struct(batch.schema().fields().clone()))?;
        Self::with_type(batch, root)
    }

    /// Binds a writer to a batch with an explicitly declared record type.
    pub fn with_type(batch: &RecordBatch, root: PostgresType) -> Result<Self> {
        if root.id() != PostgresTypeId::Record {
            return Err(CopyError::InvalidState(
                "the root type of a COPY stream must be a record".to_string(),
            ));
        }
        if root.field_count() != batch.num_columns() {
            return Err(CopyError::FieldCountMismatch {
                path: "row".to_string(),
                expected: root.field_count(),
                actual: batch.num_columns() as i64,
                offset: 0,
            });
        }
        let mut columns = Vec::with_capacity(batch.num_columns());
        for (i, (name, ty)) in root.fields().iter().enumerate() {
            let column = normalize(batch.column(i), ty)?;
            columns.push(FieldWriter::new(ty, &column, name.clone())?);
        }
        Ok(Self {
            columns,
            num_rows: batch.num_rows(),
            row: 0,
            state: WriterState::Initialized,
        })
    }

    /// Appends the signature, the zero flags word and an empty header
    /// extension.
    pub fn write_header(&mut self, out: &mut Vec<u8>) -> Result<()> {
        match &self.state {
            WriterState::Initialized => {}
            WriterState::Failed(msg) => return Err(previous_failure(msg)),
            _ => {
                return Err(CopyError::InvalidState(
                    "the COPY header was already written".to_string(),
                ))
            }
        }
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[0; 4]); // flags
        out.extend_from_slice(&[0; 4]); // header extension length
        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Appends the next tuple, or the trailer once the batch is exhausted.
    /// Returns `Ok(false)` when the trailer has been written.
    pub fn write_record(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        match &self.state {
            WriterState::HeaderWritten => {}
            WriterState::TrailerWritten => return Ok(false),
            WriterState::Initialized => {
                return Err(CopyError::InvalidState(
                    "write_header must be called before write_record".to_string(),
                ))
            }
            WriterState::Failed(msg) => return Err(previous_failure(msg)),
        }
        if self.row == self.num_rows {
            put_i16(out, -1);
            self.state = WriterState::TrailerWritten;
            debug!("wrote COPY trailer after {} rows", self.row);
            return Ok(false);
        }
        let checkpoint = out.len();
        match self.write_record_inner(out) {
            Ok(()) => {
                self.row += 1;
                Ok(true)
            }
            Err(e) => {
                // drop the partial tuple so the buffer stays framed
                out.truncate(checkpoint);
                self.state = WriterState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn write_record_inner(&mut self, out: &mut Vec<u8>) -> Result<()> {
        put_i16(out, self.columns.len() as i16);
        let row = self.row;
        for column in &mut self.columns {
            column.write(out, row)?;
        }
        Ok(())
    }
}

fn previous_failure(msg: &str) -> CopyError {
    CopyError::InvalidState(format!("the writer previously failed: {msg}"))
}

/// Casts temporal columns to the wire-native unit (days, microseconds)
/// before encoding. Other columns pass through untouched.
fn normalize(column: &ArrayRef, ty: &PostgresType) -> Result<ArrayRef> {
    let target = match (ty.id(), column.data_type()) {
        (PostgresTypeId::Date, DataType::Date64) => Some(DataType::Date32),
        (PostgresTypeId::Time, DataType::Time32(_))
        | (PostgresTypeId::Time, DataType::Time64(TimeUnit::Nanosecond)) => {
            Some(DataType::Time64(TimeUnit::Microsecond))
        }
        (
            PostgresTypeId::Timestamp | PostgresTypeId::TimestampTz,
            DataType::Timestamp(unit, tz),
        ) if *unit != TimeUnit::Microsecond => {
            Some(DataType::Timestamp(TimeUnit::Microsecond, tz.clone()))
        }
        _ => None,
    };
    Ok(match target {
        Some(target) => cast(column, &target)?,
        None => column.clone(),
    })
}

/// Writes a whole record batch as one COPY stream, trailer included.
pub fn write_to_binary(batch: &RecordBatch, out: &mut Vec<u8>) -> Result<()> {
    let mut writer = CopyStreamWriter::new(batch)?;
    writer.write_header(out)?;
    while writer.write_record(out)? {}
    Ok(())
}
