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

//! Per-type field handlers.
//!
//! A [`FieldReader`] appends decoded field payloads to the column builder it
//! owns; a [`FieldWriter`] encodes one row of the column array it is bound
//! to. Both are tagged variants dispatched by `match` and recurse through
//! `List`/`Record` arms, so handler depth is bounded by the declared type
//! depth. The reader and writer arms for a given type live side by side in
//! this module; a new type touches both.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BinaryBuilder, BooleanArray, BooleanBufferBuilder,
    BooleanBuilder, Date32Array, Date32Builder, FixedSizeBinaryArray, FixedSizeBinaryBuilder,
    Float32Array, Float32Builder, Float64Array, Float64Builder, Int16Array, Int16Builder,
    Int32Array, Int32Builder, Int64Array, Int64Builder, IntervalMonthDayNanoArray,
    IntervalMonthDayNanoBuilder, ListArray, StringArray, StringBuilder, StructArray,
    Time64MicrosecondArray, Time64MicrosecondBuilder, TimestampMicrosecondArray,
    TimestampMicrosecondBuilder,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{Field, FieldRef, Fields, IntervalMonthDayNanoType};
use arrow::error::ArrowError;

use crate::error::{CopyError, Result};
use crate::numeric::{decode_numeric, encode_numeric};
use crate::types::{child_path, PostgresType, PostgresTypeId};
use crate::wire::{
    backfill_i32, put_f32, put_f64, put_i16, put_i32, put_i64, put_u32, put_u8, reserve_i32, Cursor,
};
use crate::{EPOCH_DAYS, EPOCH_MICROS};

/// Decodes field payloads for one column (or one nested member) and
/// accumulates them in an Arrow builder.
pub struct FieldReader {
    path: String,
    kind: ReaderKind,
}

enum ReaderKind {
    Bool(BooleanBuilder),
    Int2(Int16Builder),
    Int4(Int32Builder),
    Int8(Int64Builder),
    Float4(Float32Builder),
    Float8(Float64Builder),
    Date(Date32Builder),
    Time(Time64MicrosecondBuilder),
    Timestamp(TimestampMicrosecondBuilder),
    Interval(IntervalMonthDayNanoBuilder),
    Text(StringBuilder),
    Numeric(StringBuilder),
    Bytea(BinaryBuilder),
    Uuid(FixedSizeBinaryBuilder),
    List {
        field: FieldRef,
        element_oid: u32,
        offsets: Vec<i32>,
        validity: BooleanBufferBuilder,
        child: Box<FieldReader>,
    },
    Record {
        fields: Fields,
        validity: BooleanBufferBuilder,
        children: Vec<(u32, FieldReader)>,
    },
}

impl FieldReader {
    pub fn new(ty: &PostgresType, path: String) -> Result<Self> {
        let kind = match ty.id() {
            PostgresTypeId::Bool => ReaderKind::Bool(BooleanBuilder::new()),
            PostgresTypeId::Int2 => ReaderKind::Int2(Int16Builder::new()),
            PostgresTypeId::Int4 => ReaderKind::Int4(Int32Builder::new()),
            PostgresTypeId::Int8 => ReaderKind::Int8(Int64Builder::new()),
            PostgresTypeId::Float4 => ReaderKind::Float4(Float32Builder::new()),
            PostgresTypeId::Float8 => ReaderKind::Float8(Float64Builder::new()),
            PostgresTypeId::Date => ReaderKind::Date(Date32Builder::new()),
            PostgresTypeId::Time => ReaderKind::Time(Time64MicrosecondBuilder::new()),
            PostgresTypeId::Timestamp => {
                ReaderKind::Timestamp(TimestampMicrosecondBuilder::new())
            }
            PostgresTypeId::TimestampTz => {
                ReaderKind::Timestamp(TimestampMicrosecondBuilder::new().with_timezone("UTC"))
            }
            PostgresTypeId::Interval => ReaderKind::Interval(IntervalMonthDayNanoBuilder::new()),
            PostgresTypeId::Text
            | PostgresTypeId::Varchar
            | PostgresTypeId::Char
            | PostgresTypeId::Name
            | PostgresTypeId::Json => ReaderKind::Text(StringBuilder::new()),
            PostgresTypeId::Numeric => ReaderKind::Numeric(StringBuilder::new()),
            PostgresTypeId::Bytea => ReaderKind::Bytea(BinaryBuilder::new()),
            PostgresTypeId::Uuid => ReaderKind::Uuid(FixedSizeBinaryBuilder::new(16)),
            PostgresTypeId::Array => {
                let elem = ty.element().ok_or_else(|| CopyError::UnsupportedType {
                    path: path.clone(),
                    name: "array without an element type".to_string(),
                })?;
                let field = Arc::new(Field::new("item", elem.to_data_type()?, true));
                ReaderKind::List {
                    field,
                    element_oid: elem.oid(),
                    offsets: vec![0],
                    validity: BooleanBufferBuilder::new(0),
                    child: Box::new(FieldReader::new(elem, child_path(&path, "item"))?),
                }
            }
            PostgresTypeId::Record => {
                let mut fields = Vec::with_capacity(ty.field_count());
                let mut children = Vec::with_capacity(ty.field_count());
                for (name, child_ty) in ty.fields() {
                    fields.push(Field::new(name, child_ty.to_data_type()?, true));
                    children.push((
                        child_ty.oid(),
                        FieldReader::new(child_ty, child_path(&path, name))?,
                    ));
                }
                ReaderKind::Record {
                    fields: Fields::from(fields),
                    validity: BooleanBufferBuilder::new(0),
                    children,
                }
            }
        };
        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn append_null(&mut self) {
        match &mut self.kind {
            ReaderKind::Bool(b) => b.append_null(),
            ReaderKind::Int2(b) => b.append_null(),
            ReaderKind::Int4(b) => b.append_null(),
            ReaderKind::Int8(b) => b.append_null(),
            ReaderKind::Float4(b) => b.append_null(),
            ReaderKind::Float8(b) => b.append_null(),
            ReaderKind::Date(b) => b.append_null(),
            ReaderKind::Time(b) => b.append_null(),
            ReaderKind::Timestamp(b) => b.append_null(),
            ReaderKind::Interval(b) => b.append_null(),
            ReaderKind::Text(b) => b.append_null(),
            ReaderKind::Numeric(b) => b.append_null(),
            ReaderKind::Bytea(b) => b.append_null(),
            ReaderKind::Uuid(b) => b.append_null(),
            ReaderKind::List {
                offsets, validity, ..
            } => {
                let last = offsets.last().copied().unwrap_or(0);
                offsets.push(last);
                validity.append(false);
            }
            ReaderKind::Record {
                validity, children, ..
            } => {
                // struct children stay aligned with the parent length
                for (_, child) in children {
                    child.append_null();
                }
                validity.append(false);
            }
        }
    }

    /// Consumes one non-NULL payload of exactly `len` bytes and appends the
    /// value. The caller verifies consumption, see [`read_sized`].
    fn read(&mut self, cur: &mut Cursor<'_>, len: usize) -> Result<()> {
        let path = &self.path;
        match &mut self.kind {
            ReaderKind::Bool(b) => {
                expect_len(path, 1, len, cur.position())?;
                let at = cur.position();
                match cur.read_u8()? {
                    0 => b.append_value(false),
                    1 => b.append_value(true),
                    other => {
                        return Err(CopyError::InvalidValue {
                            path: path.clone(),
                            message: format!("invalid boolean byte {other:#04x}"),
                            offset: at,
                        })
                    }
                }
            }
            ReaderKind::Int2(b) => {
                expect_len(path, 2, len, cur.position())?;
                b.append_value(cur.read_i16()?);
            }
            ReaderKind::Int4(b) => {
                expect_len(path, 4, len, cur.position())?;
                b.append_value(cur.read_i32()?);
            }
            ReaderKind::Int8(b) => {
                expect_len(path, 8, len, cur.position())?;
                b.append_value(cur.read_i64()?);
            }
            ReaderKind::Float4(b) => {
                expect_len(path, 4, len, cur.position())?;
                b.append_value(cur.read_f32()?);
            }
            ReaderKind::Float8(b) => {
                expect_len(path, 8, len, cur.position())?;
                b.append_value(cur.read_f64()?);
            }
            ReaderKind::Date(b) => {
                expect_len(path, 4, len, cur.position())?;
                b.append_value(cur.read_i32()? + EPOCH_DAYS);
            }
            ReaderKind::Time(b) => {
                expect_len(path, 8, len, cur.position())?;
                b.append_value(cur.read_i64()?);
            }
            ReaderKind::Timestamp(b) => {
                expect_len(path, 8, len, cur.position())?;
                b.append_value(cur.read_i64()? + EPOCH_MICROS);
            }
            ReaderKind::Interval(b) => {
                expect_len(path, 16, len, cur.position())?;
                let at = cur.position();
                let micros = cur.read_i64()?;
                let days = cur.read_i32()?;
                let months = cur.read_i32()?;
                let nanos = micros.checked_mul(1000).ok_or_else(|| CopyError::InvalidValue {
                    path: path.clone(),
                    message: format!("interval of {micros} microseconds overflows nanoseconds"),
                    offset: at,
                })?;
                b.append_value(IntervalMonthDayNanoType::make_value(months, days, nanos));
            }
            ReaderKind::Text(b) => {
                let at = cur.position();
                let bytes = cur.take(len)?;
                let text = std::str::from_utf8(bytes).map_err(|e| CopyError::InvalidValue {
                    path: path.clone(),
                    message: format!("invalid UTF-8 in text payload: {e}"),
                    offset: at,
                })?;
                b.append_value(text);
            }
            ReaderKind::Numeric(b) => {
                b.append_value(decode_numeric(cur, len, path)?);
            }
            ReaderKind::Bytea(b) => {
                b.append_value(cur.take(len)?);
            }
            ReaderKind::Uuid(b) => {
                expect_len(path, 16, len, cur.position())?;
                b.append_value(cur.take(16)?)?;
            }
            ReaderKind::List {
                element_oid,
                offsets,
                validity,
                child,
                ..
            } => {
                let header_at = cur.position();
                let ndim = cur.read_i32()?;
                let _has_nulls = cur.read_i32()?;
                let oid_at = cur.position();
                let oid = cur.read_u32()?;
                if oid != *element_oid {
                    return Err(CopyError::OidMismatch {
                        path: path.clone(),
                        expected: *element_oid,
                        actual: oid,
                        offset: oid_at,
                    });
                }
                if ndim < 0 {
                    return Err(CopyError::ArrayShape {
                        path: path.clone(),
                        message: format!("negative dimension count {ndim}"),
                        offset: header_at,
                    });
                }
                // multi-dimensional input flattens to one list of
                // product(dim_sizes) elements
                let mut total: i64 = i64::from(ndim != 0);
                for _ in 0..ndim {
                    let dim_at = cur.position();
                    let size = cur.read_i32()?;
                    let _lower_bound = cur.read_i32()?;
                    if size < 0 {
                        return Err(CopyError::ArrayShape {
                            path: path.clone(),
                            message: format!("negative dimension size {size}"),
                            offset: dim_at,
                        });
                    }
                    total =
                        total
                            .checked_mul(size as i64)
                            .ok_or_else(|| CopyError::ArrayShape {
                                path: path.clone(),
                                message: "element count overflows".to_string(),
                                offset: dim_at,
                            })?;
                }
                for _ in 0..total {
                    let elem_len = cur.read_length()?;
                    if elem_len == -1 {
                        child.append_null();
                    } else {
                        read_sized(child, cur, elem_len)?;
                    }
                }
                let last = offsets.last().copied().unwrap_or(0);
                let next = i32::try_from(last as i64 + total).map_err(|_| CopyError::ArrayShape {
                    path: path.clone(),
                    message: "list offsets overflow 32 bits".to_string(),
                    offset: header_at,
                })?;
                offsets.push(next);
                validity.append(true);
            }
            ReaderKind::Record {
                validity, children, ..
            } => {
                let header_at = cur.position();
                let nfields = cur.read_i32()?;
                if nfields as i64 != children.len() as i64 {
                    return Err(CopyError::FieldCountMismatch {
                        path: path.clone(),
                        expected: children.len(),
                        actual: nfields as i64,
                        offset: header_at,
                    });
                }
                for (declared_oid, child) in children.iter_mut() {
                    let oid_at = cur.position();
                    let oid = cur.read_u32()?;
                    if oid != *declared_oid {
                        return Err(CopyError::OidMismatch {
                            path: child.path.clone(),
                            expected: *declared_oid,
                            actual: oid,
                            offset: oid_at,
                        });
                    }
                    let field_len = cur.read_length()?;
                    if field_len == -1 {
                        child.append_null();
                    } else {
                        read_sized(child, cur, field_len)?;
                    }
                }
                validity.append(true);
            }
        }
        Ok(())
    }

    /// Transfers the accumulated column out of the builder.
    pub fn finish(&mut self) -> Result<ArrayRef> {
        let array: ArrayRef = match &mut self.kind {
            ReaderKind::Bool(b) => Arc::new(b.finish()),
            ReaderKind::Int2(b) => Arc::new(b.finish()),
            ReaderKind::Int4(b) => Arc::new(b.finish()),
            ReaderKind::Int8(b) => Arc::new(b.finish()),
            ReaderKind::Float4(b) => Arc::new(b.finish()),
            ReaderKind::Float8(b) => Arc::new(b.finish()),
            ReaderKind::Date(b) => Arc::new(b.finish()),
            ReaderKind::Time(b) => Arc::new(b.finish()),
            ReaderKind::Timestamp(b) => Arc::new(b.finish()),
            ReaderKind::Interval(b) => Arc::new(b.finish()),
            ReaderKind::Text(b) => Arc::new(b.finish()),
            ReaderKind::Numeric(b) => Arc::new(b.finish()),
            ReaderKind::Bytea(b) => Arc::new(b.finish()),
            ReaderKind::Uuid(b) => Arc::new(b.finish()),
            ReaderKind::List {
                field,
                offsets,
                validity,
                child,
                ..
            } => {
                let values = child.finish()?;
                let offsets = OffsetBuffer::new(ScalarBuffer::from(std::mem::replace(
                    offsets,
                    vec![0],
                )));
                let nulls = NullBuffer::new(validity.finish());
                Arc::new(ListArray::try_new(
                    field.clone(),
                    offsets,
                    values,
                    Some(nulls),
                )?)
            }
            ReaderKind::Record {
                fields,
                validity,
                children,
            } => {
                let mut arrays = Vec::with_capacity(children.len());
                for (_, child) in children {
                    arrays.push(child.finish()?);
                }
                let nulls = NullBuffer::new(validity.finish());
                Arc::new(StructArray::try_new(fields.clone(), arrays, Some(nulls))?)
            }
        };
        Ok(array)
    }
}

fn expect_len(path: &str, expected: usize, actual: usize, offset: usize) -> Result<()> {
    if expected != actual {
        return Err(CopyError::LengthMismatch {
            path: path.to_string(),
            expected,
            actual: actual as i64,
            offset,
        });
    }
    Ok(())
}

/// Runs a field reader over a payload of the declared length and verifies
/// that the cursor advanced by exactly that many bytes.
pub fn read_sized(reader: &mut FieldReader, cur: &mut Cursor<'_>, len: i32) -> Result<()> {
    let start = cur.position();
    if len < 0 {
        return Err(CopyError::InvalidValue {
            path: reader.path.clone(),
            message: format!("negative field length {len}"),
            offset: start,
        });
    }
    let len = len as usize;
    // surface truncation as a short read before the handler runs
    cur.peek(len)?;
    reader.read(cur, len)?;
    let consumed = cur.position() - start;
    if consumed != len {
        return Err(CopyError::LengthMismatch {
            path: reader.path.clone(),
            expected: len,
            actual: consumed as i64,
            offset: start,
        });
    }
    Ok(())
}

/// Encodes one row of the column array it is bound to.
#[derive(Debug)]
pub struct FieldWriter {
    path: String,
    kind: WriterKind,
}

#[derive(Debug)]
enum WriterKind {
    Bool(BooleanArray),
    Int2(Int16Array),
    Int4(Int32Array),
    Int8(Int64Array),
    Float4(Float32Array),
    Float8(Float64Array),
    Date(Date32Array),
    Time(Time64MicrosecondArray),
    Timestamp(TimestampMicrosecondArray),
    Interval(IntervalMonthDayNanoArray),
    Text(StringArray),
    Numeric(StringArray),
    Bytea(BinaryArray),
    Uuid(FixedSizeBinaryArray),
    List {
        list: ListArray,
        element_oid: u32,
        child: Box<FieldWriter>,
    },
    Record {
        strct: StructArray,
        children: Vec<(u32, FieldWriter)>,
    },
}

impl FieldWriter {
    pub fn new(ty: &PostgresType, array: &ArrayRef, path: String) -> Result<Self> {
        let kind = match ty.id() {
            PostgresTypeId::Bool => WriterKind::Bool(downcast(array, &path)?),
            PostgresTypeId::Int2 => WriterKind::Int2(downcast(array, &path)?),
            PostgresTypeId::Int4 => WriterKind::Int4(downcast(array, &path)?),
            PostgresTypeId::Int8 => WriterKind::Int8(downcast(array, &path)?),
            PostgresTypeId::Float4 => WriterKind::Float4(downcast(array, &path)?),
            PostgresTypeId::Float8 => WriterKind::Float8(downcast(array, &path)?),
            PostgresTypeId::Date => WriterKind::Date(downcast(array, &path)?),
            PostgresTypeId::Time => WriterKind::Time(downcast(array, &path)?),
            PostgresTypeId::Timestamp | PostgresTypeId::TimestampTz => {
                WriterKind::Timestamp(downcast(array, &path)?)
            }
            PostgresTypeId::Interval => WriterKind::Interval(downcast(array, &path)?),
            PostgresTypeId::Text
            | PostgresTypeId::Varchar
            | PostgresTypeId::Char
            | PostgresTypeId::Name
            | PostgresTypeId::Json => WriterKind::Text(downcast(array, &path)?),
            PostgresTypeId::Numeric => WriterKind::Numeric(downcast(array, &path)?),
            PostgresTypeId::Bytea => WriterKind::Bytea(downcast(array, &path)?),
            PostgresTypeId::Uuid => WriterKind::Uuid(downcast(array, &path)?),
            PostgresTypeId::Array => {
                let elem = ty.element().ok_or_else(|| CopyError::UnsupportedType {
                    path: path.clone(),
                    name: "array without an element type".to_string(),
                })?;
                let list: ListArray = downcast(array, &path)?;
                let child = FieldWriter::new(elem, list.values(), child_path(&path, "item"))?;
                WriterKind::List {
                    list,
                    element_oid: elem.oid(),
                    child: Box::new(child),
                }
            }
            PostgresTypeId::Record => {
                let strct: StructArray = downcast(array, &path)?;
                if strct.num_columns() != ty.field_count() {
                    return Err(CopyError::FieldCountMismatch {
                        path: path.clone(),
                        expected: ty.field_count(),
                        actual: strct.num_columns() as i64,
                        offset: 0,
                    });
                }
                let mut children = Vec::with_capacity(ty.field_count());
                for (i, (name, child_ty)) in ty.fields().iter().enumerate() {
                    let child =
                        FieldWriter::new(child_ty, strct.column(i), child_path(&path, name))?;
                    children.push((child_ty.oid(), child));
                }
                WriterKind::Record { strct, children }
            }
        };
        Ok(Self { path, kind })
    }

    fn as_array(&self) -> &dyn Array {
        match &self.kind {
            WriterKind::Bool(a) => a,
            WriterKind::Int2(a) => a,
            WriterKind::Int4(a) => a,
            WriterKind::Int8(a) => a,
            WriterKind::Float4(a) => a,
            WriterKind::Float8(a) => a,
            WriterKind::Date(a) => a,
            WriterKind::Time(a) => a,
            WriterKind::Timestamp(a) => a,
            WriterKind::Interval(a) => a,
            WriterKind::Text(a) => a,
            WriterKind::Numeric(a) => a,
            WriterKind::Bytea(a) => a,
            WriterKind::Uuid(a) => a,
            WriterKind::List { list, .. } => list,
            WriterKind::Record { strct, .. } => strct,
        }
    }

    pub fn len(&self) -> usize {
        self.as_array().len()
    }

    /// Appends the row's field encoding: `-1` for NULL, otherwise the
    /// four-byte length backfilled around the payload.
    pub fn write(&mut self, out: &mut Vec<u8>, row: usize) -> Result<()> {
        if self.as_array().is_null(row) {
            put_i32(out, -1);
            return Ok(());
        }
        let at = reserve_i32(out);
        self.write_payload(out, row)?;
        let len = (out.len() - at - 4) as i32;
        backfill_i32(out, at, len);
        Ok(())
    }

    fn write_payload(&mut self, out: &mut Vec<u8>, row: usize) -> Result<()> {
        match &mut self.kind {
            WriterKind::Bool(a) => put_u8(out, a.value(row) as u8),
            WriterKind::Int2(a) => put_i16(out, a.value(row)),
            WriterKind::Int4(a) => put_i32(out, a.value(row)),
            WriterKind::Int8(a) => put_i64(out, a.value(row)),
            WriterKind::Float4(a) => put_f32(out, a.value(row)),
            WriterKind::Float8(a) => put_f64(out, a.value(row)),
            WriterKind::Date(a) => put_i32(out, a.value(row) - EPOCH_DAYS),
            WriterKind::Time(a) => put_i64(out, a.value(row)),
            WriterKind::Timestamp(a) => put_i64(out, a.value(row) - EPOCH_MICROS),
            WriterKind::Interval(a) => {
                let v = a.value(row);
                if v.nanoseconds % 1000 != 0 {
                    return Err(CopyError::InvalidValue {
                        path: self.path.clone(),
                        message: "interval has sub-microsecond precision".to_string(),
                        offset: out.len(),
                    });
                }
                put_i64(out, v.nanoseconds / 1000);
                put_i32(out, v.days);
                put_i32(out, v.months);
            }
            WriterKind::Text(a) => out.extend_from_slice(a.value(row).as_bytes()),
            WriterKind::Numeric(a) => {
                let value = a.value(row).to_string();
                encode_numeric(out, &value, &self.path)?;
            }
            WriterKind::Bytea(a) => out.extend_from_slice(a.value(row)),
            WriterKind::Uuid(a) => out.extend_from_slice(a.value(row)),
            WriterKind::List {
                list,
                element_oid,
                child,
            } => {
                let start = list.value_offsets()[row] as usize;
                let end = list.value_offsets()[row + 1] as usize;
                if start == end {
                    // the server transmits an empty array as zero dimensions
                    put_i32(out, 0);
                    put_i32(out, 0);
                    put_u32(out, *element_oid);
                } else {
                    let has_nulls = (start..end).any(|i| child.as_array().is_null(i));
                    put_i32(out, 1);
                    put_i32(out, has_nulls as i32);
                    put_u32(out, *element_oid);
                    put_i32(out, (end - start) as i32);
                    put_i32(out, 1); // lower bound
                    for i in start..end {
                        child.write(out, i)?;
                    }
                }
            }
            WriterKind::Record { children, .. } => {
                put_i32(out, children.len() as i32);
                for (oid, child) in children.iter_mut() {
                    put_u32(out, *oid);
                    child.write(out, row)?;
                }
            }
        }
        Ok(())
    }
}

fn downcast<T: Array + Clone + 'static>(array: &ArrayRef, path: &str) -> Result<T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| {
            CopyError::Arrow(ArrowError::InvalidArgumentError(format!(
                "column {path}: array of {:?} does not match the declared type",
                array.data_type()
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PostgresType;
    use arrow::array::AsArray;
    use arrow::datatypes::Int32Type;

    fn int4_reader() -> FieldReader {
        FieldReader::new(&PostgresType::new(PostgresTypeId::Int4), "col".to_string()).unwrap()
    }

    #[test]
    fn test_fixed_width_rejects_wrong_length() {
        let mut reader = int4_reader();
        let payload = [0x00, 0x01];
        let mut cur = Cursor::new(&payload);
        let err = read_sized(&mut reader, &mut cur, 2).unwrap_err();
        match err {
            CopyError::LengthMismatch { path, expected, .. } => {
                assert_eq!(path, "col");
                assert_eq!(expected, 4);
            }
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_bool_domain_is_zero_or_one() {
        let mut reader =
            FieldReader::new(&PostgresType::new(PostgresTypeId::Bool), "col".to_string()).unwrap();
        let payload = [0x02];
        let mut cur = Cursor::new(&payload);
        let err = read_sized(&mut reader, &mut cur, 1).unwrap_err();
        assert!(matches!(err, CopyError::InvalidValue { .. }));
    }

    #[test]
    fn test_list_element_oid_is_validated() {
        let mut reader = FieldReader::new(
            &PostgresType::new(PostgresTypeId::Int4).array(),
            "col".to_string(),
        )
        .unwrap();
        // ndim 1, no nulls, element oid 25 (text) instead of 23, one element
        let payload = [
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x19, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01,
        ];
        let mut cur = Cursor::new(&payload);
        let err = read_sized(&mut reader, &mut cur, payload.len() as i32).unwrap_err();
        match err {
            CopyError::OidMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, 23);
                assert_eq!(actual, 25);
            }
            other => panic!("expected OidMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_paths_name_the_failing_member() {
        let ty = PostgresType::record(vec![(
            "outer",
            PostgresType::record(vec![("inner", PostgresType::new(PostgresTypeId::Int2))]),
        )]);
        let reader = FieldReader::new(&ty, String::new()).unwrap();
        match &reader.kind {
            ReaderKind::Record { children, .. } => match &children[0].1.kind {
                ReaderKind::Record { children, .. } => {
                    assert_eq!(children[0].1.path(), "outer.inner");
                }
                _ => panic!("expected nested record"),
            },
            _ => panic!("expected record"),
        }
    }

    #[test]
    fn test_reader_appends_and_finishes() {
        let mut reader = int4_reader();
        let payload = [0x00, 0x00, 0x00, 0x7b];
        let mut cur = Cursor::new(&payload);
        read_sized(&mut reader, &mut cur, 4).unwrap();
        reader.append_null();
        let array = reader.finish().unwrap();
        let ints = array.as_primitive::<Int32Type>();
        assert_eq!(ints.len(), 2);
        assert_eq!(ints.value(0), 123);
        assert!(ints.is_null(1));
    }
}
