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

//! PostgreSQL type descriptors and their Arrow mapping.
//!
//! A [`PostgresType`] is a tree mirroring the server-side type of a COPY
//! stream: a record of named columns, where a column may itself be an array
//! or a nested record. Schema inference walks the tree and produces the
//! corresponding Arrow schema; the writer walks an Arrow schema and derives
//! the descriptor in the other direction.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields, IntervalUnit, Schema, TimeUnit};

use crate::error::{CopyError, Result};

/// The closed set of PostgreSQL types understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostgresTypeId {
    Bool,
    Bytea,
    Char,
    Name,
    Int8,
    Int2,
    Int4,
    Text,
    Json,
    Float4,
    Float8,
    Varchar,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Numeric,
    Uuid,
    Array,
    Record,
}

impl PostgresTypeId {
    /// The catalog OID of the scalar type. `Array` resolves through the
    /// element type, see [`PostgresType::oid`].
    pub fn oid(&self) -> u32 {
        match self {
            PostgresTypeId::Bool => 16,
            PostgresTypeId::Bytea => 17,
            PostgresTypeId::Char => 18,
            PostgresTypeId::Name => 19,
            PostgresTypeId::Int8 => 20,
            PostgresTypeId::Int2 => 21,
            PostgresTypeId::Int4 => 23,
            PostgresTypeId::Text => 25,
            PostgresTypeId::Json => 114,
            PostgresTypeId::Float4 => 700,
            PostgresTypeId::Float8 => 701,
            PostgresTypeId::Varchar => 1043,
            PostgresTypeId::Date => 1082,
            PostgresTypeId::Time => 1083,
            PostgresTypeId::Timestamp => 1114,
            PostgresTypeId::TimestampTz => 1184,
            PostgresTypeId::Interval => 1186,
            PostgresTypeId::Numeric => 1700,
            PostgresTypeId::Uuid => 2950,
            PostgresTypeId::Record => 2249,
            // anyarray; a concrete array resolves through its element
            PostgresTypeId::Array => 2277,
        }
    }

    /// The OID of the one-dimensional array type over this scalar.
    pub fn array_oid(&self) -> u32 {
        match self {
            PostgresTypeId::Bool => 1000,
            PostgresTypeId::Bytea => 1001,
            PostgresTypeId::Char => 1002,
            PostgresTypeId::Name => 1003,
            PostgresTypeId::Int8 => 1016,
            PostgresTypeId::Int2 => 1005,
            PostgresTypeId::Int4 => 1007,
            PostgresTypeId::Text => 1009,
            PostgresTypeId::Json => 199,
            PostgresTypeId::Float4 => 1021,
            PostgresTypeId::Float8 => 1022,
            PostgresTypeId::Varchar => 1015,
            PostgresTypeId::Date => 1182,
            PostgresTypeId::Time => 1183,
            PostgresTypeId::Timestamp => 1115,
            PostgresTypeId::TimestampTz => 1185,
            PostgresTypeId::Interval => 1187,
            PostgresTypeId::Numeric => 1231,
            PostgresTypeId::Uuid => 2951,
            PostgresTypeId::Record => 2287,
            PostgresTypeId::Array => 2277,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PostgresTypeId::Bool => "bool",
            PostgresTypeId::Bytea => "bytea",
            PostgresTypeId::Char => "char",
            PostgresTypeId::Name => "name",
            PostgresTypeId::Int8 => "int8",
            PostgresTypeId::Int2 => "int2",
            PostgresTypeId::Int4 => "int4",
            PostgresTypeId::Text => "text",
            PostgresTypeId::Json => "json",
            PostgresTypeId::Float4 => "float4",
            PostgresTypeId::Float8 => "float8",
            PostgresTypeId::Varchar => "varchar",
            PostgresTypeId::Date => "date",
            PostgresTypeId::Time => "time",
            PostgresTypeId::Timestamp => "timestamp",
            PostgresTypeId::TimestampTz => "timestamptz",
            PostgresTypeId::Interval => "interval",
            PostgresTypeId::Numeric => "numeric",
            PostgresTypeId::Uuid => "uuid",
            PostgresTypeId::Array => "array",
            PostgresTypeId::Record => "record",
        }
    }
}

/// A PostgreSQL type descriptor tree. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct PostgresType {
    id: PostgresTypeId,
    element: Option<Box<PostgresType>>,
    children: Vec<(String, PostgresType)>,
    modifier: Option<i32>,
}

impl PostgresType {
    pub fn new(id: PostgresTypeId) -> Self {
        Self {
            id,
            element: None,
            children: Vec::new(),
            modifier: None,
        }
    }

    /// Wraps this type into a one-dimensional array of it.
    pub fn array(self) -> Self {
        Self {
            id: PostgresTypeId::Array,
            element: Some(Box::new(self)),
            children: Vec::new(),
            modifier: None,
        }
    }

    /// Builds a record (composite) type from named members.
    pub fn record<S: Into<String>>(fields: Vec<(S, PostgresType)>) -> Self {
        Self {
            id: PostgresTypeId::Record,
            element: None,
            children: fields
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
            modifier: None,
        }
    }

    /// Attaches a type modifier (`atttypmod`: declared length, precision or
    /// scale). Carried for diagnostics, not interpreted by the codec.
    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn id(&self) -> PostgresTypeId {
        self.id
    }

    pub fn modifier(&self) -> Option<i32> {
        self.modifier
    }

    pub fn element(&self) -> Option<&PostgresType> {
        self.element.as_deref()
    }

    pub fn fields(&self) -> &[(String, PostgresType)] {
        &self.children
    }

    pub fn field_count(&self) -> usize {
        self.children.len()
    }

    /// The catalog OID embedded on the wire for this type.
    pub fn oid(&self) -> u32 {
        match (self.id, self.element()) {
            (PostgresTypeId::Array, Some(elem)) => elem.id.array_oid(),
            _ => self.id.oid(),
        }
    }

    /// The Arrow logical type this PostgreSQL type decodes to.
    pub fn to_data_type(&self) -> Result<DataType> {
        self.data_type_at("")
    }

    fn data_type_at(&self, path: &str) -> Result<DataType> {
        let dt = match self.id {
            PostgresTypeId::Bool => DataType::Boolean,
            PostgresTypeId::Int2 => DataType::Int16,
            PostgresTypeId::Int4 => DataType::Int32,
            PostgresTypeId::Int8 => DataType::Int64,
            PostgresTypeId::Float4 => DataType::Float32,
            PostgresTypeId::Float8 => DataType::Float64,
            // numeric keeps its full precision as a decimal string
            PostgresTypeId::Numeric => DataType::Utf8,
            PostgresTypeId::Text
            | PostgresTypeId::Varchar
            | PostgresTypeId::Char
            | PostgresTypeId::Name
            | PostgresTypeId::Json => DataType::Utf8,
            PostgresTypeId::Bytea => DataType::Binary,
            PostgresTypeId::Date => DataType::Date32,
            PostgresTypeId::Time => DataType::Time64(TimeUnit::Microsecond),
            PostgresTypeId::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            PostgresTypeId::TimestampTz => {
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
            }
            PostgresTypeId::Interval => DataType::Interval(IntervalUnit::MonthDayNano),
            PostgresTypeId::Uuid => DataType::FixedSizeBinary(16),
            PostgresTypeId::Array => {
                let elem = self.element().ok_or_else(|| CopyError::UnsupportedType {
                    path: path.to_string(),
                    name: "array without an element type".to_string(),
                })?;
                let child = elem.data_type_at(&child_path(path, "item"))?;
                DataType::List(Arc::new(Field::new("item", child, true)))
            }
            PostgresTypeId::Record => {
                let mut fields = Vec::with_capacity(self.children.len());
                for (name, child) in &self.children {
                    let child_dt = child.data_type_at(&child_path(path, name))?;
                    fields.push(Field::new(name, child_dt, true));
                }
                DataType::Struct(Fields::from(fields))
            }
        };
        Ok(dt)
    }

    /// Walks a top-level record descriptor and produces the Arrow schema of
    /// the batch the reader will build.
    pub fn infer_schema(&self) -> Result<Schema> {
        if self.id != PostgresTypeId::Record {
            return Err(CopyError::InvalidState(
                "the root type of a COPY stream must be a record".to_string(),
            ));
        }
        let mut fields = Vec::with_capacity(self.children.len());
        for (name, child) in &self.children {
            fields.push(Field::new(name, child.data_type_at(name)?, true));
        }
        Ok(Schema::new(fields))
    }

    /// Derives the descriptor a writer uses from an Arrow type. `Utf8`
    /// derives to `text`; writing `numeric` requires an explicit descriptor
    /// (see `CopyStreamWriter::with_type`).
    pub fn from_data_type(data_type: &DataType) -> Result<Self> {
        Self::from_data_type_at(data_type, "")
    }

    fn from_data_type_at(data_type: &DataType, path: &str) -> Result<Self> {
        let id = match data_type {
            DataType::Boolean => PostgresTypeId::Bool,
            DataType::Int16 => PostgresTypeId::Int2,
            DataType::Int32 => PostgresTypeId::Int4,
            DataType::Int64 => PostgresTypeId::Int8,
            DataType::Float32 => PostgresTypeId::Float4,
            DataType::Float64 => PostgresTypeId::Float8,
            DataType::Utf8 => PostgresTypeId::Text,
            DataType::Binary => PostgresTypeId::Bytea,
            DataType::Date32 | DataType::Date64 => PostgresTypeId::Date,
            DataType::Time32(_) | DataType::Time64(_) => PostgresTypeId::Time,
            DataType::Timestamp(_, None) => PostgresTypeId::Timestamp,
            DataType::Timestamp(_, Some(_)) => PostgresTypeId::TimestampTz,
            DataType::Interval(IntervalUnit::MonthDayNano) => PostgresTypeId::Interval,
            DataType::FixedSizeBinary(16) => PostgresTypeId::Uuid,
            DataType::List(field) => {
                let elem = Self::from_data_type_at(field.data_type(), &child_path(path, "item"))?;
                return Ok(elem.array());
            }
            DataType::Struct(fields) => {
                let mut children = Vec::with_capacity(fields.len());
                for field in fields {
                    let child =
                        Self::from_data_type_at(field.data_type(), &child_path(path, field.name()))?;
                    children.push((field.name().clone(), child));
                }
                return Ok(PostgresType::record(children));
            }
            other => {
                return Err(CopyError::UnsupportedType {
                    path: path.to_string(),
                    name: format!("{other:?}"),
                })
            }
        };
        Ok(PostgresType::new(id))
    }
}

pub(crate) fn child_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child == "item" {
        format!("{parent}[]")
    } else {
        format!("{parent}.{child}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_mapping() {
        let cases = [
            (PostgresTypeId::Bool, DataType::Boolean),
            (PostgresTypeId::Int2, DataType::Int16),
            (PostgresTypeId::Int4, DataType::Int32),
            (PostgresTypeId::Int8, DataType::Int64),
            (PostgresTypeId::Float4, DataType::Float32),
            (PostgresTypeId::Float8, DataType::Float64),
            (PostgresTypeId::Numeric, DataType::Utf8),
            (PostgresTypeId::Text, DataType::Utf8),
            (PostgresTypeId::Varchar, DataType::Utf8),
            (PostgresTypeId::Json, DataType::Utf8),
            (PostgresTypeId::Bytea, DataType::Binary),
            (PostgresTypeId::Date, DataType::Date32),
            (PostgresTypeId::Time, DataType::Time64(TimeUnit::Microsecond)),
            (PostgresTypeId::Uuid, DataType::FixedSizeBinary(16)),
        ];
        for (id, expected) in cases {
            assert_eq!(PostgresType::new(id).to_data_type().unwrap(), expected);
        }
        assert_eq!(
            PostgresType::new(PostgresTypeId::Timestamp)
                .to_data_type()
                .unwrap(),
            DataType::Timestamp(TimeUnit::Microsecond, None)
        );
        assert_eq!(
            PostgresType::new(PostgresTypeId::TimestampTz)
                .to_data_type()
                .unwrap(),
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        );
        assert_eq!(
            PostgresType::new(PostgresTypeId::Interval)
                .to_data_type()
                .unwrap(),
            DataType::Interval(IntervalUnit::MonthDayNano)
        );
    }

    #[test]
    fn test_infer_schema_nested() {
        let root = PostgresType::record(vec![
            ("id", PostgresType::new(PostgresTypeId::Int4)),
            ("tags", PostgresType::new(PostgresTypeId::Text).array()),
            (
                "point",
                PostgresType::record(vec![
                    ("x", PostgresType::new(PostgresTypeId::Float8)),
                    ("y", PostgresType::new(PostgresTypeId::Float8)),
                ]),
            ),
        ]);
        let schema = root.infer_schema().unwrap();
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(0).data_type(), &DataType::Int32);
        assert_eq!(
            schema.field(1).data_type(),
            &DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
        );
        match schema.field(2).data_type() {
            DataType::Struct(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].name(), "x");
                assert_eq!(fields[1].data_type(), &DataType::Float64);
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn test_infer_schema_requires_record_root() {
        let err = PostgresType::new(PostgresTypeId::Int4)
            .infer_schema()
            .unwrap_err();
        assert!(matches!(err, CopyError::InvalidState(_)));
    }

    #[test]
    fn test_array_oids_resolve_through_element() {
        let arr = PostgresType::new(PostgresTypeId::Int4).array();
        assert_eq!(arr.oid(), 1007);
        assert_eq!(arr.element().unwrap().oid(), 23);
        assert_eq!(PostgresType::new(PostgresTypeId::Numeric).array().oid(), 1231);
        assert_eq!(PostgresType::record(Vec::<(&str, PostgresType)>::new()).oid(), 2249);
    }

    #[test]
    fn test_from_data_type_round_trip() {
        let root = PostgresType::record(vec![
            ("b", PostgresType::new(PostgresTypeId::Bool)),
            ("xs", PostgresType::new(PostgresTypeId::Int8).array()),
            (
                "rec",
                PostgresType::record(vec![("u", PostgresType::new(PostgresTypeId::Uuid))]),
            ),
        ]);
        let derived = PostgresType::from_data_type(&root.to_data_type().unwrap()).unwrap();
        assert_eq!(derived, root);
    }

    #[test]
    fn test_from_data_type_unsupported_names_type_and_path() {
        let dt = DataType::Struct(Fields::from(vec![Field::new(
            "col",
            DataType::Duration(TimeUnit::Millisecond),
            true,
        )]));
        let err = PostgresType::from_data_type(&dt).unwrap_err();
        match err {
            CopyError::UnsupportedType { path, name } => {
                assert_eq!(path, "col");
                assert!(name.contains("Duration"));
            }
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn test_modifier_is_carried() {
        let ty = PostgresType::new(PostgresTypeId::Varchar).with_modifier(64);
        assert_eq!(ty.modifier(), Some(64));
    }
}
