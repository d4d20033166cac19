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

//! An interface for reading and writing PostgreSQL's binary COPY format
//! to and from Arrow record batches.
//!
//! The stream produced by `COPY ... TO STDOUT WITH (FORMAT binary)` is
//! row-oriented, big-endian and length-prefixed. This crate converts such a
//! stream into columnar Arrow arrays, and converts record batches back into
//! a stream suitable for `COPY ... FROM STDIN WITH (FORMAT binary)`. It
//! operates entirely on in-memory buffers; moving bytes to and from a server
//! is left to a driver.
//!
//! Reading is driven by a [`PostgresType`] descriptor of the incoming
//! record:
//!
//! ```
//! use arrow_pgcopy::{read_from_binary, PostgresType, PostgresTypeId};
//!
//! let root = PostgresType::record(vec![
//!     ("id", PostgresType::new(PostgresTypeId::Int4)),
//!     ("name", PostgresType::new(PostgresTypeId::Text)),
//! ]);
//! # let bytes: Vec<u8> = {
//! #     let mut v = arrow_pgcopy::MAGIC.to_vec();
//! #     v.extend_from_slice(&[0; 8]);
//! #     v.extend_from_slice(&[0xff, 0xff]);
//! #     v
//! # };
//! let batch = read_from_binary(&bytes, &root).unwrap();
//! ```

pub mod error;
pub mod field;
pub mod numeric;
pub mod reader;
pub mod types;
pub mod wire;
pub mod writer;

/// PGCOPY header signature
pub const MAGIC: &[u8] = b"PGCOPY\n\xff\r\n\0";
/// Days from the PostgreSQL epoch (2000-01-01) back to the Unix epoch
pub const EPOCH_DAYS: i32 = 10957;
/// Microseconds from the PostgreSQL epoch back to the Unix epoch
pub const EPOCH_MICROS: i64 = 946684800000000;

pub use error::{CopyError, Result};
pub use reader::{read_from_binary, CopyStreamReader};
pub use types::{PostgresType, PostgresTypeId};
pub use wire::Cursor;
pub use writer::{write_to_binary, CopyStreamWriter};
