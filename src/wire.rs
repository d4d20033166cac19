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

//! Wire primitives.
//!
//! Everything on the wire is big-endian (network order). [`Cursor`] is a
//! non-owning view over the input bytes that tracks its absolute position so
//! decode errors can report where the stream went wrong; it never rewinds.
//! The `put_*` helpers append big-endian scalars to the growable output
//! buffer, and [`backfill_i32`] patches a length that was reserved before
//! its payload was produced.

use byteorder::{ByteOrder, NetworkEndian};

use crate::error::{CopyError, Result};

/// A bounds-checked view over the input stream.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Absolute offset from the start of the stream.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(CopyError::ShortRead {
                offset: self.pos,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Borrows the next `n` bytes and advances past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Borrows the next `n` bytes without advancing.
    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        Ok(&self.buf[self.pos..self.pos + n])
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(NetworkEndian::read_i16(self.take(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(NetworkEndian::read_u16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(NetworkEndian::read_i32(self.take(4)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(NetworkEndian::read_u32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(NetworkEndian::read_i64(self.take(8)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(NetworkEndian::read_u64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(NetworkEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(NetworkEndian::read_f64(self.take(8)?))
    }

    /// Reads a field or tuple length prefix; `-1` signals NULL (fields) or
    /// the end-of-stream trailer (tuples).
    pub fn read_length(&mut self) -> Result<i32> {
        self.read_i32()
    }
}

pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn put_i16(out: &mut Vec<u8>, v: i16) {
    let mut b = [0u8; 2];
    NetworkEndian::write_i16(&mut b, v);
    out.extend_from_slice(&b);
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    let mut b = [0u8; 2];
    NetworkEndian::write_u16(&mut b, v);
    out.extend_from_slice(&b);
}

pub fn put_i32(out: &mut Vec<u8>, v: i32) {
    let mut b = [0u8; 4];
    NetworkEndian::write_i32(&mut b, v);
    out.extend_from_slice(&b);
}

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    let mut b = [0u8; 4];
    NetworkEndian::write_u32(&mut b, v);
    out.extend_from_slice(&b);
}

pub fn put_i64(out: &mut Vec<u8>, v: i64) {
    let mut b = [0u8; 8];
    NetworkEndian::write_i64(&mut b, v);
    out.extend_from_slice(&b);
}

pub fn put_f32(out: &mut Vec<u8>, v: f32) {
    let mut b = [0u8; 4];
    NetworkEndian::write_f32(&mut b, v);
    out.extend_from_slice(&b);
}

pub fn put_f64(out: &mut Vec<u8>, v: f64) {
    let mut b = [0u8; 8];
    NetworkEndian::write_f64(&mut b, v);
    out.extend_from_slice(&b);
}

/// Reserves four bytes for a length to be patched later with
/// [`backfill_i32`]; returns the reservation offset.
pub fn reserve_i32(out: &mut Vec<u8>) -> usize {
    let at = out.len();
    out.extend_from_slice(&[0u8; 4]);
    at
}

pub fn backfill_i32(out: &mut [u8], at: usize, v: i32) {
    NetworkEndian::write_i32(&mut out[at..at + 4], v);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads_big_endian() {
        let data = [
            0x00, 0x01, // i16 1
            0xff, 0xff, 0xff, 0x85, // i32 -123
            0x3f, 0x80, 0x00, 0x00, // f32 1.0
        ];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.read_i16().unwrap(), 1);
        assert_eq!(cur.read_i32().unwrap(), -123);
        assert_eq!(cur.read_f32().unwrap(), 1.0);
        assert_eq!(cur.position(), 10);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_cursor_never_rewinds_on_peek() {
        let data = [0xde, 0xad, 0xbe, 0xef];
        let mut cur = Cursor::new(&data);
        assert_eq!(cur.peek(2).unwrap(), &[0xde, 0xad]);
        assert_eq!(cur.position(), 0);
        cur.advance(3).unwrap();
        assert_eq!(cur.take(1).unwrap(), &[0xef]);
    }

    #[test]
    fn test_short_read_reports_position() {
        let data = [0x00, 0x01, 0x02];
        let mut cur = Cursor::new(&data);
        cur.advance(2).unwrap();
        let err = cur.read_i32().unwrap_err();
        match err {
            CopyError::ShortRead {
                offset,
                needed,
                remaining,
            } => {
                assert_eq!(offset, 2);
                assert_eq!(needed, 4);
                assert_eq!(remaining, 1);
            }
            other => panic!("expected ShortRead, got {other:?}"),
        }
        // the failed read must not have advanced the cursor
        assert_eq!(cur.position(), 2);
    }

    #[test]
    fn test_read_length_null_sentinel() {
        let mut cur = Cursor::new(&[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(cur.read_length().unwrap(), -1);
    }

    #[test]
    fn test_backfill_patches_reserved_length() {
        let mut out = Vec::new();
        put_i16(&mut out, 1);
        let at = reserve_i32(&mut out);
        out.extend_from_slice(b"abc");
        let len = (out.len() - at - 4) as i32;
        backfill_i32(&mut out, at, len);
        assert_eq!(out, [0x00, 0x01, 0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn test_put_round_trip() {
        let mut out = Vec::new();
        put_i64(&mut out, -2);
        put_f64(&mut out, 123.456);
        put_u32(&mut out, 23);
        let mut cur = Cursor::new(&out);
        assert_eq!(cur.read_i64().unwrap(), -2);
        assert_eq!(cur.read_f64().unwrap(), 123.456);
        assert_eq!(cur.read_u32().unwrap(), 23);
    }
}
