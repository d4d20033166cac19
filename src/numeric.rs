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

//! The `numeric` wire codec.
//!
//! PostgreSQL transmits `numeric` as a header `{ndigits, weight, sign,
//! dscale}` followed by base-10000 digits, each an `i16`. `weight` is the
//! base-10000 exponent of the most significant digit and `dscale` the number
//! of decimal digits displayed right of the point. The columnar form is the
//! decimal string exactly as the server would print it, so no precision is
//! lost.

use crate::error::{CopyError, Result};
use crate::wire::{put_i16, put_u16, Cursor};

const NBASE: i32 = 10000;
/// Decimal digits per base-10000 digit
const DEC_DIGITS: usize = 4;

pub const NUMERIC_POS: u16 = 0x0000;
pub const NUMERIC_NEG: u16 = 0x4000;
pub const NUMERIC_NAN: u16 = 0xC000;
pub const NUMERIC_PINF: u16 = 0xD000;
pub const NUMERIC_NINF: u16 = 0xF000;

// The server stores +/-inf in the short numeric header format, whose dscale
// bits read back as 32; numeric_send transmits that value verbatim.
const INFINITY_DSCALE: i16 = 32;

/// Decodes one `numeric` field payload of `len` bytes into its decimal
/// string form.
pub fn decode_numeric(cur: &mut Cursor<'_>, len: usize, path: &str) -> Result<String> {
    let header_offset = cur.position();
    let numeric_err = |message: String, offset: usize| CopyError::NumericFormat {
        path: path.to_string(),
        message,
        offset,
    };

    let ndigits = cur.read_i16()?;
    let weight = cur.read_i16()?;
    let sign = cur.read_u16()?;
    let dscale = cur.read_i16()?;

    if ndigits < 0 || len != 8 + 2 * ndigits as usize {
        return Err(numeric_err(
            format!("digit count {ndigits} disagrees with field length {len}"),
            header_offset,
        ));
    }

    match sign {
        NUMERIC_NAN | NUMERIC_PINF | NUMERIC_NINF => {
            if ndigits != 0 {
                return Err(numeric_err(
                    format!("special value carries {ndigits} digits"),
                    header_offset,
                ));
            }
            let text = match sign {
                NUMERIC_NAN => "nan",
                NUMERIC_PINF => "inf",
                _ => "-inf",
            };
            return Ok(text.to_string());
        }
        NUMERIC_POS | NUMERIC_NEG => {}
        other => {
            return Err(numeric_err(
                format!("unknown sign word {other:#06x}"),
                header_offset,
            ))
        }
    }

    if dscale < 0 {
        return Err(numeric_err(
            format!("negative display scale {dscale}"),
            header_offset,
        ));
    }

    let mut digits = Vec::with_capacity(ndigits as usize);
    for _ in 0..ndigits {
        let digit_offset = cur.position();
        let d = cur.read_i16()?;
        if !(0..NBASE as i16).contains(&d) {
            return Err(numeric_err(
                format!("digit {d} outside base-10000"),
                digit_offset,
            ));
        }
        digits.push(d);
    }

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    // Integer digits, most significant first. The leading digit prints
    // without zero padding; every following one is four decimal characters.
    let mut emitted = false;
    if weight >= 0 {
        for i in 0..=weight as i32 {
            let d = digits.get(i as usize).copied().unwrap_or(0);
            if emitted {
                out.push_str(&format!("{d:04}"));
            } else if d != 0 {
                out.push_str(&d.to_string());
                emitted = true;
            }
        }
    }
    if !emitted {
        out.push('0');
    }

    if dscale > 0 {
        let mut frac = String::new();
        let groups = (dscale as usize + DEC_DIGITS - 1) / DEC_DIGITS;
        for i in 1..=groups as i32 {
            let idx = weight as i32 + i;
            let d = if idx >= 0 {
                digits.get(idx as usize).copied().unwrap_or(0)
            } else {
                0
            };
            frac.push_str(&format!("{d:04}"));
        }
        frac.truncate(dscale as usize);
        out.push('.');
        out.push_str(&frac);
    }

    Ok(out)
}

/// Encodes a decimal string as a `numeric` payload, appending to `out`.
/// The accepted grammar is `[+-]?digits[.digits]` plus the special values
/// `nan`, `inf`/`infinity` and their signed forms, case-insensitive.
pub fn encode_numeric(out: &mut Vec<u8>, value: &str, path: &str) -> Result<()> {
    let offset = out.len();
    let numeric_err = |message: String| CopyError::NumericFormat {
        path: path.to_string(),
        message,
        offset,
    };

    if value.eq_ignore_ascii_case("nan") {
        put_header(out, 0, 0, NUMERIC_NAN, 0);
        return Ok(());
    }
    let (negative, magnitude) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    if magnitude.eq_ignore_ascii_case("inf") || magnitude.eq_ignore_ascii_case("infinity") {
        let sign = if negative { NUMERIC_NINF } else { NUMERIC_PINF };
        put_header(out, 0, 0, sign, INFINITY_DSCALE);
        return Ok(());
    }

    let (int_part, frac_part) = match magnitude.split_once('.') {
        Some((i, f)) => (i, f),
        None => (magnitude, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(numeric_err(format!("no digits in {value:?}")));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(numeric_err(format!("invalid character in {value:?}")));
    }
    if frac_part.len() > i16::MAX as usize {
        return Err(numeric_err(format!(
            "display scale {} too large",
            frac_part.len()
        )));
    }
    let dscale = frac_part.len() as i16;

    // Left-pad the integer half and right-pad the fractional half to whole
    // base-10000 groups, then strip zero groups off both ends. Stripping a
    // leading group lowers the weight of the first remaining digit.
    let mut digits: Vec<i16> = Vec::new();
    let int_pad = (DEC_DIGITS - int_part.len() % DEC_DIGITS) % DEC_DIGITS;
    let padded_int: String = "0".repeat(int_pad) + int_part;
    for chunk in padded_int.as_bytes().chunks(DEC_DIGITS) {
        digits.push(group_value(chunk));
    }
    let mut weight = (padded_int.len() / DEC_DIGITS) as i64 - 1;
    let frac_pad = (DEC_DIGITS - frac_part.len() % DEC_DIGITS) % DEC_DIGITS;
    let padded_frac: String = frac_part.to_string() + &"0".repeat(frac_pad);
    for chunk in padded_frac.as_bytes().chunks(DEC_DIGITS) {
        digits.push(group_value(chunk));
    }

    let leading_zeros = digits.iter().take_while(|d| **d == 0).count();
    digits.drain(..leading_zeros);
    weight -= leading_zeros as i64;
    while digits.last() == Some(&0) {
        digits.pop();
    }

    if digits.is_empty() {
        // zero; the sign is dropped because negative zero is not a value
        put_header(out, 0, 0, NUMERIC_POS, dscale);
        return Ok(());
    }
    if digits.len() > i16::MAX as usize || weight > i16::MAX as i64 || weight < i16::MIN as i64 {
        return Err(numeric_err(format!("{value:?} does not fit a numeric")));
    }

    let sign = if negative { NUMERIC_NEG } else { NUMERIC_POS };
    put_header(out, digits.len() as i16, weight as i16, sign, dscale);
    for d in digits {
        put_i16(out, d);
    }
    Ok(())
}

fn put_header(out: &mut Vec<u8>, ndigits: i16, weight: i16, sign: u16, dscale: i16) {
    put_i16(out, ndigits);
    put_i16(out, weight);
    put_u16(out, sign);
    put_i16(out, dscale);
}

fn group_value(chunk: &[u8]) -> i16 {
    chunk.iter().fold(0i16, |acc, b| acc * 10 + (b - b'0') as i16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &[u8]) -> String {
        let mut cur = Cursor::new(payload);
        let out = decode_numeric(&mut cur, payload.len(), "col").unwrap();
        assert_eq!(cur.remaining(), 0);
        out
    }

    fn encode(value: &str) -> Vec<u8> {
        let mut out = Vec::new();
        encode_numeric(&mut out, value, "col").unwrap();
        out
    }

    // payloads lifted from a server-produced COPY stream of
    //   1000000, 0.00001234, 1.0000, -123.456, 123.456, nan, -inf, inf
    const ONE_MILLION: &[u8] = &[0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x64];
    const SMALL_FRACTION: &[u8] = &[0x00, 0x01, 0xff, 0xfe, 0x00, 0x00, 0x00, 0x08, 0x04, 0xd2];
    const ONE_SCALE_FOUR: &[u8] = &[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x01];
    const NEGATIVE: &[u8] = &[
        0x00, 0x02, 0x00, 0x00, 0x40, 0x00, 0x00, 0x03, 0x00, 0x7b, 0x11, 0xd0,
    ];
    const POSITIVE: &[u8] = &[
        0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x7b, 0x11, 0xd0,
    ];
    const NAN: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0xc0, 0x00, 0x00, 0x00];
    const NEG_INF: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0xf0, 0x00, 0x00, 0x20];
    const POS_INF: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0xd0, 0x00, 0x00, 0x20];

    #[test]
    fn test_decode_server_payloads() {
        assert_eq!(decode(ONE_MILLION), "1000000");
        assert_eq!(decode(SMALL_FRACTION), "0.00001234");
        assert_eq!(decode(ONE_SCALE_FOUR), "1.0000");
        assert_eq!(decode(NEGATIVE), "-123.456");
        assert_eq!(decode(POSITIVE), "123.456");
        assert_eq!(decode(NAN), "nan");
        assert_eq!(decode(NEG_INF), "-inf");
        assert_eq!(decode(POS_INF), "inf");
    }

    #[test]
    fn test_encode_matches_server_payloads() {
        assert_eq!(encode("1000000"), ONE_MILLION);
        assert_eq!(encode("0.00001234"), SMALL_FRACTION);
        assert_eq!(encode("1.0000"), ONE_SCALE_FOUR);
        assert_eq!(encode("-123.456"), NEGATIVE);
        assert_eq!(encode("123.456"), POSITIVE);
        assert_eq!(encode("nan"), NAN);
        assert_eq!(encode("-inf"), NEG_INF);
        assert_eq!(encode("inf"), POS_INF);
    }

    #[test]
    fn test_zero_encodings() {
        // ndigits = 0, weight = 0, positive, dscale = 0
        assert_eq!(encode("0"), &[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode(&[0, 0, 0, 0, 0, 0, 0, 0]), "0");
        // a carried scale still prints its zeros
        assert_eq!(encode("0.00"), &[0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(decode(&[0, 0, 0, 0, 0, 0, 0, 2]), "0.00");
        // negative zero collapses to zero
        assert_eq!(encode("-0"), encode("0"));
    }

    #[test]
    fn test_decode_encode_identity_on_canonical_strings() {
        for s in [
            "0",
            "1",
            "-1",
            "9999",
            "10000",
            "123456789",
            "0.5",
            "-0.5",
            "0.00000001",
            "12345.678900",
            "-9999999999.9999",
            "1.0000",
            "nan",
            "inf",
            "-inf",
        ] {
            assert_eq!(decode(&encode(s)), s, "round-tripping {s}");
        }
    }

    #[test]
    fn test_interior_zero_groups_are_padded() {
        // 1 0000 0001 . 0001 => digits [1, 0, 1, 1000] at weight 2, dscale 4
        let payload = encode("100000001.0001");
        assert_eq!(decode(&payload), "100000001.0001");
    }

    #[test]
    fn test_encode_rejects_malformed_strings() {
        for s in ["", "-", "+", ".", "12a.4", "1.2.3", "--5", "1e5", " 1"] {
            let mut out = Vec::new();
            let err = encode_numeric(&mut out, s, "col").unwrap_err();
            assert!(
                matches!(err, CopyError::NumericFormat { .. }),
                "expected NumericFormat for {s:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_inconsistent_headers() {
        // ndigits claims one digit but the field carries none
        let payload = [0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut cur = Cursor::new(&payload);
        let err = decode_numeric(&mut cur, payload.len(), "col").unwrap_err();
        assert!(matches!(err, CopyError::NumericFormat { .. }));

        // digit outside base-10000
        let payload = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x27, 0x10, // 10000
        ];
        let mut cur = Cursor::new(&payload);
        let err = decode_numeric(&mut cur, payload.len(), "col").unwrap_err();
        assert!(matches!(err, CopyError::NumericFormat { .. }));

        // unknown sign word
        let payload = [0x00, 0x00, 0x00, 0x00, 0x50, 0x00, 0x00, 0x00];
        let mut cur = Cursor::new(&payload);
        let err = decode_numeric(&mut cur, payload.len(), "col").unwrap_err();
        assert!(matches!(err, CopyError::NumericFormat { .. }));
    }

    #[test]
    fn test_sign_accepts_explicit_plus() {
        assert_eq!(decode(&encode("+123.456")), "123.456");
        assert_eq!(encode("+inf"), POS_INF);
        assert_eq!(encode("-infinity"), NEG_INF);
    }
}
