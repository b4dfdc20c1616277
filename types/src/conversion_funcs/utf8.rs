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

use crate::conversion_funcs::numeric::{
    parse_string_to_float, parse_string_to_integer, BoundedInteger, IntegerParse,
};
use crate::conversion_funcs::warnings::{LogWarningSink, WarningSink};
use crate::data_type::DataType;
use crate::datum::{write_f32, write_f64, Bag, DataMap, Datum, Tuple};
use crate::error::ConversionError;
use crate::parser::TextDataParser;
use std::fmt::Display;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

/// Converts between UTF-8 encoded bytes and typed values.
///
/// Numeric conversions never fail: input that cannot be interpreted is reported
/// to the [`WarningSink`] and the field becomes null. Composite conversions (map,
/// tuple, bag) go through a [`TextDataParser`] and report malformed input as an
/// [`io::Error`] of kind [`io::ErrorKind::InvalidData`] wrapping a
/// [`ConversionError`], because a broken composite usually means a corrupt
/// upstream write.
///
/// The parser is stateful, so composite conversions take `&mut self`. Use one
/// converter per thread.
#[derive(Debug)]
pub struct Utf8StorageConverter {
    parser: TextDataParser,
    warnings: Arc<dyn WarningSink>,
}

impl Default for Utf8StorageConverter {
    fn default() -> Self {
        Self::new(Arc::new(LogWarningSink))
    }
}

impl Utf8StorageConverter {
    pub fn new(warnings: Arc<dyn WarningSink>) -> Self {
        Self {
            parser: TextDataParser::new(),
            warnings,
        }
    }

    pub fn bytes_to_integer(&self, bytes: Option<&[u8]>) -> Option<i32> {
        self.bytes_to_bounded_integer::<i32>(bytes?)
    }

    pub fn bytes_to_long(&self, bytes: Option<&[u8]>) -> Option<i64> {
        self.bytes_to_bounded_integer::<i64>(bytes?)
    }

    pub fn bytes_to_float(&self, bytes: Option<&[u8]>) -> Option<f32> {
        self.bytes_to_floating::<f32>(bytes?, "float")
    }

    pub fn bytes_to_double(&self, bytes: Option<&[u8]>) -> Option<f64> {
        self.bytes_to_floating::<f64>(bytes?, "double")
    }

    pub fn bytes_to_boolean(&self, bytes: Option<&[u8]>) -> Option<bool> {
        let bytes = bytes?;
        let s = String::from_utf8_lossy(bytes);
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Some(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            self.warnings.warn(&format!(
                "Unable to interpret value {s} in field being converted to boolean, field discarded"
            ));
            None
        }
    }

    /// Decodes the bytes as UTF-8, replacing invalid sequences.
    pub fn bytes_to_char_array(&self, bytes: Option<&[u8]>) -> Option<String> {
        bytes.map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn bytes_to_bytes(&self, bytes: Option<&[u8]>) -> Option<Vec<u8>> {
        bytes.map(<[u8]>::to_vec)
    }

    pub fn bytes_to_map(&mut self, bytes: Option<&[u8]>) -> io::Result<Option<DataMap>> {
        match self.parse_composite(bytes)? {
            Datum::Map(m) => Ok(Some(m)),
            Datum::Null => Ok(None),
            other => Err(unexpected_type(DataType::Map, &other)),
        }
    }

    pub fn bytes_to_tuple(&mut self, bytes: Option<&[u8]>) -> io::Result<Option<Tuple>> {
        match self.parse_composite(bytes)? {
            Datum::Tuple(t) => Ok(Some(t)),
            Datum::Null => Ok(None),
            other => Err(unexpected_type(DataType::Tuple, &other)),
        }
    }

    pub fn bytes_to_bag(&mut self, bytes: Option<&[u8]>) -> io::Result<Option<Bag>> {
        match self.parse_composite(bytes)? {
            Datum::Bag(b) => Ok(Some(b)),
            Datum::Null => Ok(None),
            other => Err(unexpected_type(DataType::Bag, &other)),
        }
    }

    /// Converts `bytes` to a value of `target` type. Null input and dropped
    /// numeric fields yield [`Datum::Null`]. An [`DataType::Unknown`] target keeps
    /// the raw bytes.
    pub fn bytes_to(&mut self, bytes: Option<&[u8]>, target: DataType) -> io::Result<Datum> {
        let datum = match target {
            DataType::Boolean => self.bytes_to_boolean(bytes).into(),
            DataType::Int => self.bytes_to_integer(bytes).into(),
            DataType::Long => self.bytes_to_long(bytes).into(),
            DataType::Float => self.bytes_to_float(bytes).into(),
            DataType::Double => self.bytes_to_double(bytes).into(),
            DataType::Text => self.bytes_to_char_array(bytes).into(),
            DataType::Bytes | DataType::Unknown => self.bytes_to_bytes(bytes).into(),
            DataType::Map => self.bytes_to_map(bytes)?.into(),
            DataType::Tuple => self.bytes_to_tuple(bytes)?.into(),
            DataType::Bag => self.bytes_to_bag(bytes)?.into(),
        };
        Ok(datum)
    }

    /// Literal textual rendering of `value`.
    pub fn to_bytes<T: ToUtf8Bytes + ?Sized>(&self, value: &T) -> Vec<u8> {
        value.to_utf8_bytes()
    }

    fn parse_composite(&mut self, bytes: Option<&[u8]>) -> io::Result<Datum> {
        match bytes {
            None => Ok(Datum::Null),
            Some(b) => Ok(self.parser.parse(b)?),
        }
    }

    fn bytes_to_bounded_integer<T>(&self, bytes: &[u8]) -> Option<T>
    where
        T: BoundedInteger,
        <T as FromStr>::Err: Display,
    {
        let s = String::from_utf8_lossy(bytes);
        match parse_string_to_integer::<T>(&s) {
            IntegerParse::Exact(v) => Some(v),
            IntegerParse::Truncated(v, d) => {
                self.warnings.warn(&format!(
                    "Value {s} in field being converted to {} was truncated from {d} to {v}",
                    T::TYPE_NAME
                ));
                Some(v)
            }
            IntegerParse::Overflow(d) => {
                self.warnings
                    .warn(&format!("Value {d} too large for {}", T::TYPE_NAME));
                None
            }
            IntegerParse::Invalid(reason) => {
                self.warnings.warn(&format!(
                    "Unable to interpret value {s} in field being converted to {}, \
                     caught parse error <{reason}> field discarded",
                    T::TYPE_NAME
                ));
                None
            }
        }
    }

    fn bytes_to_floating<F>(&self, bytes: &[u8], type_name: &str) -> Option<F>
    where
        F: FromStr + num::Float,
    {
        let s = String::from_utf8_lossy(bytes);
        let parsed = parse_string_to_float::<F>(&s);
        if parsed.is_none() {
            self.warnings.warn(&format!(
                "Unable to interpret value {s} in field being converted to {type_name}, \
                 field discarded"
            ));
        }
        parsed
    }
}

fn unexpected_type(expected: DataType, actual: &Datum) -> io::Error {
    ConversionError::UnexpectedType {
        expected,
        actual: actual.data_type(),
    }
    .into()
}

/// Literal UTF-8 rendering of a value, the inverse of the `bytes_to_*` conversions.
pub trait ToUtf8Bytes {
    fn to_utf8_bytes(&self) -> Vec<u8>;
}

macro_rules! impl_to_utf8_bytes_display {
    ($($ty:ty),*) => {
        $(
            impl ToUtf8Bytes for $ty {
                fn to_utf8_bytes(&self) -> Vec<u8> {
                    self.to_string().into_bytes()
                }
            }
        )*
    };
}

impl_to_utf8_bytes_display!(bool, i32, i64, str, String, Tuple, Bag, DataMap, Datum);

impl ToUtf8Bytes for f32 {
    fn to_utf8_bytes(&self) -> Vec<u8> {
        let mut s = String::new();
        // Writing to a String cannot fail
        let _ = write_f32(&mut s, *self);
        s.into_bytes()
    }
}

impl ToUtf8Bytes for f64 {
    fn to_utf8_bytes(&self) -> Vec<u8> {
        let mut s = String::new();
        let _ = write_f64(&mut s, *self);
        s.into_bytes()
    }
}

impl ToUtf8Bytes for [u8] {
    fn to_utf8_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}
