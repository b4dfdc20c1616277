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

//! Parser for the textual form of structured values.
//!
//! The format is the one produced by the `Display` implementations in
//! [`crate::datum`]: tuples are written as `(a,b)`, bags as `{(a),(b)}` and maps as
//! `[key#value]`. An empty element is a null. Text inside a composite is quoted
//! as `'it\'s'`; unquoted atoms have their type inferred.

use crate::datum::{Bag, DataMap, Datum, Tuple};
use crate::error::{ConversionError, ConversionResult};

const MAX_DEPTH: usize = 256;

pub(crate) const QUOTE: u8 = b'\'';
pub(crate) const ESCAPE: u8 = b'\\';
/// A tuple holding a single null, which `()` cannot express.
pub(crate) const LONE_NULL: &str = "(null)";

pub(crate) fn is_delimiter(ch: u8) -> bool {
    matches!(ch, b',' | b')' | b'}' | b']' | b'#')
}

/// Reusable parser for structured values.
///
/// The parser keeps an internal buffer that is reset on every call to
/// [`TextDataParser::parse`]. It is not meant to be shared between threads; use one
/// instance per thread.
#[derive(Debug, Default)]
pub struct TextDataParser {
    buf: Vec<u8>,
    pos: usize,
}

impl TextDataParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a complete value. Trailing input after the value is an error.
    pub fn parse(&mut self, input: &[u8]) -> ConversionResult<Datum> {
        self.buf.clear();
        self.buf.extend_from_slice(input);
        self.pos = 0;

        let value = self.parse_value(0)?;
        if self.pos < self.buf.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(value)
    }

    fn error(&self, message: impl Into<String>) -> ConversionError {
        ConversionError::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn expect(&mut self, expected: u8) -> ConversionResult<()> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(ch) => Err(self.error(format!(
                "expected '{}' but found '{}'",
                expected as char, ch as char
            ))),
            None => Err(self.error(format!(
                "expected '{}' but reached end of input",
                expected as char
            ))),
        }
    }

    fn parse_value(&mut self, depth: usize) -> ConversionResult<Datum> {
        if depth > MAX_DEPTH {
            return Err(ConversionError::NestingTooDeep {
                max_depth: MAX_DEPTH,
            });
        }
        match self.peek() {
            Some(b'(') => Ok(Datum::Tuple(self.parse_tuple(depth)?)),
            Some(b'{') => Ok(Datum::Bag(self.parse_bag(depth)?)),
            Some(b'[') => Ok(Datum::Map(self.parse_map(depth)?)),
            Some(QUOTE) => Ok(Datum::Text(self.read_quoted()?)),
            _ => Ok(parse_atom(&self.read_token())),
        }
    }

    fn parse_tuple(&mut self, depth: usize) -> ConversionResult<Tuple> {
        if self.buf[self.pos..].starts_with(LONE_NULL.as_bytes()) {
            self.pos += LONE_NULL.len();
            return Ok(Tuple::new(vec![Datum::Null]));
        }
        self.expect(b'(')?;
        let mut values = vec![];
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(Tuple::new(values));
        }
        loop {
            values.push(self.parse_value(depth + 1)?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(Tuple::new(values));
                }
                Some(ch) => {
                    return Err(self.error(format!("unexpected '{}' in tuple", ch as char)))
                }
                None => return Err(self.error("unterminated tuple")),
            }
        }
    }

    fn parse_bag(&mut self, depth: usize) -> ConversionResult<Bag> {
        self.expect(b'{')?;
        let mut tuples = vec![];
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Bag::new(tuples));
        }
        loop {
            if self.peek() != Some(b'(') {
                return Err(self.error("bag elements must be tuples"));
            }
            tuples.push(self.parse_tuple(depth + 1)?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Bag::new(tuples));
                }
                Some(ch) => return Err(self.error(format!("unexpected '{}' in bag", ch as char))),
                None => return Err(self.error("unterminated bag")),
            }
        }
    }

    fn parse_map(&mut self, depth: usize) -> ConversionResult<DataMap> {
        self.expect(b'[')?;
        let mut map = DataMap::new();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(map);
        }
        loop {
            let key = if self.peek() == Some(QUOTE) {
                self.read_quoted()?
            } else {
                self.read_token()
            };
            if self.peek() != Some(b'#') {
                return Err(self.error(format!("map entry '{key}' has no '#' separator")));
            }
            self.pos += 1;
            let value = self.parse_value(depth + 1)?;
            map.insert(key, value);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(map);
                }
                Some(ch) => return Err(self.error(format!("unexpected '{}' in map", ch as char))),
                None => return Err(self.error("unterminated map")),
            }
        }
    }

    /// Reads a quoted string, undoing the escapes.
    fn read_quoted(&mut self) -> ConversionResult<String> {
        self.expect(QUOTE)?;
        let mut bytes = vec![];
        loop {
            match self.peek() {
                Some(QUOTE) => {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(ESCAPE) if self.pos + 1 < self.buf.len() => {
                    bytes.push(self.buf[self.pos + 1]);
                    self.pos += 2;
                }
                Some(ch) => {
                    bytes.push(ch);
                    self.pos += 1;
                }
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    /// Reads bytes up to the next delimiter (or end of input).
    fn read_token(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.buf[start..self.pos]).into_owned()
    }
}

/// Infers the type of an unquoted atom.
fn parse_atom(token: &str) -> Datum {
    if token.is_empty() {
        return Datum::Null;
    }
    if token.eq_ignore_ascii_case("true") {
        return Datum::Boolean(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Datum::Boolean(false);
    }
    if let Some(digits) = token.strip_suffix(['L', 'l']) {
        if let Ok(v) = digits.parse::<i64>() {
            return Datum::Long(v);
        }
    }
    if let Ok(v) = token.parse::<i32>() {
        return Datum::Int(v);
    }
    if let Ok(v) = token.parse::<i64>() {
        return Datum::Long(v);
    }
    let has_digit = token.bytes().any(|b| b.is_ascii_digit());
    if let Some(number) = token.strip_suffix(['F', 'f']) {
        match number {
            "NaN" => return Datum::Float(f32::NAN),
            "Infinity" => return Datum::Float(f32::INFINITY),
            "-Infinity" => return Datum::Float(f32::NEG_INFINITY),
            _ => {}
        }
        if has_digit {
            if let Ok(v) = number.parse::<f32>() {
                return Datum::Float(v);
            }
        }
    }
    match token {
        "NaN" => return Datum::Double(f64::NAN),
        "Infinity" => return Datum::Double(f64::INFINITY),
        "-Infinity" => return Datum::Double(f64::NEG_INFINITY),
        _ => {}
    }
    if has_digit && token.contains(['.', 'e', 'E']) {
        if let Ok(v) = token.parse::<f64>() {
            return Datum::Double(v);
        }
    }
    Datum::Text(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ConversionResult<Datum> {
        TextDataParser::new().parse(input.as_bytes())
    }

    #[test]
    fn parses_atoms() {
        assert_eq!(parse("5").unwrap(), Datum::Int(5));
        assert_eq!(parse("5L").unwrap(), Datum::Long(5));
        assert_eq!(parse("3000000000").unwrap(), Datum::Long(3_000_000_000));
        assert_eq!(parse("1.5F").unwrap(), Datum::Float(1.5));
        assert_eq!(parse("2.5").unwrap(), Datum::Double(2.5));
        assert_eq!(parse("1e3").unwrap(), Datum::Double(1000.0));
        assert_eq!(parse("true").unwrap(), Datum::Boolean(true));
        assert_eq!(parse("hello").unwrap(), Datum::Text("hello".to_string()));
        assert_eq!(parse("").unwrap(), Datum::Null);
    }

    #[test]
    fn parses_nested_values() {
        let value = parse("(1,,{(a,2L)},[k#v])").unwrap();
        let mut map = DataMap::new();
        map.insert("k", Datum::Text("v".to_string()));
        let expected = Datum::Tuple(Tuple::new(vec![
            Datum::Int(1),
            Datum::Null,
            Datum::Bag(Bag::new(vec![Tuple::new(vec![
                Datum::Text("a".to_string()),
                Datum::Long(2),
            ])])),
            Datum::Map(map),
        ]));
        assert_eq!(value, expected);
    }

    #[test]
    fn parses_quoted_text() {
        let value = parse(r"('5','a,b)','it\'s','',['k#1'#'v'])").unwrap();
        let mut map = DataMap::new();
        map.insert("k#1", Datum::from("v"));
        let expected = Datum::Tuple(Tuple::new(vec![
            Datum::from("5"),
            Datum::from("a,b)"),
            Datum::from("it's"),
            Datum::from(""),
            Datum::Map(map),
        ]));
        assert_eq!(value, expected);
        assert!(matches!(parse("('abc)"), Err(ConversionError::Parse { .. })));
    }

    #[test]
    fn parses_lone_null_and_float_specials() {
        assert_eq!(
            parse("(null)").unwrap(),
            Datum::Tuple(Tuple::new(vec![Datum::Null]))
        );
        assert_eq!(
            parse("{(null),()}").unwrap(),
            Datum::Bag(Bag::new(vec![
                Tuple::new(vec![Datum::Null]),
                Tuple::default()
            ]))
        );
        assert_eq!(parse("(nullable)").unwrap().as_tuple().unwrap().len(), 1);
        assert!(matches!(parse("NaNF").unwrap(), Datum::Float(v) if v.is_nan()));
        assert_eq!(parse("-InfinityF").unwrap(), Datum::Float(f32::NEG_INFINITY));
        assert_eq!(parse("Infinity").unwrap(), Datum::Double(f64::INFINITY));
    }

    #[test]
    fn empty_composites() {
        assert_eq!(parse("()").unwrap(), Datum::Tuple(Tuple::default()));
        assert_eq!(parse("{}").unwrap(), Datum::Bag(Bag::default()));
        assert_eq!(parse("[]").unwrap(), Datum::Map(DataMap::default()));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse("(1,2"), Err(ConversionError::Parse { .. })));
        assert!(matches!(parse("{1}"), Err(ConversionError::Parse { .. })));
        assert!(matches!(parse("[a]"), Err(ConversionError::Parse { .. })));
        assert!(matches!(parse("(1))"), Err(ConversionError::Parse { .. })));
    }

    #[test]
    fn reports_position() {
        match parse("(1,2]") {
            Err(ConversionError::Parse { position, .. }) => assert_eq!(position, 4),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn limits_nesting_depth() {
        let input = "(".repeat(MAX_DEPTH + 2);
        assert!(matches!(
            parse(&input),
            Err(ConversionError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn parser_is_reusable() {
        let mut parser = TextDataParser::new();
        assert!(parser.parse(b"(1,").is_err());
        assert_eq!(
            parser.parse(b"(7)").unwrap(),
            Datum::Tuple(Tuple::new(vec![Datum::Int(7)]))
        );
    }
}
