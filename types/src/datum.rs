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

//! In-memory representation of typed field values.

use crate::data_type::DataType;
use crate::parser::{is_delimiter, ESCAPE, LONE_NULL, QUOTE};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter, Write};

/// A single, possibly null, typed value.
///
/// `Datum` has a total order: null sorts before every non-null value, values of
/// different types are ordered by [`DataType::ordinal`], and values of the same type
/// use their natural order. Floating point values are compared with `total_cmp`, so
/// the order (and therefore equality) is well defined for NaN as well.
#[derive(Debug, Clone, Default)]
pub enum Datum {
    #[default]
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Text(String),
    Map(DataMap),
    Tuple(Tuple),
    Bag(Bag),
}

/// Ordered, positional list of values. Order matches the schema's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tuple(pub Vec<Datum>);

/// Collection of tuples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bag(pub Vec<Tuple>);

/// Map with text keys. Iteration (and rendering) follows key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataMap(pub BTreeMap<String, Datum>);

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Type of the value; null has no type and reports [`DataType::Unknown`].
    pub fn data_type(&self) -> DataType {
        match self {
            Datum::Null => DataType::Unknown,
            Datum::Boolean(_) => DataType::Boolean,
            Datum::Int(_) => DataType::Int,
            Datum::Long(_) => DataType::Long,
            Datum::Float(_) => DataType::Float,
            Datum::Double(_) => DataType::Double,
            Datum::Bytes(_) => DataType::Bytes,
            Datum::Text(_) => DataType::Text,
            Datum::Map(_) => DataType::Map,
            Datum::Tuple(_) => DataType::Tuple,
            Datum::Bag(_) => DataType::Bag,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Datum::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&Bag> {
        match self {
            Datum::Bag(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DataMap> {
        match self {
            Datum::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Ord for Datum {
    fn cmp(&self, other: &Self) -> Ordering {
        use Datum::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Long(a), Long(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Double(a), Double(b)) => a.total_cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Map(a), Map(b)) => a.cmp(b),
            (Tuple(a), Tuple(b)) => a.cmp(b),
            (Bag(a), Bag(b)) => a.cmp(b),
            (a, b) => a.data_type().ordinal().cmp(&b.data_type().ordinal()),
        }
    }
}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Datum {}

impl Tuple {
    pub fn new(values: Vec<Datum>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value at `index`, or `None` when the tuple is shorter.
    pub fn get(&self, index: usize) -> Option<&Datum> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Datum> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Datum> {
        self.0
    }
}

impl Bag {
    pub fn new(tuples: Vec<Tuple>) -> Self {
        Self(tuples)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.0.iter()
    }
}

// Bags and maps order by size first, then element-wise.
impl Ord for Bag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.0.iter().cmp(other.0.iter()))
    }
}

impl PartialOrd for Bag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Datum) -> Option<Datum> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Ord for DataMap {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.0.iter().cmp(other.0.iter()))
    }
}

impl PartialOrd for DataMap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Vec<Datum>> for Tuple {
    fn from(values: Vec<Datum>) -> Self {
        Tuple(values)
    }
}

impl From<Vec<Tuple>> for Bag {
    fn from(tuples: Vec<Tuple>) -> Self {
        Bag(tuples)
    }
}

impl FromIterator<(String, Datum)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (String, Datum)>>(iter: I) -> Self {
        DataMap(iter.into_iter().collect())
    }
}

macro_rules! impl_from_for_datum {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Datum {
            fn from(value: $ty) -> Self {
                Datum::$variant(value)
            }
        }
    };
}

impl_from_for_datum!(bool, Boolean);
impl_from_for_datum!(i32, Int);
impl_from_for_datum!(i64, Long);
impl_from_for_datum!(f32, Float);
impl_from_for_datum!(f64, Double);
impl_from_for_datum!(Vec<u8>, Bytes);
impl_from_for_datum!(String, Text);
impl_from_for_datum!(DataMap, Map);
impl_from_for_datum!(Tuple, Tuple);
impl_from_for_datum!(Bag, Bag);

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_string())
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map_or(Datum::Null, Into::into)
    }
}

/// Renders a float the way the text format expects it: always with a fractional
/// part or an exponent, so that it never reads back as an integer.
pub(crate) fn write_f64(out: &mut impl Write, value: f64) -> fmt::Result {
    if value.is_nan() {
        out.write_str("NaN")
    } else if value.is_infinite() {
        out.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(out, "{value:?}")
    }
}

pub(crate) fn write_f32(out: &mut impl Write, value: f32) -> fmt::Result {
    if value.is_nan() {
        out.write_str("NaN")
    } else if value.is_infinite() {
        out.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(out, "{value:?}")
    }
}

/// Writes `datum`. Inside composites, longs and floats carry an `L`/`F` suffix and
/// text is quoted so the parser can restore their type.
fn write_datum(f: &mut Formatter<'_>, datum: &Datum, nested: bool) -> fmt::Result {
    match datum {
        Datum::Null => Ok(()),
        Datum::Boolean(b) => write!(f, "{b}"),
        Datum::Int(i) => write!(f, "{i}"),
        Datum::Long(l) if nested => write!(f, "{l}L"),
        Datum::Long(l) => write!(f, "{l}"),
        Datum::Float(v) if nested => {
            write_f32(f, *v)?;
            f.write_char('F')
        }
        Datum::Float(v) => write_f32(f, *v),
        Datum::Double(v) => write_f64(f, *v),
        Datum::Bytes(b) if nested => write_quoted(f, &String::from_utf8_lossy(b)),
        Datum::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        Datum::Text(s) if nested => write_quoted(f, s),
        Datum::Text(s) => f.write_str(s),
        Datum::Map(m) => Display::fmt(m, f),
        Datum::Tuple(t) => Display::fmt(t, f),
        Datum::Bag(b) => Display::fmt(b, f),
    }
}

/// Writes `s` between single quotes, escaping quotes and backslashes.
fn write_quoted(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char(QUOTE as char)?;
    for ch in s.chars() {
        if ch == QUOTE as char || ch == ESCAPE as char {
            f.write_char(ESCAPE as char)?;
        }
        f.write_char(ch)?;
    }
    f.write_char(QUOTE as char)
}

impl Display for Datum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_datum(f, self, false)
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // `()` is the empty tuple
        if let [Datum::Null] = self.0.as_slice() {
            return f.write_str(LONE_NULL);
        }
        f.write_char('(')?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write_datum(f, value, true)?;
        }
        f.write_char(')')
    }
}

impl Display for Bag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        for (i, tuple) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            Display::fmt(tuple, f)?;
        }
        f.write_char('}')
    }
}

impl Display for DataMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            if key.starts_with(QUOTE as char) || key.bytes().any(is_delimiter) {
                write_quoted(f, key)?;
            } else {
                f.write_str(key)?;
            }
            f.write_char('#')?;
            write_datum(f, value, true)?;
        }
        f.write_char(']')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first() {
        assert!(Datum::Null < Datum::Int(i32::MIN));
        assert!(Datum::Null < Datum::Text(String::new()));
        assert_eq!(Datum::Null, Datum::Null);
    }

    #[test]
    fn cross_type_order_uses_type_ordinal() {
        assert!(Datum::Int(100) < Datum::Long(1));
        assert!(Datum::Double(1e300) < Datum::Text("a".to_string()));
    }

    #[test]
    fn nan_is_equal_to_itself() {
        assert_eq!(Datum::Double(f64::NAN), Datum::Double(f64::NAN));
        assert!(Datum::Double(f64::INFINITY) < Datum::Double(f64::NAN));
    }

    #[test]
    fn bags_order_by_size_first() {
        let small = Bag::new(vec![Tuple::new(vec![Datum::Int(9)])]);
        let large = Bag::new(vec![
            Tuple::new(vec![Datum::Int(1)]),
            Tuple::new(vec![Datum::Int(1)]),
        ]);
        assert!(small < large);
    }

    #[test]
    fn tuples_order_element_wise() {
        let a = Tuple::new(vec![Datum::Int(1), Datum::Int(5)]);
        let b = Tuple::new(vec![Datum::Int(2)]);
        assert!(a < b);
        let prefix = Tuple::new(vec![Datum::Int(1)]);
        assert!(prefix < a);
    }

    #[test]
    fn renders_nested_values() {
        let mut map = DataMap::new();
        map.insert("b", Datum::Long(7));
        map.insert("a", Datum::Text("x".to_string()));
        let tuple = Tuple::new(vec![
            Datum::Int(1),
            Datum::Null,
            Datum::Double(2.0),
            Datum::Float(1.5),
            Datum::Bag(Bag::new(vec![Tuple::new(vec![Datum::Long(3)])])),
            Datum::Map(map),
        ]);
        assert_eq!(tuple.to_string(), "(1,,2.0,1.5F,{(3L)},[a#'x',b#7L])");
    }

    #[test]
    fn renders_nested_text_quoted() {
        let tuple = Tuple::new(vec![
            Datum::from("5"),
            Datum::from("it's a,b"),
            Datum::from(r"c:\dir"),
        ]);
        assert_eq!(tuple.to_string(), r"('5','it\'s a,b','c:\\dir')");

        let mut map = DataMap::new();
        map.insert("k#1", Datum::Int(1));
        map.insert("plain", Datum::Int(2));
        assert_eq!(map.to_string(), "['k#1'#1,plain#2]");
    }

    #[test]
    fn renders_lone_null_and_non_finite_floats() {
        assert_eq!(Tuple::new(vec![Datum::Null]).to_string(), "(null)");
        assert_eq!(Tuple::new(vec![]).to_string(), "()");
        assert_eq!(Tuple::new(vec![Datum::Null, Datum::Null]).to_string(), "(,)");
        let floats = Tuple::new(vec![Datum::Float(f32::NAN), Datum::Float(f32::NEG_INFINITY)]);
        assert_eq!(floats.to_string(), "(NaNF,-InfinityF)");
    }

    #[test]
    fn top_level_atoms_have_no_suffix() {
        assert_eq!(Datum::Long(42).to_string(), "42");
        assert_eq!(Datum::Double(2.25).to_string(), "2.25");
        assert_eq!(Datum::Float(f32::INFINITY).to_string(), "Infinity");
    }
}
