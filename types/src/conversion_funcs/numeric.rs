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

use std::fmt::Display;
use std::str::FromStr;

/// helper to parse floats from string inputs
pub(crate) fn parse_string_to_float<F>(s: &str) -> Option<F>
where
    F: FromStr + num::Float,
{
    let s = s.trim();
    // Handle +inf / -inf
    if s.eq_ignore_ascii_case("inf")
        || s.eq_ignore_ascii_case("+inf")
        || s.eq_ignore_ascii_case("infinity")
        || s.eq_ignore_ascii_case("+infinity")
    {
        return Some(F::infinity());
    }
    if s.eq_ignore_ascii_case("-inf") || s.eq_ignore_ascii_case("-infinity") {
        return Some(F::neg_infinity());
    }
    if s.eq_ignore_ascii_case("nan") {
        return Some(F::nan());
    }
    // Remove D/F suffix if present
    let pruned_float_str =
        if s.ends_with('d') || s.ends_with('D') || s.ends_with('f') || s.ends_with('F') {
            &s[..s.len() - 1]
        } else {
            s
        };
    // Rust's parse logic already handles scientific notations so we just rely on it
    pruned_float_str.parse::<F>().ok()
}

/// Integer targets that accept a floating point fallback.
pub(crate) trait BoundedInteger: FromStr + Copy + Display {
    const TYPE_NAME: &'static str;
    const MAX_AS_F64: f64;

    /// Truncates toward zero. Values below the minimum saturate.
    fn truncate_from(value: f64) -> Self;
}

impl BoundedInteger for i32 {
    const TYPE_NAME: &'static str = "int";
    const MAX_AS_F64: f64 = i32::MAX as f64;

    fn truncate_from(value: f64) -> Self {
        value as i32
    }
}

impl BoundedInteger for i64 {
    const TYPE_NAME: &'static str = "long";
    const MAX_AS_F64: f64 = i64::MAX as f64;

    fn truncate_from(value: f64) -> Self {
        value as i64
    }
}

/// Outcome of parsing text into an integer.
#[derive(Debug, PartialEq)]
pub(crate) enum IntegerParse<T> {
    /// The text was an integer literal.
    Exact(T),
    /// The text was a floating point literal and was truncated.
    Truncated(T, f64),
    /// The floating point value exceeds the maximum of the target type.
    Overflow(f64),
    /// Neither an integer nor a floating point literal.
    Invalid(String),
}

pub(crate) fn parse_string_to_integer<T>(s: &str) -> IntegerParse<T>
where
    T: BoundedInteger,
    <T as FromStr>::Err: Display,
{
    match s.parse::<T>() {
        Ok(v) => IntegerParse::Exact(v),
        Err(e) => match parse_string_to_float::<f64>(s) {
            // The guard is only on the upper bound, negative values saturate.
            Some(d) if d > T::MAX_AS_F64 + 1.0 => IntegerParse::Overflow(d),
            Some(d) => IntegerParse::Truncated(T::truncate_from(d), d),
            None => IntegerParse::Invalid(e.to_string()),
        },
    }
}
