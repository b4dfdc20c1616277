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

use std::fmt::{Display, Formatter};

/// Field types understood by the schema model and the coercion layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    #[default]
    Unknown,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Text,
    Map,
    Tuple,
    /// A collection of tuples sharing one tuple shape.
    Bag,
}

impl DataType {
    /// Atomic types carry no nested schema.
    pub fn is_atomic(&self) -> bool {
        !matches!(
            self,
            DataType::Tuple | DataType::Bag | DataType::Map | DataType::Unknown
        )
    }

    /// Tuple and bag fields own a nested schema.
    pub fn is_nested(&self) -> bool {
        matches!(self, DataType::Tuple | DataType::Bag)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int | DataType::Long | DataType::Float | DataType::Double
        )
    }

    /// Position of the type in the cross-type ordering of values.
    pub fn ordinal(&self) -> u8 {
        match self {
            DataType::Unknown => 0,
            DataType::Boolean => 5,
            DataType::Int => 10,
            DataType::Long => 15,
            DataType::Float => 20,
            DataType::Double => 25,
            DataType::Bytes => 50,
            DataType::Text => 55,
            DataType::Map => 100,
            DataType::Tuple => 110,
            DataType::Bag => 120,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::Boolean => "boolean",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Bytes => "bytearray",
            DataType::Text => "chararray",
            DataType::Map => "map",
            DataType::Tuple => "tuple",
            DataType::Bag => "bag",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_and_nested_are_disjoint() {
        for dt in [
            DataType::Unknown,
            DataType::Boolean,
            DataType::Int,
            DataType::Long,
            DataType::Float,
            DataType::Double,
            DataType::Bytes,
            DataType::Text,
            DataType::Map,
            DataType::Tuple,
            DataType::Bag,
        ] {
            assert!(!(dt.is_atomic() && dt.is_nested()), "{dt}");
        }
        assert!(!DataType::Map.is_atomic());
        assert!(!DataType::Map.is_nested());
    }

    #[test]
    fn ordinals_follow_declaration_order() {
        assert!(DataType::Int.ordinal() < DataType::Long.ordinal());
        assert!(DataType::Double.ordinal() < DataType::Bytes.ordinal());
        assert!(DataType::Text.ordinal() < DataType::Tuple.ordinal());
        assert_eq!(DataType::Text.to_string(), "chararray");
    }
}
