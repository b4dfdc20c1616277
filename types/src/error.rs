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

use crate::data_type::DataType;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("[MALFORMED_VALUE] Cannot parse structured value at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("[NESTING_TOO_DEEP] Structured value exceeds the maximum nesting depth of {max_depth}")]
    NestingTooDeep { max_depth: usize },

    #[error("[UNEXPECTED_TYPE] A value of type \"{actual}\" cannot be converted to \"{expected}\"")]
    UnexpectedType {
        expected: DataType,
        actual: DataType,
    },
}

pub type ConversionResult<T> = Result<T, ConversionError>;

impl From<ConversionError> for std::io::Error {
    fn from(value: ConversionError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value)
    }
}
