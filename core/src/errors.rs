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

//! Errors raised by the schema tree, the sort partitioner and the boundary table.

use arrow::error::ArrowError;
use quill_types::ConversionError;

#[derive(thiserror::Error, Debug)]
pub enum QuillError {
    /// Missing or unusable job configuration. Fatal for the worker task.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Malformed schema, for example a bag whose nested schema is not a single tuple.
    #[error("Schema Error: {0}")]
    Schema(String),

    #[error("Quill Internal Error: {0}")]
    Internal(String),

    #[error(transparent)]
    Conversion {
        #[from]
        source: ConversionError,
    },

    #[error(transparent)]
    Arrow {
        #[from]
        source: ArrowError,
    },

    #[error(transparent)]
    ObjectStore {
        #[from]
        source: object_store::Error,
    },

    #[error(transparent)]
    IO {
        #[from]
        source: std::io::Error,
    },

    #[error(transparent)]
    Url {
        #[from]
        source: url::ParseError,
    },
}

pub type QuillResult<T> = Result<T, QuillError>;

impl QuillError {
    pub fn is_config(&self) -> bool {
        matches!(self, QuillError::Config(_))
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, QuillError::Schema(_))
    }
}
