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

use quill_types::DataType;

/// Source schema descriptor produced by the plan compiler.
///
/// Nested schemas may be missing when the compiler could only infer part of the
/// layout; [`crate::schema::ResourceSchema`] accepts such partial schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicalSchema {
    pub fields: Vec<LogicalFieldSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalFieldSchema {
    pub alias: Option<String>,
    pub data_type: DataType,
    pub schema: Option<LogicalSchema>,
}

impl LogicalSchema {
    pub fn new(fields: Vec<LogicalFieldSchema>) -> Self {
        Self { fields }
    }
}

impl LogicalFieldSchema {
    pub fn new(alias: impl Into<String>, data_type: DataType) -> Self {
        Self {
            alias: Some(alias.into()),
            data_type,
            schema: None,
        }
    }

    pub fn nested(alias: impl Into<String>, data_type: DataType, schema: LogicalSchema) -> Self {
        Self {
            alias: Some(alias.into()),
            data_type,
            schema: Some(schema),
        }
    }

    /// A field without alias, as produced for positional tuple elements.
    pub fn anonymous(data_type: DataType, schema: Option<LogicalSchema>) -> Self {
        Self {
            alias: None,
            data_type,
            schema,
        }
    }
}
