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

//! Value model, structured-value text format and byte coercion shared by the
//! loaders, storers and the sort partitioner.

mod conversion_funcs;
mod data_type;
mod datum;
mod error;
mod parser;

pub use conversion_funcs::{
    CollectingWarningSink, LogWarningSink, ToUtf8Bytes, Utf8StorageConverter, WarningSink,
};
pub use data_type::DataType;
pub use datum::{Bag, DataMap, Datum, Tuple};
pub use error::{ConversionError, ConversionResult};
pub use parser::TextDataParser;
