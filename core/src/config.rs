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

//! Job configuration handed to every worker task.

use crate::errors::{QuillError, QuillResult};
use std::collections::HashMap;

/// Location of the persisted boundary table read by the sort partitioner.
pub const QUANTILES_LOCATION_KEY: &str = "quill.sort.quantiles.location";
/// Optional log4rs configuration file.
pub const LOG_CONFIG_KEY: &str = "quill.log.config";

/// String key/value configuration of a job, as distributed by the execution
/// substrate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobConf {
    configs: HashMap<String, String>,
}

impl JobConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.configs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.configs.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, treating an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// Returns the value for `key` or a configuration error naming the key.
    pub fn get_required(&self, key: &str) -> QuillResult<&str> {
        self.get_non_empty(key).ok_or_else(|| {
            QuillError::Config(format!("Required configuration '{key}' is missing or empty"))
        })
    }

    pub fn parse_bool(&self, key: &str) -> QuillResult<bool> {
        self.get(key)
            .unwrap_or("false")
            .trim()
            .parse::<bool>()
            .map_err(|e| QuillError::Config(format!("Invalid value for '{key}': {e}")))
    }
}

impl From<HashMap<String, String>> for JobConf {
    fn from(configs: HashMap<String, String>) -> Self {
        Self { configs }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobConf {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            configs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
