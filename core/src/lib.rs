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

// The clippy throws an error if the reference clone not wrapped into `Arc::clone`
// The lint makes easier for code reader/reviewer separate references clones from more heavyweight ones
#![deny(clippy::clone_on_ref_ptr)]

//! Schema tree, sort comparator, quantile sampler and range partitioner of the
//! Quill dataflow engine.

use log::{info, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{load_config_file, Appender, Deserializers, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use once_cell::sync::OnceCell;

pub mod config;
pub mod errors;
pub mod execution;
pub mod schema;

pub use config::JobConf;
pub use errors::{QuillError, QuillResult};
pub use execution::{partitioner, sampler, sort};

static LOGGER: OnceCell<()> = OnceCell::new();

/// Installs the process-wide logger. Only the first successful call has an effect.
///
/// Uses the log4rs file named by `quill.log.config` when set, and otherwise logs
/// to stderr at `INFO`.
pub fn init_logging(conf: &JobConf) -> QuillResult<()> {
    LOGGER.get_or_try_init(|| -> QuillResult<()> {
        let log_config = match conf.get_non_empty(config::LOG_CONFIG_KEY) {
            Some(path) => load_config_file(path, Deserializers::default())
                .map_err(|err| QuillError::Config(err.to_string()))?,
            None => default_logger_config()?,
        };
        // another logger may already be installed by the host process
        let _ = log4rs::init_config(log_config);
        info!(
            "Quill core version {} initialized",
            env!("CARGO_PKG_VERSION")
        );
        Ok(())
    })?;
    Ok(())
}

const LOG_PATTERN: &str = "{d(%y/%m/%d %H:%M:%S)} {l} {f}: {m}{n}";

// Creates a default log4rs config, which logs to console with `INFO` level.
fn default_logger_config() -> QuillResult<Config> {
    let console_append = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let appender = Appender::builder().build("console", Box::new(console_append));
    let root = Root::builder().appender("console").build(LevelFilter::Info);
    Config::builder()
        .appender(appender)
        .build(root)
        .map_err(|err| QuillError::Config(err.to_string()))
}
