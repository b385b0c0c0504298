// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Error;
use crate::layout::*;
use crate::service::DEFAULT_GENE_BITS;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default hash key holding the worker id lease counters.
pub const DEFAULT_COORDINATION_KEY: &str = "snowflake_work_id_key";
/// Default connect/read/write timeout of the coordination call.
pub const DEFAULT_COORDINATION_TIMEOUT_MS: u64 = 3000;

/// Settings of the process-wide generator.
///
/// Every field is optional when deserializing; missing ones take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SnowflakeConfig {
    /// Read the wall clock instead of the monotonic counter.
    pub use_system_clock: bool,
    pub epoch_millis: i64,
    pub timestamp_bits: u8,
    pub data_center_id_bits: u8,
    pub worker_id_bits: u8,
    pub sequence_bits: u8,
    /// Low sequence bits given to the gene of service-scoped ids.
    pub gene_bits: u8,
    /// Backward clock movement waited out instead of rejected.
    pub max_backward_ms: u64,
    /// Lease worker ids from Redis when set.
    pub coordination: Option<CoordinationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CoordinationConfig {
    pub redis_url: String,
    #[serde(default = "default_coordination_key")]
    pub key: String,
    #[serde(default = "default_coordination_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_coordination_key() -> String {
    DEFAULT_COORDINATION_KEY.to_string()
}

fn default_coordination_timeout_ms() -> u64 {
    DEFAULT_COORDINATION_TIMEOUT_MS
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            use_system_clock: false,
            epoch_millis: DEFAULT_EPOCH_MILLIS,
            timestamp_bits: DEFAULT_BIT_LEN_TIME,
            data_center_id_bits: DEFAULT_BIT_LEN_DATA_CENTER_ID,
            worker_id_bits: DEFAULT_BIT_LEN_WORKER_ID,
            sequence_bits: DEFAULT_BIT_LEN_SEQUENCE,
            gene_bits: DEFAULT_GENE_BITS,
            max_backward_ms: 0,
            coordination: None,
        }
    }
}

impl SnowflakeConfig {
    /// Load settings from an optional TOML file, then from `SNOWFLAKE_*`
    /// environment variables (`SNOWFLAKE_COORDINATION__REDIS_URL` for nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("SNOWFLAKE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// The validated bit layout.
    pub fn layout(&self) -> Result<BitLayout, Error> {
        BitLayout::new(
            self.timestamp_bits,
            self.data_center_id_bits,
            self.worker_id_bits,
            self.sequence_bits,
            self.epoch_millis,
        )
    }
}
