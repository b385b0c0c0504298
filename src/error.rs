// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use thiserror::Error;

/// Convenience type alias for usage within Snowflake.
pub type BoxDynError = Box<dyn StdError + 'static + Send + Sync>;

/// The error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("epoch `{0}` is ahead of current time")]
    EpochAheadOfCurrentTime(DateTime<Utc>),
    #[error("worker_id returned an error: {0}")]
    WorkerIdFailed(#[source] BoxDynError),
    #[error("data_center_id returned an error: {0}")]
    DataCenterIdFailed(#[source] BoxDynError),
    #[error("check_worker_id returned false")]
    CheckWorkerIdFailed,
    #[error("check_data_center_id returned false")]
    CheckDataCenterIdFailed,
    #[error("clock moved backwards, refusing to generate id for {0} milliseconds")]
    ClockMovedBackward(i64),
    #[error("over the time limit")]
    OverTimeLimit,
    #[error("mutex is poisoned (i.e. a panic happened while it was locked)")]
    MutexPoisoned,
    #[error(
        "invalid bit length configuration: time({0}) + data_center({1}) + worker({2}) + sequence({3}) must be 63"
    )]
    InvalidBitLength(u8, u8, u8, u8),
    #[error("gene bits ({gene_bits}) must be less than sequence bits ({sequence_bits})")]
    InvalidGeneBits { gene_bits: u8, sequence_bits: u8 },
    #[error("{field} `{value}` is out of range, max allowed value is {max}")]
    FieldOutOfRange {
        field: &'static str,
        value: i64,
        max: i64,
    },
    #[error("no id generator registered for resource `{0}`")]
    GeneratorNotFound(String),
    #[error("an id generator is already registered for resource `{0}`")]
    GeneratorAlreadyRegistered(String),
    #[error("service id `{0}` is not a valid integer")]
    InvalidServiceId(String),
    #[error("id `{0}` is not a valid unsigned integer")]
    InvalidId(String),
    #[error("invalid coordination store url: {0}")]
    InvalidCoordinationUrl(#[source] BoxDynError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),
}
