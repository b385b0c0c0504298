// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::allocator::WorkerIdentity;
use crate::clock::{Clock, MonotonicClock, SystemClock};
use crate::codec::IdCodec;
use crate::error::{BoxDynError, Error};
use crate::layout::*;
use crate::snowflake::{Internals, SharedSnowflake, Snowflake};
use chrono::prelude::*;
use std::sync::{Arc, Mutex};

/// A builder for building the ['Snowflake'] generator.
///
/// [`Snowflake`]: struct.Snowflake.html
pub struct Builder<'a> {
    epoch_millis: i64,
    worker_id: Option<&'a dyn Fn() -> Result<u16, BoxDynError>>,
    data_center_id: Option<&'a dyn Fn() -> Result<u16, BoxDynError>>,
    check_worker_id: Option<&'a dyn Fn(u16) -> bool>,
    check_data_center_id: Option<&'a dyn Fn(u16) -> bool>,
    bit_len_time: u8,
    bit_len_sequence: u8,
    bit_len_data_center_id: u8,
    bit_len_worker_id: u8,
    use_system_clock: bool,
    clock: Option<Box<dyn Clock>>,
    max_backward_ms: u64,
}

impl<'a> Default for Builder<'a> {
    fn default() -> Self {
        Builder::new()
    }
}

impl<'a> Builder<'a> {
    /// Construct a new builder for the build of ['Snowflake'].
    ///
    /// [`Snowflake`]: struct.Snowflake.html
    pub fn new() -> Self {
        Self {
            epoch_millis: DEFAULT_EPOCH_MILLIS,
            worker_id: None,
            data_center_id: None,
            check_worker_id: None,
            check_data_center_id: None,
            bit_len_time: DEFAULT_BIT_LEN_TIME,
            bit_len_sequence: DEFAULT_BIT_LEN_SEQUENCE,
            bit_len_data_center_id: DEFAULT_BIT_LEN_DATA_CENTER_ID,
            bit_len_worker_id: DEFAULT_BIT_LEN_WORKER_ID,
            use_system_clock: false,
            clock: None,
            max_backward_ms: 0,
        }
    }

    /// Set the epoch.
    /// If the epoch is set later than the current time, 'finalize' will fail.
    pub fn epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch_millis = epoch.timestamp_millis();
        self
    }

    /// Set the epoch in milliseconds since the Unix epoch.
    pub fn epoch_millis(mut self, epoch_millis: i64) -> Self {
        self.epoch_millis = epoch_millis;
        self
    }

    /// Take every bit length and the epoch from `layout`.
    pub fn layout(mut self, layout: BitLayout) -> Self {
        self.epoch_millis = layout.epoch_millis();
        self.bit_len_time = layout.timestamp_bits();
        self.bit_len_data_center_id = layout.data_center_id_bits();
        self.bit_len_worker_id = layout.worker_id_bits();
        self.bit_len_sequence = layout.sequence_bits();
        self
    }

    /// Set the worker ID.
    /// If the provided closure returns an error, 'finalize' will fail.
    pub fn worker_id(mut self, worker_id: &'a dyn Fn() -> Result<u16, BoxDynError>) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    /// Set up the data center ID.
    /// If the provided closure returns an error, 'finalize' will fail.
    pub fn data_center_id(
        mut self,
        data_center_id: &'a dyn Fn() -> Result<u16, BoxDynError>,
    ) -> Self {
        self.data_center_id = Some(data_center_id);
        self
    }

    /// Set up a function to check the worker ID.
    /// If the function returns 'false', 'finalize' will fail.
    pub fn check_worker_id(mut self, check_worker_id: &'a dyn Fn(u16) -> bool) -> Self {
        self.check_worker_id = Some(check_worker_id);
        self
    }

    /// Set up a function to check the data center ID.
    /// If the function returns 'false', 'finalize' will fail.
    pub fn check_data_center_id(mut self, check_data_center_id: &'a dyn Fn(u16) -> bool) -> Self {
        self.check_data_center_id = Some(check_data_center_id);
        self
    }

    /// Set the bit length of the timestamp section.
    pub fn bit_len_time(mut self, bit_len_time: u8) -> Self {
        self.bit_len_time = bit_len_time;
        self
    }

    /// Sets the bit length of the sequence section.
    pub fn bit_len_sequence(mut self, bit_len_sequence: u8) -> Self {
        self.bit_len_sequence = bit_len_sequence;
        self
    }

    /// Set the bit length for the Data Center ID section.
    pub fn bit_len_data_center_id(mut self, bit_len_data_center_id: u8) -> Self {
        self.bit_len_data_center_id = bit_len_data_center_id;
        self
    }

    /// Set the bit length of the worker ID section.
    pub fn bit_len_worker_id(mut self, bit_len_worker_id: u8) -> Self {
        self.bit_len_worker_id = bit_len_worker_id;
        self
    }

    /// Read the wall clock on every call instead of the default monotonic counter.
    /// Ignored when a custom clock is set.
    pub fn use_system_clock(mut self, use_system_clock: bool) -> Self {
        self.use_system_clock = use_system_clock;
        self
    }

    /// Use a custom time source.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Tolerate the clock moving backwards by up to `max_backward_ms` milliseconds
    /// by waiting for it to catch up. Any larger regression fails `next_id`.
    pub fn max_backward_ms(mut self, max_backward_ms: u64) -> Self {
        self.max_backward_ms = max_backward_ms;
        self
    }

    /// Finish building and create a Snowflake instance.
    /// This method will return an error if any of the configured functions return an error or if validation fails.
    pub fn finalize(self) -> Result<Snowflake, Error> {
        let layout = BitLayout::new(
            self.bit_len_time,
            self.bit_len_data_center_id,
            self.bit_len_worker_id,
            self.bit_len_sequence,
            self.epoch_millis,
        )?;

        let clock: Box<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None if self.use_system_clock => Box::new(SystemClock),
            None => Box::new(MonotonicClock::new()),
        };

        if layout.epoch_millis() > clock.now_millis() {
            let epoch = Utc
                .timestamp_millis_opt(layout.epoch_millis())
                .single()
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            return Err(Error::EpochAheadOfCurrentTime(epoch));
        }

        let worker_id_mask = layout.max_worker_id();
        let worker_id = match self.worker_id {
            Some(worker_id_fn) => worker_id_fn().map_err(Error::WorkerIdFailed)?,
            None => return Err(Error::WorkerIdFailed("Worker ID not provided".into())),
        };

        if worker_id > worker_id_mask {
            return Err(Error::WorkerIdFailed(
                format!(
                    "Worker ID {} is greater than the max allowed value {}",
                    worker_id, worker_id_mask
                )
                .into(),
            ));
        }

        if let Some(check_worker_id) = self.check_worker_id {
            if !check_worker_id(worker_id) {
                return Err(Error::CheckWorkerIdFailed);
            }
        }

        let data_center_id_mask = layout.max_data_center_id();
        let data_center_id = match self.data_center_id {
            Some(data_center_id_fn) => data_center_id_fn().map_err(Error::DataCenterIdFailed)?,
            None => {
                return Err(Error::DataCenterIdFailed(
                    "Data Center ID not provided".into(),
                ))
            }
        };

        if data_center_id > data_center_id_mask {
            return Err(Error::DataCenterIdFailed(
                format!(
                    "Data Center ID {} is greater than the max allowed value {}",
                    data_center_id, data_center_id_mask
                )
                .into(),
            ));
        }

        if let Some(check_data_center_id) = self.check_data_center_id {
            if !check_data_center_id(data_center_id) {
                return Err(Error::CheckDataCenterIdFailed);
            }
        }

        let shared = Arc::new(SharedSnowflake {
            codec: IdCodec::new(layout),
            identity: WorkerIdentity {
                worker_id,
                data_center_id,
            },
            clock,
            max_backward_ms: i64::try_from(self.max_backward_ms).unwrap_or(i64::MAX),
            internals: Mutex::new(Internals {
                last_timestamp: i64::MIN,
                sequence: 0,
            }),
        });
        Ok(Snowflake::new_inner(shared))
    }
}
