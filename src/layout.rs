// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Error;

/// Default epoch in milliseconds since the Unix epoch (2010-11-04T01:42:54.657Z).
pub const DEFAULT_EPOCH_MILLIS: i64 = 1_288_834_974_657;
/// Default bit length of the timestamp section.
pub const DEFAULT_BIT_LEN_TIME: u8 = 41;
/// Default bit length of the data center id section.
pub const DEFAULT_BIT_LEN_DATA_CENTER_ID: u8 = 5;
/// Default bit length of the worker id section.
pub const DEFAULT_BIT_LEN_WORKER_ID: u8 = 5;
/// Default bit length of the sequence section.
pub const DEFAULT_BIT_LEN_SEQUENCE: u8 = 12;

/// The bit partition of a Snowflake ID.
///
/// From the most significant end: one unused sign bit, the timestamp (milliseconds
/// since `epoch_millis`), the data center id, the worker id and the sequence.
/// The four widths always sum to 63, so every ID fits a non-negative `i64`.
///
/// The same value must be used to encode and decode an ID; see [`IdCodec`].
///
/// [`IdCodec`]: crate::IdCodec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitLayout {
    timestamp_bits: u8,
    data_center_id_bits: u8,
    worker_id_bits: u8,
    sequence_bits: u8,
    epoch_millis: i64,
}

impl Default for BitLayout {
    fn default() -> Self {
        Self {
            timestamp_bits: DEFAULT_BIT_LEN_TIME,
            data_center_id_bits: DEFAULT_BIT_LEN_DATA_CENTER_ID,
            worker_id_bits: DEFAULT_BIT_LEN_WORKER_ID,
            sequence_bits: DEFAULT_BIT_LEN_SEQUENCE,
            epoch_millis: DEFAULT_EPOCH_MILLIS,
        }
    }
}

impl BitLayout {
    /// Create a layout, checking that the widths add up to 63 bits.
    ///
    /// Data center and worker ids are `u16`, so each may use at most 16 bits.
    /// The sequence needs between 1 and 16 bits.
    pub fn new(
        timestamp_bits: u8,
        data_center_id_bits: u8,
        worker_id_bits: u8,
        sequence_bits: u8,
        epoch_millis: i64,
    ) -> Result<Self, Error> {
        let total = timestamp_bits as u32
            + data_center_id_bits as u32
            + worker_id_bits as u32
            + sequence_bits as u32;
        if total != 63
            || data_center_id_bits > 16
            || worker_id_bits > 16
            || sequence_bits == 0
            || sequence_bits > 16
        {
            return Err(Error::InvalidBitLength(
                timestamp_bits,
                data_center_id_bits,
                worker_id_bits,
                sequence_bits,
            ));
        }

        Ok(Self {
            timestamp_bits,
            data_center_id_bits,
            worker_id_bits,
            sequence_bits,
            epoch_millis,
        })
    }

    /// Returns a copy of this layout with a different epoch.
    pub fn with_epoch_millis(mut self, epoch_millis: i64) -> Self {
        self.epoch_millis = epoch_millis;
        self
    }

    pub fn timestamp_bits(&self) -> u8 {
        self.timestamp_bits
    }

    pub fn data_center_id_bits(&self) -> u8 {
        self.data_center_id_bits
    }

    pub fn worker_id_bits(&self) -> u8 {
        self.worker_id_bits
    }

    pub fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    /// Milliseconds since the Unix epoch that map to a timestamp field of zero.
    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    pub fn worker_id_shift(&self) -> u8 {
        self.sequence_bits
    }

    pub fn data_center_id_shift(&self) -> u8 {
        self.sequence_bits + self.worker_id_bits
    }

    pub fn timestamp_shift(&self) -> u8 {
        self.sequence_bits + self.worker_id_bits + self.data_center_id_bits
    }

    pub fn max_worker_id(&self) -> u16 {
        mask(self.worker_id_bits) as u16
    }

    pub fn max_data_center_id(&self) -> u16 {
        mask(self.data_center_id_bits) as u16
    }

    pub fn max_sequence(&self) -> u16 {
        mask(self.sequence_bits) as u16
    }

    /// The largest elapsed time (in milliseconds past the epoch) that still fits.
    pub fn max_elapsed(&self) -> i64 {
        mask(self.timestamp_bits) as i64
    }
}

/// A mask of the lowest `bits` bits.
pub(crate) fn mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
