// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Error;
use crate::layout::{mask, BitLayout};
use serde::{Deserialize, Serialize};

/// DecodedId is the parts of a Snowflake ID.
///
/// `gene` is only present for IDs issued by a [`ServiceIdGenerator`]; in that case
/// `sequence` holds the high part of the sequence field and `gene` the low part.
///
/// [`ServiceIdGenerator`]: crate::ServiceIdGenerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedId {
    /// Absolute time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub data_center_id: u16,
    pub worker_id: u16,
    pub sequence: u16,
    pub gene: Option<u16>,
}

/// Packs fields into IDs and breaks IDs back up, according to one [`BitLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCodec {
    layout: BitLayout,
    gene_bits: u8,
}

impl IdCodec {
    /// A codec for plain IDs, whose whole sequence field is the sequence.
    pub fn new(layout: BitLayout) -> Self {
        Self {
            layout,
            gene_bits: 0,
        }
    }

    /// A codec for service IDs, whose lowest `gene_bits` sequence bits carry a gene.
    pub fn with_gene_bits(layout: BitLayout, gene_bits: u8) -> Result<Self, Error> {
        if gene_bits >= layout.sequence_bits() {
            return Err(Error::InvalidGeneBits {
                gene_bits,
                sequence_bits: layout.sequence_bits(),
            });
        }
        Ok(Self { layout, gene_bits })
    }

    pub fn layout(&self) -> &BitLayout {
        &self.layout
    }

    pub fn gene_bits(&self) -> u8 {
        self.gene_bits
    }

    /// Break an ID up into its parts.
    ///
    /// Never fails: decoding an ID with a layout other than the one it was
    /// issued with yields meaningless fields.
    pub fn decode(&self, id: u64) -> DecodedId {
        let layout = &self.layout;
        let sequence_field = id & mask(layout.sequence_bits());
        let (sequence, gene) = if self.gene_bits > 0 {
            (
                (sequence_field >> self.gene_bits) as u16,
                Some((sequence_field & mask(self.gene_bits)) as u16),
            )
        } else {
            (sequence_field as u16, None)
        };

        DecodedId {
            timestamp: (((id >> layout.timestamp_shift()) & mask(layout.timestamp_bits())) as i64)
                .saturating_add(layout.epoch_millis()),
            data_center_id: ((id >> layout.data_center_id_shift())
                & mask(layout.data_center_id_bits())) as u16,
            worker_id: ((id >> layout.worker_id_shift()) & mask(layout.worker_id_bits())) as u16,
            sequence,
            gene,
        }
    }

    /// Pack parts into an ID, rejecting any field that does not fit its section.
    pub fn encode(&self, parts: &DecodedId) -> Result<u64, Error> {
        let layout = &self.layout;
        let elapsed = parts
            .timestamp
            .checked_sub(layout.epoch_millis())
            .ok_or(Error::FieldOutOfRange {
                field: "timestamp",
                value: parts.timestamp,
                max: layout.max_elapsed(),
            })?;
        check_range("timestamp", elapsed, layout.max_elapsed())?;
        check_range(
            "data_center_id",
            parts.data_center_id as i64,
            layout.max_data_center_id() as i64,
        )?;
        check_range(
            "worker_id",
            parts.worker_id as i64,
            layout.max_worker_id() as i64,
        )?;

        let gene_mask = mask(self.gene_bits);
        let sequence_max = mask(layout.sequence_bits() - self.gene_bits);
        check_range("sequence", parts.sequence as i64, sequence_max as i64)?;
        let gene = parts.gene.unwrap_or(0);
        check_range("gene", gene as i64, gene_mask as i64)?;

        let sequence_field = ((parts.sequence as u64) << self.gene_bits) | gene as u64;
        Ok(self.pack(
            elapsed as u64,
            parts.data_center_id,
            parts.worker_id,
            sequence_field,
        ))
    }

    /// Pack already range-checked sections.
    pub(crate) fn pack(
        &self,
        elapsed: u64,
        data_center_id: u16,
        worker_id: u16,
        sequence_field: u64,
    ) -> u64 {
        let layout = &self.layout;
        elapsed << layout.timestamp_shift()
            | (data_center_id as u64) << layout.data_center_id_shift()
            | (worker_id as u64) << layout.worker_id_shift()
            | sequence_field
    }
}

fn check_range(field: &'static str, value: i64, max: i64) -> Result<(), Error> {
    if value < 0 || value > max {
        return Err(Error::FieldOutOfRange { field, value, max });
    }
    Ok(())
}
