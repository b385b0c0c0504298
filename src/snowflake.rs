// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::allocator::{WorkerAllocator, WorkerIdentity};
use crate::builder::Builder;
use crate::clock::Clock;
use crate::codec::{DecodedId, IdCodec};
use crate::config::SnowflakeConfig;
use crate::error::*;
use crate::layout::BitLayout;
use std::{
    fmt,
    sync::{Arc, Mutex},
    thread,
};
use tracing::debug;

/// Internals of Snowflake.
/// This struct is not exposed to the public.
#[derive(Debug)]
pub(crate) struct Internals {
    /// Clock reading (ms since the Unix epoch) of the last issued id.
    pub(crate) last_timestamp: i64,
    /// Last sequence value handed out within `last_timestamp`.
    pub(crate) sequence: u32,
}

/// SharedSnowflake is shared between Snowflake instances.
/// This struct is not exposed to the public.
pub(crate) struct SharedSnowflake {
    pub(crate) codec: IdCodec,
    pub(crate) identity: WorkerIdentity,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) max_backward_ms: i64,
    pub(crate) internals: Mutex<Internals>,
}

/// Snowflake is a distributed unique ID generator.
/// It is thread-safe and can be cloned to be used in multiple threads.
///
/// Clones share one state, so they keep handing out strictly increasing ids.
/// Independently built instances never contend with each other.
pub struct Snowflake(pub(crate) Arc<SharedSnowflake>);

impl Snowflake {
    /// Create a new Snowflake with the default configuration and a random
    /// worker identity.
    /// For custom configuration see [`builder`] or [`WorkerAllocator`].
    ///
    /// [`builder`]: struct.Snowflake.html#method.builder
    pub fn new() -> Result<Self, Error> {
        WorkerAllocator::Random.choose_and_init(&SnowflakeConfig::default())
    }

    /// Create a new [`Builder`] to construct a Snowflake.
    ///
    /// [`Builder`]: struct.Builder.html
    pub fn builder<'a>() -> Builder<'a> {
        Builder::new()
    }

    pub(crate) fn new_inner(shared: Arc<SharedSnowflake>) -> Self {
        Self(shared)
    }

    /// Generate the next unique id.
    ///
    /// Fails with [`Error::ClockMovedBackward`] when the clock is behind the last
    /// issued id by more than the configured tolerance, and with
    /// [`Error::OverTimeLimit`] once the timestamp section is exhausted.
    pub fn next_id(&self) -> Result<u64, Error> {
        self.generate(0)
    }

    /// Generate the next unique id as a decimal string.
    pub fn next_id_string(&self) -> Result<String, Error> {
        self.next_id().map(|id| id.to_string())
    }

    /// Generate an id whose lowest `gene_bits` carry `gene`.
    ///
    /// A whole aligned block of `2^gene_bits` sequence values is consumed, so the
    /// result cannot collide with any other id of this instance.
    pub(crate) fn next_id_with_gene(&self, gene_bits: u8, gene: u16) -> Result<u64, Error> {
        Ok(self.generate(gene_bits)? | gene as u64)
    }

    /// Break an id issued with this generator's layout up into its parts.
    pub fn decode(&self, id: u64) -> DecodedId {
        self.0.codec.decode(id)
    }

    /// Like [`decode`], for an id given as a decimal string.
    ///
    /// [`decode`]: Snowflake::decode
    pub fn decode_str(&self, id: &str) -> Result<DecodedId, Error> {
        parse_id(id).map(|id| self.decode(id))
    }

    pub fn codec(&self) -> &IdCodec {
        &self.0.codec
    }

    pub fn layout(&self) -> &BitLayout {
        self.0.codec.layout()
    }

    pub fn identity(&self) -> WorkerIdentity {
        self.0.identity
    }

    fn generate(&self, reserve_bits: u8) -> Result<u64, Error> {
        let shared = &*self.0;
        let clock = shared.clock.as_ref();
        let layout = shared.codec.layout();
        let max_sequence = layout.max_sequence() as u32;
        let block = 1u32 << reserve_bits;

        let mut internals = shared.internals.lock().map_err(|_| Error::MutexPoisoned)?;

        let mut now = clock.now_millis();
        if now < internals.last_timestamp {
            let skew = internals.last_timestamp.saturating_sub(now);
            if skew > shared.max_backward_ms {
                return Err(Error::ClockMovedBackward(skew));
            }
            debug!(skew, "clock moved backwards within tolerance, waiting");
            now = wait_until(clock, internals.last_timestamp);
        }

        let start = if now == internals.last_timestamp {
            // First free sequence value aligned to the block size.
            let next = (internals.sequence + block) & !(block - 1);
            if next + block - 1 > max_sequence {
                now = wait_until(clock, internals.last_timestamp.saturating_add(1));
                0
            } else {
                next
            }
        } else {
            0
        };

        let epoch = layout.epoch_millis();
        let elapsed = match now.checked_sub(epoch) {
            Some(elapsed) if elapsed >= 0 => elapsed,
            _ if now < epoch => return Err(Error::ClockMovedBackward(epoch.saturating_sub(now))),
            _ => return Err(Error::OverTimeLimit),
        };
        if elapsed > layout.max_elapsed() {
            return Err(Error::OverTimeLimit);
        }

        internals.last_timestamp = now;
        internals.sequence = start + block - 1;

        Ok(shared.codec.pack(
            elapsed as u64,
            shared.identity.data_center_id,
            shared.identity.worker_id,
            start as u64,
        ))
    }
}

/// Returns a new `Snowflake` referencing the same state as `self`.
/// This is used for concurrent use.
impl Clone for Snowflake {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snowflake")
            .field("identity", &self.0.identity)
            .field("layout", self.0.codec.layout())
            .field("max_backward_ms", &self.0.max_backward_ms)
            .finish()
    }
}

/// Spin until the clock reaches `target`, returning the reading that did.
fn wait_until(clock: &dyn Clock, target: i64) -> i64 {
    loop {
        let now = clock.now_millis();
        if now >= target {
            return now;
        }
        thread::yield_now();
    }
}

/// Break a Snowflake ID up into its parts, assuming the default [`BitLayout`].
///
/// Only meaningful for ids issued with the default layout and epoch. Ids from a
/// generator with custom bit lengths or epoch decode into garbage here; use
/// [`Snowflake::decode`] or [`IdCodec::decode`] with the matching layout instead.
pub fn decompose(id: u64) -> DecodedId {
    IdCodec::new(BitLayout::default()).decode(id)
}

pub(crate) fn parse_id(id: &str) -> Result<u64, Error> {
    id.trim()
        .parse()
        .map_err(|_| Error::InvalidId(id.to_string()))
}
