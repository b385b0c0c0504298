// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Worker identity allocation.
//!
//! Every generator needs a `(worker_id, data_center_id)` pair that no other
//! running generator uses. [`WorkerAllocator`] resolves one at startup, either by
//! drawing it at random or by leasing it from a shared coordination store.

use crate::config::SnowflakeConfig;
use crate::error::{BoxDynError, Error};
use crate::layout::BitLayout;
use crate::snowflake::Snowflake;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

/// The `(worker_id, data_center_id)` pair a generator stamps into its ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub worker_id: u16,
    pub data_center_id: u16,
}

impl WorkerIdentity {
    pub fn new(worker_id: u16, data_center_id: u16) -> Self {
        Self {
            worker_id,
            data_center_id,
        }
    }
}

/// A shared store that leases worker identities to generators.
pub trait CoordinationStore: Send + Sync {
    /// Atomically allocate or reuse a `(worker_id, data_center_id)` pair.
    ///
    /// `Ok(None)` means the store had no lease to give.
    fn acquire(&self, layout: &BitLayout) -> Result<Option<(i64, i64)>, BoxDynError>;
}

/// How a generator obtains its [`WorkerIdentity`].
pub enum WorkerAllocator {
    /// Draw both ids uniformly at random. Never fails, but two instances may
    /// collide, so it suits single-instance and test deployments.
    Random,
    /// Lease both ids from a coordination store, falling back to [`Random`]
    /// when the store cannot provide a usable pair.
    ///
    /// [`Random`]: WorkerAllocator::Random
    Coordinated(Box<dyn CoordinationStore>),
}

/// The identity chosen by a [`WorkerAllocator`] and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    Random(WorkerIdentity),
    Coordinated(WorkerIdentity),
    /// The coordination store failed and a random identity was drawn instead.
    FellBackToRandom {
        identity: WorkerIdentity,
        reason: String,
    },
}

impl Allocation {
    pub fn identity(&self) -> WorkerIdentity {
        match self {
            Allocation::Random(identity)
            | Allocation::Coordinated(identity)
            | Allocation::FellBackToRandom { identity, .. } => *identity,
        }
    }

    /// A short name of the strategy that produced the identity.
    pub fn strategy(&self) -> &'static str {
        match self {
            Allocation::Random(_) => "random",
            Allocation::Coordinated(_) => "coordinated",
            Allocation::FellBackToRandom { .. } => "fell-back-to-random",
        }
    }
}

impl fmt::Debug for WorkerAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerAllocator::Random => f.write_str("Random"),
            WorkerAllocator::Coordinated(_) => f.write_str("Coordinated"),
        }
    }
}

impl WorkerAllocator {
    /// Pick the allocator described by `config`: coordinated when a coordination
    /// store is configured, random otherwise.
    pub fn from_config(config: &SnowflakeConfig) -> Result<Self, Error> {
        match &config.coordination {
            #[cfg(feature = "redis")]
            Some(coordination) => {
                let store = crate::redis_store::RedisCoordinationStore::from_config(coordination)?;
                Ok(WorkerAllocator::Coordinated(Box::new(store)))
            }
            #[cfg(not(feature = "redis"))]
            Some(_) => {
                warn!("coordination store configured but the `redis` feature is disabled, using random worker ids");
                Ok(WorkerAllocator::Random)
            }
            None => Ok(WorkerAllocator::Random),
        }
    }

    /// Choose a worker identity that fits `layout`. Never fails.
    pub fn choose_work_id(&self, layout: &BitLayout) -> Allocation {
        match self {
            WorkerAllocator::Random => Allocation::Random(random_identity(layout)),
            WorkerAllocator::Coordinated(store) => match store.acquire(layout) {
                Ok(Some((worker_id, data_center_id))) => {
                    match checked_identity(layout, worker_id, data_center_id) {
                        Some(identity) => Allocation::Coordinated(identity),
                        None => fall_back(
                            layout,
                            format!(
                                "coordination store returned out of range pair [{}, {}]",
                                worker_id, data_center_id
                            ),
                        ),
                    }
                }
                Ok(None) => fall_back(layout, "coordination store returned no lease".to_string()),
                Err(err) => {
                    error!(error = %err, "failed to acquire worker id from coordination store");
                    fall_back(layout, err.to_string())
                }
            },
        }
    }

    /// Choose a worker identity and build the generator described by `config`.
    ///
    /// The returned [`Snowflake`] is meant to be the single generator of the
    /// process; clone it into whatever needs ids. An invalid layout in `config`
    /// is returned as an error rather than papered over.
    pub fn choose_and_init(&self, config: &SnowflakeConfig) -> Result<Snowflake, Error> {
        let layout = config.layout()?;
        let allocation = self.choose_work_id(&layout);
        let identity = allocation.identity();

        let worker_id = || -> Result<u16, BoxDynError> { Ok(identity.worker_id) };
        let data_center_id = || -> Result<u16, BoxDynError> { Ok(identity.data_center_id) };
        let snowflake = Snowflake::builder()
            .layout(layout)
            .worker_id(&worker_id)
            .data_center_id(&data_center_id)
            .use_system_clock(config.use_system_clock)
            .max_backward_ms(config.max_backward_ms)
            .finalize()?;

        info!(
            strategy = allocation.strategy(),
            worker_id = identity.worker_id,
            data_center_id = identity.data_center_id,
            use_system_clock = config.use_system_clock,
            "snowflake generator initialized"
        );
        Ok(snowflake)
    }
}

fn fall_back(layout: &BitLayout, reason: String) -> Allocation {
    let identity = random_identity(layout);
    warn!(
        %reason,
        worker_id = identity.worker_id,
        data_center_id = identity.data_center_id,
        "coordinated worker allocation failed, falling back to a random worker id"
    );
    Allocation::FellBackToRandom { identity, reason }
}

fn random_identity(layout: &BitLayout) -> WorkerIdentity {
    let mut rng = rand::rng();
    WorkerIdentity {
        worker_id: rng.random_range(0..=layout.max_worker_id()),
        data_center_id: rng.random_range(0..=layout.max_data_center_id()),
    }
}

fn checked_identity(layout: &BitLayout, worker_id: i64, data_center_id: i64) -> Option<WorkerIdentity> {
    let in_range = |value: i64, max: u16| (0..=max as i64).contains(&value);
    if in_range(worker_id, layout.max_worker_id())
        && in_range(data_center_id, layout.max_data_center_id())
    {
        Some(WorkerIdentity::new(worker_id as u16, data_center_id as u16))
    } else {
        None
    }
}
