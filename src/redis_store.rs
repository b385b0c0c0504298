// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::allocator::CoordinationStore;
use crate::config::CoordinationConfig;
use crate::error::{BoxDynError, Error};
use crate::layout::BitLayout;
use std::time::Duration;

/// Lua script that leases `[worker_id, data_center_id]` pairs round-robin.
const CHOOSE_WORK_ID_SCRIPT: &str = include_str!("lua/choose_work_id.lua");

/// A [`CoordinationStore`] backed by a Redis hash updated by one atomic Lua script.
///
/// Every call opens a short-lived connection; connect, read and write are all
/// bounded by `timeout` so a dead server cannot stall startup.
pub struct RedisCoordinationStore {
    client: redis::Client,
    script: redis::Script,
    key: String,
    timeout: Duration,
}

impl RedisCoordinationStore {
    /// Fails only when `url` cannot be parsed; no connection is made yet.
    pub fn open(url: &str, key: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client =
            redis::Client::open(url).map_err(|err| Error::InvalidCoordinationUrl(Box::new(err)))?;
        Ok(Self {
            client,
            script: redis::Script::new(CHOOSE_WORK_ID_SCRIPT),
            key: key.into(),
            timeout,
        })
    }

    pub fn from_config(config: &CoordinationConfig) -> Result<Self, Error> {
        Self::open(
            &config.redis_url,
            config.key.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }
}

impl CoordinationStore for RedisCoordinationStore {
    fn acquire(&self, layout: &BitLayout) -> Result<Option<(i64, i64)>, BoxDynError> {
        let mut con = self.client.get_connection_with_timeout(self.timeout)?;
        con.set_read_timeout(Some(self.timeout))?;
        con.set_write_timeout(Some(self.timeout))?;

        let reply: Vec<i64> = self
            .script
            .key(&self.key)
            .arg(layout.max_worker_id())
            .arg(layout.max_data_center_id())
            .invoke(&mut con)?;

        match reply.as_slice() {
            [] => Ok(None),
            [worker_id, data_center_id] => Ok(Some((*worker_id, *data_center_id))),
            other => Err(format!("expected 2 integers from lease script, got {}", other.len()).into()),
        }
    }
}
