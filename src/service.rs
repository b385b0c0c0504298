// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Service-scoped ids.
//!
//! A [`ServiceIdGenerator`] folds a short "gene", derived from a caller-supplied
//! service id, into the low bits of the sequence section. Ids of the same
//! service can then be routed (e.g. sharded) by looking at their last bits only.

use crate::codec::{DecodedId, IdCodec};
use crate::config::SnowflakeConfig;
use crate::error::Error;
use crate::snowflake::{parse_id, Snowflake};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Default number of sequence bits given to the gene.
pub const DEFAULT_GENE_BITS: u8 = 4;
/// Registry key of the process-default generator.
pub const DEFAULT_RESOURCE: &str = "default";

/// Issues ids tagged with a gene derived from a service id.
///
/// The sequence section is shared: its high `sequence_bits - gene_bits` bits
/// count, its low `gene_bits` bits hold the gene. Ids come from the wrapped
/// [`Snowflake`], so plain ids and service ids of one process never collide.
#[derive(Debug, Clone)]
pub struct ServiceIdGenerator {
    snowflake: Snowflake,
    codec: IdCodec,
}

impl ServiceIdGenerator {
    /// Fails when `gene_bits` leaves no room for the sequence.
    pub fn new(snowflake: Snowflake, gene_bits: u8) -> Result<Self, Error> {
        let codec = IdCodec::with_gene_bits(*snowflake.layout(), gene_bits)?;
        Ok(Self { snowflake, codec })
    }

    /// Wrap `snowflake` with the gene width configured in `config`.
    pub fn from_config(snowflake: Snowflake, config: &SnowflakeConfig) -> Result<Self, Error> {
        Self::new(snowflake, config.gene_bits)
    }

    pub fn gene_bits(&self) -> u8 {
        self.codec.gene_bits()
    }

    pub fn snowflake(&self) -> &Snowflake {
        &self.snowflake
    }

    /// The gene of `service_id`: its high and low 32-bit halves XORed together,
    /// made non-negative and reduced modulo `2^gene_bits`.
    pub fn gene(&self, service_id: i64) -> u16 {
        let folded = (service_id ^ (service_id >> 32)) as i32;
        (folded.unsigned_abs() % (1u32 << self.codec.gene_bits())) as u16
    }

    pub fn next_id(&self, service_id: i64) -> Result<u64, Error> {
        self.snowflake
            .next_id_with_gene(self.codec.gene_bits(), self.gene(service_id))
    }

    /// Like [`next_id`], for a service id given as a decimal string.
    ///
    /// [`next_id`]: ServiceIdGenerator::next_id
    pub fn next_id_str(&self, service_id: &str) -> Result<String, Error> {
        let service_id = parse_service_id(service_id)?;
        self.next_id(service_id).map(|id| id.to_string())
    }

    /// Break a service id up into its parts, gene included.
    pub fn decode(&self, id: u64) -> DecodedId {
        self.codec.decode(id)
    }

    pub fn decode_str(&self, id: &str) -> Result<DecodedId, Error> {
        parse_id(id).map(|id| self.decode(id))
    }
}

fn parse_service_id(service_id: &str) -> Result<i64, Error> {
    service_id
        .trim()
        .parse()
        .map_err(|_| Error::InvalidServiceId(service_id.to_string()))
}

/// Maps resource names to their [`ServiceIdGenerator`].
///
/// Entries are never removed and the first registration of a name wins.
#[derive(Debug)]
pub struct ServiceGeneratorRegistry {
    default: ServiceIdGenerator,
    generators: RwLock<HashMap<String, ServiceIdGenerator>>,
}

impl ServiceGeneratorRegistry {
    /// Create a registry with `default` registered under [`DEFAULT_RESOURCE`].
    pub fn new(default: ServiceIdGenerator) -> Self {
        let mut generators = HashMap::new();
        generators.insert(DEFAULT_RESOURCE.to_string(), default.clone());
        Self {
            default,
            generators: RwLock::new(generators),
        }
    }

    /// Create a registry whose default generator wraps `snowflake` with the
    /// configured gene width.
    pub fn from_config(snowflake: Snowflake, config: &SnowflakeConfig) -> Result<Self, Error> {
        ServiceIdGenerator::from_config(snowflake, config).map(Self::new)
    }

    /// Register `generator` for `resource`.
    ///
    /// A resource that already has a generator keeps it, and
    /// [`Error::GeneratorAlreadyRegistered`] is returned.
    pub fn register(
        &self,
        resource: impl Into<String>,
        generator: ServiceIdGenerator,
    ) -> Result<(), Error> {
        let resource = resource.into();
        // Insert-only map: a panic elsewhere cannot leave it half-updated.
        let mut generators = self.generators.write().unwrap_or_else(PoisonError::into_inner);
        if generators.contains_key(&resource) {
            warn!(%resource, "id generator already registered, keeping the first one");
            return Err(Error::GeneratorAlreadyRegistered(resource));
        }
        debug!(%resource, gene_bits = generator.gene_bits(), "id generator registered");
        generators.insert(resource, generator);
        Ok(())
    }

    pub fn get(&self, resource: &str) -> Option<ServiceIdGenerator> {
        self.generators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(resource)
            .cloned()
    }

    pub fn default_generator(&self) -> &ServiceIdGenerator {
        &self.default
    }

    pub fn next_id_for_resource(&self, resource: &str, service_id: i64) -> Result<u64, Error> {
        self.lookup(resource)?.next_id(service_id)
    }

    pub fn next_id_str_for_resource(
        &self,
        resource: &str,
        service_id: &str,
    ) -> Result<String, Error> {
        self.lookup(resource)?.next_id_str(service_id)
    }

    pub fn decode_for_resource(&self, resource: &str, id: u64) -> Result<DecodedId, Error> {
        Ok(self.lookup(resource)?.decode(id))
    }

    pub fn decode_str_for_resource(&self, resource: &str, id: &str) -> Result<DecodedId, Error> {
        self.lookup(resource)?.decode_str(id)
    }

    fn lookup(&self, resource: &str) -> Result<ServiceIdGenerator, Error> {
        self.get(resource)
            .ok_or_else(|| Error::GeneratorNotFound(resource.to_string()))
    }
}
