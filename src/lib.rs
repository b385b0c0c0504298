//! A distributed unique ID generator inspired by [Twitter's Snowflake].
//!
//! Each generator stamps a worker identity `(worker_id, data_center_id)` into its
//! ids. The identity is resolved once at startup by a [`WorkerAllocator`], either
//! at random or by leasing it from Redis, and ids can be decoded back into their
//! parts at any time.
//!
//! ## Quickstart
//!
//! Add the following to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! snowflake_me = "0.2"
//! ```
//!
//! Use the library like this:
//!
//! ```
//! use snowflake_me::Snowflake;
//!
//! let sf = Snowflake::new().unwrap();
//! let next_id = sf.next_id().unwrap();
//! println!("{}", next_id);
//! println!("{:?}", sf.decode(next_id));
//! ```
//!
//! ## Startup
//!
//! Build the generator once, from configuration, and hand clones of it to
//! whatever needs ids:
//!
//! ```
//! use snowflake_me::{SnowflakeConfig, WorkerAllocator};
//!
//! let config = SnowflakeConfig::default();
//! let allocator = WorkerAllocator::from_config(&config).unwrap();
//! let sf = allocator.choose_and_init(&config).unwrap();
//! assert!(sf.identity().worker_id <= 31);
//! ```
//!
//! ## Concurrent use
//!
//! Snowflake is threadSafe. `clone` it before moving to another thread:
//! ```
//! use snowflake_me::Snowflake;
//! use std::thread;
//!
//! let sf = Snowflake::new().unwrap();
//!
//! let mut children = Vec::new();
//! for _ in 0..10 {
//!     let thread_sf = sf.clone();
//!     children.push(thread::spawn(move || {
//!         println!("{}", thread_sf.next_id().unwrap());
//!     }));
//! }
//!
//! for child in children {
//!     child.join().unwrap();
//! }
//! ```
//!
//! ## Service-scoped ids
//!
//! ```
//! use snowflake_me::{ServiceGeneratorRegistry, ServiceIdGenerator, Snowflake};
//!
//! let sf = Snowflake::new().unwrap();
//! let registry = ServiceGeneratorRegistry::new(ServiceIdGenerator::new(sf.clone(), 4).unwrap());
//! registry.register("orders", ServiceIdGenerator::new(sf, 4).unwrap()).unwrap();
//!
//! let id = registry.next_id_for_resource("orders", 1001).unwrap();
//! let parts = registry.decode_for_resource("orders", id).unwrap();
//! assert!(parts.gene.is_some());
//! ```
//!
//! [Twitter's Snowflake]: https://blog.twitter.com/2010/announcing-snowflake
#![doc(html_root_url = "https://docs.rs/snowflake_me/*")]

mod allocator;
mod builder;
mod clock;
mod codec;
mod config;
mod error;
mod layout;
#[cfg(feature = "redis")]
mod redis_store;
mod service;
mod snowflake;

pub use crate::config::*;
pub use crate::snowflake::*;
pub use allocator::*;
pub use builder::*;
pub use clock::*;
pub use codec::*;
pub use error::*;
pub use layout::*;
#[cfg(feature = "redis")]
pub use redis_store::*;
pub use service::*;
