//! Rate limiting functionality for thermod.
//!
//! Every client, identified by its IP address, gets its own continuous-refill token
//! bucket. Buckets live in an in-memory [`ClientRegistry`] that a background task
//! sweeps periodically to forget idle clients.

#![deny(missing_docs)]

mod bucket;
mod error;
mod manager;
mod registry;
mod request;

pub use bucket::TokenBucket;
pub use error::RateLimitError;
pub use manager::RateLimitManager;
pub use registry::{ClientRegistry, RateLimitResult};
pub use request::{RateLimitRequest, RateLimitRequestBuilder, UNKNOWN_CLIENT};
