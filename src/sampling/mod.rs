//! Volume-reduction sampling.
//!
//! Strategies for deciding whether a single event passes sampling:
//! - `engine` - uniform random, deterministic (hash-keyed) and bucketed
//! - `adaptive` - windowed rate adaptation toward a target volume

pub mod adaptive;
pub mod engine;

pub use adaptive::AdaptiveSampler;
pub use engine::SamplingEngine;
