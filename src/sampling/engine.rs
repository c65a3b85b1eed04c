//! Sampling strategies.
//!
//! All strategies share the boundary rules: rate 1.0 always passes and
//! rate 0.0 always fails, with no random draw or hash computed. Rates are
//! validated when the configuration is built, never here.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Sampling decisions for a rate and optional deterministic key.
///
/// The random source is owned and injected at construction so uniform
/// sampling is reproducible in tests (`with_seed`). Deterministic and
/// bucketed sampling never touch the RNG.
#[derive(Debug)]
pub struct SamplingEngine {
    rng: Mutex<StdRng>,
}

impl SamplingEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded RNG for reproducible uniform draws.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Uniform random: draw u in [0,1), pass iff u < rate.
    pub fn sample_uniform(&self, rate: f64) -> bool {
        if rate >= 1.0 {
            return true;
        }
        if rate <= 0.0 {
            return false;
        }
        self.rng.lock().gen::<f64>() < rate
    }

    /// Deterministic: normalize hash(key) to [0,1), pass iff below rate.
    ///
    /// Pure function of (key, rate): the same key stays consistently in or
    /// out of the sample across calls and processes.
    pub fn sample_deterministic(&self, key: &str, rate: f64) -> bool {
        if rate >= 1.0 {
            return true;
        }
        if rate <= 0.0 {
            return false;
        }
        hash_unit(key) < rate
    }

    /// Bucketed: hash(key) mod `bucket_count`, pass iff the index falls in
    /// `target_buckets`. Canary-style partitioning.
    pub fn sample_bucket(
        &self,
        key: &str,
        bucket_count: u32,
        target_buckets: &BTreeSet<u32>,
    ) -> bool {
        if bucket_count == 0 {
            return false;
        }
        let index = (hash_u64(key) % u64::from(bucket_count)) as u32;
        target_buckets.contains(&index)
    }
}

impl Default for SamplingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_u64(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(buf)
}

/// Normalize a key hash into [0,1).
fn hash_unit(key: &str) -> f64 {
    // 2^64 as f64; the division can never reach 1.0.
    hash_u64(key) as f64 / 18_446_744_073_709_551_616.0
}
