// Copyright (c) 2024 Mike Tsao

//! Provides a random-number generator for parameter randomization and
//! testing.

use byteorder::{BigEndian, ByteOrder};
use delegate::delegate;

/// A pseudorandom number generator (PRNG) for applications such as
/// digital-audio libraries that don't require cryptographically secure random
/// numbers.
#[derive(Debug)]
pub struct Rng(oorandom::Rand64);
impl Default for Rng {
    fn default() -> Self {
        match Self::generate_seed() {
            Ok(seed) => Self::new_with_seed(seed),
            Err(e) => {
                log::warn!("no OS entropy ({e}); falling back to a fixed seed");
                Self::new_with_seed(Self::FALLBACK_SEED)
            }
        }
    }
}
#[allow(missing_docs)]
impl Rng {
    const FALLBACK_SEED: u128 = 0x5eed;

    /// Pass the same number to [Rng::new_with_seed()] to get the same stream
    /// back again. Good for reproducing test failures.
    pub fn new_with_seed(seed: u128) -> Self {
        Self(oorandom::Rand64::new(seed))
    }

    /// Create a sufficiently high-quality random number that's suitable for
    /// [Rng].
    pub fn generate_seed() -> anyhow::Result<u128> {
        let mut bytes = [0u8; 16];

        getrandom::getrandom(&mut bytes)?;
        Ok(BigEndian::read_u128(&bytes))
    }

    delegate! {
        to self.0 {
            pub fn rand_u64(&mut self) -> u64;
            pub fn rand_i64(&mut self) -> i64;
            pub fn rand_float(&mut self) -> f64;
            pub fn rand_range(&mut self, range: core::ops::Range<u64>) -> u64;
        }
    }
}
