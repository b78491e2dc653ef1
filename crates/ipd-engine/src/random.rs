//! Seeded pseudo-random number generator
//!
//! Deterministic PRNG for reproducible matches, tournaments and evolutionary
//! runs. Uses xorshift64* and plugs into `rand` through `RngCore`, so every
//! draw in the engine goes through `rand::Rng`.

use rand::RngCore;

/// Seeded random number generator
///
/// Deterministic: same seed + stream = same sequence
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a new RNG from a 64-bit seed
    pub fn new(seed: u64) -> Self {
        Self::with_stream(seed, 0)
    }

    /// Create an RNG for an independent stream of the same seed
    ///
    /// Batch runs use the run index as the stream so every run owns its
    /// generator regardless of which worker executes it.
    pub fn with_stream(seed: u64, stream: u64) -> Self {
        let mut state = seed.wrapping_add(0x9e3779b97f4a7c15);
        state ^= stream.wrapping_mul(0x517cc1b727220a95);
        // xorshift never leaves the all-zero state
        if state == 0 {
            state = 0x2545f4914f6cdd1d;
        }

        // Warm up the generator
        let mut rng = Self { state };
        for _ in 0..8 {
            rng.next_raw();
        }

        rng
    }

    /// Seed from OS entropy, for runs configured without a seed
    ///
    /// In the browser the entropy comes from `crypto.getRandomValues`.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    fn next_raw(&mut self) -> u64 {
        // xorshift64*
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545f4914f6cdd1d)
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_raw() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_raw()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_determinism() {
        let mut r1 = SeededRng::new(42);
        let mut r2 = SeededRng::new(42);

        for _ in 0..100 {
            assert_eq!(r1.next_u64(), r2.next_u64());
        }
    }

    #[test]
    fn test_different_seeds() {
        let mut rng1 = SeededRng::new(1);
        let mut rng2 = SeededRng::new(2);

        let vals1: Vec<_> = (0..10).map(|_| rng1.next_u64()).collect();
        let vals2: Vec<_> = (0..10).map(|_| rng2.next_u64()).collect();

        assert_ne!(vals1, vals2);
    }

    #[test]
    fn test_different_streams() {
        let mut rng1 = SeededRng::with_stream(42, 0);
        let mut rng2 = SeededRng::with_stream(42, 1);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = SeededRng::with_stream(0u64.wrapping_sub(0x9e3779b97f4a7c15), 0);
        let vals: Vec<_> = (0..4).map(|_| rng.next_u64()).collect();
        assert!(vals.iter().any(|v| *v != 0));
    }

    #[test]
    fn test_from_entropy_seeds_differ() {
        let mut a = SeededRng::from_entropy();
        let mut b = SeededRng::from_entropy();
        let a_vals: Vec<_> = (0..4).map(|_| a.next_u64()).collect();
        let b_vals: Vec<_> = (0..4).map(|_| b.next_u64()).collect();
        assert_ne!(a_vals, b_vals);
    }

    #[test]
    fn test_fill_bytes_partial_chunk() {
        let mut rng = SeededRng::new(9);
        let mut buf = [0u8; 13];
        rng.fill_bytes(&mut buf);
        assert!(buf.iter().any(|b| *b != 0));
    }

    #[test]
    fn test_random_bool_extremes() {
        let mut rng = SeededRng::new(42);
        for _ in 0..1000 {
            assert!(!rng.random_bool(0.0));
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn test_random_range() {
        let mut rng = SeededRng::new(42);

        for max in [1u32, 10, 100, 1000] {
            for _ in 0..100 {
                let val = rng.random_range(0..max);
                assert!(val < max, "random_range(0..{}) returned {}", max, val);
            }
        }
    }
}
