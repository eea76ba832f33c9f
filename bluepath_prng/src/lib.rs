// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Every stochastic decision in `bluepath_music` (progression walk, chord-type
// draws, durations, pitch choice, motif reuse, cadence pull) draws from a
// `SeededRng` passed in by the caller. There is no ambient generator: two
// compositions generated from generators with the same seed are identical,
// and generators with different seeds share no state.
//
// **Critical constraint: determinism.** The core generator is integer-only.
// Float helpers derive from the integer stream with fixed bit widths so the
// output is identical across platforms and optimization levels.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG, the engine's sole source of randomness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeededRng {
    s: [u64; 4],
}

impl SeededRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform `f64` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        assert!(low < high, "range_f64: low must be less than high");
        low + self.next_f64() * (high - low)
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Return `true` with probability `p`.
    ///
    /// `p <= 0.0` never fires and `p >= 1.0` always fires.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick a uniformly random element, or `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        Some(&items[self.range_usize(0, items.len())])
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Non-positive weights are never picked. Returns `None` if no weight is
    /// positive.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            cumulative += w;
            last_positive = Some(i);
            if cumulative > target {
                return Some(i);
            }
        }
        // Rounding can leave `target` a hair above the running sum.
        last_positive
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = SeededRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_f64_within_bounds() {
        let mut rng = SeededRng::new(777);
        for _ in 0..10_000 {
            let v = rng.range_f64(-0.04, 0.04);
            assert!((-0.04..0.04).contains(&v), "range_f64 out of range: {v}");
        }
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = SeededRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn random_bool_distribution() {
        let mut rng = SeededRng::new(42);
        let n = 10_000;
        let hits = (0..n).filter(|_| rng.random_bool(0.18)).count();
        let pct = hits as f64 / n as f64;
        assert!(
            (0.15..0.21).contains(&pct),
            "random_bool(0.18) should be ~18%, got {:.1}%",
            pct * 100.0
        );
    }

    #[test]
    fn random_bool_extremes() {
        let mut rng = SeededRng::new(42);
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0));
        }
        for _ in 0..100 {
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn choose_empty_and_single() {
        let mut rng = SeededRng::new(3);
        let empty: [u8; 0] = [];
        assert_eq!(rng.choose(&empty), None);
        assert_eq!(rng.choose(&[7u8]), Some(&7));
    }

    #[test]
    fn choose_reaches_every_element() {
        let mut rng = SeededRng::new(9);
        let items = [1, 3, 6];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let v = *rng.choose(&items).unwrap();
            let i = items.iter().position(|&x| x == v).unwrap();
            seen[i] = true;
        }
        assert!(seen.iter().all(|&s| s), "every element should be chosen");
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let mut rng = SeededRng::new(11);
        for _ in 0..1000 {
            let i = rng.weighted_index(&[0.0, 2.0, 0.0, 1.0]).unwrap();
            assert!(i == 1 || i == 3, "picked zero-weight index {i}");
        }
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
        assert_eq!(rng.weighted_index(&[]), None);
    }

    #[test]
    fn weighted_index_follows_weights() {
        let mut rng = SeededRng::new(21);
        let n = 10_000;
        let heavy = (0..n)
            .filter(|_| rng.weighted_index(&[3.0, 1.0]) == Some(0))
            .count();
        let pct = heavy as f64 / n as f64;
        assert!((0.72..0.78).contains(&pct), "expected ~75%, got {pct}");
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = SeededRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: SeededRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
