use std::f32::consts::PI;
use std::num::Wrapping;

use crate::ONE_MINUS_EPSILON;

const PCG32_DEFAULT_STATE: Wrapping<u64> = Wrapping(0x853c49e6748fea9b);
const PCG32_DEFAULT_STREAM: Wrapping<u64> = Wrapping(0xda3e39cb94b95bdb);
const PCG32_MULT: Wrapping<u64> = Wrapping(0x5851f42d4c957f2d);

/// PCG-32 pseudo-random generator. A uniform [0, 1) sampler is the base
/// primitive; every other distribution is derived from it. Each render thread
/// holds its own generator, seeded from the global seed plus the thread id.
#[derive(Copy, Clone)]
pub struct Rng {
    state: Wrapping<u64>,
    inc: Wrapping<u64>,
}

impl Rng {
    pub fn new() -> Rng {
        Rng {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }

    pub fn with_seed(seed: u64) -> Rng {
        let mut rng = Rng::new();
        rng.set_sequence(seed);
        rng
    }

    pub fn set_sequence(&mut self, seed: u64) {
        self.state = Wrapping(0);
        self.inc = Wrapping((seed << 1) | 1);
        let _ = self.uniform_u32();
        self.state += PCG32_DEFAULT_STATE;
        let _ = self.uniform_u32();
    }

    pub fn uniform_u32(&mut self) -> u32 {
        let oldstate = self.state;
        self.state = oldstate * PCG32_MULT + self.inc;
        let xorshifted = Wrapping((((oldstate >> 18) ^ oldstate) >> 27).0 as u32);
        let rot = (oldstate >> 59).0 as u32;

        (xorshifted.0 >> rot) | (xorshifted.0 << ((!Wrapping(rot) + Wrapping(1)).0 & 31))
    }

    pub fn uniform_u32_bounded(&mut self, b: u32) -> u32 {
        let threshold = (!b + 1) % b;
        loop {
            let r = self.uniform_u32();
            if r >= threshold {
                return r % b;
            }
        }
    }

    /// Uniform sample in [0, 1).
    pub fn uniform_f32(&mut self) -> f32 {
        (self.uniform_u32() as f32 * 2.3283064365386963e-10).min(ONE_MINUS_EPSILON)
    }

    /// Uniform sample in [lo, hi).
    pub fn uniform_range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.uniform_f32()
    }

    /// Uniform integer in [lo, hi] (both inclusive).
    pub fn uniform_int(&mut self, lo: i32, hi: i32) -> i32 {
        debug_assert!(hi >= lo);
        lo + self.uniform_u32_bounded((hi - lo + 1) as u32) as i32
    }

    /// Standard normal sample (Box-Muller).
    pub fn normal_f32(&mut self) -> f32 {
        let u1 = self.uniform_f32().max(1e-10);
        let u2 = self.uniform_f32();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Sample an index from a normalized CDF by inversion. `weights` must sum
    /// to 1; the last bucket absorbs any floating-point slack.
    pub fn sample_cdf(&mut self, weights: &[f32]) -> usize {
        debug_assert!(!weights.is_empty());
        let u = self.uniform_f32();
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if u < cumulative {
                return i;
            }
        }
        weights.len() - 1
    }
}

impl Default for Rng {
    fn default() -> Rng {
        Rng::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_range() {
        let mut rng = Rng::with_seed(1);
        for _ in 0..1000 {
            let v = rng.uniform_f32();
            assert!((0.0..1.0).contains(&v));
            let r = rng.uniform_range(-5.0, 5.0);
            assert!((-5.0..5.0).contains(&r));
        }
    }

    #[test]
    fn test_uniform_int_bounds() {
        let mut rng = Rng::with_seed(2);
        let mut seen = [false; 5];
        for _ in 0..1000 {
            let v = rng.uniform_int(-1, 3);
            assert!((-1..=3).contains(&v));
            seen[(v + 1) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_sample_cdf() {
        let mut rng = Rng::with_seed(3);
        let weights = [0.0, 0.5, 0.0, 0.5];
        let mut counts = [0u32; 4];
        for _ in 0..1000 {
            counts[rng.sample_cdf(&weights)] += 1;
        }
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);
        assert!(counts[1] > 400 && counts[3] > 400);
    }

    #[test]
    fn test_sequences_differ() {
        let mut a = Rng::with_seed(1);
        let mut b = Rng::with_seed(2);
        let same = (0..10).all(|_| a.uniform_u32() == b.uniform_u32());
        assert!(!same);
    }
}
