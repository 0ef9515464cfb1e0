//! Bidirectional mutation: the large-scale workhorse of the Metropolis
//! sampler. Deletes a contiguous subpath of the current state and replaces it
//! with a freshly sampled one, possibly changing the path length.

use crate::integrator::mlt::Mutation;
use crate::path::Path;
use crate::rng::Rng;

/// p_d1(0) and p_d1(1): deletion-length masses for the common short cases.
const PD1_0: f32 = 0.25;
const PD1_1: f32 = 0.5;
/// p_a1 masses for |ka - kd| of 0 and 1.
const PA1_0: f32 = 0.5;
const PA1_1: f32 = 0.2;
/// Largest |ka - kd| considered; the geometric tail beyond this carries
/// negligible mass and the weights are renormalized over the window.
const MAX_LENGTH_DELTA: usize = 8;

#[derive(Debug, Default)]
pub struct BidirMutation;

impl BidirMutation {
    pub fn new() -> BidirMutation {
        BidirMutation
    }
}

/// Deletion-length distribution over kd in 0..=n: 1/4, 1/2, then a geometric
/// tail 2^-(i+1), with the leftover mass assigned to kd = n.
fn deletion_weights(n: usize) -> Vec<f32> {
    debug_assert!(n >= 2);
    let mut w = vec![0.0f32; n + 1];
    let mut total = 0.0;
    for (i, slot) in w.iter_mut().enumerate().take(n) {
        *slot = match i {
            0 => PD1_0,
            1 => PD1_1,
            _ => 0.5f32.powi(i as i32 + 1),
        };
        total += *slot;
    }
    w[n] = 1.0 - total;
    w
}

/// Addition-length distribution over ka given kd: mass by |ka - kd| (1/2 for
/// equal length, 1/5 one off, geometric beyond), renormalized over the
/// reachable window [max(0, kd - MAX), kd + MAX].
fn addition_weights(kd: usize) -> (usize, Vec<f32>) {
    let lo = kd.saturating_sub(MAX_LENGTH_DELTA);
    let hi = kd + MAX_LENGTH_DELTA;
    let mut w = vec![0.0f32; hi - lo + 1];
    for (idx, slot) in w.iter_mut().enumerate() {
        let ka = lo + idx;
        let diff = if ka >= kd { ka - kd } else { kd - ka };
        *slot = match diff {
            0 => PA1_0,
            1 => PA1_1,
            _ => PA1_1 * 0.5f32.powi(diff as i32),
        };
    }
    let total: f32 = w.iter().sum();
    for slot in w.iter_mut() {
        *slot /= total;
    }
    (lo, w)
}

fn pa1(kd: usize, ka: usize) -> f32 {
    let (lo, w) = addition_weights(kd);
    if ka < lo || ka >= lo + w.len() {
        0.0
    } else {
        w[ka - lo]
    }
}

/// Sum over all ways the mutated subpath could have been placed: the total
/// transition density T(Y | X) up to the shared deletion factor.
fn transition_density(path: &Path<'_>, ka: usize, l: i32) -> f32 {
    let n2 = path.len();
    let pa2 = 1.0 / (ka as f32 + 1.0);
    let mut t_sum = 0.0;
    for i in 0..=ka {
        let s = (l + 1) as usize + i;
        if s > n2 {
            break;
        }
        let t = n2 - s;
        t_sum += pa2 * path.pd(s, t, false);
    }
    t_sum
}

impl<'a> Mutation<'a> for BidirMutation {
    fn mutate(&self, x: &Path<'a>, rng: &mut Rng) -> (Path<'a>, f32) {
        let n = x.len();
        let failed = |ctx| (Path::new(ctx), 0.0);

        // choose a subpath length to delete
        let d_weights = deletion_weights(n);
        let kd = rng.sample_cdf(&d_weights);
        let pd1 = d_weights[kd];

        // choose a specific subpath of length kd: l and m are the exclusive
        // indices bracketing the deleted run
        let l = rng.uniform_int(-1, (n - kd) as i32 - 1);
        let m = l + kd as i32 + 1;
        let pd2 = 1.0 / (n - kd + 1) as f32;

        // choose the length to add and its split between the two ends
        let (a_lo, a_weights) = addition_weights(kd);
        let ka = a_lo + rng.sample_cdf(&a_weights);
        let pa1_xy = a_weights[ka - a_lo];
        let lp = rng.uniform_int(0, ka as i32) as usize;
        let mp = ka - lp;

        if kd >= n && ka == 0 {
            return failed(x.ctx()); // would leave an empty path
        }

        let mut y = x.left((l + 1) as usize);
        let mut right = x.right(n - m as usize);
        debug_assert_eq!(n - (y.len() + right.len()), kd);

        // grow the replacement subpath from both ends and close the gap
        for _ in 0..lp {
            if !y.append(rng, false) {
                return failed(x.ctx());
            }
        }
        for _ in 0..mp {
            if !right.prepend(rng, false) {
                return failed(x.ctx());
            }
        }
        if !y.append_path(&right) {
            return failed(x.ctx());
        }

        let n2 = n - kd + ka;
        debug_assert_eq!(y.len(), n2);
        if !y.front().is_emitter() || !y.back().is_sensor() {
            return failed(x.ctx());
        }

        let f_y = y.radiance().luminance();
        let f_x = x.radiance().luminance();
        if f_x <= 0.0 || f_y <= 0.0 {
            return failed(x.ctx());
        }

        // T(Y|X): all placements of the added subpath within Y
        let t_xy = pd1 * pd2 * pa1_xy * transition_density(&y, ka, l);
        if t_xy <= 0.0 {
            return failed(x.ctx());
        }

        // T(X|Y): the reverse move deletes what was added
        let rd_weights = deletion_weights(n2);
        let r_pd1 = rd_weights[ka];
        let r_pd2 = 1.0 / (n2 - ka + 1) as f32;
        let t_yx = r_pd1 * r_pd2 * pa1(ka, kd) * transition_density(x, kd, l);

        let alpha = (f_y * t_yx) / (f_x * t_xy);
        (y, alpha.min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_weights_normalized() {
        for n in 2..12 {
            let w = deletion_weights(n);
            assert_eq!(w.len(), n + 1);
            let total: f32 = w.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "n={} total={}", n, total);
            assert_eq!(w[0], 0.25);
        }
    }

    #[test]
    fn test_addition_weights_normalized() {
        for kd in 0..10 {
            let (lo, w) = addition_weights(kd);
            let total: f32 = w.iter().sum();
            assert!((total - 1.0).abs() < 1e-5);
            // same-length replacement carries the largest mass
            let same = w[kd - lo];
            assert!(w.iter().all(|&v| v <= same));
        }
    }

    #[test]
    fn test_pa1_window() {
        // inside the reachable window the mass is positive, outside zero
        assert!(pa1(3, 3) > 0.0);
        assert!(pa1(3, 0) > 0.0);
        assert!(pa1(3, 3 + MAX_LENGTH_DELTA) > 0.0);
        assert_eq!(pa1(3, 3 + MAX_LENGTH_DELTA + 1), 0.0);
        // once both windows are untruncated the distribution is symmetric
        assert_eq!(pa1(8, 10), pa1(10, 8));
        assert_eq!(pa1(9, 9), pa1(12, 12));
    }
}
