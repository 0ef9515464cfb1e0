//! One Markov chain over path space: Metropolis-Hastings transitions driven
//! by the aggregate mutation, with the expected-value estimator splatting
//! both the current and the tentative sample at every step.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::film::Film;
use crate::integrator::mlt::Mutation;
use crate::path::Path;
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::stats;
use crate::Point2f;

#[derive(Debug, Copy, Clone)]
pub struct ChainParams {
    /// Proposals longer than this are rejected outright; 0 disables the cap.
    pub max_depth: usize,
    /// After this many consecutive rejections the chain stops splatting (a
    /// safety throttle for pathological seeds) but keeps stepping; 0
    /// disables the throttle.
    pub max_consecutive_rejections: u32,
}

struct ChainSample {
    position: Point2f,
    value: Spectrum,
}

/// Map a path to its film splat: position of its last scene vertex projected
/// through the camera, and its radiance rescaled so every splat carries the
/// chain weight `b` worth of luminance.
fn init_sample(path: &Path<'_>, b: f32) -> Option<ChainSample> {
    if path.len() < 2 {
        return None;
    }
    let radiance = path.radiance();
    let luminance = radiance.luminance();
    if radiance.has_nan() || radiance.is_infinite() || !luminance.is_finite() {
        stats::inc(&stats::DEGENERATE_SAMPLES);
        return None;
    }
    if radiance.is_zero() || luminance <= 0.0 {
        return None;
    }

    let position = path.film_position()?;
    Some(ChainSample {
        position,
        value: radiance * (b / luminance),
    })
}

/// Run one chain until the shared stop flag trips.
pub fn run_chain<'a>(
    seed: Path<'a>,
    b: f32,
    mutation: &dyn Mutation<'a>,
    film: &Film,
    params: ChainParams,
    stop: &AtomicBool,
    rng: &mut Rng,
) {
    let mut x = seed;
    let mut x_sample = init_sample(&x, b);
    let mut rejections: u32 = 0;

    while !stop.load(Ordering::Relaxed) {
        let (y, mut alpha) = mutation.mutate(&x, rng);
        stats::inc(&stats::MLT_PROPOSALS);

        if alpha > 0.0
            && (y.len() < 2 || (params.max_depth > 0 && y.len() > params.max_depth))
        {
            alpha = 0.0;
        }

        let y_sample = if alpha > 0.0 { init_sample(&y, b) } else { None };
        if y_sample.is_none() {
            alpha = 0.0;
        }

        rejections += 1;
        if params.max_consecutive_rejections == 0 || rejections < params.max_consecutive_rejections
        {
            // expected-value estimator: both states contribute each step,
            // weighted by their transition probabilities
            if alpha < 1.0 {
                if let Some(s) = &x_sample {
                    film.splat_mlt(s.position, s.value * (1.0 - alpha), false);
                }
            }
            if alpha > 0.0 {
                if let Some(s) = &y_sample {
                    film.splat_mlt(s.position, s.value * alpha, true);
                }
            }
        }

        if rng.uniform_f32() < alpha {
            stats::inc(&stats::MLT_ACCEPTED);
            rejections = 0;
            x = y;
            x_sample = y_sample;
        }
    }
}
