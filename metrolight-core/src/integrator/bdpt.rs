//! Unbiased bidirectional path tracer.
//!
//! One pixel sample: grow an eye subpath from the film point, grow an
//! independent light subpath from the emitter sampler, join them, then
//! combine every (s, t) split of every prefix length with multiple
//! importance sampling under the power heuristic (beta = 2).

use crate::path::{Path, PathContext, PathVertex};
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::stats;
use crate::Point2f;

#[derive(Debug, Copy, Clone)]
pub struct BidirPathTracer {
    /// Clamp each spectral component of a sample to [0, 1]. Bounds the
    /// heavy-tailed variance of rare high-energy paths at the cost of a
    /// small bias; off in a faithful render.
    pub clamp_samples: bool,
}

impl Default for BidirPathTracer {
    fn default() -> BidirPathTracer {
        BidirPathTracer {
            clamp_samples: false,
        }
    }
}

impl BidirPathTracer {
    pub fn new(clamp_samples: bool) -> BidirPathTracer {
        BidirPathTracer { clamp_samples }
    }

    /// Estimate the radiance arriving at one film-plane point.
    pub fn sample<'a>(&self, ctx: PathContext<'a>, film_pt: Point2f, rng: &mut Rng) -> Spectrum {
        stats::inc(&stats::PATHS_TRACED);

        let mut eye = Path::new(ctx);
        let film_pa = ctx.camera.film_pa();
        eye.prepend_vertex(PathVertex::sensor_seed(
            ctx.camera.point_on_film(film_pt),
            film_pa,
        ));
        generate_eye(&mut eye, rng);

        if eye.len() == 1 {
            // the primary ray escaped the scene
            let d = ctx.camera.ray_direction(film_pt);
            return ctx.scene.background_radiance(d);
        }

        let mut path = Path::new(ctx);
        if !eye.front().pt.is_emitter() {
            generate_light(&mut path, rng);
        }

        let valid = path.append_path(&eye);

        // an occluded connecting edge only kills the full-length strategies;
        // the subpath-only splits still contribute
        let length = path.len() - usize::from(!valid);

        let mut l = Spectrum::black();
        for k in 2..=length {
            let mut pdfs = vec![0.0f32; k + 1];
            let mut sum = 0.0;
            for (s, slot) in pdfs.iter_mut().enumerate() {
                let t = k - s;
                let pd = path.pd(s, t, false);
                debug_assert!(pd >= 0.0);
                // power heuristic with beta = 2
                *slot = pd * pd;
                sum += *slot;
            }
            if sum == 0.0 {
                continue;
            }

            for (s, &pd2) in pdfs.iter().enumerate() {
                if pd2 > 0.0 {
                    let weight = pd2 / sum;
                    l += path.contribution(s, k - s, false) * weight;
                }
            }
        }

        if l.has_nan() || l.is_infinite() {
            stats::inc(&stats::DEGENERATE_SAMPLES);
            return Spectrum::black();
        }
        if self.clamp_samples {
            l = l.clamped(0.0, 1.0);
        }
        l
    }

    /// Generate a complete joined path from a random film point; the seed
    /// phase of the Metropolis sampler feeds on this. Returns whether the
    /// joined path is valid.
    pub fn generate<'a>(&self, path: &mut Path<'a>, rng: &mut Rng) -> bool {
        let mut eye = Path::new(path.ctx());
        if !eye.prepend(rng, false) {
            return false;
        }
        generate_eye(&mut eye, rng);

        if !eye.front().pt.is_emitter() {
            generate_light(path, rng);
        }

        path.append_path(&eye)
    }
}

/// Extend an eye subpath until the walk is absorbed, escapes, or lands on an
/// emitter. Russian roulette engages once two bounces are in place.
pub fn generate_eye<'a>(eye: &mut Path<'a>, rng: &mut Rng) {
    debug_assert!(!eye.is_empty());
    loop {
        let roulette = eye.len() >= 2;
        if !eye.prepend(rng, roulette) {
            break;
        }
        if eye.front().pt.is_emitter() {
            break;
        }
    }
}

/// Grow a light subpath from the emitter sampler until termination.
pub fn generate_light<'a>(light: &mut Path<'a>, rng: &mut Rng) {
    loop {
        let roulette = light.len() >= 2;
        if !light.append(rng, roulette) {
            break;
        }
    }
}
