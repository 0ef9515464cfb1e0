//! Metropolis light transport: Markov chains over path space whose
//! stationary distribution is the image-contribution function, seeded from
//! bidirectional path tracing and driven by three mutation strategies.

mod bidir;
mod chain;
mod perturb;

pub use self::bidir::BidirMutation;
pub use self::chain::{run_chain, ChainParams};
pub use self::perturb::{CausticMutation, LensMutation};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{info, warn};

use crate::film::Film;
use crate::integrator::bdpt::BidirPathTracer;
use crate::path::{Path, PathContext};
use crate::rng::Rng;

/// A path-space mutation: propose Y from X together with the
/// Metropolis-Hastings acceptance probability of the move. alpha = 0 marks an
/// invalid or rejected-by-construction proposal.
pub trait Mutation<'a>: Send + Sync {
    fn mutate(&self, x: &Path<'a>, rng: &mut Rng) -> (Path<'a>, f32);
}

/// Chooses between the registered mutation strategies by a fixed categorical
/// distribution each step.
pub struct AggregateMutation<'a> {
    mutations: Vec<Box<dyn Mutation<'a> + 'a>>,
    weights: Vec<f32>,
}

impl<'a> AggregateMutation<'a> {
    pub fn new(bidir_prob: f32, lens_prob: f32, caustic_prob: f32) -> AggregateMutation<'a> {
        let mut bidir = bidir_prob.abs();
        let mut lens = lens_prob.abs();
        let mut caustic = caustic_prob.abs();
        if bidir + lens + caustic <= 1e-9 {
            bidir = 1.0;
            lens = 1.0;
            caustic = 1.0;
        }

        let mut mutations: Vec<Box<dyn Mutation<'a> + 'a>> = Vec::new();
        let mut weights = Vec::new();
        if bidir > 0.0 {
            mutations.push(Box::new(BidirMutation::new()));
            weights.push(bidir);
        }
        if lens > 0.0 {
            mutations.push(Box::new(LensMutation::new()));
            weights.push(lens);
        }
        if caustic > 0.0 {
            mutations.push(Box::new(CausticMutation::new()));
            weights.push(caustic);
        }

        let total: f32 = weights.iter().sum();
        for w in weights.iter_mut() {
            *w /= total;
        }

        AggregateMutation { mutations, weights }
    }
}

impl<'a> Mutation<'a> for AggregateMutation<'a> {
    fn mutate(&self, x: &Path<'a>, rng: &mut Rng) -> (Path<'a>, f32) {
        let index = rng.sample_cdf(&self.weights);
        self.mutations[index].mutate(x, rng)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct MltRenderer {
    pub no_initial_paths: u32,
    pub max_depth: usize,
    pub max_consecutive_rejections: u32,
    pub bidir_prob: f32,
    pub lens_prob: f32,
    pub caustic_prob: f32,
    /// Wall-clock render budget for the chains.
    pub render_seconds: u32,
    pub save_period: u32,
    pub seed: u64,
}

impl MltRenderer {
    /// Run the full Metropolis render: seed-path selection, then one chain
    /// per thread until the wall clock runs out.
    pub fn render<'a>(&self, ctx: PathContext<'a>, film: &Film, n_threads: usize) -> Result<()> {
        let (seeds, weights, b) = self.init_seed_paths(ctx);
        info!(
            "seeded {} candidate paths, image flux estimate b = {}",
            seeds.len(),
            b
        );

        let mutation = AggregateMutation::new(self.bidir_prob, self.lens_prob, self.caustic_prob);
        let params = ChainParams {
            max_depth: self.max_depth,
            max_consecutive_rejections: self.max_consecutive_rejections,
        };
        let stop = AtomicBool::new(false);

        info!(
            "rendering with {} {} for {}s",
            n_threads,
            if n_threads == 1 { "chain" } else { "chains" },
            self.render_seconds
        );

        let mut seed_rng = Rng::with_seed(self.seed.wrapping_add(0x5eed));
        crossbeam::scope(|scope| {
            let mutation = &mutation;
            let stop = &stop;

            for i in 0..n_threads {
                let index = seed_rng.sample_cdf(&weights);
                debug_assert!(weights[index] > 0.0);
                let seed_path = seeds[index].clone();
                let mut rng = Rng::with_seed(self.seed.wrapping_add(1 + i as u64));

                scope.spawn(move |_| {
                    run_chain(seed_path, b, mutation, film, params, stop, &mut rng);
                });
            }

            // drive the wall clock and the periodic checkpoints
            let start = Instant::now();
            let deadline = Duration::from_secs(u64::from(self.render_seconds));
            while start.elapsed() < deadline {
                let remaining = deadline - start.elapsed();
                let nap = if self.save_period > 0 {
                    remaining.min(Duration::from_secs(u64::from(self.save_period)))
                } else {
                    remaining
                };
                std::thread::sleep(nap);
                if self.save_period > 0 && start.elapsed() < deadline {
                    if let Err(e) = film.save_partial() {
                        warn!("periodic save failed: {}", e);
                    }
                }
            }
            stop.store(true, Ordering::Relaxed);
        })
        .unwrap();

        Ok(())
    }

    /// Generate the seed-path pool: M bidirectional proposals, every
    /// non-trivial (s, t) split re-joined and weighted by the luminance of
    /// its contribution. Returns the pool, its normalized selection weights,
    /// and b, the estimate of total image radiant flux.
    pub fn init_seed_paths<'a>(
        &self,
        ctx: PathContext<'a>,
    ) -> (Vec<Path<'a>>, Vec<f32>, f32) {
        let m = self.no_initial_paths.max(1);
        info!("generating initial seed paths (mltNoInitialPaths = {})", m);

        let bdpt = BidirPathTracer::new(false);
        let mut rng = Rng::with_seed(self.seed);
        let mut seeds = Vec::new();
        let mut weights: Vec<f32> = Vec::new();
        let mut sum = 0.0f32;

        loop {
            let pb = indicatif::ProgressBar::new(u64::from(m));
            pb.set_style(
                indicatif::ProgressStyle::default_bar()
                    .progress_chars("=>-")
                    .template("[{elapsed_precise}] [{wide_bar}] {pos}/{len}"),
            );

            let mut count = 0;
            while count < m {
                let mut path = Path::new(ctx);
                let _ = bdpt.generate(&mut path, &mut rng);
                let length = path.len();
                if self.max_depth > 0 && length > self.max_depth {
                    continue; // resample without consuming a slot
                }
                count += 1;
                pb.inc(1);

                for k in 2..=length {
                    for s in 0..=k {
                        let t = k - s;
                        let mut split = path.left(s);
                        if !split.append_path(&path.right(t)) {
                            continue;
                        }
                        debug_assert_eq!(split.len(), k);

                        let f = path.contribution(s, t, false).luminance();
                        if f > 0.0 {
                            sum += f;
                            weights.push(f);
                            seeds.push(split);
                        }
                    }
                }
            }
            pb.finish_and_clear();

            if !seeds.is_empty() && sum > 0.0 {
                break;
            }
            warn!("no seed path carried energy; retrying seed generation");
        }

        let b = sum / m as f32;
        for w in weights.iter_mut() {
            *w /= sum;
        }

        (seeds, weights, b)
    }
}
