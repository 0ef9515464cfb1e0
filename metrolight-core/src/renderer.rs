//! Render controller: the point-sample producer/consumer pipeline for the
//! bidirectional renderer and the front door for the Metropolis sampler.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::Result;
use log::{info, warn};

use crate::camera::PinholeCamera;
use crate::config::Config;
use crate::film::Film;
use crate::integrator::{BidirPathTracer, MltRenderer};
use crate::path::PathContext;
use crate::rng::Rng;
use crate::scene::Scene;
use crate::{filter, stats, tonemap, Point2f};

/// Capacity of the queue between the sample generator and the consumers.
const SAMPLE_QUEUE_CAPACITY: usize = 512;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Algorithm {
    Bidirectional,
    Metropolis,
}

pub struct Renderer {
    pub config: Config,
    pub algorithm: Algorithm,
}

impl Renderer {
    pub fn render(&self, scene: &Scene, camera: &PinholeCamera, output: PathBuf) -> Result<()> {
        self.config.validate()?;
        let cfg = &self.config;

        let filter = filter::create(
            &cfg.filter,
            cfg.filter_support,
            cfg.filter_sigma,
            cfg.filter_b,
            cfg.filter_c,
            cfg.filter_tau,
        )?;
        let tonemap = tonemap::create(&cfg.tonemap)?;
        let is_mlt = self.algorithm == Algorithm::Metropolis;

        let film = Film::new(
            cfg.width,
            cfg.height,
            filter,
            tonemap,
            is_mlt,
            cfg.mlt_filter_proposed,
            output,
        );

        let n_threads = cfg.resolved_threads();
        let ctx = PathContext { scene, camera };

        match self.algorithm {
            Algorithm::Bidirectional => render_bidirectional(ctx, &film, cfg, n_threads)?,
            Algorithm::Metropolis => {
                let mlt = MltRenderer {
                    no_initial_paths: cfg.mlt_no_initial_paths,
                    max_depth: cfg.mlt_max_depth as usize,
                    max_consecutive_rejections: cfg.mlt_max_consecutive_rejections,
                    bidir_prob: cfg.mlt_bidir_path_mutation_prob,
                    lens_prob: cfg.mlt_lens_subpath_mutation_prob,
                    caustic_prob: cfg.mlt_perturbation_path_mutation_prob,
                    render_seconds: cfg.render_seconds,
                    save_period: cfg.save_period,
                    seed: cfg.seed,
                };
                mlt.render(ctx, &film, n_threads)?;
            }
        }

        film.finalize()?;
        stats::report();
        Ok(())
    }
}

/// One generator thread feeds film-plane sample positions through a bounded
/// queue to the consumer threads, which evaluate the bidirectional estimator
/// and splat into the film.
fn render_bidirectional(
    ctx: PathContext<'_>,
    film: &Film,
    cfg: &Config,
    n_threads: usize,
) -> Result<()> {
    let (width, height) = (cfg.width, cfg.height);
    let spp = cfg.no_super_samples;
    let total = u64::from(spp) * u64::from(width) * u64::from(height);

    info!(
        "bidirectional render: {}x{}, {} threads, {}",
        width,
        height,
        n_threads,
        if spp == 0 {
            "unbounded sampling".to_string()
        } else {
            format!("{} samples/pixel", spp)
        }
    );

    let pb = if spp > 0 {
        let pb = indicatif::ProgressBar::new(total);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .progress_chars("=>-")
                .template("[{elapsed_precise}] [{wide_bar}] {percent}% {eta}"),
        );
        Some(pb)
    } else {
        None
    };

    let (tx, rx) = crossbeam_channel::bounded::<Point2f>(SAMPLE_QUEUE_CAPACITY);
    let start = Instant::now();
    let last_save = AtomicU64::new(0);

    crossbeam::scope(|scope| {
        let pb = &pb;
        let last_save = &last_save;

        // generator: passes over the film in scanline order, one jittered
        // sample per pixel per pass; blocks when the queue is full
        let gen_seed = cfg.seed;
        scope.spawn(move |_| {
            let mut rng = Rng::with_seed(gen_seed.wrapping_add(0x7ab));
            let mut pass = 0u32;
            'generate: while spp == 0 || pass < spp {
                for y in 0..height {
                    for x in 0..width {
                        let p = Point2f::new(
                            (x as f32 + rng.uniform_f32()) / width as f32,
                            (y as f32 + rng.uniform_f32()) / height as f32,
                        );
                        if tx.send(p).is_err() {
                            break 'generate;
                        }
                    }
                }
                pass += 1;
            }
            drop(tx);
        });

        // consumers
        for i in 0..n_threads {
            let rx = rx.clone();
            let mut rng = Rng::with_seed(cfg.seed.wrapping_add(1 + i as u64));
            let bdpt = BidirPathTracer::new(cfg.clamp_samples);
            let save_period = cfg.save_period;

            scope.spawn(move |_| {
                for p in rx.iter() {
                    let l = bdpt.sample(ctx, p, &mut rng);
                    film.add_sample(p, l, 1.0);
                    if let Some(pb) = pb {
                        pb.inc(1);
                    }

                    if save_period > 0 {
                        maybe_save(film, start, save_period, last_save);
                    }
                }
            });
        }
    })
    .unwrap();

    if let Some(pb) = pb {
        pb.finish();
    }
    Ok(())
}

/// Claim the periodic checkpoint if this thread crosses the save boundary
/// first; losers skip it.
fn maybe_save(film: &Film, start: Instant, save_period: u32, last_save: &AtomicU64) {
    let elapsed = start.elapsed().as_secs();
    let last = last_save.load(Ordering::Relaxed);
    if elapsed >= last + u64::from(save_period)
        && last_save
            .compare_exchange(last, elapsed, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    {
        if let Err(e) = film.save_partial() {
            warn!("periodic save failed: {}", e);
        }
    }
}
