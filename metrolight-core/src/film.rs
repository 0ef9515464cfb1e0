//! Progressive film: per-pixel weighted-sum accumulators fed by point
//! samples, with reconstruction-kernel splatting, histogram normalization for
//! the Metropolis sampler, tonemapping, and periodic persistence.

use std::path::{Path as FsPath, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use log::info;
use parking_lot::Mutex;

use crate::clamp;
use crate::filter::Filter;
use crate::spectrum::Spectrum;
use crate::tonemap::Tonemap;
use crate::Point2f;

#[derive(Default, Clone)]
struct Pixel {
    num: Spectrum,
    weight: f32,
    /// Number of tentative Metropolis proposals splatted here.
    proposed: u64,
}

/// One lock stripe owns the pixels of the columns mapping to it. Stripes are
/// only ever locked one at a time, in ascending column order.
struct Stripe {
    pixels: Vec<Pixel>,
    n_samples: u64,
}

pub struct Film {
    width: u32,
    height: u32,
    stripe_count: u32,
    stripes: Vec<Mutex<Stripe>>,
    filter: Option<Box<dyn Filter>>,
    tonemap: Box<dyn Tonemap>,
    /// Metropolis rendering divides by the global sample count instead of
    /// the per-pixel filter weight.
    mlt: bool,
    /// Rescale pixels by a 3x3 median of the proposal counts, removing
    /// single-chain spike artifacts at the cost of slight bias.
    filter_proposed: bool,
    mlt_splats: AtomicU64,
    output_path: PathBuf,
}

impl Film {
    pub fn new(
        width: u32,
        height: u32,
        filter: Option<Box<dyn Filter>>,
        tonemap: Box<dyn Tonemap>,
        mlt: bool,
        filter_proposed: bool,
        output_path: PathBuf,
    ) -> Film {
        assert!(width > 0 && height > 0);
        let stripe_count = width;
        let stripes = (0..stripe_count)
            .map(|stripe| {
                let n_cols = columns_of_stripe(stripe, width, stripe_count);
                Mutex::new(Stripe {
                    pixels: vec![Pixel::default(); (n_cols * height) as usize],
                    n_samples: 0,
                })
            })
            .collect();

        Film {
            width,
            height,
            stripe_count,
            stripes,
            filter,
            tonemap,
            mlt,
            filter_proposed,
            mlt_splats: AtomicU64::new(0),
            output_path,
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn bin(&self, position: Point2f) -> (u32, u32) {
        let x = clamp(
            (position.x * self.width as f32) as i64,
            0,
            i64::from(self.width) - 1,
        ) as u32;
        let y = clamp(
            (position.y * self.height as f32) as i64,
            0,
            i64::from(self.height) - 1,
        ) as u32;
        (x, y)
    }

    /// Accumulate one weighted sample, splatting through the reconstruction
    /// kernel when one is configured.
    pub fn add_sample(&self, position: Point2f, value: Spectrum, weight: f32) {
        self.splat(position, value, weight, false);
    }

    /// Accumulate one Metropolis sample (always weight 1 in the histogram
    /// measure); `proposed` marks the tentative splat of a step.
    pub fn splat_mlt(&self, position: Point2f, value: Spectrum, proposed: bool) {
        self.mlt_splats.fetch_add(1, Ordering::Relaxed);
        self.splat(position, value, 1.0, proposed);
    }

    fn splat(&self, position: Point2f, value: Spectrum, weight: f32, proposed: bool) {
        let (cx, cy) = self.bin(position);

        let half = self.filter.as_ref().map_or(0, |f| f.radius().ceil() as i64);
        if half == 0 {
            self.deposit(cx, cy, value, weight, proposed);
            return;
        }

        let filter = self.filter.as_ref().unwrap();
        let center_x = position.x * self.width as f32;
        let center_y = position.y * self.height as f32;

        let x0 = (i64::from(cx) - half).max(0) as u32;
        let x1 = (i64::from(cx) + half).min(i64::from(self.width) - 1) as u32;
        let y0 = (i64::from(cy) - half).max(0) as u32;
        let y1 = (i64::from(cy) + half).min(i64::from(self.height) - 1) as u32;

        // ascending column order; one stripe held at a time
        for x in x0..=x1 {
            for y in y0..=y1 {
                let fw = filter.evaluate(x as f32 + 0.5 - center_x, y as f32 + 0.5 - center_y);
                if fw > 0.0 {
                    self.deposit(x, y, value, weight * fw, proposed && x == cx && y == cy);
                }
            }
        }
    }

    fn deposit(&self, x: u32, y: u32, value: Spectrum, weight: f32, proposed: bool) {
        let stripe_index = x % self.stripe_count;
        let local_col = x / self.stripe_count;
        let index = (local_col * self.height + y) as usize;

        let mut stripe = self.stripes[stripe_index as usize].lock();
        let pixel = &mut stripe.pixels[index];
        pixel.num += value * weight;
        pixel.weight += weight;
        if proposed {
            pixel.proposed += 1;
        }
        stripe.n_samples += 1;
    }

    /// Snapshot every pixel (row-major) by visiting the stripes in ascending
    /// order.
    fn snapshot(&self) -> Vec<Pixel> {
        let mut pixels = vec![Pixel::default(); (self.width * self.height) as usize];
        for stripe_index in 0..self.stripe_count {
            let stripe = self.stripes[stripe_index as usize].lock();
            let n_cols = columns_of_stripe(stripe_index, self.width, self.stripe_count);
            for local_col in 0..n_cols {
                let x = stripe_index + local_col * self.stripe_count;
                for y in 0..self.height {
                    pixels[(y * self.width + x) as usize] =
                        stripe.pixels[(local_col * self.height + y) as usize].clone();
                }
            }
        }
        pixels
    }

    /// Resolve the accumulators into linear HDR values.
    fn develop(&self) -> Vec<Spectrum> {
        let pixels = self.snapshot();
        let mut hdr = vec![Spectrum::black(); pixels.len()];

        if self.mlt {
            // each pixel's visit count is itself the estimator of its
            // relative brightness: normalize by the global splat count, not
            // the local filter weight
            let splats = self.mlt_splats.load(Ordering::Relaxed).max(1);
            let scale =
                2.0 * (self.width as f32 * self.height as f32) / splats as f32;

            for (i, px) in pixels.iter().enumerate() {
                let rescale = if self.filter_proposed {
                    let mid = self.proposed_median(&pixels, i);
                    if mid > 0 && px.proposed > 0 {
                        mid as f32 / px.proposed as f32
                    } else {
                        1.0
                    }
                } else {
                    1.0
                };
                hdr[i] = px.num * (scale * rescale);
            }
        } else {
            for (i, px) in pixels.iter().enumerate() {
                if px.weight > 0.0 {
                    hdr[i] = px.num / px.weight;
                }
            }
        }

        hdr
    }

    /// 3x3 median of the proposal-count plane around pixel `i`.
    fn proposed_median(&self, pixels: &[Pixel], i: usize) -> u64 {
        let w = self.width as i64;
        let h = self.height as i64;
        let x = i as i64 % w;
        let y = i as i64 / w;

        let mut counts = [0u64; 9];
        let mut n = 0;
        for dy in -1..=1 {
            let row = clamp(y + dy, 0, h - 1);
            for dx in -1..=1 {
                let col = clamp(x + dx, 0, w - 1);
                counts[n] = pixels[(row * w + col) as usize].proposed;
                n += 1;
            }
        }
        counts.sort_unstable();
        counts[(n - 1) / 2]
    }

    /// Tonemapped 8-bit RGBA snapshot of the current film state.
    pub fn to_rgba(&self) -> Vec<u8> {
        let hdr = self.develop();
        let mut rgba = Vec::with_capacity(hdr.len() * 4);
        for s in hdr {
            let [r, g, b] = self.tonemap.map(s);
            rgba.extend_from_slice(&[r, g, b, 0xff]);
        }
        rgba
    }

    fn write(&self, path: &FsPath) -> Result<()> {
        let rgba = self.to_rgba();
        image::save_buffer(
            path,
            &rgba,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )
        .with_context(|| format!("failed to write image {}", path.display()))
    }

    /// Periodic checkpoint to a `.partial.` sibling of the output path. An
    /// I/O failure here is reported by the caller and rendering continues.
    pub fn save_partial(&self) -> Result<()> {
        let path = partial_path(&self.output_path);
        self.write(&path)
    }

    /// Write the final image.
    pub fn finalize(&self) -> Result<()> {
        self.write(&self.output_path)?;
        info!("wrote {}", self.output_path.display());
        let partial = partial_path(&self.output_path);
        if partial.exists() {
            let _ = std::fs::remove_file(partial);
        }
        Ok(())
    }

    /// Mean HDR value of a pixel block; test and diagnostics hook.
    pub fn mean_of_block(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Spectrum {
        let hdr = self.develop();
        let mut sum = Spectrum::black();
        let mut n = 0;
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                sum += hdr[(y * self.width + x) as usize];
                n += 1;
            }
        }
        if n > 0 {
            sum / n as f32
        } else {
            sum
        }
    }
}

fn columns_of_stripe(stripe: u32, width: u32, stripe_count: u32) -> u32 {
    // columns x with x % stripe_count == stripe
    (width - stripe + stripe_count - 1) / stripe_count
}

fn partial_path(path: &FsPath) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("png");
    path.with_file_name(format!("{}.partial.{}", stem, ext))
}
