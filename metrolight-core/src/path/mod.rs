//! Core data structure for manipulating a sequence x0, x1, ..., xk-1 of
//! points on scene surfaces. Paths are the central unit of the path-integral
//! formulation of light transport, on which the bidirectional path tracer and
//! the Metropolis sampler are both built.
//!
//! Vertices are stored in light-flow order: x0 on an emitter (for a light
//! subpath or a complete path), the last vertex on the sensor (for an eye
//! subpath or a complete path). `append` operations grow the light end,
//! `prepend` operations grow the eye end.

mod vertex;

pub use self::vertex::{PathVertex, VertexRole};

use std::collections::VecDeque;
use std::fmt;

use log::error;

use crate::bsdf::{Bsdf, Lobe, ScatterEvent};
use crate::camera::PinholeCamera;
use crate::ray::Ray;
use crate::rng::Rng;
use crate::scene::Scene;
use crate::spectrum::Spectrum;
use crate::{min, Normal3f, Point2f, Vector3f};

/// Russian-roulette survival probability ceiling.
const ROULETTE_MAX_Q: f32 = 0.95;

/// Density-query event for a direction: reuses the metadata of `base` when it
/// carries a sampled mode, and falls back to a smooth-surface query for
/// vertices that never sampled (seeds and glued junctions).
fn query_event(base: ScatterEvent, wo: Vector3f) -> ScatterEvent {
    let mut e = base.redirected(wo);
    if e.lobe == Lobe::Absorb {
        e.lobe = Lobe::Diffuse;
    }
    e
}

/// The shared, immutable collaborators a path samples against.
#[derive(Copy, Clone)]
pub struct PathContext<'a> {
    pub scene: &'a Scene,
    pub camera: &'a PinholeCamera,
}

#[derive(Clone)]
pub struct Path<'a> {
    vertices: VecDeque<PathVertex>,
    ctx: PathContext<'a>,
    radiance: Spectrum,
}

impl<'a> Path<'a> {
    pub fn new(ctx: PathContext<'a>) -> Path<'a> {
        Path {
            vertices: VecDeque::new(),
            ctx,
            radiance: Spectrum::black(),
        }
    }

    pub fn ctx(&self) -> PathContext<'a> {
        self.ctx
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, i: usize) -> &PathVertex {
        &self.vertices[i]
    }

    pub fn vertex_mut(&mut self, i: usize) -> &mut PathVertex {
        &mut self.vertices[i]
    }

    pub fn front(&self) -> &PathVertex {
        self.vertices.front().expect("empty path")
    }

    pub fn back(&self) -> &PathVertex {
        self.vertices.back().expect("empty path")
    }

    pub fn back_mut(&mut self) -> &mut PathVertex {
        self.vertices.back_mut().expect("empty path")
    }

    /// True iff the path starts on an emitter and ends on a sensor.
    pub fn is_complete(&self) -> bool {
        self.len() >= 2 && self.front().is_emitter() && self.back().is_sensor()
    }

    /// Radiance propagated along this path in the light-flow direction,
    /// recomputed by the last join.
    pub fn radiance(&self) -> Spectrum {
        self.radiance
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.radiance = Spectrum::black();
    }

    /// Copy of the path formed by the left (light-side) `n` vertices.
    pub fn left(&self, n: usize) -> Path<'a> {
        assert!(n <= self.len());
        Path {
            vertices: self.vertices.iter().take(n).cloned().collect(),
            ctx: self.ctx,
            radiance: Spectrum::black(),
        }
    }

    /// Copy of the path formed by the right (eye-side) `n` vertices.
    pub fn right(&self, n: usize) -> Path<'a> {
        assert!(n <= self.len());
        Path {
            vertices: self.vertices.iter().skip(self.len() - n).cloned().collect(),
            ctx: self.ctx,
            radiance: Spectrum::black(),
        }
    }

    /// Remove the light-end vertex.
    pub fn pop_front(&mut self) {
        assert!(!self.is_empty());
        self.vertices.pop_front();
    }

    /// Remove the eye-end vertex.
    pub fn pop_back(&mut self) {
        assert!(!self.is_empty());
        self.vertices.pop_back();
    }

    /// Extend the light end by one vertex: sample the end's BSDF, trace, and
    /// initialize the new vertex. The first call seeds x0 from the emitter
    /// sampler. Returns false on absorption, miss, roulette termination, or a
    /// degenerate edge.
    pub fn append(&mut self, rng: &mut Rng, roulette: bool) -> bool {
        if !self.is_empty() {
            return self.sample_vertex(rng, roulette, false, true);
        }

        let (pt, _index) = match self.ctx.scene.emitter_sampler.sample(rng) {
            Some(s) => s,
            None => return false,
        };
        let p_area = self.ctx.scene.emitter_sampler.pd();
        self.vertices.push_back(PathVertex::emitter_seed(pt, p_area));
        true
    }

    /// Extend the eye end by one vertex. The first call seeds the sensor
    /// vertex from a uniformly sampled film point.
    pub fn prepend(&mut self, rng: &mut Rng, roulette: bool) -> bool {
        if !self.is_empty() {
            return self.sample_vertex(rng, roulette, true, true);
        }

        let ndc = Point2f::new(rng.uniform_f32(), rng.uniform_f32());
        let pt = self.ctx.camera.point_on_film(ndc);
        self.vertices
            .push_back(PathVertex::sensor_seed(pt, self.ctx.camera.film_pa()));
        true
    }

    /// Extend the eye end using the event already stored on the end vertex
    /// instead of sampling a fresh one. The perturbation mutations steer
    /// retraces through this.
    pub fn prepend_with_event(&mut self, rng: &mut Rng) -> bool {
        debug_assert!(!self.is_empty());
        self.sample_vertex(rng, false, true, false)
    }

    /// Extend the light end using the event already stored on the end vertex.
    pub fn append_with_event(&mut self, rng: &mut Rng) -> bool {
        debug_assert!(!self.is_empty());
        self.sample_vertex(rng, false, false, false)
    }

    /// Push a prepared vertex onto the eye end of this path (deeper into the
    /// scene), re-evaluating the previous end vertex against it. Seeds the
    /// path when empty.
    pub fn prepend_vertex(&mut self, v1: PathVertex) -> bool {
        if self.is_empty() {
            self.vertices.push_front(v1);
            self.front_mut_tl_zero();
            return true;
        }

        let wo_full = v1.pt.p - self.vertices[0].pt.p;
        let t = wo_full.length();
        if t <= 0.0 {
            return false;
        }
        let wo = wo_full / t;

        let mut wi = -wo;
        if self.len() >= 2 {
            wi = (self.vertices[0].pt.p - self.vertices[1].pt.p).normalize();
        }

        let other_n = v1.pt.ng;
        let (alpha_e, p_e) = match self.init_e(0, wi, wo, t, other_n, None, None) {
            Some(r) => r,
            None => return false,
        };

        let ge_of_front = self.vertices[0].ge;
        self.vertices.push_front(v1);
        let z = &mut self.vertices[0];
        z.gl = ge_of_front;
        z.wi = wo;
        z.alpha_l = Spectrum::identity();
        z.alpha_e = alpha_e;
        z.p_l = 1.0;
        z.p_e = p_e;
        z.tl = t;
        if z.role == VertexRole::Sensor {
            // a sensor vertex glued into the interior scatters as a surface
            z.role = VertexRole::Reflectance;
        }

        true
    }

    fn front_mut_tl_zero(&mut self) {
        if let Some(front) = self.vertices.front_mut() {
            front.tl = 0.0;
        }
    }

    /// Glue a prepared eye subpath onto this light subpath: one visibility
    /// check on the connecting edge, junction re-evaluation, cumulative
    /// alpha/p sweeps in both directions, and a radiance recomputation.
    /// Either subpath may be empty. Returns false iff the connecting edge is
    /// occluded or degenerate; the joined vertices are kept either way so
    /// subpath-only strategies remain evaluable.
    pub fn append_path(&mut self, eye: &Path<'a>) -> bool {
        let s = self.len();
        let t = eye.len();
        let k = s + t;
        let mut invalid = false;

        self.vertices.extend(eye.vertices.iter().cloned());
        debug_assert_eq!(k, self.len());

        if k > 0 && self.vertices[0].pt.is_emitter() {
            self.vertices[0].role = VertexRole::Emitter;
        }

        // initialize the connection between the last light vertex and the
        // first eye vertex
        if s > 0 && t > 0 {
            let y_p = self.vertices[s - 1].pt.p;
            let z_p = self.vertices[s].pt.p;
            let wo_full = z_p - y_p;
            let d = wo_full.length();

            if d <= 0.0 {
                invalid = true;
            } else {
                let wo = wo_full / d;

                let mut wi = -wo;
                if s > 1 {
                    wi = (y_p - self.vertices[s - 2].pt.p).normalize();
                }
                let z_n = self.vertices[s].pt.ng;
                if self.init_l(s - 1, wi, wo, d, z_n, None, None).is_none() {
                    invalid = true;
                }

                let mut wi = wo;
                if t > 1 {
                    wi = (z_p - self.vertices[s + 1].pt.p).normalize();
                }
                let y_n = self.vertices[s - 1].pt.ng;
                if self.init_e(s, wi, -wo, d, y_n, None, None).is_none() {
                    invalid = true;
                }

                if !invalid && self.ctx.scene.occluded_between(y_p, z_p) {
                    self.vertices[s - 1].gl = 0.0;
                    self.vertices[s].ge = 0.0;
                    invalid = true;
                }
            }
        }

        // back-propagate the cumulative eye quantities through the original
        // light subpath
        for i in (0..s).rev() {
            if i >= k - 1 {
                // the light end is the whole path: eye end-cap
                debug_assert_eq!(t, 0);
                let film_pa = self.ctx.camera.film_pa();
                let wi = if i > 0 {
                    (self.vertices[i].pt.p - self.vertices[i - 1].pt.p).normalize()
                } else {
                    self.vertices[i].wi
                };
                if self.vertices[i].pt.is_sensor() {
                    self.vertices[i].role = VertexRole::Sensor;
                    let (we0, fs, pdf_e) = {
                        let y = &self.vertices[i];
                        let sensor = y.bsdf();
                        (
                            y.pt.sensor.as_ref().unwrap().we0(),
                            sensor.evaluate(&y.pt, wi, -wi),
                            sensor.pd(&y.pt, wi, &ScatterEvent::new(-wi, Lobe::Sense)),
                        )
                    };
                    let y = &mut self.vertices[i];
                    y.event = ScatterEvent::new(-wi, Lobe::Sense);
                    y.alpha_e = we0;
                    // pinhole film density stands in for the (zero) lens area
                    y.p_e = film_pa;
                    y.fs = fs;
                    y.pdf_e = pdf_e;
                } else {
                    let y = &mut self.vertices[i];
                    y.alpha_e = Spectrum::black();
                    y.p_e = 0.0;
                    y.fs = Spectrum::black();
                    y.pdf_e = 0.0;
                }
                self.vertices[i].tl = 0.0;
            } else {
                let (z_alpha_e, z_fs, z_pdf_e, z_ge, z_p_e) = {
                    let z = &self.vertices[i + 1];
                    (z.alpha_e, z.fs, z.pdf_e, z.ge, z.p_e)
                };
                let y = &mut self.vertices[i];
                y.alpha_e = if z_pdf_e > 0.0 && z_ge > 0.0 {
                    z_alpha_e * z_fs / z_pdf_e
                } else {
                    Spectrum::black()
                };
                y.p_e = z_p_e * z_pdf_e * z_ge;
            }
        }

        // forward-propagate the cumulative light quantities through the
        // original eye subpath
        for i in 0..t {
            let index = s + i;
            if index == 0 {
                // the eye end is the whole path: light end-cap
                debug_assert_eq!(s, 0);
                let p_area = self.ctx.scene.emitter_sampler.pd();
                let wo = if k > 1 {
                    (self.vertices[1].pt.p - self.vertices[0].pt.p).normalize()
                } else {
                    -self.vertices[0].wi
                };
                if self.vertices[0].pt.is_emitter() {
                    self.vertices[0].role = VertexRole::Emitter;
                    let (le0, fs, pdf_l) = {
                        let z = &self.vertices[0];
                        let emitter = z.bsdf();
                        (
                            z.pt.material.emitter.as_ref().unwrap().le0(),
                            emitter.evaluate(&z.pt, z.wi, wo),
                            emitter.pd(&z.pt, z.wi, &ScatterEvent::new(wo, Lobe::Emit)),
                        )
                    };
                    let z = &mut self.vertices[0];
                    z.event = ScatterEvent::new(wo, Lobe::Emit);
                    z.alpha_l = le0 / p_area;
                    z.p_l = p_area;
                    z.fs = fs;
                    z.pdf_l = pdf_l;
                } else {
                    let z = &mut self.vertices[0];
                    z.alpha_l = Spectrum::black();
                    z.p_l = 0.0;
                    z.fs = Spectrum::black();
                    z.pdf_l = 0.0;
                }
                self.vertices[0].te = 0.0;
            } else {
                let (y_alpha_l, y_fs, y_pdf_l, y_gl, y_p_l) = {
                    let y = &self.vertices[index - 1];
                    (y.alpha_l, y.fs, y.pdf_l, y.gl, y.p_l)
                };
                let z = &mut self.vertices[index];
                z.alpha_l = if y_pdf_l > 0.0 && y_gl > 0.0 {
                    y_alpha_l * y_fs / y_pdf_l
                } else {
                    Spectrum::black()
                };
                z.p_l = y_p_l * y_pdf_l * y_gl;
            }
        }

        self.compute_radiance();
        if !invalid {
            self.check_edges();
        }
        !invalid
    }

    /// Unweighted image contribution of the split with `s` light vertices and
    /// `t` eye vertices. Visibility of the connecting edge is re-checked
    /// unless s + t equals the path length or `tentative` is set.
    pub fn contribution(&self, s: usize, t: usize, tentative: bool) -> Spectrum {
        let n = self.len();
        assert!(s + t <= n && n >= 2);
        let eps = self.ctx.scene.geometry_eps();

        if s == 0 {
            // point lights cannot be hit by random eye walks
            let v = n - t;
            let z = &self.vertices[v];
            if z.pt.shape_area < 1e-12 || !z.pt.is_emitter() {
                return Spectrum::black();
            }

            let mut wo = -z.wi;
            if v < n - 1 {
                wo = (self.vertices[v + 1].pt.p - z.pt.p).normalize();
            }

            let emitter = z.pt.material.emitter.as_ref().unwrap();
            emitter.le(&z.pt, wo) * z.alpha_e
        } else if t == 0 {
            // pinhole cameras cannot be hit by random light walks
            let u = s - 1;
            let y = &self.vertices[u];
            if y.pt.shape_area < 1e-12 || !y.pt.is_sensor() {
                return Spectrum::black();
            }

            let mut wo = -y.wi;
            if u > 0 {
                wo = (self.vertices[u - 1].pt.p - y.pt.p).normalize();
            }

            let sensor = y.pt.sensor.as_ref().unwrap();
            y.alpha_l * sensor.evaluate(&y.pt, y.wi, wo)
        } else {
            let u = s - 1;
            let v = n - t;
            debug_assert!(u < v && v < n);
            let y = &self.vertices[u];
            let z = &self.vertices[v];

            // a specular vertex on the connecting edge has zero contribution
            // with probability one; such splits are charged to the other
            // strategies
            if y.is_specular() || z.is_specular() {
                return Spectrum::black();
            }

            if s + t == n {
                // full-length split: visibility is implicit and fs and G are
                // already cached
                y.alpha_l * y.fs * y.gl * z.fs * z.alpha_e
            } else {
                let wo_full = z.pt.p - y.pt.p;
                let d = wo_full.length();
                if d < eps {
                    return Spectrum::black();
                }
                let wo = wo_full / d;

                if !tentative && self.ctx.scene.occluded_between(y.pt.p, z.pt.p) {
                    return Spectrum::black();
                }

                let mut wi_y = y.wi;
                if u > 0 {
                    wi_y = (y.pt.p - self.vertices[u - 1].pt.p).normalize();
                }

                let mut wo_z = -wo;
                if v < n - 1 {
                    wo_z = (self.vertices[v + 1].pt.p - z.pt.p).normalize();
                }

                let g = (y.pt.ng.dot(&wo) * z.pt.ng.dot(&-wo)).abs() / (d * d);

                y.alpha_l
                    * y.bsdf().evaluate(&y.pt, wi_y, wo)
                    * g
                    * z.bsdf().evaluate(&z.pt, wo, wo_z)
                    * z.alpha_e
            }
        }
    }

    /// Surface-area density of the specific (s, t) sampling strategy.
    pub fn pd(&self, s: usize, t: usize, tentative: bool) -> f32 {
        let n = self.len();
        assert!(s + t <= n && n >= 2);
        let eps = self.ctx.scene.geometry_eps();

        if s == 0 {
            let v = n - t;
            let z = &self.vertices[v];
            if z.pt.shape_area < 1e-12 {
                return 0.0;
            }
            z.p_e
        } else if t == 0 {
            let u = s - 1;
            let y = &self.vertices[u];
            if y.pt.shape_area < 1e-12 {
                return 0.0;
            }
            y.p_l
        } else {
            let u = s - 1;
            let v = n - t;
            debug_assert!(u < v);
            let y = &self.vertices[u];
            let z = &self.vertices[v];

            if y.is_specular() || z.is_specular() {
                return 0.0;
            }

            if s + t == n {
                y.p_l * z.p_e
            } else {
                let wo_full = z.pt.p - y.pt.p;
                let d = wo_full.length();
                if d < eps {
                    return 0.0;
                }
                if !tentative && self.ctx.scene.occluded_between(y.pt.p, z.pt.p) {
                    return 0.0;
                }
                y.p_l * z.p_e
            }
        }
    }

    /// Relative densities of every split of a k-vertex path, expressed as
    /// ratios with p(s0) = 1 where `s_actual` is the light-subpath length the
    /// path was actually generated with. The normalization is irrelevant for
    /// multiple importance sampling, which only consumes density ratios.
    pub fn pds(&self, k: usize, s_actual: usize) -> Vec<f32> {
        let n = self.len();
        assert!(s_actual <= n && k <= n && k >= 1);

        let t = n - s_actual;
        let s = if t > k { k } else { k - t };

        let mut pdfs = vec![0.0f32; k + 1];
        pdfs[s] = 1.0;

        // index of the ith vertex of the k-suffix/prefix: from the light end
        // when !adjoint, from the eye end when adjoint
        let index = |i: usize, adjoint: bool| if adjoint { n - k + i } else { i };

        // p(i) known; ratio p(i+1)/p(i) determines p(s+1)..p(k)
        for i in s..k {
            let num = if i == 0 {
                self.vertices[index(i, false)].p_l
            } else {
                let y = &self.vertices[index(i - 1, false)];
                y.pdf_l * y.gl
            };
            let den = if i == k - 1 {
                self.vertices[index(i, true)].p_e
            } else {
                let z = &self.vertices[index(i + 1, true)];
                z.pdf_e * z.ge
            };

            if num == 0.0 || den == 0.0 {
                break;
            }
            pdfs[i + 1] = pdfs[i] * (num / den);
        }

        // p(i) known; ratio p(i-1)/p(i) determines p(s-1)..p(0)
        for i in (1..=s).rev() {
            let num = if i == k {
                self.vertices[index(i - 1, true)].p_e
            } else {
                let z = &self.vertices[index(i, true)];
                z.pdf_e * z.ge
            };
            let den = if i == 1 {
                self.vertices[index(i - 1, false)].p_l
            } else {
                let y = &self.vertices[index(i - 1, false)];
                y.pdf_l * y.gl
            };

            if num == 0.0 || den == 0.0 {
                break;
            }
            pdfs[i - 1] = pdfs[i] * (num / den);
        }

        // a split whose connecting edge contains a specular vertex is charged
        // to the strategies that keep the vertex off the connecting edge
        for i in (0..k).rev() {
            if self.vertices[index(i, true)].is_specular()
                || self.vertices[index(i, false)].is_specular()
            {
                pdfs[i] = 0.0;
                pdfs[i + 1] = 0.0;
            }
        }

        pdfs
    }

    /// Recompute the cached radiance Le0 * prod fs * G.
    pub fn compute_radiance(&mut self) {
        let n = self.len();
        if n < 2 || !self.vertices[0].pt.is_emitter() {
            self.radiance = Spectrum::black();
            return;
        }

        let mut radiance = self.vertices[0].pt.material.emitter.as_ref().unwrap().le0();
        for v in &self.vertices {
            radiance *= v.fs * v.gl;
        }
        self.radiance = radiance;
    }

    /// Film-plane position this path contributes to: the projection of the
    /// last scene vertex before the sensor.
    pub fn film_position(&self) -> Option<Point2f> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        self.ctx.camera.project(&self.vertices[n - 2].pt.p)
    }

    /// Edge-length and geometry-term agreement between adjacent vertices.
    /// These are construction invariants; a mismatch means the bookkeeping
    /// has been corrupted, which is fatal.
    pub fn check_edges(&self) {
        for i in 0..self.len().saturating_sub(1) {
            let y = &self.vertices[i];
            let z = &self.vertices[i + 1];
            let t_ok = (y.tl - z.te).abs() <= 1e-3 * y.tl.abs().max(1.0);
            let g_ok = (y.gl - z.ge).abs() <= 1e-3 * y.gl.abs().max(1.0);
            if !t_ok || !g_ok {
                error!("path invariant violation at edge {}: {}", i, self);
                panic!(
                    "path edge {} mismatch: tL={} vs tE={}, GL={} vs GE={}",
                    i, y.tl, z.te, y.gl, z.ge
                );
            }
        }
    }

    /// Sample the BSDF at one end of the path, trace, and initialize the new
    /// end vertex. `adjoint` selects the eye end.
    fn sample_vertex(
        &mut self,
        rng: &mut Rng,
        roulette: bool,
        adjoint: bool,
        sample_bsdf: bool,
    ) -> bool {
        let n = self.len();
        debug_assert!(n > 0);
        let end = if adjoint { 0 } else { n - 1 };
        let eps = self.ctx.scene.geometry_eps();

        let mut wi = if n > 1 {
            if adjoint {
                (self.vertices[0].pt.p - self.vertices[1].pt.p).normalize()
            } else {
                (self.vertices[n - 1].pt.p - self.vertices[n - 2].pt.p).normalize()
            }
        } else {
            self.vertices[end].wi
        };

        if sample_bsdf {
            let event = {
                let v = &self.vertices[end];
                v.bsdf().sample(&v.pt, wi, None, rng)
            };
            self.vertices[end].event = event;
        }

        let wo = self.vertices[end].event.wo;
        if wo.is_zero() {
            return false; // absorbed
        }
        debug_assert!(wo.is_unit());

        // a zero-area light seed has no frame of its own; align it with the
        // emission direction so its geometry terms use cos = 1
        if n == 1 && self.vertices[end].pt.shape_area == 0.0 && !self.vertices[end].pt.is_sensor()
        {
            let v = &mut self.vertices[end];
            v.pt.ng = Normal3f::from(wo);
            v.pt.ns = v.pt.ng;
        }

        let ray = Ray::spawn(self.vertices[end].pt.p, wo);
        let (t, mut pt) = match self.ctx.scene.intersect(&ray) {
            Some(hit) => hit,
            None => return false,
        };
        if t < eps {
            return false;
        }

        // spectral coherence: a dispersive event pins the wavelength for the
        // rest of the walk
        let lambda = {
            let v = &self.vertices[end];
            if v.event.lambda > 0 {
                v.event.lambda
            } else {
                v.pt.preferred_lambda
            }
        };
        pt.preferred_lambda = lambda;

        if n == 1 {
            wi = -wo;
        }
        self.vertices[end].wi = wi;

        let other_n = pt.ng;
        if adjoint {
            let (alpha_e, p_e) = match self.init_e(
                end,
                wi,
                wo,
                t,
                other_n,
                if roulette { Some(rng) } else { None },
                None,
            ) {
                Some(r) => r,
                None => return false,
            };

            let gl = self.vertices[end].ge;
            self.vertices
                .push_front(PathVertex::eye_extension(pt, wo, gl, t, alpha_e, p_e));
        } else {
            let (alpha_l, p_l) = match self.init_l(
                end,
                wi,
                wo,
                t,
                other_n,
                if roulette { Some(rng) } else { None },
                None,
            ) {
                Some(r) => r,
                None => return false,
            };

            let ge = self.vertices[end].gl;
            self.vertices
                .push_back(PathVertex::light_extension(pt, wo, ge, t, alpha_l, p_l));
        }

        true
    }

    /// Re-evaluate light-end vertex `u` against a new next point along `wo`
    /// at distance `t`. Returns the accumulated (alpha_l, p_l) for the next
    /// vertex, or `None` when the extension is invalid. `prior_event`
    /// overrides the event metadata used for the density queries.
    fn init_l(
        &mut self,
        u: usize,
        wi: Vector3f,
        wo: Vector3f,
        t: f32,
        other_n: Normal3f,
        roulette: Option<&mut Rng>,
        prior_event: Option<ScatterEvent>,
    ) -> Option<(Spectrum, f32)> {
        let eps = self.ctx.scene.geometry_eps();
        if t < eps {
            self.vertices[u].gl = 0.0;
            return None;
        }

        let (gl, fs, pdf_l, pdf_e) = {
            let y = &self.vertices[u];
            let event = prior_event.unwrap_or(y.event);
            let gl = (y.pt.ng.dot(&wo) * other_n.dot(&-wo)).abs() / (t * t);
            let bsdf = y.bsdf();
            let pdf_e = bsdf.pd(&y.pt, -wo, &query_event(event, -wi));
            let fs = bsdf.evaluate(&y.pt, wi, wo);
            let pdf_l = bsdf.pd(&y.pt, wi, &query_event(event, wo));
            (gl, fs, pdf_l, pdf_e)
        };

        let y = &mut self.vertices[u];
        y.tl = t;
        y.gl = gl;
        y.pdf_e = pdf_e;
        y.fs = fs;
        y.pdf_l = pdf_l;

        if y.gl == 0.0 || y.pdf_l == 0.0 {
            return None;
        }

        if let Some(rng) = roulette {
            let q = min(ROULETTE_MAX_Q, y.fs[y.fs.max_sample_index()] / y.pdf_l);
            if q <= rng.uniform_f32() {
                y.pdf_l = 0.0;
                return None;
            }
            y.pdf_l *= q;
        } else if y.fs.is_zero() {
            y.pdf_l = 0.0;
            return None;
        }

        Some(((y.fs / y.pdf_l) * y.alpha_l, y.pdf_l * y.gl * y.p_l))
    }

    /// Mirror of `init_l` for eye-end vertex `z`: `wi` is the eye-walk
    /// arrival direction, `wo` the direction toward the new (deeper) point.
    fn init_e(
        &mut self,
        zi: usize,
        wi: Vector3f,
        wo: Vector3f,
        t: f32,
        other_n: Normal3f,
        roulette: Option<&mut Rng>,
        prior_event: Option<ScatterEvent>,
    ) -> Option<(Spectrum, f32)> {
        let eps = self.ctx.scene.geometry_eps();
        if t < eps {
            self.vertices[zi].ge = 0.0;
            return None;
        }

        let (ge, fs, pdf_l, pdf_e) = {
            let z = &self.vertices[zi];
            let event = prior_event.unwrap_or(z.event);
            let ge = (z.pt.ng.dot(&wo) * other_n.dot(&-wo)).abs() / (t * t);
            let bsdf = z.bsdf();
            // light flows from the new point through z toward the eye
            let pdf_l = bsdf.pd(&z.pt, -wo, &query_event(event, -wi));
            let fs = bsdf.evaluate(&z.pt, -wo, -wi);
            let pdf_e = bsdf.pd(&z.pt, wi, &query_event(event, wo));
            (ge, fs, pdf_l, pdf_e)
        };

        let z = &mut self.vertices[zi];
        z.te = t;
        z.ge = ge;
        z.pdf_l = pdf_l;
        z.fs = fs;
        z.pdf_e = pdf_e;

        if z.ge == 0.0 || z.pdf_e == 0.0 {
            return None;
        }

        if let Some(rng) = roulette {
            let q = min(ROULETTE_MAX_Q, z.fs[z.fs.max_sample_index()] / z.pdf_e);
            if q <= rng.uniform_f32() {
                z.pdf_e = 0.0;
                return None;
            }
            z.pdf_e *= q;
        } else if z.fs.is_zero() {
            z.pdf_e = 0.0;
            return None;
        }

        Some(((z.fs / z.pdf_e) * z.alpha_e, z.pdf_e * z.ge * z.p_e))
    }
}

impl<'a> PartialEq for Path<'a> {
    fn eq(&self, other: &Path<'a>) -> bool {
        self.len() == other.len()
            && self
                .vertices
                .iter()
                .zip(other.vertices.iter())
                .all(|(a, b)| a == b)
    }
}

impl<'a> fmt::Display for Path<'a> {
    /// Heckbert notation (e.g. "LDSDE") followed by the per-vertex state;
    /// this is the dump emitted on invariant violations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for v in &self.vertices {
            write!(f, "{}", v.letter())?;
        }
        write!(f, ", length = {}", self.len())?;
        for v in &self.vertices {
            write!(f, ", {}", v)?;
        }
        write!(f, " }}")
    }
}
