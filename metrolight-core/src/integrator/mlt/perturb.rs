//! Lens, multi-chain and caustic perturbations: small, cheap moves that
//! explore nearby paths with a high acceptance probability, complementing the
//! large-scale bidirectional mutation.
//!
//! The tail of the current path is classified by scanning from the sensor
//! end: a suffix S+DE marks a caustic path; otherwise the lens chain S*D is
//! popped, and further DS+ groups promote the move to a multi-chain
//! perturbation.

use crate::clamp;
use crate::integrator::mlt::Mutation;
use crate::path::{Path, PathVertex};
use crate::rng::Rng;
use crate::{coordinate_system, Point2f, Vector3f};

/// Film-plane jitter half-width in pixels. The jitter is symmetric, so its
/// density cancels out of the acceptance ratio.
const FILM_JITTER_PIXELS: f32 = 5.0;
/// Angular jitter bounds in radians for the exponential-radius perturbation.
const THETA_MIN: f32 = 0.05;
const THETA_MAX: f32 = 0.3;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PerturbKind {
    Lens,
    MultiChain,
    Caustic,
}

/// Rotate a direction by a small angle with exponentially distributed radius
/// between the configured bounds, uniform in azimuth.
fn perturb_direction(d: Vector3f, rng: &mut Rng) -> Vector3f {
    let (u, v) = coordinate_system(&d);
    let phi = rng.uniform_f32() * 2.0 * std::f32::consts::PI;
    let r = THETA_MAX * (-(THETA_MAX / THETA_MIN).ln() * rng.uniform_f32()).exp();
    (d + u * (r * phi.cos()) + v * (r * phi.sin())).normalize()
}

/// Pop the perturbable tail off `y` (a clone of the current state) and report
/// what kind of tail it was. Returns `None` when the scan runs off the path.
fn classify(y: &mut Path<'_>) -> Option<PerturbKind> {
    y.pop_back(); // sensor vertex

    if y.is_empty() {
        return None;
    }

    if !y.back().is_specular() && y.len() >= 2 && y.vertex(y.len() - 2).is_specular() {
        // suffix SDE: primary caustic
        y.pop_back(); // the diffuse vertex
        while !y.is_empty() && y.back().is_specular() {
            y.pop_back();
        }
        if y.is_empty() {
            return None;
        }
        return Some(PerturbKind::Caustic);
    }

    let mut kind = PerturbKind::Lens;
    while y.back().is_specular() {
        y.pop_back();
        if y.is_empty() {
            return None;
        }
    }
    y.pop_back(); // the lens-edge diffuse vertex

    while y.len() >= 2 && y.back().is_specular() {
        // suffix SDS*E: promote to multi-chain and pop the next DS+ group
        kind = PerturbKind::MultiChain;
        loop {
            y.pop_back();
            if y.is_empty() {
                return None;
            }
            if !y.back().is_specular() {
                break;
            }
        }
        y.pop_back(); // the group's diffuse vertex
        if y.is_empty() {
            break;
        }
    }

    if kind == PerturbKind::Lens && !y.is_empty() && y.back().is_specular() {
        return None;
    }
    Some(kind)
}

/// Extend the front of `lens` one vertex using its stored event, check
/// material identity against the corresponding vertex of `x`, and resample
/// the new front's event with `x`'s event as the mode-preserving prior.
fn retrace_step<'a>(lens: &mut Path<'a>, x: &Path<'a>, rng: &mut Rng) -> bool {
    let n = x.len();
    if !lens.prepend_with_event(rng) {
        return false;
    }
    if lens.len() > n {
        return false;
    }
    let xi = n - lens.len();
    if !lens.front().pt.same_material(&x.vertex(xi).pt) {
        return false;
    }
    let event = {
        let f = lens.front();
        f.bsdf().sample(&f.pt, f.wi, Some(&x.vertex(xi).event), rng)
    };
    lens.vertex_mut(0).event = event;
    true
}

fn mutate_perturbation<'a>(
    x: &Path<'a>,
    rng: &mut Rng,
    want_caustic: bool,
) -> (Path<'a>, f32) {
    let ctx = x.ctx();
    let failed = || (Path::new(ctx), 0.0);
    let n = x.len();
    if n < 2 {
        return failed();
    }

    let mut y = x.clone();
    let kind = match classify(&mut y) {
        Some(k) => k,
        None => return failed(),
    };
    if want_caustic != (kind == PerturbKind::Caustic) {
        return failed(); // tail shape belongs to the other strategy
    }

    let s = y.len();
    let camera = ctx.camera;
    let mut lens = Path::new(ctx);

    if kind == PerturbKind::Lens || kind == PerturbKind::MultiChain {
        // jitter the film-plane point and retrace the eye chain through the
        // specular vertices onto the first diffuse surface
        let (w, h) = camera.resolution();
        let old = x.back().pt.uv;
        let film = Point2f::new(
            clamp(
                old.x + rng.uniform_range(-FILM_JITTER_PIXELS, FILM_JITTER_PIXELS) / w as f32,
                0.0,
                1.0,
            ),
            clamp(
                old.y + rng.uniform_range(-FILM_JITTER_PIXELS, FILM_JITTER_PIXELS) / h as f32,
                0.0,
                1.0,
            ),
        );

        let pt = camera.point_on_film(film);
        if !lens.prepend_vertex(PathVertex::sensor_seed(pt, camera.film_pa())) {
            return failed();
        }
        let seed_event = {
            let f = lens.front();
            f.bsdf().sample(&f.pt, Vector3f::zero(), None, rng)
        };
        lens.vertex_mut(0).event = seed_event;

        loop {
            if !retrace_step(&mut lens, x, rng) {
                return failed();
            }
            if !lens.front().is_specular() {
                break;
            }
        }

        if kind == PerturbKind::MultiChain {
            // perturb the outgoing direction at each interior DS+ junction
            // and retrace the next chain
            loop {
                let t_index = n - lens.len();
                if t_index == 0 || y.len() + lens.len() >= n {
                    break;
                }

                let wo = (x.vertex(t_index - 1).pt.p - x.vertex(t_index).pt.p).normalize();
                let wo = perturb_direction(wo, rng);
                let redirected = lens.front().event.redirected(wo);
                lens.vertex_mut(0).event = redirected;

                loop {
                    if !retrace_step(&mut lens, x, rng) {
                        return failed();
                    }
                    if !lens.front().is_specular() {
                        break;
                    }
                }

                if lens.len() + y.len() >= n {
                    break;
                }
            }
        }
    } else {
        // caustic: perturb the emission-side direction at the diffuse
        // boundary, retrace through the specular chain, and reproject the
        // landing point onto the film plane
        debug_assert!(x.vertex(s).is_specular());
        debug_assert!(!y.back().is_specular());

        let wo = (x.vertex(s).pt.p - x.vertex(s - 1).pt.p).normalize();
        let wo = perturb_direction(wo, rng);
        let redirected = y.back().event.redirected(wo);
        y.back_mut().event = redirected;

        loop {
            if !y.append_with_event(rng) {
                return failed();
            }
            if !y.back().pt.same_material(&x.vertex(y.len() - 1).pt) {
                return failed();
            }
            if y.len() >= n - 1 {
                break;
            }
            let event = {
                let b = y.back();
                b.bsdf().sample(&b.pt, b.wi, Some(&x.vertex(y.len() - 1).event), rng)
            };
            y.back_mut().event = event;
        }

        let film = match camera.project(&y.back().pt.p) {
            Some(p) => Point2f::new(clamp(p.x, 0.0, 1.0), clamp(p.y, 0.0, 1.0)),
            None => return failed(),
        };
        let pt = camera.point_on_film(film);
        if !lens.prepend_vertex(PathVertex::sensor_seed(pt, camera.film_pa())) {
            return failed();
        }
    }

    // reattach the perturbed chain to the untouched remainder
    if !y.append_path(&lens) {
        return failed();
    }
    if !y.front().is_emitter() || !y.back().is_sensor() {
        return failed();
    }

    let (t_xy, t_yx) = match kind {
        PerturbKind::Caustic => (y.back().p_l, x.back().p_l),
        _ => (y.vertex(s).p_e, x.vertex(s).p_e),
    };

    let f_x = x.radiance().luminance();
    let f_y = y.radiance().luminance();
    if t_xy * f_x <= 0.0 || f_y <= 0.0 {
        return failed();
    }

    let alpha = (f_y * t_yx) / (f_x * t_xy);
    (y, alpha.min(1.0))
}

/// Lens and multi-chain perturbation: jitters the film point and retraces
/// the eye-side chain(s), leaving the light side untouched.
#[derive(Debug, Default)]
pub struct LensMutation;

impl LensMutation {
    pub fn new() -> LensMutation {
        LensMutation
    }
}

impl<'a> Mutation<'a> for LensMutation {
    fn mutate(&self, x: &Path<'a>, rng: &mut Rng) -> (Path<'a>, f32) {
        mutate_perturbation(x, rng, false)
    }
}

/// Caustic perturbation: targets LS+DE paths by perturbing the direction out
/// of the diffuse boundary vertex and reprojecting through the camera.
#[derive(Debug, Default)]
pub struct CausticMutation;

impl CausticMutation {
    pub fn new() -> CausticMutation {
        CausticMutation
    }
}

impl<'a> Mutation<'a> for CausticMutation {
    fn mutate(&self, x: &Path<'a>, rng: &mut Rng) -> (Path<'a>, f32) {
        mutate_perturbation(x, rng, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perturb_direction_stays_close() {
        let mut rng = Rng::with_seed(51);
        let d = Vector3f::new(0.0, 0.0, 1.0);
        for _ in 0..200 {
            let p = perturb_direction(d, &mut rng);
            assert!(p.is_unit());
            // radius is bounded by THETA_MAX (to first order)
            assert!(d.dot(&p) > (2.0f32 * THETA_MAX).cos());
        }
    }
}
