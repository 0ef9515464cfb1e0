use std::f32::consts::PI;

use crate::bsdf::{faceforward, Bsdf, Lobe, ScatterEvent};
use crate::interaction::SurfacePoint;
use crate::rng::Rng;
use crate::sampling::{cosine_sample_hemisphere, spherical_direction};
use crate::spectrum::Spectrum;
use crate::{clamp, coordinate_system, Point2f, Vector3f, INV_PI};

/// Modified Phong model (Lafortune & Willems): a diffuse lobe `kd` plus a
/// glossy lobe `ks` with shininess exponent `n`, kd + ks <= 1 element-wise;
/// the remaining energy is absorbed. The sampled lobe travels with the event
/// so later density queries answer about the lobe that was actually chosen.
#[derive(Debug)]
pub struct ModifiedPhongBsdf {
    kd: Spectrum,
    ks: Spectrum,
    n: f32,
    kd_avg: f32,
    ks_avg: f32,
}

impl ModifiedPhongBsdf {
    pub fn new(kd: Spectrum, ks: Spectrum, n: f32) -> ModifiedPhongBsdf {
        assert!((kd + ks).le(&Spectrum::identity()));
        assert!(n >= 0.0);
        ModifiedPhongBsdf {
            kd,
            ks,
            n,
            kd_avg: kd.average(),
            ks_avg: ks.average(),
        }
    }

    /// Orthonormal frame around the mirror direction for lobe sampling.
    fn glossy_direction(&self, pt: &SurfacePoint, wi: Vector3f, rng: &mut Rng) -> Vector3f {
        let alpha = rng.uniform_f32().powf(1.0 / (self.n + 1.0)).acos();
        let phi = 2.0 * PI * rng.uniform_f32();

        let r = wi.reflect(&pt.ns).normalize();
        let (u, v) = if pt.ng.dot(&r).abs() < 0.95 {
            let u = r.cross(&Vector3f::from(pt.ns)).normalize();
            (u, u.cross(&r))
        } else {
            coordinate_system(&r)
        };

        let w = spherical_direction(alpha.sin(), alpha.cos(), phi);
        let wo = u * w.x + v * w.y + r * w.z;

        if pt.ng.dot(&wo) * pt.ng.dot(&r) > 0.0 {
            wo.normalize()
        } else {
            // sampled onto the wrong side of the surface; fall back to the
            // mirror direction as the original model does
            r
        }
    }
}

impl Bsdf for ModifiedPhongBsdf {
    fn sample(
        &self,
        pt: &SurfacePoint,
        wi: Vector3f,
        prior: Option<&ScatterEvent>,
        rng: &mut Rng,
    ) -> ScatterEvent {
        let lobe = match prior.map(|e| e.lobe) {
            Some(Lobe::Diffuse) => Lobe::Diffuse,
            Some(Lobe::Glossy) => Lobe::Glossy,
            _ => {
                let u = rng.uniform_f32();
                if u < self.kd_avg {
                    Lobe::Diffuse
                } else if u < self.kd_avg + self.ks_avg {
                    Lobe::Glossy
                } else {
                    return ScatterEvent::absorbed();
                }
            }
        };

        match lobe {
            Lobe::Diffuse => {
                let n = faceforward(pt.ns, -wi);
                let (t, b) = coordinate_system(&Vector3f::from(n));
                let local =
                    cosine_sample_hemisphere(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
                let wo = t * local.x + b * local.y + Vector3f::from(n) * local.z;
                ScatterEvent::new(wo.normalize(), Lobe::Diffuse)
            }
            _ => ScatterEvent::new(self.glossy_direction(pt, wi, rng), Lobe::Glossy),
        }
    }

    fn pd(&self, pt: &SurfacePoint, wi: Vector3f, event: &ScatterEvent) -> f32 {
        match event.lobe {
            Lobe::Absorb => (1.0 - self.kd_avg - self.ks_avg).max(0.0),
            Lobe::Diffuse | Lobe::Glossy => {
                // either lobe can produce any front-hemisphere direction, so
                // the direction's density is the lobe-marginal one
                let cos_o = faceforward(pt.ns, -wi).dot(&event.wo);
                if cos_o <= 0.0 {
                    return 0.0;
                }
                let r = wi.reflect(&pt.ns).normalize();
                let cos_a = clamp(r.dot(&event.wo), 0.0, 1.0);
                self.kd_avg * INV_PI
                    + self.ks_avg * (self.n + 1.0) / (2.0 * PI) * cos_a.powf(self.n) / cos_o
            }
            _ => 0.0,
        }
    }

    fn evaluate(&self, pt: &SurfacePoint, wi: Vector3f, wo: Vector3f) -> Spectrum {
        if pt.ng.dot(&-wi) * pt.ng.dot(&wo) <= 0.0 {
            return Spectrum::black();
        }

        let r = wi.reflect(&pt.ns).normalize();
        let cos_a = clamp(r.dot(&wo), 0.0, 1.0);
        let glossy = (self.n + 2.0) / (2.0 * PI) * cos_a.powf(self.n);

        self.kd * INV_PI + self.ks * glossy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::Material;
    use crate::{Normal3f, Point3f};
    use std::sync::Arc;

    fn test_point(bsdf: Arc<dyn Bsdf>) -> SurfacePoint {
        SurfacePoint::new(
            Point3f::origin(),
            Normal3f::new(0.0, 0.0, 1.0),
            Point2f::new(0.0, 0.0),
            0,
            1.0,
            Material::reflective(bsdf),
        )
    }

    #[test]
    fn test_lobe_consistency() {
        let bsdf = ModifiedPhongBsdf::new(Spectrum::fill(0.4), Spectrum::fill(0.4), 20.0);
        let pt = test_point(Arc::new(ModifiedPhongBsdf::new(
            Spectrum::fill(0.4),
            Spectrum::fill(0.4),
            20.0,
        )));
        let wi = Vector3f::new(0.4, 0.0, -1.0).normalize();
        let mut rng = Rng::with_seed(21);
        let mut saw_diffuse = false;
        let mut saw_glossy = false;
        for _ in 0..500 {
            let e = bsdf.sample(&pt, wi, None, &mut rng);
            match e.lobe {
                Lobe::Diffuse => {
                    saw_diffuse = true;
                    assert!(bsdf.pd(&pt, wi, &e) > 0.0);
                }
                Lobe::Glossy => {
                    saw_glossy = true;
                    assert!(bsdf.pd(&pt, wi, &e) > 0.0);
                }
                Lobe::Absorb => {}
                _ => panic!("unexpected lobe"),
            }
        }
        assert!(saw_diffuse && saw_glossy);
    }

    #[test]
    fn test_prior_event_preserves_lobe() {
        let bsdf = ModifiedPhongBsdf::new(Spectrum::fill(0.3), Spectrum::fill(0.5), 50.0);
        let pt = test_point(Arc::new(LambertianStandin));
        let wi = Vector3f::new(0.4, 0.2, -1.0).normalize();
        let mut rng = Rng::with_seed(22);
        let prior = ScatterEvent::new(Vector3f::new(0.0, 0.0, 1.0), Lobe::Glossy);
        for _ in 0..100 {
            let e = bsdf.sample(&pt, wi, Some(&prior), &mut rng);
            assert_eq!(e.lobe, Lobe::Glossy);
        }
    }

    #[derive(Debug)]
    struct LambertianStandin;
    impl Bsdf for LambertianStandin {
        fn sample(
            &self,
            _pt: &SurfacePoint,
            _wi: Vector3f,
            _prior: Option<&ScatterEvent>,
            _rng: &mut Rng,
        ) -> ScatterEvent {
            ScatterEvent::absorbed()
        }
        fn pd(&self, _pt: &SurfacePoint, _wi: Vector3f, _event: &ScatterEvent) -> f32 {
            0.0
        }
        fn evaluate(&self, _pt: &SurfacePoint, _wi: Vector3f, _wo: Vector3f) -> Spectrum {
            Spectrum::black()
        }
    }
}
