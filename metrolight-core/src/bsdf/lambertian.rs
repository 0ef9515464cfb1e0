use crate::bsdf::{faceforward, Bsdf, Lobe, ScatterEvent};
use crate::interaction::SurfacePoint;
use crate::rng::Rng;
use crate::sampling::cosine_sample_hemisphere;
use crate::spectrum::Spectrum;
use crate::{coordinate_system, Point2f, Vector3f, INV_PI};

/// Ideal diffuse reflector with albedo `kd`. The average albedo doubles as
/// the probability of scattering at all; the remainder is absorbed.
#[derive(Debug)]
pub struct LambertianBsdf {
    kd: Spectrum,
    kd_avg: f32,
}

impl LambertianBsdf {
    pub fn new(kd: Spectrum) -> LambertianBsdf {
        let kd_avg = kd.average();
        assert!(kd_avg > 0.0 && kd.max_value() <= 1.0);
        LambertianBsdf { kd, kd_avg }
    }
}

impl Bsdf for LambertianBsdf {
    fn sample(
        &self,
        pt: &SurfacePoint,
        wi: Vector3f,
        prior: Option<&ScatterEvent>,
        rng: &mut Rng,
    ) -> ScatterEvent {
        let forced_diffuse = prior.map_or(false, |e| e.lobe == Lobe::Diffuse);
        if !forced_diffuse && rng.uniform_f32() >= self.kd_avg {
            return ScatterEvent::absorbed();
        }

        // cosine-sample the hemisphere on the incoming side
        let n = faceforward(pt.ns, -wi);
        let (t, b) = coordinate_system(&Vector3f::from(n));
        let local = cosine_sample_hemisphere(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
        let wo = t * local.x + b * local.y + Vector3f::from(n) * local.z;

        ScatterEvent::new(wo.normalize(), Lobe::Diffuse)
    }

    fn pd(&self, pt: &SurfacePoint, wi: Vector3f, event: &ScatterEvent) -> f32 {
        match event.lobe {
            Lobe::Absorb => 1.0 - self.kd_avg,
            Lobe::Diffuse => {
                let n = faceforward(pt.ns, -wi);
                if n.dot(&event.wo) <= 0.0 {
                    0.0
                } else {
                    // cosine-weighted density is cos/pi w.r.t. solid angle,
                    // a constant w.r.t. projected solid angle
                    self.kd_avg * INV_PI
                }
            }
            _ => 0.0,
        }
    }

    fn evaluate(&self, pt: &SurfacePoint, wi: Vector3f, wo: Vector3f) -> Spectrum {
        // reflection only: wi and wo on the same side
        if pt.ng.dot(&-wi) * pt.ng.dot(&wo) <= 0.0 {
            return Spectrum::black();
        }
        self.kd * INV_PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::Material;
    use crate::{Normal3f, Point3f};
    use std::sync::Arc;

    fn test_point() -> SurfacePoint {
        let bsdf: Arc<dyn Bsdf> = Arc::new(LambertianBsdf::new(Spectrum::fill(0.8)));
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
    fn test_sampled_events_have_positive_density() {
        let bsdf = LambertianBsdf::new(Spectrum::fill(0.8));
        let pt = test_point();
        let wi = Vector3f::new(0.3, 0.1, -1.0).normalize();
        let mut rng = Rng::with_seed(11);
        for _ in 0..200 {
            let e = bsdf.sample(&pt, wi, None, &mut rng);
            if e.is_absorbed() {
                assert!((bsdf.pd(&pt, wi, &e) - 0.2).abs() < 1e-6);
            } else {
                assert!(bsdf.pd(&pt, wi, &e) > 0.0);
                assert!(!bsdf.evaluate(&pt, wi, e.wo).is_zero());
            }
        }
    }

    #[test]
    fn test_evaluate_opposite_side_is_black() {
        let bsdf = LambertianBsdf::new(Spectrum::fill(0.8));
        let pt = test_point();
        let wi = Vector3f::new(0.0, 0.0, -1.0);
        let below = Vector3f::new(0.1, 0.0, -1.0).normalize();
        assert!(bsdf.evaluate(&pt, wi, below).is_zero());
    }
}
