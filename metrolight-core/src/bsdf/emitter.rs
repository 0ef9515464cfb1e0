use std::f32::consts::PI;

use crate::bsdf::{Bsdf, Lobe, ScatterEvent};
use crate::interaction::SurfacePoint;
use crate::rng::Rng;
use crate::sampling::{cosine_sample_hemisphere, uniform_sample_sphere};
use crate::spectrum::Spectrum;
use crate::{coordinate_system, Point2f, Vector3f, INV_PI};

/// An emitter doubles as a BSDF so the first vertex of a light subpath can be
/// sampled and queried through the same protocol as interior vertices.
pub trait Emitter: Bsdf {
    /// Emitted radiance independent of direction.
    fn le0(&self) -> Spectrum;

    /// Emitted radiance leaving in direction `wo`.
    fn le(&self, pt: &SurfacePoint, wo: Vector3f) -> Spectrum;

    /// Total emitted power for an owning shape of the given surface area.
    fn power(&self, area: f32) -> Spectrum;

    fn as_bsdf(&self) -> &dyn Bsdf;
}

/// Lambertian area emitter: constant radiance over the front hemisphere.
#[derive(Debug)]
pub struct DiffuseAreaEmitter {
    radiance: Spectrum,
}

impl DiffuseAreaEmitter {
    pub fn new(radiance: Spectrum) -> DiffuseAreaEmitter {
        DiffuseAreaEmitter { radiance }
    }
}

impl Bsdf for DiffuseAreaEmitter {
    fn sample(
        &self,
        pt: &SurfacePoint,
        _wi: Vector3f,
        _prior: Option<&ScatterEvent>,
        rng: &mut Rng,
    ) -> ScatterEvent {
        let n = Vector3f::from(pt.ns);
        let (t, b) = coordinate_system(&n);
        let local = cosine_sample_hemisphere(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
        let wo = t * local.x + b * local.y + n * local.z;
        ScatterEvent::new(wo.normalize(), Lobe::Emit)
    }

    fn pd(&self, pt: &SurfacePoint, _wi: Vector3f, event: &ScatterEvent) -> f32 {
        if pt.ns.dot(&event.wo) <= 0.0 {
            0.0
        } else {
            // cosine-weighted emission, constant in projected solid angle
            INV_PI
        }
    }

    fn evaluate(&self, pt: &SurfacePoint, _wi: Vector3f, wo: Vector3f) -> Spectrum {
        // directional modulation of Le0; uniform over the front hemisphere
        if pt.ns.dot(&wo) > 0.0 {
            Spectrum::identity()
        } else {
            Spectrum::black()
        }
    }
}

impl Emitter for DiffuseAreaEmitter {
    fn le0(&self) -> Spectrum {
        self.radiance
    }

    fn le(&self, pt: &SurfacePoint, wo: Vector3f) -> Spectrum {
        if pt.ns.dot(&wo) > 0.0 {
            self.radiance
        } else {
            Spectrum::black()
        }
    }

    fn power(&self, area: f32) -> Spectrum {
        self.radiance * PI * area
    }

    fn as_bsdf(&self) -> &dyn Bsdf {
        self
    }
}

/// Isotropic point emitter with the given radiant intensity. Point lights
/// have zero surface area: they can seed light subpaths but can never be hit
/// by a random walk, so the s = 0 strategies report zero for them.
#[derive(Debug)]
pub struct PointEmitter {
    intensity: Spectrum,
}

impl PointEmitter {
    pub fn new(intensity: Spectrum) -> PointEmitter {
        PointEmitter { intensity }
    }
}

impl Bsdf for PointEmitter {
    fn sample(
        &self,
        _pt: &SurfacePoint,
        _wi: Vector3f,
        _prior: Option<&ScatterEvent>,
        rng: &mut Rng,
    ) -> ScatterEvent {
        let wo = uniform_sample_sphere(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
        ScatterEvent::new(wo, Lobe::Emit)
    }

    fn pd(&self, _pt: &SurfacePoint, _wi: Vector3f, _event: &ScatterEvent) -> f32 {
        // the vertex normal is aligned with the outgoing direction, so the
        // projected-solid-angle density equals the solid-angle one
        1.0 / (4.0 * PI)
    }

    fn evaluate(&self, _pt: &SurfacePoint, _wi: Vector3f, _wo: Vector3f) -> Spectrum {
        Spectrum::identity()
    }
}

impl Emitter for PointEmitter {
    fn le0(&self) -> Spectrum {
        self.intensity
    }

    fn le(&self, _pt: &SurfacePoint, _wo: Vector3f) -> Spectrum {
        self.intensity
    }

    fn power(&self, _area: f32) -> Spectrum {
        self.intensity * (4.0 * PI)
    }

    fn as_bsdf(&self) -> &dyn Bsdf {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::Material;
    use crate::bsdf::LambertianBsdf;
    use crate::{Normal3f, Point3f};
    use std::sync::Arc;

    fn emissive_point() -> SurfacePoint {
        let bsdf: Arc<dyn Bsdf> = Arc::new(LambertianBsdf::new(Spectrum::fill(0.5)));
        let emitter: Arc<dyn Emitter> = Arc::new(DiffuseAreaEmitter::new(Spectrum::fill(10.0)));
        SurfacePoint::new(
            Point3f::origin(),
            Normal3f::new(0.0, 0.0, 1.0),
            Point2f::new(0.0, 0.0),
            0,
            2.0,
            Material::emissive(bsdf, emitter),
        )
    }

    #[test]
    fn test_area_emitter_hemisphere() {
        let e = DiffuseAreaEmitter::new(Spectrum::fill(10.0));
        let pt = emissive_point();
        let mut rng = Rng::with_seed(41);
        for _ in 0..100 {
            let ev = e.sample(&pt, Vector3f::zero(), None, &mut rng);
            assert!(pt.ns.dot(&ev.wo) > 0.0);
            assert!(e.pd(&pt, Vector3f::zero(), &ev) > 0.0);
        }
        let below = Vector3f::new(0.0, 0.0, -1.0);
        assert!(e.le(&pt, below).is_zero());
    }

    #[test]
    fn test_area_emitter_power() {
        let e = DiffuseAreaEmitter::new(Spectrum::fill(10.0));
        let p = e.power(2.0);
        assert!((p.average() - 10.0 * PI * 2.0).abs() < 1e-3);
    }
}
