use std::f32;
use std::sync::Arc;

use crate::interaction::SurfacePoint;
use crate::ray::{Ray, RAY_EPSILON};
use crate::rng::Rng;
use crate::shapes::Shape;
use crate::spectrum::Spectrum;
use crate::stats;
use crate::{Point3f, Vector3f};

/// Fraction of the scene diagonal below which an edge counts as degenerate.
const GEOMETRY_EPS_SCALE: f32 = 1e-4;

/// Selects a point on an emitter with probability proportional to the
/// emitter's average power; the density reported back is with respect to
/// surface area on the union of emitter surfaces. Point lights carry zero
/// area and are only reachable through explicit light-subpath seeding.
#[derive(Debug)]
pub struct EmitterSampler {
    emitters: Vec<Arc<dyn Shape>>,
    /// Normalized selection weights, CDF-sampled.
    weights: Vec<f32>,
    total_area: f32,
}

impl EmitterSampler {
    fn new(shapes: &[Arc<dyn Shape>]) -> EmitterSampler {
        let emitters: Vec<Arc<dyn Shape>> = shapes
            .iter()
            .filter(|s| s.material().is_emitter())
            .cloned()
            .collect();

        let mut weights: Vec<f32> = emitters
            .iter()
            .map(|s| {
                let emitter = s.material().emitter.as_ref().unwrap();
                emitter.power(s.area()).average()
            })
            .collect();
        let total_power: f32 = weights.iter().sum();
        assert!(emitters.is_empty() || total_power > 0.0);
        for w in weights.iter_mut() {
            *w /= total_power;
        }

        let total_area = emitters.iter().map(|s| s.area()).sum();

        EmitterSampler {
            emitters,
            weights,
            total_area,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    /// Sample a point on an emitter; returns the point and the emitter index.
    pub fn sample(&self, rng: &mut Rng) -> Option<(SurfacePoint, usize)> {
        if self.emitters.is_empty() {
            return None;
        }
        let index = rng.sample_cdf(&self.weights);
        Some((self.emitters[index].sample_point(rng), index))
    }

    /// Surface-area density of a sampled emitter point.
    pub fn pd(&self) -> f32 {
        if self.total_area > 0.0 {
            1.0 / self.total_area
        } else {
            1.0
        }
    }
}

pub struct Scene {
    shapes: Vec<Arc<dyn Shape>>,
    pub emitter_sampler: EmitterSampler,
    background: Spectrum,
    geometry_eps: f32,
}

impl Scene {
    pub fn new(shapes: Vec<Arc<dyn Shape>>, background: Spectrum) -> Scene {
        let emitter_sampler = EmitterSampler::new(&shapes);

        let mut lo = Point3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        let mut hi = Point3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        for s in &shapes {
            let (slo, shi) = s.bounds();
            lo = Point3f::new(lo.x.min(slo.x), lo.y.min(slo.y), lo.z.min(slo.z));
            hi = Point3f::new(hi.x.max(shi.x), hi.y.max(shi.y), hi.z.max(shi.z));
        }
        let diagonal = if shapes.is_empty() {
            0.0
        } else {
            (hi - lo).length()
        };

        Scene {
            shapes,
            emitter_sampler,
            background,
            geometry_eps: (diagonal * GEOMETRY_EPS_SCALE).max(RAY_EPSILON),
        }
    }

    /// Minimum edge length; shorter edges are declared invalid to suppress
    /// near-singular geometry terms.
    pub fn geometry_eps(&self) -> f32 {
        self.geometry_eps
    }

    /// Closest intersection, or `None` on a miss.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, SurfacePoint)> {
        stats::inc(&stats::INTERSECTION_TESTS);
        let mut closest: Option<(f32, SurfacePoint)> = None;
        let mut r = *ray;
        for shape in &self.shapes {
            if let Some((t, pt)) = shape.intersect(&r) {
                r.t_max = t;
                closest = Some((t, pt));
            }
        }
        closest
    }

    /// Shadow-ray query: is anything hit along `ray` before `max_t`?
    pub fn occluded(&self, ray: &Ray, max_t: f32) -> bool {
        stats::inc(&stats::SHADOW_TESTS);
        let r = Ray::segment(ray.o, ray.d, max_t);
        self.shapes.iter().any(|s| s.intersect(&r).is_some())
    }

    /// Mutual visibility of two surface positions, with both endpoints backed
    /// off by the ray epsilon so the query is symmetric in its arguments.
    pub fn occluded_between(&self, a: Point3f, b: Point3f) -> bool {
        let v = b - a;
        let dist = v.length();
        if dist <= 2.0 * RAY_EPSILON {
            return false;
        }
        let d = v / dist;
        let ray = Ray::segment(a + d * RAY_EPSILON, d, dist - 2.0 * RAY_EPSILON);
        self.occluded(&ray, dist - 2.0 * RAY_EPSILON)
    }

    pub fn background_radiance(&self, _dir: Vector3f) -> Spectrum {
        self.background
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::{Bsdf, DiffuseAreaEmitter, Emitter, LambertianBsdf};
    use crate::interaction::Material;
    use crate::shapes::{Quad, Sphere};

    fn matte() -> Arc<Material> {
        let bsdf: Arc<dyn Bsdf> = Arc::new(LambertianBsdf::new(Spectrum::fill(0.5)));
        Material::reflective(bsdf)
    }

    fn light() -> Arc<Material> {
        let bsdf: Arc<dyn Bsdf> = Arc::new(LambertianBsdf::new(Spectrum::fill(0.5)));
        let emitter: Arc<dyn Emitter> = Arc::new(DiffuseAreaEmitter::new(Spectrum::fill(10.0)));
        Material::emissive(bsdf, emitter)
    }

    fn test_scene() -> Scene {
        let shapes: Vec<Arc<dyn Shape>> = vec![
            Arc::new(Sphere::new(0, Point3f::new(0.0, 0.0, -5.0), 1.0, matte())),
            Arc::new(Quad::new(
                1,
                Point3f::new(-1.0, 4.0, -6.0),
                Vector3f::new(2.0, 0.0, 0.0),
                Vector3f::new(0.0, 0.0, 2.0),
                light(),
            )),
        ];
        Scene::new(shapes, Spectrum::black())
    }

    #[test]
    fn test_intersect_picks_closest() {
        let scene = test_scene();
        let ray = Ray::new(Point3f::origin(), Vector3f::new(0.0, 0.0, -1.0));
        let (t, pt) = scene.intersect(&ray).unwrap();
        assert!((t - 4.0).abs() < 1e-4);
        assert_eq!(pt.shape_id, 0);
    }

    #[test]
    fn test_emitter_sampler() {
        let scene = test_scene();
        assert_eq!(scene.emitter_sampler.len(), 1);
        let mut rng = Rng::with_seed(17);
        let (pt, index) = scene.emitter_sampler.sample(&mut rng).unwrap();
        assert_eq!(index, 0);
        assert!(pt.is_emitter());
        assert!((scene.emitter_sampler.pd() - 1.0 / 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_visibility_symmetry() {
        let scene = test_scene();
        let mut rng = Rng::with_seed(18);
        for _ in 0..50 {
            let a = Point3f::new(
                rng.uniform_range(-3.0, 3.0),
                rng.uniform_range(-3.0, 5.0),
                rng.uniform_range(-8.0, 0.0),
            );
            let b = Point3f::new(
                rng.uniform_range(-3.0, 3.0),
                rng.uniform_range(-3.0, 5.0),
                rng.uniform_range(-8.0, 0.0),
            );
            assert_eq!(
                scene.occluded_between(a, b),
                scene.occluded_between(b, a)
            );
        }
    }

    #[test]
    fn test_background() {
        let scene = Scene::new(Vec::new(), Spectrum::fill(0.25));
        let l = scene.background_radiance(Vector3f::new(0.0, 0.0, -1.0));
        assert_eq!(l, Spectrum::fill(0.25));
    }
}
