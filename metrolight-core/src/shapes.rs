//! Minimal shape primitives. Ray-intersection kernels and acceleration
//! structures are external collaborators; these cover what the demo scenes
//! and the test suite need.

use std::fmt::Debug;
use std::sync::Arc;

use crate::interaction::{Material, SurfacePoint};
use crate::ray::Ray;
use crate::rng::Rng;
use crate::sampling::uniform_sample_triangle;
use crate::{Normal3f, Point2f, Point3f, Vector3f};

const INTERSECT_EPSILON: f32 = 1e-5;

pub trait Shape: Debug + Send + Sync {
    fn id(&self) -> u32;

    fn material(&self) -> &Arc<Material>;

    /// Closest hit along `ray` within `(INTERSECT_EPSILON, ray.t_max)`.
    fn intersect(&self, ray: &Ray) -> Option<(f32, SurfacePoint)>;

    fn area(&self) -> f32;

    /// Uniform point on the surface.
    fn sample_point(&self, rng: &mut Rng) -> SurfacePoint;

    /// Axis-aligned bounds as (min, max).
    fn bounds(&self) -> (Point3f, Point3f);
}

#[derive(Debug)]
pub struct Sphere {
    id: u32,
    center: Point3f,
    radius: f32,
    material: Arc<Material>,
}

impl Sphere {
    pub fn new(id: u32, center: Point3f, radius: f32, material: Arc<Material>) -> Sphere {
        assert!(radius > 0.0);
        Sphere {
            id,
            center,
            radius,
            material,
        }
    }

    fn point_at(&self, p: Point3f) -> SurfacePoint {
        let n = Normal3f::from((p - self.center).normalize());
        let uv = Point2f::new(
            0.5 + n.x.atan2(n.z) / (2.0 * std::f32::consts::PI),
            0.5 - n.y.asin() / std::f32::consts::PI,
        );
        SurfacePoint::new(p, n, uv, self.id, self.area(), Arc::clone(&self.material))
    }
}

impl Shape for Sphere {
    fn id(&self) -> u32 {
        self.id
    }

    fn material(&self) -> &Arc<Material> {
        &self.material
    }

    fn intersect(&self, ray: &Ray) -> Option<(f32, SurfacePoint)> {
        let oc = ray.o - self.center;
        let b = oc.dot(&ray.d);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();

        let mut t = -b - sqrt_disc;
        if t <= INTERSECT_EPSILON {
            t = -b + sqrt_disc;
        }
        if t <= INTERSECT_EPSILON || t >= ray.t_max {
            return None;
        }

        // reproject onto the sphere to cut down on float drift
        let p = ray.at(t);
        let p = self.center + (p - self.center).normalize() * self.radius;
        Some((t, self.point_at(p)))
    }

    fn area(&self) -> f32 {
        4.0 * std::f32::consts::PI * self.radius * self.radius
    }

    fn sample_point(&self, rng: &mut Rng) -> SurfacePoint {
        let d = crate::sampling::uniform_sample_sphere(Point2f::new(
            rng.uniform_f32(),
            rng.uniform_f32(),
        ));
        self.point_at(self.center + d * self.radius)
    }

    fn bounds(&self) -> (Point3f, Point3f) {
        let r = Vector3f::new(self.radius, self.radius, self.radius);
        (self.center - r, self.center + r)
    }
}

/// Parallelogram given by a corner and two edge vectors.
#[derive(Debug)]
pub struct Quad {
    id: u32,
    corner: Point3f,
    e1: Vector3f,
    e2: Vector3f,
    normal: Normal3f,
    area: f32,
    material: Arc<Material>,
}

impl Quad {
    pub fn new(
        id: u32,
        corner: Point3f,
        e1: Vector3f,
        e2: Vector3f,
        material: Arc<Material>,
    ) -> Quad {
        let cross = e1.cross(&e2);
        let area = cross.length();
        assert!(area > 0.0);
        Quad {
            id,
            corner,
            e1,
            e2,
            normal: Normal3f::from(cross / area),
            area,
            material,
        }
    }

    fn point_at(&self, u: f32, v: f32) -> SurfacePoint {
        let p = self.corner + self.e1 * u + self.e2 * v;
        SurfacePoint::new(
            p,
            self.normal,
            Point2f::new(u, v),
            self.id,
            self.area,
            Arc::clone(&self.material),
        )
    }
}

impl Shape for Quad {
    fn id(&self) -> u32 {
        self.id
    }

    fn material(&self) -> &Arc<Material> {
        &self.material
    }

    fn intersect(&self, ray: &Ray) -> Option<(f32, SurfacePoint)> {
        let denom = self.normal.dot(&ray.d);
        if denom.abs() < 1e-9 {
            return None;
        }
        let t = self.normal.dot(&(self.corner - ray.o)) / denom;
        if t <= INTERSECT_EPSILON || t >= ray.t_max {
            return None;
        }

        let rel = ray.at(t) - self.corner;
        let e1_len2 = self.e1.length_squared();
        let e2_len2 = self.e2.length_squared();
        // assumes near-orthogonal edges, which holds for the demo scenes
        let u = rel.dot(&self.e1) / e1_len2;
        let v = rel.dot(&self.e2) / e2_len2;
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }

        Some((t, self.point_at(u, v)))
    }

    fn area(&self) -> f32 {
        self.area
    }

    fn sample_point(&self, rng: &mut Rng) -> SurfacePoint {
        self.point_at(rng.uniform_f32(), rng.uniform_f32())
    }

    fn bounds(&self) -> (Point3f, Point3f) {
        let corners = [
            self.corner,
            self.corner + self.e1,
            self.corner + self.e2,
            self.corner + self.e1 + self.e2,
        ];
        bounds_of(&corners)
    }
}

#[derive(Debug)]
pub struct Triangle {
    id: u32,
    a: Point3f,
    b: Point3f,
    c: Point3f,
    normal: Normal3f,
    area: f32,
    material: Arc<Material>,
}

impl Triangle {
    pub fn new(id: u32, a: Point3f, b: Point3f, c: Point3f, material: Arc<Material>) -> Triangle {
        let cross = (b - a).cross(&(c - a));
        let double_area = cross.length();
        assert!(double_area > 0.0);
        Triangle {
            id,
            a,
            b,
            c,
            normal: Normal3f::from(cross / double_area),
            area: double_area / 2.0,
            material,
        }
    }

    fn point_at(&self, b0: f32, b1: f32) -> SurfacePoint {
        let p = self.a + (self.b - self.a) * b0 + (self.c - self.a) * b1;
        SurfacePoint::new(
            p,
            self.normal,
            Point2f::new(b0, b1),
            self.id,
            self.area,
            Arc::clone(&self.material),
        )
    }
}

impl Shape for Triangle {
    fn id(&self) -> u32 {
        self.id
    }

    fn material(&self) -> &Arc<Material> {
        &self.material
    }

    fn intersect(&self, ray: &Ray) -> Option<(f32, SurfacePoint)> {
        // Moeller-Trumbore
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let pvec = ray.d.cross(&e2);
        let det = e1.dot(&pvec);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = ray.o - self.a;
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = tvec.cross(&e1);
        let v = ray.d.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(&qvec) * inv_det;
        if t <= INTERSECT_EPSILON || t >= ray.t_max {
            return None;
        }

        Some((t, self.point_at(u, v)))
    }

    fn area(&self) -> f32 {
        self.area
    }

    fn sample_point(&self, rng: &mut Rng) -> SurfacePoint {
        let b = uniform_sample_triangle(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
        self.point_at(b.x, b.y)
    }

    fn bounds(&self) -> (Point3f, Point3f) {
        bounds_of(&[self.a, self.b, self.c])
    }
}

/// Zero-area stand-in shape for point lights. It can never be hit by a ray;
/// light subpaths seeded on it leave through the emitter's sphere sampling.
#[derive(Debug)]
pub struct PointShape {
    id: u32,
    p: Point3f,
    material: Arc<Material>,
}

impl PointShape {
    pub fn new(id: u32, p: Point3f, material: Arc<Material>) -> PointShape {
        assert!(material.is_emitter());
        PointShape { id, p, material }
    }
}

impl Shape for PointShape {
    fn id(&self) -> u32 {
        self.id
    }

    fn material(&self) -> &Arc<Material> {
        &self.material
    }

    fn intersect(&self, _ray: &Ray) -> Option<(f32, SurfacePoint)> {
        None
    }

    fn area(&self) -> f32 {
        0.0
    }

    fn sample_point(&self, _rng: &mut Rng) -> SurfacePoint {
        // the normal is provisional; the path core aligns it with the first
        // sampled emission direction
        SurfacePoint::new(
            self.p,
            Normal3f::new(0.0, 0.0, 1.0),
            Point2f::new(0.0, 0.0),
            self.id,
            0.0,
            Arc::clone(&self.material),
        )
    }

    fn bounds(&self) -> (Point3f, Point3f) {
        (self.p, self.p)
    }
}

fn bounds_of(points: &[Point3f]) -> (Point3f, Point3f) {
    let mut lo = points[0];
    let mut hi = points[0];
    for p in &points[1..] {
        lo = Point3f::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z));
        hi = Point3f::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z));
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::{Bsdf, LambertianBsdf};
    use crate::spectrum::Spectrum;

    fn matte() -> Arc<Material> {
        let bsdf: Arc<dyn Bsdf> = Arc::new(LambertianBsdf::new(Spectrum::fill(0.5)));
        Material::reflective(bsdf)
    }

    #[test]
    fn test_sphere_intersect() {
        let s = Sphere::new(1, Point3f::new(0.0, 0.0, -5.0), 1.0, matte());
        let ray = Ray::new(Point3f::origin(), Vector3f::new(0.0, 0.0, -1.0));
        let (t, pt) = s.intersect(&ray).unwrap();
        assert!((t - 4.0).abs() < 1e-4);
        assert!((Vector3f::from(pt.ng) - Vector3f::new(0.0, 0.0, 1.0)).length() < 1e-4);

        let miss = Ray::new(Point3f::origin(), Vector3f::new(0.0, 1.0, 0.0));
        assert!(s.intersect(&miss).is_none());
    }

    #[test]
    fn test_quad_intersect() {
        let q = Quad::new(
            2,
            Point3f::new(-1.0, -1.0, -3.0),
            Vector3f::new(2.0, 0.0, 0.0),
            Vector3f::new(0.0, 2.0, 0.0),
            matte(),
        );
        let ray = Ray::new(Point3f::origin(), Vector3f::new(0.0, 0.0, -1.0));
        let (t, pt) = q.intersect(&ray).unwrap();
        assert!((t - 3.0).abs() < 1e-4);
        assert!((pt.uv.x - 0.5).abs() < 1e-4 && (pt.uv.y - 0.5).abs() < 1e-4);
        assert_eq!(q.area(), 4.0);

        let outside = Ray::new(
            Point3f::new(5.0, 0.0, 0.0),
            Vector3f::new(0.0, 0.0, -1.0),
        );
        assert!(q.intersect(&outside).is_none());
    }

    #[test]
    fn test_triangle_intersect() {
        let tri = Triangle::new(
            3,
            Point3f::new(-1.0, -1.0, -2.0),
            Point3f::new(1.0, -1.0, -2.0),
            Point3f::new(0.0, 1.0, -2.0),
            matte(),
        );
        let ray = Ray::new(Point3f::origin(), Vector3f::new(0.0, 0.0, -1.0));
        assert!(tri.intersect(&ray).is_some());
        assert!((tri.area() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_sample_point_on_surface() {
        let mut rng = Rng::with_seed(5);
        let s = Sphere::new(4, Point3f::new(1.0, 2.0, 3.0), 2.0, matte());
        for _ in 0..50 {
            let pt = s.sample_point(&mut rng);
            assert!((pt.p.distance(&Point3f::new(1.0, 2.0, 3.0)) - 2.0).abs() < 1e-4);
        }
    }
}
