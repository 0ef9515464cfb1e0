//! Pinhole camera: the mapping between film-space and world-space, plus the
//! sensor handle eye subpaths are seeded from.
//!
//! Film-space is normalized device coordinates: (x, y) in [0,1]^2 with (0,0)
//! the upper-left corner of the image and (1,1) the lower-right.

use std::sync::Arc;

use crate::bsdf::{Bsdf, LambertianBsdf, Lobe, ScatterEvent};
use crate::interaction::{Material, SurfacePoint};
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::{Normal3f, Point2f, Point3f, Vector3f};

/// Shape id reserved for camera film points.
pub const CAMERA_SHAPE_ID: u32 = u32::MAX;

/// The camera's sensor as a BSDF-shaped handle, so the eye end of a path is
/// sampled and queried through the same protocol as every other vertex. The
/// film point a sensor vertex was created for determines its ray direction,
/// which the camera caches in the surface point's normal.
///
/// The emitted importance We is pixel-matched: a direction contributes only
/// when it projects into the same pixel the sensor vertex was created for,
/// because the render controller splats each sample at that film position.
#[derive(Debug)]
pub struct PinholeSensor {
    forward: Vector3f,
    right: Vector3f,
    up: Vector3f,
    half_w: f32,
    half_h: f32,
    width: u32,
    height: u32,
    /// World-space film plane area at unit distance along `forward`.
    film_area: f32,
}

impl PinholeSensor {
    /// Emitted importance independent of direction.
    pub fn we0(&self) -> Spectrum {
        Spectrum::identity()
    }

    /// Film-plane NDC a direction projects to; `None` outside the frustum.
    fn ndc_of(&self, d: Vector3f) -> Option<Point2f> {
        let z = d.dot(&self.forward);
        if z <= 0.0 {
            return None;
        }
        let x = d.dot(&self.right) / z / self.half_w;
        let y = d.dot(&self.up) / z / self.half_h;
        let ndc = Point2f::new((x + 1.0) / 2.0, (1.0 - y) / 2.0);
        if (0.0..=1.0).contains(&ndc.x) && (0.0..=1.0).contains(&ndc.y) {
            Some(ndc)
        } else {
            None
        }
    }

    /// Projected-solid-angle density of the primary direction through a film
    /// point sampled uniformly over the plane.
    fn density(&self, pt: &SurfacePoint, wo: Vector3f) -> f32 {
        if self.ndc_of(wo).is_none() {
            return 0.0;
        }
        let cos_axis = self.forward.dot(&wo);
        let cos_n = pt.ng.dot(&wo).abs().max(1e-6);
        // film-plane jacobian through the perspective projection, converted
        // to the projected-solid-angle measure at this vertex
        1.0 / (self.film_area * cos_axis.powi(3) * cos_n)
    }

    fn same_pixel(&self, a: Point2f, b: Point2f) -> bool {
        let ax = (a.x * self.width as f32) as i64;
        let ay = (a.y * self.height as f32) as i64;
        let bx = (b.x * self.width as f32) as i64;
        let by = (b.y * self.height as f32) as i64;
        ax == bx && ay == by
    }
}

impl Bsdf for PinholeSensor {
    fn sample(
        &self,
        pt: &SurfacePoint,
        _wi: Vector3f,
        _prior: Option<&ScatterEvent>,
        _rng: &mut Rng,
    ) -> ScatterEvent {
        // the primary ray direction for this film point is the point's normal
        ScatterEvent::new(Vector3f::from(pt.ns), Lobe::Sense)
    }

    fn pd(&self, pt: &SurfacePoint, _wi: Vector3f, event: &ScatterEvent) -> f32 {
        self.density(pt, event.wo)
    }

    fn evaluate(&self, pt: &SurfacePoint, _wi: Vector3f, wo: Vector3f) -> Spectrum {
        // the importance of a direction that lands in this vertex's pixel is
        // the sampling density itself, so the primary-direction estimator is
        // exactly the arriving radiance
        match self.ndc_of(wo) {
            Some(ndc) if self.same_pixel(ndc, pt.uv) => Spectrum::fill(self.density(pt, wo)),
            _ => Spectrum::black(),
        }
    }
}

#[derive(Debug)]
pub struct PinholeCamera {
    eye: Point3f,
    forward: Vector3f,
    right: Vector3f,
    up: Vector3f,
    /// Film plane half-extents at unit distance.
    half_w: f32,
    half_h: f32,
    width: u32,
    height: u32,
    sensor: Arc<PinholeSensor>,
    /// Placeholder reflectance for camera film points; a sensor vertex never
    /// scatters off it, but every surface point carries a material.
    material: Arc<Material>,
}

impl PinholeCamera {
    pub fn new(
        eye: Point3f,
        look_at: Point3f,
        up_hint: Vector3f,
        fov_y_degrees: f32,
        width: u32,
        height: u32,
    ) -> PinholeCamera {
        assert!(width > 0 && height > 0);
        let forward = (look_at - eye).normalize();
        let right = forward.cross(&up_hint).normalize();
        let up = right.cross(&forward);

        let half_h = (fov_y_degrees.to_radians() / 2.0).tan();
        let half_w = half_h * width as f32 / height as f32;

        let sensor = Arc::new(PinholeSensor {
            forward,
            right,
            up,
            half_w,
            half_h,
            width,
            height,
            film_area: 4.0 * half_w * half_h,
        });
        let material = Material::reflective(Arc::new(LambertianBsdf::new(Spectrum::fill(0.5))));

        PinholeCamera {
            eye,
            forward,
            right,
            up,
            half_w,
            half_h,
            width,
            height,
            sensor,
            material,
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Area density of a uniformly sampled film point, in film units.
    pub fn film_pa(&self) -> f32 {
        1.0 / (self.width as f32 * self.height as f32)
    }

    pub fn ray_direction(&self, ndc: Point2f) -> Vector3f {
        let x = (2.0 * ndc.x - 1.0) * self.half_w;
        let y = (1.0 - 2.0 * ndc.y) * self.half_h;
        (self.forward + self.right * x + self.up * y).normalize()
    }

    /// Build the sensor surface point for a film-plane position.
    pub fn point_on_film(&self, ndc: Point2f) -> SurfacePoint {
        let d = self.ray_direction(ndc);
        let mut pt = SurfacePoint::new(
            self.eye,
            Normal3f::from(d),
            ndc,
            CAMERA_SHAPE_ID,
            0.0,
            Arc::clone(&self.material),
        );
        pt.sensor = Some(Arc::clone(&self.sensor));
        pt
    }

    /// Project a world-space point back onto the film plane. Returns `None`
    /// for points behind the camera.
    pub fn project(&self, p: &Point3f) -> Option<Point2f> {
        let v = *p - self.eye;
        let z = v.dot(&self.forward);
        if z <= 0.0 {
            return None;
        }
        let x = v.dot(&self.right) / z;
        let y = v.dot(&self.up) / z;

        Some(Point2f::new(
            (x / self.half_w + 1.0) / 2.0,
            (1.0 - y / self.half_h) / 2.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PinholeCamera {
        PinholeCamera::new(
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.0, 0.0, -1.0),
            Vector3f::new(0.0, 1.0, 0.0),
            60.0,
            64,
            64,
        )
    }

    #[test]
    fn test_center_ray_is_forward() {
        let cam = camera();
        let d = cam.ray_direction(Point2f::new(0.5, 0.5));
        assert!((d - Vector3f::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_project_round_trip() {
        let cam = camera();
        for &(x, y) in &[(0.5, 0.5), (0.25, 0.75), (0.9, 0.1)] {
            let ndc = Point2f::new(x, y);
            let d = cam.ray_direction(ndc);
            let p = Point3f::origin() + d * 3.0;
            let back = cam.project(&p).unwrap();
            approx::assert_abs_diff_eq!(back.x, ndc.x, epsilon = 1e-4);
            approx::assert_abs_diff_eq!(back.y, ndc.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_project_behind_camera() {
        let cam = camera();
        assert!(cam.project(&Point3f::new(0.0, 0.0, 5.0)).is_none());
    }

    #[test]
    fn test_film_point_normal_matches_ray() {
        let cam = camera();
        let ndc = Point2f::new(0.3, 0.6);
        let pt = cam.point_on_film(ndc);
        let d = cam.ray_direction(ndc);
        assert!((Vector3f::from(pt.ng) - d).length() < 1e-6);
        assert!(pt.is_sensor());
        assert_eq!(pt.shape_area, 0.0);
    }
}
