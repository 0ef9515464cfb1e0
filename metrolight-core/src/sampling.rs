use std::f32::consts;

use crate::{Point2f, Vector3f};

const FRAC_PI_4: f32 = consts::FRAC_PI_2 / 2.0;

pub fn uniform_sample_sphere(u: Point2f) -> Vector3f {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * consts::PI * u.y;

    Vector3f::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn cosine_sample_hemisphere(u: Point2f) -> Vector3f {
    let d = concentric_sample_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vector3f::new(d.x, d.y, z)
}

pub fn concentric_sample_disk(u: Point2f) -> Point2f {
    // Map uniform random numbers to `[-1, 1]^2`
    let u_offset = Point2f::new(2.0 * u.x - 1.0, 2.0 * u.y - 1.0);

    // Handle degeneracy at the origin
    if u_offset.x == 0.0 && u_offset.y == 0.0 {
        return Point2f::new(0.0, 0.0);
    }

    // Apply concentric mapping to point
    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, FRAC_PI_4 * (u_offset.y / u_offset.x))
    } else {
        (
            u_offset.y,
            consts::FRAC_PI_2 - FRAC_PI_4 * (u_offset.x / u_offset.y),
        )
    };
    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn uniform_sample_triangle(u: Point2f) -> Point2f {
    let su0 = u.x.sqrt();
    Point2f::new(1.0 - su0, u.y * su0)
}

/// Spherical direction from polar angle theta (from +z) and azimuth phi.
pub fn spherical_direction(sin_theta: f32, cos_theta: f32, phi: f32) -> Vector3f {
    Vector3f::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Rng;

    #[test]
    fn test_uniform_sphere_is_unit() {
        let mut rng = Rng::with_seed(7);
        for _ in 0..100 {
            let d = uniform_sample_sphere(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
            assert!(d.is_unit());
        }
    }

    #[test]
    fn test_cosine_hemisphere_is_upper() {
        let mut rng = Rng::with_seed(8);
        for _ in 0..100 {
            let d = cosine_sample_hemisphere(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
            assert!(d.z >= 0.0);
            assert!(d.is_unit());
        }
    }

    #[test]
    fn test_uniform_triangle_barycentric() {
        let mut rng = Rng::with_seed(9);
        for _ in 0..100 {
            let b = uniform_sample_triangle(Point2f::new(rng.uniform_f32(), rng.uniform_f32()));
            assert!(b.x >= 0.0 && b.y >= 0.0 && b.x + b.y <= 1.0 + 1e-6);
        }
    }
}
