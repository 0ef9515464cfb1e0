#![recursion_limit = "128"]
// Lints
#![deny(unused_qualifications, unused_must_use)]
#![warn(rust_2018_idioms)]
// Clippy config
#![allow(
    clippy::float_cmp,
    clippy::many_single_char_names,
    clippy::excessive_precision,
    clippy::too_many_arguments
)]

use std::ops::{Add, Mul, Sub};

use num::One;

pub mod bsdf;
pub mod camera;
pub mod config;
pub mod film;
pub mod filter;
pub mod geometry;
pub mod integrator;
pub mod interaction;
pub mod path;
pub mod ray;
pub mod renderer;
pub mod rng;
pub mod sampling;
pub mod scene;
pub mod scenes;
pub mod shapes;
pub mod spectrum;
pub mod stats;
pub mod tonemap;

pub use crate::geometry::{Normal3f, Point2f, Point3f, Vector2f, Vector3f};

pub const INV_PI: f32 = 0.31830988618379067154;
pub const INV_2_PI: f32 = 0.15915494309189533577;

/// Smallest representable float strictly less than 1
pub const ONE_MINUS_EPSILON: f32 = 0.99999994f32;

/// Linear interpolation between 2 values.
///
/// This version is generic enough to linearly interpolate between 2 Spectrums
/// using an f32 parameter.
pub fn lerp<S, T>(t: S, a: T, b: T) -> T
where
    S: One,
    S: Sub<S, Output = S>,
    S: Copy,
    T: Add<T, Output = T>,
    T: Mul<S, Output = T>,
{
    let one: S = num::one();
    a * (one - t) + b * t
}

pub fn clamp<T>(val: T, low: T, high: T) -> T
where
    T: PartialOrd + Copy,
{
    if val < low {
        low
    } else if val > high {
        high
    } else {
        val
    }
}

/// Version of min() that works on `PartialOrd`, so it works for both u32 and f32.
pub fn min<T: PartialOrd + Copy>(a: T, b: T) -> T {
    if a.lt(&b) {
        a
    } else {
        b
    }
}

/// Version of max() that works on `PartialOrd`, so it works for both u32 and f32.
pub fn max<T: PartialOrd + Copy>(a: T, b: T) -> T {
    if a.gt(&b) {
        a
    } else {
        b
    }
}

/// Create an orthogonal coordinate system from a single vector.
pub fn coordinate_system(v1: &Vector3f) -> (Vector3f, Vector3f) {
    let v2 = if v1.x.abs() > v1.y.abs() {
        Vector3f::new(-v1.z, 0.0, v1.x) / (v1.x * v1.x + v1.z * v1.z).sqrt()
    } else {
        Vector3f::new(0.0, v1.z, -v1.y) / (v1.y * v1.y + v1.z * v1.z).sqrt()
    };

    let v3 = v1.cross(&v2);

    (v2, v3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.5, 0.0, 2.0), 1.0);
        assert_eq!(lerp(0.0, 3.0, 7.0), 3.0);
        assert_eq!(lerp(1.0, 3.0, 7.0), 7.0);
    }

    #[test]
    fn test_coordinate_system() {
        let v1 = Vector3f::new(0.0, 0.0, 1.0);
        let (v2, v3) = coordinate_system(&v1);
        assert!(v1.dot(&v2).abs() < 1e-6);
        assert!(v1.dot(&v3).abs() < 1e-6);
        assert!(v2.dot(&v3).abs() < 1e-6);
        assert!((v2.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5, 0, 3), 3);
        assert_eq!(clamp(-1.0, 0.0, 3.0), 0.0);
        assert_eq!(clamp(2.0, 0.0, 3.0), 2.0);
    }
}
