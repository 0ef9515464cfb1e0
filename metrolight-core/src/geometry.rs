//! Minimal f32 vector/point/normal types used throughout the path core.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Index, Mul, Neg, Sub};

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3f {
    pub fn new(x: f32, y: f32, z: f32) -> Vector3f {
        Vector3f { x, y, z }
    }

    pub fn zero() -> Vector3f {
        Vector3f::new(0.0, 0.0, 0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn dot(&self, rhs: &Vector3f) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn dotn(&self, rhs: &Normal3f) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(&self, rhs: &Vector3f) -> Vector3f {
        Vector3f::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn normalize(&self) -> Vector3f {
        let l = self.length();
        debug_assert!(l > 0.0);
        *self / l
    }

    pub fn is_unit(&self) -> bool {
        (self.length_squared() - 1.0).abs() < 1e-4
    }

    pub fn abs(&self) -> Vector3f {
        Vector3f::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    /// Mirror reflection of this direction about the given normal. `self` is
    /// a propagation direction (pointing into the surface).
    pub fn reflect(&self, n: &Normal3f) -> Vector3f {
        let nv = Vector3f::from(*n);
        *self - nv * (2.0 * self.dotn(n))
    }

    /// Refracted direction of this propagation direction through an interface
    /// with indices of refraction eta1 (front) / eta2 (back). Returns the zero
    /// vector on total internal reflection.
    pub fn refract(&self, n: &Normal3f, eta1: f32, eta2: f32) -> Vector3f {
        let mut nv = Vector3f::from(*n);
        let mut cos_i = -self.dotn(n);
        let (ei, et) = if cos_i < 0.0 {
            // incident from the back side
            nv = -nv;
            cos_i = -cos_i;
            (eta2, eta1)
        } else {
            (eta1, eta2)
        };

        let eta = ei / et;
        let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
        if sin2_t >= 1.0 {
            return Vector3f::zero();
        }
        let cos_t = (1.0 - sin2_t).sqrt();

        *self * eta + nv * (eta * cos_i - cos_t)
    }
}

impl Add<Vector3f> for Vector3f {
    type Output = Vector3f;
    fn add(self, rhs: Vector3f) -> Vector3f {
        Vector3f::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<Vector3f> for Vector3f {
    type Output = Vector3f;
    fn sub(self, rhs: Vector3f) -> Vector3f {
        Vector3f::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3f {
    type Output = Vector3f;
    fn mul(self, rhs: f32) -> Vector3f {
        Vector3f::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vector3f> for f32 {
    type Output = Vector3f;
    fn mul(self, rhs: Vector3f) -> Vector3f {
        rhs * self
    }
}

impl Div<f32> for Vector3f {
    type Output = Vector3f;
    fn div(self, rhs: f32) -> Vector3f {
        Vector3f::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vector3f {
    type Output = Vector3f;
    fn neg(self) -> Vector3f {
        Vector3f::new(-self.x, -self.y, -self.z)
    }
}

impl Index<usize> for Vector3f {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Invalid index into Vector3f"),
        }
    }
}

impl fmt::Display for Vector3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {}, {}, {} ]", self.x, self.y, self.z)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3f {
    pub fn new(x: f32, y: f32, z: f32) -> Point3f {
        Point3f { x, y, z }
    }

    pub fn origin() -> Point3f {
        Point3f::new(0.0, 0.0, 0.0)
    }

    pub fn distance(&self, rhs: &Point3f) -> f32 {
        (*self - *rhs).length()
    }
}

impl Add<Vector3f> for Point3f {
    type Output = Point3f;
    fn add(self, rhs: Vector3f) -> Point3f {
        Point3f::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<Point3f> for Point3f {
    type Output = Vector3f;
    fn sub(self, rhs: Point3f) -> Vector3f {
        Vector3f::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub<Vector3f> for Point3f {
    type Output = Point3f;
    fn sub(self, rhs: Vector3f) -> Point3f {
        Point3f::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Point3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {}, {}, {} )", self.x, self.y, self.z)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Normal3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Normal3f {
    pub fn new(x: f32, y: f32, z: f32) -> Normal3f {
        Normal3f { x, y, z }
    }

    pub fn dot(&self, rhs: &Vector3f) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn dotn(&self, rhs: &Normal3f) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn normalize(&self) -> Normal3f {
        let l = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        Normal3f::new(self.x / l, self.y / l, self.z / l)
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Normal3f {
        Normal3f::new(v.x, v.y, v.z)
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Vector3f {
        Vector3f::new(n.x, n.y, n.z)
    }
}

impl Neg for Normal3f {
    type Output = Normal3f;
    fn neg(self) -> Normal3f {
        Normal3f::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Normal3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {}, {}, {} ]", self.x, self.y, self.z)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Point2f {
        Point2f { x, y }
    }
}

impl Add<Vector2f> for Point2f {
    type Output = Point2f;
    fn add(self, rhs: Vector2f) -> Point2f {
        Point2f::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub<Point2f> for Point2f {
    type Output = Vector2f;
    fn sub(self, rhs: Point2f) -> Vector2f {
        Vector2f::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Point2f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {}, {} )", self.x, self.y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vector2f {
    pub x: f32,
    pub y: f32,
}

impl Vector2f {
    pub fn new(x: f32, y: f32) -> Vector2f {
        Vector2f { x, y }
    }
}

impl Mul<f32> for Vector2f {
    type Output = Vector2f;
    fn mul(self, rhs: f32) -> Vector2f {
        Vector2f::new(self.x * rhs, self.y * rhs)
    }
}

impl AddAssign<Vector2f> for Vector2f {
    fn add_assign(&mut self, rhs: Vector2f) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect() {
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let wi = Vector3f::new(1.0, 0.0, -1.0).normalize();
        let r = wi.reflect(&n);
        assert!((r - Vector3f::new(1.0, 0.0, 1.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_refract_straight_through() {
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let wi = Vector3f::new(0.0, 0.0, -1.0);
        let wt = wi.refract(&n, 1.0, 1.5);
        assert!((wt - Vector3f::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_refract_tir() {
        let n = Normal3f::new(0.0, 0.0, 1.0);
        // grazing incidence from the dense side
        let wi = Vector3f::new(0.9, 0.0, 0.1).normalize();
        let wt = wi.refract(&n, 1.0, 1.5);
        assert!(wt.is_zero());
    }
}
