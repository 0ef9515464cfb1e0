//! Reconstruction filter kernels for splatting point samples into the film.

use std::f32::consts::PI;

use anyhow::{bail, Result};

pub trait Filter: Send + Sync {
    /// Kernel value at an offset (in pixels) from the sample position.
    fn evaluate(&self, x: f32, y: f32) -> f32;

    /// Support half-width in pixels.
    fn radius(&self) -> f32;
}

/// Build a filter by name; `null` disables reconstruction filtering.
pub fn create(
    name: &str,
    support: f32,
    sigma: f32,
    b: f32,
    c: f32,
    tau: f32,
) -> Result<Option<Box<dyn Filter>>> {
    let filter: Box<dyn Filter> = match name {
        "null" => return Ok(None),
        "box" => Box::new(BoxFilter { radius: support }),
        "triangle" => Box::new(TriangleFilter { radius: support }),
        "gaussian" => Box::new(GaussianFilter::new(support, sigma)),
        "mitchell" => Box::new(MitchellFilter {
            radius: support,
            b,
            c,
        }),
        "lanczosSinc" => Box::new(LanczosSincFilter {
            radius: support,
            tau,
        }),
        _ => bail!("unknown filter \"{}\"", name),
    };
    Ok(Some(filter))
}

pub struct BoxFilter {
    radius: f32,
}

impl Filter for BoxFilter {
    fn evaluate(&self, x: f32, y: f32) -> f32 {
        if x.abs() <= self.radius && y.abs() <= self.radius {
            1.0
        } else {
            0.0
        }
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

pub struct TriangleFilter {
    radius: f32,
}

impl Filter for TriangleFilter {
    fn evaluate(&self, x: f32, y: f32) -> f32 {
        (self.radius - x.abs()).max(0.0) * (self.radius - y.abs()).max(0.0)
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

pub struct GaussianFilter {
    radius: f32,
    alpha: f32,
    exp_r: f32,
}

impl GaussianFilter {
    pub fn new(radius: f32, sigma: f32) -> GaussianFilter {
        let alpha = 1.0 / (2.0 * sigma * sigma);
        GaussianFilter {
            radius,
            alpha,
            exp_r: (-alpha * radius * radius).exp(),
        }
    }

    fn gaussian(&self, d: f32) -> f32 {
        ((-self.alpha * d * d).exp() - self.exp_r).max(0.0)
    }
}

impl Filter for GaussianFilter {
    fn evaluate(&self, x: f32, y: f32) -> f32 {
        self.gaussian(x) * self.gaussian(y)
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

pub struct MitchellFilter {
    radius: f32,
    b: f32,
    c: f32,
}

impl MitchellFilter {
    fn mitchell_1d(&self, x: f32) -> f32 {
        let x = (2.0 * x).abs();
        let (b, c) = (self.b, self.c);
        if x > 2.0 {
            0.0
        } else if x > 1.0 {
            ((-b - 6.0 * c) * x * x * x
                + (6.0 * b + 30.0 * c) * x * x
                + (-12.0 * b - 48.0 * c) * x
                + (8.0 * b + 24.0 * c))
                * (1.0 / 6.0)
        } else {
            ((12.0 - 9.0 * b - 6.0 * c) * x * x * x
                + (-18.0 + 12.0 * b + 6.0 * c) * x * x
                + (6.0 - 2.0 * b))
                * (1.0 / 6.0)
        }
    }
}

impl Filter for MitchellFilter {
    fn evaluate(&self, x: f32, y: f32) -> f32 {
        self.mitchell_1d(x / self.radius) * self.mitchell_1d(y / self.radius)
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

pub struct LanczosSincFilter {
    radius: f32,
    tau: f32,
}

impl LanczosSincFilter {
    fn sinc(x: f32) -> f32 {
        let x = x.abs();
        if x < 1e-5 {
            1.0
        } else {
            (PI * x).sin() / (PI * x)
        }
    }

    fn windowed_sinc(&self, x: f32) -> f32 {
        let x = x.abs();
        if x > self.radius {
            0.0
        } else {
            Self::sinc(x) * Self::sinc(x / self.tau)
        }
    }
}

impl Filter for LanczosSincFilter {
    fn evaluate(&self, x: f32, y: f32) -> f32 {
        self.windowed_sinc(x) * self.windowed_sinc(y)
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_by_name() {
        assert!(create("null", 2.0, 1.0, 0.33, 0.33, 3.0).unwrap().is_none());
        for name in &["box", "triangle", "gaussian", "mitchell", "lanczosSinc"] {
            let f = create(name, 2.0, 1.0, 0.33, 0.33, 3.0).unwrap().unwrap();
            assert!(f.evaluate(0.0, 0.0) > 0.0, "{} center", name);
            assert_eq!(f.radius(), 2.0);
        }
        assert!(create("bogus", 2.0, 1.0, 0.33, 0.33, 3.0).is_err());
    }

    #[test]
    fn test_kernels_decay() {
        for name in &["triangle", "gaussian", "mitchell"] {
            let f = create(name, 2.0, 0.8, 1.0 / 3.0, 1.0 / 3.0, 3.0)
                .unwrap()
                .unwrap();
            assert!(f.evaluate(0.0, 0.0) > f.evaluate(1.5, 1.5).abs());
            assert_eq!(f.evaluate(5.0, 0.0), 0.0);
        }
    }
}
