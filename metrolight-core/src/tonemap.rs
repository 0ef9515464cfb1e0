//! HDR-to-display tonemap operators.

use anyhow::{bail, Result};

use crate::spectrum::Spectrum;

pub trait Tonemap: Send + Sync {
    /// Map a linear HDR value to display sRGB bytes.
    fn map(&self, s: Spectrum) -> [u8; 3];
}

pub fn create(name: &str) -> Result<Box<dyn Tonemap>> {
    match name {
        "default" | "linear" => Ok(Box::new(LinearTonemap)),
        "reinhard" => Ok(Box::new(ReinhardTonemap)),
        _ => bail!("unknown tonemap \"{}\"", name),
    }
}

/// Clamp to [0, 1] and gamma-encode.
pub struct LinearTonemap;

impl Tonemap for LinearTonemap {
    fn map(&self, s: Spectrum) -> [u8; 3] {
        s.clamped(0.0, 1.0).to_srgb()
    }
}

/// Reinhard global operator: L / (1 + L) compression on luminance.
pub struct ReinhardTonemap;

impl Tonemap for ReinhardTonemap {
    fn map(&self, s: Spectrum) -> [u8; 3] {
        let l = s.luminance();
        if l <= 0.0 {
            return Spectrum::black().to_srgb();
        }
        (s * (1.0 / (1.0 + l))).clamped(0.0, 1.0).to_srgb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_clamps() {
        let t = LinearTonemap;
        assert_eq!(t.map(Spectrum::fill(2.0)), [255, 255, 255]);
        assert_eq!(t.map(Spectrum::black()), [0, 0, 0]);
    }

    #[test]
    fn test_reinhard_compresses() {
        let t = ReinhardTonemap;
        let bright = t.map(Spectrum::fill(100.0));
        assert!(bright[0] < 255);
        assert_eq!(t.map(Spectrum::black()), [0, 0, 0]);
    }

    #[test]
    fn test_create() {
        assert!(create("default").is_ok());
        assert!(create("reinhard").is_ok());
        assert!(create("filmic").is_err());
    }
}
