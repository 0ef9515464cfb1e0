//! BSDFs, emitters and the scatter-event protocol.
//!
//! All densities returned by [`Bsdf::pd`] are with respect to *projected*
//! solid angle (solid angle divided by |cos theta| against the surface
//! normal). Incident directions are in the propagation sense: `wi` points
//! into the surface along the direction the walk arrived from.

mod dielectric;
mod emitter;
mod fresnel;
mod lambertian;
mod phong;

pub use self::dielectric::DielectricBsdf;
pub use self::emitter::{DiffuseAreaEmitter, Emitter, PointEmitter};
pub use self::fresnel::fresnel_dielectric;
pub use self::lambertian::LambertianBsdf;
pub use self::phong::ModifiedPhongBsdf;

use std::fmt::Debug;

use crate::interaction::SurfacePoint;
use crate::rng::Rng;
use crate::spectrum::Spectrum;
use crate::Vector3f;

/// Which scattering mode produced an event. Mixture BSDFs branch on this tag
/// so that repeated queries about one event stay mutually consistent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lobe {
    Absorb,
    Diffuse,
    Glossy,
    SpecularReflect,
    SpecularTransmit,
    Emit,
    Sense,
}

/// The outcome of sampling a BSDF: an exitant direction plus the metadata
/// needed to answer later density queries about the same choice.
#[derive(Debug, Copy, Clone)]
pub struct ScatterEvent {
    /// Sampled exitant direction; the zero vector signals absorption.
    pub wo: Vector3f,
    pub lobe: Lobe,
    /// 1-based wavelength index the event is coherent with; 0 = all.
    pub lambda: usize,
}

impl ScatterEvent {
    pub fn new(wo: Vector3f, lobe: Lobe) -> ScatterEvent {
        ScatterEvent {
            wo,
            lobe,
            lambda: 0,
        }
    }

    pub fn absorbed() -> ScatterEvent {
        ScatterEvent::new(Vector3f::zero(), Lobe::Absorb)
    }

    pub fn is_absorbed(&self) -> bool {
        self.wo.is_zero()
    }

    /// Same event pointed along a different direction, keeping the metadata.
    /// Used by the perturbations to steer a retrace while preserving the
    /// scattering mode.
    pub fn redirected(&self, wo: Vector3f) -> ScatterEvent {
        ScatterEvent {
            wo,
            lobe: self.lobe,
            lambda: self.lambda,
        }
    }
}

pub trait Bsdf: Debug + Send + Sync {
    /// Sample an exitant direction for the incident direction `wi`. When
    /// `prior` is given, the same scattering mode as that earlier event is
    /// requested (e.g. a transmit event asks for another transmit at the
    /// same wavelength).
    fn sample(
        &self,
        pt: &SurfacePoint,
        wi: Vector3f,
        prior: Option<&ScatterEvent>,
        rng: &mut Rng,
    ) -> ScatterEvent;

    /// Probability density with which `sample` would have produced `event`,
    /// with respect to projected solid angle, including any discrete
    /// mode-selection probability.
    fn pd(&self, pt: &SurfacePoint, wi: Vector3f, event: &ScatterEvent) -> f32;

    /// fs(wi -> wo).
    fn evaluate(&self, pt: &SurfacePoint, wi: Vector3f, wo: Vector3f) -> Spectrum;

    /// True iff this BSDF is nonzero only on a set of directions of measure
    /// zero.
    fn is_specular(&self) -> bool {
        false
    }
}

/// Orient `n` to the hemisphere the direction `towards` points into.
pub(crate) fn faceforward(n: crate::Normal3f, towards: Vector3f) -> crate::Normal3f {
    if n.dot(&towards) < 0.0 {
        -n
    } else {
        n
    }
}
