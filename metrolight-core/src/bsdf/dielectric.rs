use crate::bsdf::{faceforward, fresnel_dielectric, Bsdf, Lobe, ScatterEvent};
use crate::interaction::SurfacePoint;
use crate::rng::Rng;
use crate::spectrum::{Spectrum, N_SPECTRAL_SAMPLES};
use crate::Vector3f;

/// Directions closer than this are considered equal when matching a query
/// against the dirac reflect/refract directions.
const DIRAC_COS_EPSILON: f32 = 1e-5;

/// Smooth dielectric with a per-wavelength interior index of refraction.
///
/// Dispersion is simulated by letting the interior IOR vary per wavelength.
/// To keep a single path spectrally coherent, the surface point's preferred
/// wavelength index (when set) pins which IOR is used; otherwise the
/// wavelength is chosen uniformly and the evaluation integrates over all
/// samples whose refracted direction matches.
#[derive(Debug)]
pub struct DielectricBsdf {
    ks: Spectrum,
    /// Interior IOR per wavelength sample.
    ior: Spectrum,
    /// Average transmittance; scales the refraction branch probability.
    transparency: f32,
    /// True when the IOR actually varies over the samples; only then do
    /// events carry a wavelength and pin the path's spectral coherence.
    dispersive: bool,
}

impl DielectricBsdf {
    pub fn new(ks: Spectrum, ior: Spectrum, transparency: f32) -> DielectricBsdf {
        assert!((0.0..=1.0).contains(&transparency));
        let dispersive = (1..N_SPECTRAL_SAMPLES).any(|i| ior[i] != ior[0]);
        DielectricBsdf {
            ks,
            ior,
            transparency,
            dispersive,
        }
    }

    /// Non-dispersive glass.
    pub fn glass(ks: Spectrum, ior: f32) -> DielectricBsdf {
        DielectricBsdf::new(ks, Spectrum::fill(ior), 1.0)
    }

    fn lambda_index(&self, pt: &SurfacePoint, rng: &mut Rng) -> usize {
        if pt.preferred_lambda > 0 {
            pt.preferred_lambda - 1
        } else {
            rng.uniform_u32_bounded(N_SPECTRAL_SAMPLES as u32) as usize
        }
    }

    fn reflect_dir(&self, pt: &SurfacePoint, wi: Vector3f) -> Vector3f {
        let n = faceforward(pt.ns, -wi);
        wi.reflect(&n).normalize()
    }

    fn refract_dir(&self, pt: &SurfacePoint, wi: Vector3f, lambda: usize) -> Vector3f {
        let wt = wi.refract(&pt.ns, pt.ior.0, self.ior[lambda]);
        if wt.is_zero() {
            wt
        } else {
            wt.normalize()
        }
    }

    fn fresnel(&self, pt: &SurfacePoint, wi: Vector3f, lambda: usize) -> f32 {
        fresnel_dielectric(-wi.dotn(&pt.ns), pt.ior.0, self.ior[lambda])
    }

    /// Probability of taking the refraction branch for the given wavelength.
    fn transmit_prob(&self, pt: &SurfacePoint, wi: Vector3f, lambda: usize) -> f32 {
        let wt = self.refract_dir(pt, wi, lambda);
        if wt.is_zero() {
            return 0.0;
        }
        self.transparency * (1.0 - self.fresnel(pt, wi, lambda))
    }
}

fn same_direction(a: Vector3f, b: Vector3f) -> bool {
    !a.is_zero() && !b.is_zero() && a.dot(&b) > 1.0 - DIRAC_COS_EPSILON
}

impl Bsdf for DielectricBsdf {
    fn sample(
        &self,
        pt: &SurfacePoint,
        wi: Vector3f,
        prior: Option<&ScatterEvent>,
        rng: &mut Rng,
    ) -> ScatterEvent {
        let tag = |lambda: usize| if self.dispersive { lambda + 1 } else { 0 };

        // preserve the scattering mode of an earlier event when asked to
        if let Some(prior) = prior {
            match prior.lobe {
                Lobe::SpecularReflect => {
                    let mut e =
                        ScatterEvent::new(self.reflect_dir(pt, wi), Lobe::SpecularReflect);
                    e.lambda = prior.lambda;
                    return e;
                }
                Lobe::SpecularTransmit => {
                    let lambda = if prior.lambda > 0 {
                        prior.lambda - 1
                    } else {
                        self.lambda_index(pt, rng)
                    };
                    let wt = self.refract_dir(pt, wi, lambda);
                    let mut e = ScatterEvent::new(wt, Lobe::SpecularTransmit);
                    e.lambda = tag(lambda);
                    if wt.is_zero() {
                        e.lobe = Lobe::Absorb;
                    }
                    return e;
                }
                _ => {}
            }
        }

        let lambda = self.lambda_index(pt, rng);
        let wt = self.refract_dir(pt, wi, lambda);

        if !wt.is_zero() {
            let fs = self.transparency * (1.0 - self.fresnel(pt, wi, lambda));
            if rng.uniform_f32() < fs {
                let mut e = ScatterEvent::new(wt, Lobe::SpecularTransmit);
                e.lambda = tag(lambda);
                return e;
            }
        }

        let mut e = ScatterEvent::new(self.reflect_dir(pt, wi), Lobe::SpecularReflect);
        e.lambda = tag(lambda);
        e
    }

    fn pd(&self, pt: &SurfacePoint, wi: Vector3f, event: &ScatterEvent) -> f32 {
        match event.lobe {
            Lobe::SpecularReflect => {
                if !same_direction(event.wo, self.reflect_dir(pt, wi)) {
                    return 0.0;
                }
                let lambda = if event.lambda > 0 {
                    event.lambda - 1
                } else if pt.preferred_lambda > 0 {
                    pt.preferred_lambda - 1
                } else {
                    // reflection is wavelength-independent; any sample does
                    0
                };
                1.0 - self.transmit_prob(pt, wi, lambda)
            }
            Lobe::SpecularTransmit => {
                // selection probability of the matching wavelength(s)
                let mut p = 0.0;
                let mut n_matching = 0;
                for i in 0..N_SPECTRAL_SAMPLES {
                    if pt.preferred_lambda > 0 && pt.preferred_lambda - 1 != i {
                        continue;
                    }
                    if same_direction(event.wo, self.refract_dir(pt, wi, i)) {
                        p += self.transmit_prob(pt, wi, i);
                        n_matching += 1;
                    }
                }
                if n_matching == 0 {
                    return 0.0;
                }
                if pt.preferred_lambda > 0 {
                    p
                } else {
                    p / N_SPECTRAL_SAMPLES as f32
                }
            }
            _ => 0.0,
        }
    }

    fn evaluate(&self, pt: &SurfacePoint, wi: Vector3f, wo: Vector3f) -> Spectrum {
        if same_direction(wo, self.reflect_dir(pt, wi)) {
            let lambda = if pt.preferred_lambda > 0 {
                pt.preferred_lambda - 1
            } else {
                0
            };
            // whatever is not transmitted reflects: Fresnel reflection plus
            // the blocked share of the transmission lobe, so transparency 0
            // degenerates to a perfect mirror
            let fr = self.fresnel(pt, wi, lambda);
            return self.ks * (fr + (1.0 - fr) * (1.0 - self.transparency));
        }

        // per-wavelength refraction indicator: under dispersion only the
        // wavelengths whose refracted direction matches wo survive
        let mut s = Spectrum::black();
        for i in 0..N_SPECTRAL_SAMPLES {
            if pt.preferred_lambda > 0 && pt.preferred_lambda - 1 != i {
                continue;
            }
            if same_direction(wo, self.refract_dir(pt, wi, i)) {
                s[i] = self.ks[i] * (1.0 - self.fresnel(pt, wi, i)) * self.transparency;
            }
        }
        s
    }

    fn is_specular(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::Material;
    use crate::{Normal3f, Point2f, Point3f};
    use std::sync::Arc;

    fn glass_point() -> SurfacePoint {
        let bsdf: Arc<dyn Bsdf> = Arc::new(DielectricBsdf::glass(Spectrum::identity(), 1.49));
        let mut pt = SurfacePoint::new(
            Point3f::origin(),
            Normal3f::new(0.0, 0.0, 1.0),
            Point2f::new(0.0, 0.0),
            0,
            1.0,
            Material::reflective(bsdf),
        );
        pt.ior = (1.0, 1.49);
        pt
    }

    #[test]
    fn test_sampled_branch_is_consistent() {
        let bsdf = DielectricBsdf::glass(Spectrum::identity(), 1.49);
        let pt = glass_point();
        let wi = Vector3f::new(0.3, 0.0, -1.0).normalize();
        let mut rng = Rng::with_seed(31);
        let mut saw_reflect = false;
        let mut saw_transmit = false;
        for _ in 0..500 {
            let e = bsdf.sample(&pt, wi, None, &mut rng);
            assert!(!e.is_absorbed());
            assert!(bsdf.pd(&pt, wi, &e) > 0.0);
            assert!(!bsdf.evaluate(&pt, wi, e.wo).is_zero());
            match e.lobe {
                Lobe::SpecularReflect => saw_reflect = true,
                Lobe::SpecularTransmit => saw_transmit = true,
                _ => panic!("unexpected lobe"),
            }
        }
        assert!(saw_reflect && saw_transmit);
    }

    #[test]
    fn test_prior_transmit_keeps_mode_and_wavelength() {
        let bsdf = DielectricBsdf::glass(Spectrum::identity(), 1.49);
        let pt = glass_point();
        let wi = Vector3f::new(0.3, 0.0, -1.0).normalize();
        let mut rng = Rng::with_seed(32);
        let first = loop {
            let e = bsdf.sample(&pt, wi, None, &mut rng);
            if e.lobe == Lobe::SpecularTransmit {
                break e;
            }
        };
        let again = bsdf.sample(&pt, wi, Some(&first), &mut rng);
        assert_eq!(again.lobe, Lobe::SpecularTransmit);
        assert_eq!(again.lambda, first.lambda);
        assert!(same_direction(again.wo, first.wo));
    }

    #[test]
    fn test_arbitrary_direction_evaluates_black() {
        let bsdf = DielectricBsdf::glass(Spectrum::identity(), 1.49);
        let pt = glass_point();
        let wi = Vector3f::new(0.3, 0.0, -1.0).normalize();
        let off = Vector3f::new(0.5, 0.5, 0.5).normalize();
        assert!(bsdf.evaluate(&pt, wi, off).is_zero());
    }
}
