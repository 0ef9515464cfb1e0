use std::fmt;

use crate::bsdf::{Bsdf, ScatterEvent};
use crate::interaction::SurfacePoint;
use crate::spectrum::Spectrum;
use crate::Vector3f;

/// Which of the surface point's handles a vertex scatters through. Only the
/// first vertex of a complete path may be an `Emitter`, only the last a
/// `Sensor`; every interior vertex uses the surface's reflectance BSDF.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VertexRole {
    Reflectance,
    Emitter,
    Sensor,
}

/// One vertex of a transport path, carrying the cached local quantities that
/// let every (s, t) split of the parent path be evaluated without re-tracing:
/// cumulative contributions `alpha_l`/`alpha_e`, cumulative area densities
/// `p_l`/`p_e`, the per-edge geometry terms and lengths, the BSDF value in
/// the light-flow direction, and the projected-solid-angle densities of
/// extending the path in either direction.
#[derive(Debug, Clone)]
pub struct PathVertex {
    pub pt: SurfacePoint,
    pub role: VertexRole,
    /// Incoming direction in the light-flow sense (pointing into the vertex).
    pub wi: Vector3f,
    /// Geometry term of the edge toward the eye side: G(x_i <-> x_i+1).
    pub gl: f32,
    /// Geometry term of the edge toward the light side: G(x_i-1 <-> x_i).
    pub ge: f32,
    /// Length of the edge toward the eye side; 0 at the eye end.
    pub tl: f32,
    /// Length of the edge toward the light side; 0 at the light end.
    pub te: f32,
    /// Cumulative unweighted light-subpath contribution up to this vertex.
    pub alpha_l: Spectrum,
    /// Cumulative unweighted eye-subpath contribution up to this vertex.
    pub alpha_e: Spectrum,
    /// fs(x_i-1, x_i, x_i+1) in the light-flow direction.
    pub fs: Spectrum,
    /// Projected-solid-angle density of sampling the next vertex light-to-eye.
    pub pdf_l: f32,
    /// Projected-solid-angle density of sampling the previous vertex eye-to-light.
    pub pdf_e: f32,
    /// Cumulative surface-area density of the prefix sampled from the light end.
    pub p_l: f32,
    /// Cumulative surface-area density of the suffix sampled from the eye end.
    pub p_e: f32,
    /// The event that produced this vertex's outgoing direction; kept so later
    /// density queries about the same choice stay consistent.
    pub event: ScatterEvent,
}

impl PathVertex {
    fn base(pt: SurfacePoint, role: VertexRole) -> PathVertex {
        PathVertex {
            pt,
            role,
            wi: Vector3f::zero(),
            gl: 1.0,
            ge: 1.0,
            tl: 0.0,
            te: 0.0,
            alpha_l: Spectrum::identity(),
            alpha_e: Spectrum::identity(),
            fs: Spectrum::identity(),
            pdf_l: 1.0,
            pdf_e: 1.0,
            p_l: 1.0,
            p_e: 1.0,
            event: ScatterEvent::absorbed(),
        }
    }

    /// First vertex of a light subpath, sampled from the emitter sampler with
    /// surface-area density `p_area`.
    pub fn emitter_seed(pt: SurfacePoint, p_area: f32) -> PathVertex {
        debug_assert!(pt.is_emitter() && p_area > 0.0);
        let le0 = pt.material.emitter.as_ref().unwrap().le0();
        let mut v = PathVertex::base(pt, VertexRole::Emitter);
        v.alpha_l = le0 / p_area;
        v.p_l = p_area;
        v
    }

    /// First vertex of an eye subpath, on the camera with film-plane density
    /// `p_film` = 1 / (width * height).
    pub fn sensor_seed(pt: SurfacePoint, p_film: f32) -> PathVertex {
        debug_assert!(pt.is_sensor() && p_film > 0.0);
        let mut v = PathVertex::base(pt, VertexRole::Sensor);
        v.p_e = p_film;
        v
    }

    /// Interior vertex appended on the light side.
    pub fn light_extension(
        pt: SurfacePoint,
        wi: Vector3f,
        ge: f32,
        te: f32,
        alpha_l: Spectrum,
        p_l: f32,
    ) -> PathVertex {
        let mut v = PathVertex::base(pt, VertexRole::Reflectance);
        v.wi = wi;
        v.ge = ge;
        v.te = te;
        v.alpha_l = alpha_l;
        v.p_l = p_l;
        v
    }

    /// Interior vertex prepended on the eye side.
    pub fn eye_extension(
        pt: SurfacePoint,
        wi: Vector3f,
        gl: f32,
        tl: f32,
        alpha_e: Spectrum,
        p_e: f32,
    ) -> PathVertex {
        let mut v = PathVertex::base(pt, VertexRole::Reflectance);
        v.wi = wi;
        v.gl = gl;
        v.tl = tl;
        v.alpha_e = alpha_e;
        v.p_e = p_e;
        v
    }

    /// The BSDF this vertex scatters through, resolved by role.
    pub fn bsdf(&self) -> &dyn Bsdf {
        match self.role {
            VertexRole::Emitter => self.pt.material.emitter.as_ref().unwrap().as_bsdf(),
            VertexRole::Sensor => self.pt.sensor.as_ref().unwrap().as_ref(),
            VertexRole::Reflectance => self.pt.material.bsdf.as_ref(),
        }
    }

    pub fn is_emitter(&self) -> bool {
        self.role == VertexRole::Emitter && self.pt.is_emitter()
    }

    pub fn is_sensor(&self) -> bool {
        self.role == VertexRole::Sensor && self.pt.is_sensor()
    }

    pub fn is_specular(&self) -> bool {
        self.bsdf().is_specular()
    }

    /// Heckbert-notation letter for path dumps.
    pub fn letter(&self) -> char {
        if self.is_emitter() {
            'L'
        } else if self.is_sensor() {
            'E'
        } else if self.pt.material.bsdf.is_specular() {
            'S'
        } else {
            'D'
        }
    }
}

impl PartialEq for PathVertex {
    fn eq(&self, other: &PathVertex) -> bool {
        self.pt.p == other.pt.p
            && (self.pt.uv.x - other.pt.uv.x).abs() < 1e-6
            && (self.pt.uv.y - other.pt.uv.y).abs() < 1e-6
    }
}

impl fmt::Display for PathVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} (GL={}, GE={}, tL={}, tE={}, pdfL={}, pdfE={}, pL={}, pE={})",
            self.letter(),
            self.pt.p,
            self.gl,
            self.ge,
            self.tl,
            self.te,
            self.pdf_l,
            self.pdf_e,
            self.p_l,
            self.p_e
        )
    }
}
