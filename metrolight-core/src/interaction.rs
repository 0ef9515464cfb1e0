use std::sync::Arc;

use crate::bsdf::{Bsdf, Emitter};
use crate::camera::PinholeSensor;
use crate::{Normal3f, Point2f, Point3f};

/// A surface's scattering description: its reflectance BSDF and, if the
/// surface emits, its emitter. Materials are immutable and shared; surface
/// points reference them without owning them.
#[derive(Debug)]
pub struct Material {
    pub bsdf: Arc<dyn Bsdf>,
    pub emitter: Option<Arc<dyn Emitter>>,
}

impl Material {
    pub fn reflective(bsdf: Arc<dyn Bsdf>) -> Arc<Material> {
        Arc::new(Material {
            bsdf,
            emitter: None,
        })
    }

    pub fn emissive(bsdf: Arc<dyn Bsdf>, emitter: Arc<dyn Emitter>) -> Arc<Material> {
        Arc::new(Material {
            bsdf,
            emitter: Some(emitter),
        })
    }

    pub fn is_emitter(&self) -> bool {
        self.emitter.is_some()
    }
}

/// A point on a scene surface together with the local frame and the handles
/// lazily consulted by the path core. Surface points own none of the scene:
/// shapes and materials outlive them.
#[derive(Debug, Clone)]
pub struct SurfacePoint {
    pub p: Point3f,
    /// Geometric normal.
    pub ng: Normal3f,
    /// Shading normal.
    pub ns: Normal3f,
    pub uv: Point2f,
    pub shape_id: u32,
    /// Cached owning-shape surface area; zero for point lights and pinholes.
    pub shape_area: f32,
    pub material: Arc<Material>,
    /// Set only on camera film points.
    pub sensor: Option<Arc<PinholeSensor>>,
    /// Indices of refraction on the front / back side of the surface.
    pub ior: (f32, f32),
    /// 1-based index of the wavelength this path is spectrally coherent with
    /// under dispersion; 0 = unspecified.
    pub preferred_lambda: usize,
}

impl SurfacePoint {
    pub fn new(
        p: Point3f,
        ng: Normal3f,
        uv: Point2f,
        shape_id: u32,
        shape_area: f32,
        material: Arc<Material>,
    ) -> SurfacePoint {
        SurfacePoint {
            p,
            ng,
            ns: ng,
            uv,
            shape_id,
            shape_area,
            material,
            sensor: None,
            ior: (1.0, 1.0),
            preferred_lambda: 0,
        }
    }

    pub fn is_emitter(&self) -> bool {
        self.material.is_emitter()
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor.is_some()
    }

    /// Two surface points share a material iff their materials are the same
    /// shared instance. Used by the perturbation mutations' identity checks.
    pub fn same_material(&self, other: &SurfacePoint) -> bool {
        Arc::ptr_eq(&self.material, &other.material)
    }
}
