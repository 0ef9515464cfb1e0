//! Built-in demo scenes, selectable by name from the front-end. Scene-file
//! parsing lives outside this crate; these cover the renderer's exercise
//! cases: a Cornell box, a glass-sphere caustic, a mirror with a point light,
//! a bare background, and a triangle light over a floor.

use std::f32::consts::PI;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::bsdf::{
    Bsdf, DielectricBsdf, DiffuseAreaEmitter, Emitter, LambertianBsdf, ModifiedPhongBsdf,
    PointEmitter,
};
use crate::camera::PinholeCamera;
use crate::interaction::Material;
use crate::scene::Scene;
use crate::shapes::{PointShape, Quad, Shape, Sphere, Triangle};
use crate::spectrum::Spectrum;
use crate::{Point3f, Vector3f};

pub fn available() -> &'static [&'static str] {
    &["cornell", "caustic", "mirror", "empty", "triangle"]
}

pub fn create(name: &str, width: u32, height: u32) -> Result<(Scene, PinholeCamera)> {
    match name {
        "cornell" => Ok(cornell(width, height)),
        "caustic" => Ok(caustic(width, height)),
        "mirror" => Ok(mirror(width, height)),
        "empty" => Ok(empty(width, height)),
        "triangle" => Ok(triangle(width, height)),
        _ => bail!(
            "unknown scene \"{}\" (available: {})",
            name,
            available().join(", ")
        ),
    }
}

fn matte(kd: Spectrum) -> Arc<Material> {
    let bsdf: Arc<dyn Bsdf> = Arc::new(LambertianBsdf::new(kd));
    Material::reflective(bsdf)
}

fn area_light(radiance: Spectrum) -> Arc<Material> {
    let bsdf: Arc<dyn Bsdf> = Arc::new(LambertianBsdf::new(Spectrum::fill(0.5)));
    let emitter: Arc<dyn Emitter> = Arc::new(DiffuseAreaEmitter::new(radiance));
    Material::emissive(bsdf, emitter)
}

/// The classic closed box: white floor/ceiling/back, red and green side
/// walls, a square ceiling light with total power (80, 80, 80).
pub fn cornell(width: u32, height: u32) -> (Scene, PinholeCamera) {
    let white = matte(Spectrum::fill(0.73));
    let red = matte(Spectrum::from_rgb(0.63, 0.065, 0.05));
    let green = matte(Spectrum::from_rgb(0.14, 0.45, 0.09));

    let light_area = 0.25;
    let light_radiance = Spectrum::fill(80.0) / (PI * light_area);

    let shapes: Vec<Arc<dyn Shape>> = vec![
        // floor
        Arc::new(Quad::new(
            0,
            Point3f::new(-1.0, 0.0, -1.0),
            Vector3f::new(0.0, 0.0, 2.0),
            Vector3f::new(2.0, 0.0, 0.0),
            Arc::clone(&white),
        )),
        // ceiling
        Arc::new(Quad::new(
            1,
            Point3f::new(-1.0, 2.0, -1.0),
            Vector3f::new(2.0, 0.0, 0.0),
            Vector3f::new(0.0, 0.0, 2.0),
            Arc::clone(&white),
        )),
        // back wall
        Arc::new(Quad::new(
            2,
            Point3f::new(-1.0, 0.0, -1.0),
            Vector3f::new(2.0, 0.0, 0.0),
            Vector3f::new(0.0, 2.0, 0.0),
            Arc::clone(&white),
        )),
        // left wall
        Arc::new(Quad::new(
            3,
            Point3f::new(-1.0, 0.0, -1.0),
            Vector3f::new(0.0, 2.0, 0.0),
            Vector3f::new(0.0, 0.0, 2.0),
            red,
        )),
        // right wall
        Arc::new(Quad::new(
            4,
            Point3f::new(1.0, 0.0, -1.0),
            Vector3f::new(0.0, 0.0, 2.0),
            Vector3f::new(0.0, 2.0, 0.0),
            green,
        )),
        // ceiling light
        Arc::new(Quad::new(
            5,
            Point3f::new(-0.25, 1.999, -0.25),
            Vector3f::new(0.5, 0.0, 0.0),
            Vector3f::new(0.0, 0.0, 0.5),
            area_light(light_radiance),
        )),
    ];

    let scene = Scene::new(shapes, Spectrum::black());
    let camera = PinholeCamera::new(
        Point3f::new(0.0, 1.0, 2.8),
        Point3f::new(0.0, 1.0, 0.0),
        Vector3f::new(0.0, 1.0, 0.0),
        50.0,
        width,
        height,
    );
    (scene, camera)
}

/// Glass sphere over a diffuse ground plane, lit by an area light: the
/// caustic-perturbation exercise scene.
pub fn caustic(width: u32, height: u32) -> (Scene, PinholeCamera) {
    let ground = matte(Spectrum::fill(0.7));
    let glass: Arc<dyn Bsdf> = Arc::new(DielectricBsdf::glass(Spectrum::fill(0.98), 1.49));

    let shapes: Vec<Arc<dyn Shape>> = vec![
        Arc::new(Quad::new(
            0,
            Point3f::new(-8.0, 0.0, -8.0),
            Vector3f::new(0.0, 0.0, 16.0),
            Vector3f::new(16.0, 0.0, 0.0),
            ground,
        )),
        Arc::new(Sphere::new(
            1,
            Point3f::new(0.0, 0.7, 0.0),
            0.5,
            Material::reflective(glass),
        )),
        // distant area light, high and to the side
        Arc::new(Quad::new(
            2,
            Point3f::new(1.5, 3.0, -0.5),
            Vector3f::new(1.0, 0.0, 0.0),
            Vector3f::new(0.0, 0.0, 1.0),
            area_light(Spectrum::fill(60.0)),
        )),
    ];

    let scene = Scene::new(shapes, Spectrum::black());
    let camera = PinholeCamera::new(
        Point3f::new(0.0, 2.0, 3.5),
        Point3f::new(0.0, 0.3, 0.0),
        Vector3f::new(0.0, 1.0, 0.0),
        45.0,
        width,
        height,
    );
    (scene, camera)
}

/// A perfect mirror plane and a point light: no strategy of the
/// bidirectional sampler can connect them at length 2, so everything arrives
/// through specular reflection.
pub fn mirror(width: u32, height: u32) -> (Scene, PinholeCamera) {
    // zero transparency leaves only the reflection branch
    let mirror_bsdf: Arc<dyn Bsdf> = Arc::new(DielectricBsdf::new(
        Spectrum::fill(0.95),
        Spectrum::fill(1.49),
        0.0,
    ));
    let floor = matte(Spectrum::fill(0.6));

    let point_light: Arc<dyn Emitter> = Arc::new(PointEmitter::new(Spectrum::fill(20.0)));
    let light_material = Material::emissive(
        Arc::new(LambertianBsdf::new(Spectrum::fill(0.5))) as Arc<dyn Bsdf>,
        point_light,
    );

    let shapes: Vec<Arc<dyn Shape>> = vec![
        Arc::new(Quad::new(
            0,
            Point3f::new(-2.0, 0.0, -2.0),
            Vector3f::new(4.0, 0.0, 0.0),
            Vector3f::new(0.0, 4.0, 0.0),
            Material::reflective(mirror_bsdf),
        )),
        Arc::new(Quad::new(
            1,
            Point3f::new(-4.0, 0.0, -2.0),
            Vector3f::new(0.0, 0.0, 8.0),
            Vector3f::new(8.0, 0.0, 0.0),
            floor,
        )),
        Arc::new(PointShape::new(2, Point3f::new(0.0, 1.0, 2.0), light_material)),
    ];

    let scene = Scene::new(shapes, Spectrum::black());
    let camera = PinholeCamera::new(
        Point3f::new(0.0, 1.0, 4.0),
        Point3f::new(0.0, 1.0, 0.0),
        Vector3f::new(0.0, 1.0, 0.0),
        60.0,
        width,
        height,
    );
    (scene, camera)
}

/// No geometry at all: every pixel sees the uniform white background.
pub fn empty(width: u32, height: u32) -> (Scene, PinholeCamera) {
    let scene = Scene::new(Vec::new(), Spectrum::identity());
    let camera = PinholeCamera::new(
        Point3f::new(0.0, 0.0, 0.0),
        Point3f::new(0.0, 0.0, -1.0),
        Vector3f::new(0.0, 1.0, 0.0),
        60.0,
        width,
        height,
    );
    (scene, camera)
}

/// A diffuse triangle light high above a glossy floor, seen from a pinhole
/// looking straight down.
pub fn triangle(width: u32, height: u32) -> (Scene, PinholeCamera) {
    let floor: Arc<dyn Bsdf> = Arc::new(ModifiedPhongBsdf::new(
        Spectrum::fill(0.5),
        Spectrum::fill(0.3),
        15.0,
    ));

    let shapes: Vec<Arc<dyn Shape>> = vec![
        Arc::new(Quad::new(
            0,
            Point3f::new(-10.0, 0.0, -10.0),
            Vector3f::new(0.0, 0.0, 20.0),
            Vector3f::new(20.0, 0.0, 0.0),
            Material::reflective(floor),
        )),
        Arc::new(Triangle::new(
            1,
            Point3f::new(-1.0, 10.0, -1.0),
            Point3f::new(1.0, 10.0, -1.0),
            Point3f::new(0.0, 10.0, 1.0),
            area_light(Spectrum::fill(40.0)),
        )),
    ];

    let scene = Scene::new(shapes, Spectrum::black());
    let camera = PinholeCamera::new(
        Point3f::new(0.0, 1.0, 0.0),
        Point3f::new(0.0, 0.0, 0.0),
        Vector3f::new(0.0, 0.0, -1.0),
        70.0,
        width,
        height,
    );
    (scene, camera)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenes_build() {
        for name in available() {
            let (scene, camera) = create(name, 32, 32).unwrap();
            assert_eq!(camera.resolution(), (32, 32));
            if *name != "empty" {
                assert!(!scene.emitter_sampler.is_empty());
            }
        }
        assert!(create("nope", 32, 32).is_err());
    }
}
