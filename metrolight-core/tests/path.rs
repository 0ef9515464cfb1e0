//! Property tests for the path data structure: density bookkeeping,
//! split consistency, specular zeroing, and reconstruction.

use metrolight_core::integrator::BidirPathTracer;
use metrolight_core::path::{Path, PathContext, VertexRole};
use metrolight_core::rng::Rng;
use metrolight_core::scenes;

fn relative_close(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1e-20)
}

/// Generate up to `want` valid complete paths in the named scene.
fn generate_paths<'a>(ctx: PathContext<'a>, want: usize, seed: u64) -> Vec<Path<'a>> {
    let bdpt = BidirPathTracer::new(false);
    let mut rng = Rng::with_seed(seed);
    let mut paths = Vec::new();
    for _ in 0..want * 20 {
        let mut path = Path::new(ctx);
        if bdpt.generate(&mut path, &mut rng) && path.is_complete() {
            paths.push(path);
            if paths.len() == want {
                break;
            }
        }
    }
    assert!(!paths.is_empty(), "no complete path generated");
    paths
}

#[test]
fn complete_paths_have_proper_ends() {
    let (scene, camera) = scenes::cornell(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    for path in generate_paths(ctx, 50, 101) {
        let k = path.len();
        assert!(k >= 2);
        assert!(path.front().is_emitter());
        assert!(path.back().is_sensor());
        for i in 1..k - 1 {
            assert_eq!(path.vertex(i).role, VertexRole::Reflectance);
        }
    }
}

#[test]
fn edge_lengths_and_geometry_terms_match_across_edges() {
    let (scene, camera) = scenes::cornell(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    for path in generate_paths(ctx, 50, 102) {
        for i in 0..path.len() - 1 {
            let y = path.vertex(i);
            let z = path.vertex(i + 1);
            assert!(relative_close(y.tl, z.te, 1e-3), "tL {} vs tE {}", y.tl, z.te);
            assert!(relative_close(y.gl, z.ge, 1e-3), "GL {} vs GE {}", y.gl, z.ge);
        }
        // the ends carry no outer edge
        assert_eq!(path.front().te, 0.0);
        assert_eq!(path.back().tl, 0.0);
    }
}

#[test]
fn relative_densities_match_independent_ratios() {
    let (scene, camera) = scenes::cornell(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    for path in generate_paths(ctx, 40, 103) {
        let k = path.len();
        let pdfs = path.pds(k, k);
        assert_eq!(pdfs.len(), k + 1);

        // pick a reference split with nonzero relative density
        let s0 = match (0..=k).find(|&s| pdfs[s] > 0.0 && path.pd(s, k - s, true) > 0.0) {
            Some(s) => s,
            None => continue,
        };

        for s in 0..=k {
            let p_direct = path.pd(s, k - s, true);
            if pdfs[s] == 0.0 || p_direct == 0.0 {
                continue;
            }
            let ratio_pds = pdfs[s] / pdfs[s0];
            let ratio_direct = p_direct / path.pd(s0, k - s0, true);
            assert!(
                relative_close(ratio_pds, ratio_direct, 2e-2),
                "split {}: pds ratio {} vs direct ratio {}",
                s,
                ratio_pds,
                ratio_direct
            );
        }
    }
}

#[test]
fn mis_weights_sum_to_one() {
    let (scene, camera) = scenes::cornell(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    for path in generate_paths(ctx, 40, 104) {
        let k = path.len();
        let mut squared: Vec<f32> = (0..=k)
            .map(|s| {
                let p = path.pd(s, k - s, true);
                p * p
            })
            .collect();
        let sum: f32 = squared.iter().sum();
        if sum <= 0.0 {
            continue;
        }
        for w in squared.iter_mut() {
            *w /= sum;
        }
        let total: f32 = squared.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }
}

#[test]
fn specular_connecting_vertices_zero_the_split() {
    let (scene, camera) = scenes::caustic(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    let mut checked = 0;
    for path in generate_paths(ctx, 100, 105) {
        let k = path.len();
        let pdfs = path.pds(k, k);
        for i in 0..k {
            if !path.vertex(i).is_specular() {
                continue;
            }
            checked += 1;
            // the splits that put vertex i on the connecting edge
            for &s in &[i, i + 1] {
                if s > k {
                    continue;
                }
                assert!(path.contribution(s, k - s, true).is_zero());
                assert_eq!(path.pd(s, k - s, true), 0.0);
                assert_eq!(pdfs[s], 0.0);
            }
        }
    }
    // the glass sphere must show up in some sampled path
    assert!(checked > 0, "no specular vertex encountered");
}

#[test]
fn split_and_rejoin_reconstructs_radiance() {
    let (scene, camera) = scenes::cornell(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    for path in generate_paths(ctx, 40, 106) {
        let k = path.len();
        let reference = path.radiance();

        for s in 0..=k {
            let mut rebuilt = path.left(s);
            if !rebuilt.append_path(&path.right(k - s)) {
                continue;
            }
            assert_eq!(rebuilt.len(), k);
            let r = rebuilt.radiance();
            for i in 0..3 {
                assert!(
                    relative_close(r[i], reference[i], 1e-3),
                    "split {}: {} vs {}",
                    s,
                    r[i],
                    reference[i]
                );
            }
        }
    }
}

#[test]
fn full_length_contribution_matches_tentative_evaluation() {
    let (scene, camera) = scenes::cornell(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    for path in generate_paths(ctx, 30, 107) {
        let k = path.len();
        for s in 0..=k {
            let strict = path.contribution(s, k - s, false);
            let tentative = path.contribution(s, k - s, true);
            // full-length splits skip the visibility test entirely, so the
            // two evaluations must agree
            for i in 0..3 {
                assert!(relative_close(strict[i], tentative[i], 1e-4));
            }
        }
    }
}

#[test]
fn structural_ops_slice_and_drop_vertices() {
    let (scene, camera) = scenes::cornell(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    let path = generate_paths(ctx, 1, 109).remove(0);
    let k = path.len();

    let prefix = path.left(2.min(k));
    assert_eq!(prefix.len(), 2.min(k));
    assert_eq!(prefix.vertex(0).pt.p, path.vertex(0).pt.p);

    let suffix = path.right(1);
    assert_eq!(suffix.len(), 1);
    assert_eq!(suffix.vertex(0).pt.p, path.vertex(k - 1).pt.p);

    let mut trimmed = path.clone();
    trimmed.pop_front();
    assert_eq!(trimmed.len(), k - 1);
    assert_eq!(trimmed.vertex(0).pt.p, path.vertex(1).pt.p);
    trimmed.pop_back();
    assert_eq!(trimmed.len(), k - 2);

    trimmed.clear();
    assert!(trimmed.is_empty());
    assert!(trimmed.radiance().is_zero());

    assert!(path == path.clone());
    assert!(!(path == prefix) || k == 2);
}

#[test]
fn point_light_and_pinhole_forbid_end_strategies() {
    let (scene, camera) = scenes::mirror(32, 32);
    let ctx = PathContext {
        scene: &scene,
        camera: &camera,
    };

    for path in generate_paths(ctx, 30, 108) {
        let k = path.len();
        // a point light can never be hit by an eye walk, a pinhole never by
        // a light walk: the end strategies must report zero density
        assert_eq!(path.pd(0, k, true), 0.0);
        assert_eq!(path.pd(k, 0, true), 0.0);
        assert!(path.contribution(0, k, true).is_zero());
        assert!(path.contribution(k, 0, true).is_zero());
    }
}
