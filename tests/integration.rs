use ffd_engine::parse::lattice_json;
use ffd_engine::{
    BBox, BatchDomain, ControlLattice, CornerIndex, CornerMode, FfdBatch, FfdDomain, FfdError,
    FfdOptions, GeomMesh, Point3, Vec3, deform_batch, deform_mesh, deform_points,
};
use ffd_engine::geom::Tolerance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TWO_CORNERS: &str = r#"{
    "lattice_deformations": {
        "0": { "original": [0.5, -0.5, -0.5], "deformation": [-0.0023, -0.5887, 0.0] },
        "7": { "original": [-0.5, 0.5, 0.5], "deformation": [0.25, 0.0, -0.125] }
    }
}"#;

fn random_lattice(rng: &mut StdRng) -> ControlLattice {
    let mut lattice = ControlLattice::zero();
    for corner in CornerIndex::ALL {
        lattice.set(
            corner,
            Vec3::new(
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
            ),
        );
    }
    lattice
}

fn random_points(rng: &mut StdRng, bbox: BBox, count: usize) -> Vec<[f64; 3]> {
    // Sample a margin around the box so clamped points are exercised too.
    let size = bbox.size();
    (0..count)
        .map(|_| {
            [
                rng.random_range(bbox.min.x - 0.25 * size.x..bbox.max.x + 0.25 * size.x),
                rng.random_range(bbox.min.y - 0.25 * size.y..bbox.max.y + 0.25 * size.y),
                rng.random_range(bbox.min.z - 0.25 * size.z..bbox.max.z + 0.25 * size.z),
            ]
        })
        .collect()
}

#[test]
fn json_description_drives_mesh_deformation() {
    let document = lattice_json::parse_str(TWO_CORNERS).expect("parse lattice json");
    let mesh = GeomMesh::new(
        vec![
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [4.0, 2.0, 0.0],
            [0.0, 2.0, 2.0],
            [2.0, 1.0, 1.0],
        ],
        vec![0, 1, 2, 0, 2, 3, 1, 4, 3],
    );

    let (out, diag) =
        deform_mesh(&mesh, document.descriptions(), FfdOptions::default()).expect("deform mesh");
    assert_eq!(out.indices, mesh.indices);
    assert_eq!(diag.point_count, 5);

    // Vertex 1 sits on corner (1, 0, 0): offset (-0.0023, -0.5887, 0) × (4, 2, 2).
    let v1 = out.positions[1];
    assert!((v1[0] - (4.0 - 0.0092)).abs() < 1e-9, "{v1:?}");
    assert!((v1[1] - -1.1774).abs() < 1e-9, "{v1:?}");
    assert!(v1[2].abs() < 1e-9, "{v1:?}");

    // Vertex 3 sits on corner (0, 1, 1): offset (0.25, 0, -0.125) × (4, 2, 2).
    let v3 = out.positions[3];
    assert!((v3[0] - 1.0).abs() < 1e-9, "{v3:?}");
    assert!((v3[1] - 2.0).abs() < 1e-9, "{v3:?}");
    assert!((v3[2] - 1.75).abs() < 1e-9, "{v3:?}");

    // Vertex 0 sits on an undescribed corner.
    assert!(out.positions[0].iter().all(|c| c.abs() < 1e-9));
}

#[test]
fn json_lattice_matches_manual_lattice() {
    let document = lattice_json::parse_str(TWO_CORNERS).expect("parse lattice json");
    let extent = Vec3::new(2.0, 1.0, 4.0);
    let lattice = document.to_lattice(extent, 1e-6).expect("resolve corners");

    let mut manual = ControlLattice::zero();
    manual.set(CornerIndex::from_bits(true, false, false), Vec3::new(-0.0046, -0.5887, 0.0));
    manual.set(CornerIndex::from_bits(false, true, true), Vec3::new(0.5, 0.0, -0.5));
    for corner in CornerIndex::ALL {
        let diff = lattice.get(corner) - manual.get(corner);
        assert!(diff.length() < 1e-12, "corner {corner}");
    }
}

#[test]
fn malformed_json_corner_reports_key() {
    let json = r#"{ "lattice_deformations": { "weird": { "original": [0.1, 0.5, 0.5], "deformation": [0, 0, 0] } } }"#;
    let document = lattice_json::parse_str(json).expect("shape is valid");
    let err = document
        .to_lattice(Vec3::splat(1.0), 1e-6)
        .expect_err("0.1 is not a corner coordinate");
    match err {
        lattice_json::ParseError::Lattice(FfdError::InvalidCorner { key, .. }) => {
            assert_eq!(key, "weird");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn random_batches_match_individual_evaluation() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let boxes: Vec<BBox> = (0..6)
        .map(|_| {
            let min = Point3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            );
            let size = Vec3::new(
                rng.random_range(0.1..5.0),
                rng.random_range(0.1..5.0),
                rng.random_range(0.1..5.0),
            );
            BBox::new(min, min + size)
        })
        .collect();
    let lattices: Vec<ControlLattice> = boxes.iter().map(|_| random_lattice(&mut rng)).collect();
    let point_sets: Vec<Vec<[f64; 3]>> = boxes
        .iter()
        .enumerate()
        .map(|(i, bbox)| random_points(&mut rng, *bbox, 50 + 17 * i))
        .collect();

    for mode in [CornerMode::Interpolating, CornerMode::Approximating] {
        let options = FfdOptions::new().corner_mode(mode);
        let batch = FfdBatch::new(
            BatchDomain::per_scene(boxes.iter().copied()).expect("valid boxes"),
            lattices.clone(),
            point_sets.iter().map(Vec::as_slice).collect(),
        )
        .expect("consistent batch");

        let results = deform_batch(&batch, options);
        assert_eq!(results.len(), boxes.len());
        for (i, (out, diag)) in results.iter().enumerate() {
            let domain = FfdDomain::new(boxes[i]).expect("valid box");
            let (alone, _) = deform_points(&point_sets[i], &domain, &lattices[i], options);
            assert_eq!(out, &alone, "scene {i}");
            assert_eq!(out.len(), point_sets[i].len());
            assert_eq!(diag.point_count, point_sets[i].len());
        }
    }
}

#[test]
fn interpolating_corners_hit_random_offsets() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let bbox = BBox::new(
            Point3::new(-rng.random_range(0.5..3.0), -1.0, 0.0),
            Point3::new(rng.random_range(0.5..3.0), 1.0, rng.random_range(0.5..3.0)),
        );
        let domain = FfdDomain::new(bbox).expect("valid box");
        let lattice = random_lattice(&mut rng);
        let corners: Vec<[f64; 3]> = CornerIndex::ALL
            .iter()
            .map(|c| bbox.corner(c.id()).to_array())
            .collect();

        let (out, _) = deform_points(&corners, &domain, &lattice, FfdOptions::default());
        for (corner, (before, after)) in CornerIndex::ALL.iter().zip(corners.iter().zip(&out)) {
            let delta = Point3::from_array(*after).sub_point(Point3::from_array(*before));
            assert!(
                Tolerance::new(1e-12).approx_eq_vec3(delta, lattice.get(*corner)),
                "corner {corner}: {delta:?}"
            );
        }
    }
}

#[test]
fn batch_shape_mismatch_is_rejected() {
    let points = [[0.0, 0.0, 0.0]];
    let err = FfdBatch::new(
        BatchDomain::PerScene(vec![
            FfdDomain::new(BBox::new(Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0))).expect("box"),
        ]),
        vec![ControlLattice::zero(), ControlLattice::zero()],
        vec![&points[..], &points[..]],
    )
    .expect_err("one box for two scenes");
    assert!(matches!(
        err,
        FfdError::SceneCountMismatch {
            lattices: 2,
            point_sets: 2,
            domains: 1
        }
    ));
}
