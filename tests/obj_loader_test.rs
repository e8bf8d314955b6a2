use std::fs;

use flow_batch::{
    Vector4,
    data_structures::model::Material,
    resources::{
        LoadOutcome, ModelError, load_model,
        material::MaterialLibrary,
        mesh::MeshData,
        obj::{AttributeLayout, LoadOptions, MISSING_NORMAL, MISSING_UV, parse_obj},
    },
};

mod common;
use common::test_utils::{RecordingBackend, init_logger};

const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

const TWO_MATERIALS: &str = "\
mtllib scene.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
usemtl red
f 1 2 3
usemtl blue
f 2 3 4
";

fn library() -> MaterialLibrary {
    MaterialLibrary::parse("newmtl red\nKd 1 0 0\nnewmtl blue\nKd 0 0 1\n", "scene.mtl")
}

fn parse(source: &str, options: LoadOptions) -> Result<Vec<MeshData>, ModelError> {
    parse_obj(source, "test.obj", &options, |_| library())
}

fn split() -> LoadOptions {
    LoadOptions {
        split_submesh_geometry: true,
        ..Default::default()
    }
}

#[test]
fn triangle_indices_address_positions() {
    init_logger();
    let meshes = parse(QUAD, LoadOptions::default()).unwrap();
    assert_eq!(meshes.len(), 1);

    let quad = &meshes[0];
    assert_eq!(quad.positions.len(), 4);
    assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(quad.triangle_count(), 2);
    assert_eq!(quad.material, Material::zero());
}

#[test]
fn attributes_follow_face_order() {
    let quad = parse(QUAD, LoadOptions::default()).unwrap().remove(0);

    // one entry per processed face vertex, shared vertices repeat
    assert_eq!(quad.uvs.len(), 6);
    assert_eq!(quad.normals.len(), 6);
    assert_eq!(quad.uvs[0], [0.0, 1.0]);
    assert_eq!(quad.uvs[2], [1.0, 0.0]);
    assert_eq!(quad.uvs[3], quad.uvs[0]);
    assert!(quad.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
}

#[test]
fn per_vertex_layout_aligns_attributes_with_positions() {
    let options = LoadOptions {
        layout: AttributeLayout::PerVertex,
        ..Default::default()
    };
    let quad = parse(QUAD, options).unwrap().remove(0);

    assert_eq!(quad.uvs.len(), quad.positions.len());
    assert_eq!(quad.normals.len(), quad.positions.len());
    assert_eq!(quad.uvs, vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
    assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
}

#[test]
fn missing_attributes_use_defaults() {
    init_logger();
    let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nf 1/1 2/7 3//4\n";
    let mesh = parse(source, LoadOptions::default()).unwrap().remove(0);

    assert_eq!(mesh.uvs, vec![[0.5, 0.5], MISSING_UV, MISSING_UV]);
    assert_eq!(mesh.normals, vec![MISSING_NORMAL; 3]);
    assert_eq!(mesh.indices, vec![0, 1, 2]);
}

#[test]
fn empty_source_still_yields_one_mesh() {
    let meshes = parse("", LoadOptions::default()).unwrap();
    assert_eq!(meshes.len(), 1);
    assert!(meshes[0].indices.is_empty());
    assert!(meshes[0].positions.is_empty());
}

#[test]
fn first_usemtl_only_selects_a_material() {
    let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nusemtl red\nf 3 2 1\n";
    let meshes = parse_obj(source, "test.obj", &LoadOptions::default(), |_| library()).unwrap();
    // no `mtllib`, so the lookup misses
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].indices, vec![0, 1, 2, 2, 1, 0]);
    assert!(meshes[0].material.is_zero());
}

#[test]
fn usemtl_splits_submeshes_and_shares_geometry() {
    init_logger();
    let meshes = parse(TWO_MATERIALS, LoadOptions::default()).unwrap();
    assert_eq!(meshes.len(), 2);

    assert_eq!(meshes[0].material.diffuse, Vector4::new(1.0, 0.0, 0.0, 255.0));
    assert_eq!(meshes[1].material.diffuse, Vector4::new(0.0, 0.0, 1.0, 255.0));

    // geometry is cumulative over the whole file
    assert_eq!(meshes[0].indices, vec![0, 1, 2]);
    assert_eq!(meshes[1].indices, vec![0, 1, 2, 1, 2, 3]);
    assert_eq!(meshes[1].positions.len(), 4);
    // face-order attributes are per sub-mesh
    assert_eq!(meshes[0].uvs.len(), 3);
    assert_eq!(meshes[1].uvs.len(), 3);
}

#[test]
fn split_policy_renumbers_each_submesh() {
    let meshes = parse(TWO_MATERIALS, split()).unwrap();
    assert_eq!(meshes.len(), 2);

    assert_eq!(meshes[0].positions, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]);
    assert_eq!(meshes[0].indices, vec![0, 1, 2]);
    assert_eq!(meshes[1].positions, vec![[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
    assert_eq!(meshes[1].indices, vec![0, 1, 2]);
}

#[test]
fn split_policy_deduplicates_shared_vertices() {
    let quad = parse(QUAD, split()).unwrap().remove(0);
    assert_eq!(quad.positions.len(), 4);
    assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
}

#[test]
fn split_policy_rejects_undefined_vertices() {
    let err = parse("v 0 0 0\nf 1 2 3\n", split()).unwrap_err();
    assert!(matches!(err, ModelError::Malformed { line: 2, .. }));
}

#[test]
fn every_mtllib_replaces_the_active_library() {
    let source = "mtllib a.mtl\nmtllib b.mtl\nusemtl only_in_b\n";
    let mut requested = Vec::new();
    let meshes = parse_obj(source, "test.obj", &LoadOptions::default(), |path| {
        requested.push(path.to_string());
        match path {
            "b.mtl" => MaterialLibrary::parse("newmtl only_in_b\nKa 1 1 1\n", path),
            _ => MaterialLibrary::new(),
        }
    })
    .unwrap();

    assert_eq!(requested, vec!["a.mtl", "b.mtl"]);
    assert_eq!(meshes[0].material.ambient, Vector4::new(1.0, 1.0, 1.0, 255.0));
}

#[test]
fn malformed_faces_are_rejected() {
    let quad_face = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3 4\n";
    match parse(quad_face, LoadOptions::default()).unwrap_err() {
        ModelError::Malformed {
            line, directive, ..
        } => {
            assert_eq!(line, 5);
            assert_eq!(directive, "f");
        }
        other => panic!("unexpected error {other:?}"),
    }

    assert!(parse("v 0 0 0\nf 0 1 1\n", LoadOptions::default()).is_err());
    assert!(parse("v 0 0 0\nf a b c\n", LoadOptions::default()).is_err());
    assert!(parse("f 1 2\n", LoadOptions::default()).is_err());
}

#[test]
fn malformed_vertices_are_rejected() {
    assert!(matches!(
        parse("v 1 2\n", LoadOptions::default()),
        Err(ModelError::Malformed { line: 1, .. })
    ));
    assert!(parse("v 1 two 3\n", LoadOptions::default()).is_err());
    assert!(parse("vt\n", LoadOptions::default()).is_err());
}

#[test]
fn unknown_directives_are_ignored() {
    let source = "# comment\ns off\no thing\ng group\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let meshes = parse(source, LoadOptions::default()).unwrap();
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].indices.len(), 3);
}

#[test]
fn load_model_resolves_material_library_next_to_the_model() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("scene.obj"), TWO_MATERIALS).unwrap();
    fs::write(
        dir.path().join("scene.mtl"),
        "newmtl red\nKd 1 0 0\nnewmtl blue\nKd 0 0 1\n",
    )
    .unwrap();

    let mut gfx = RecordingBackend::new();
    let model = load_model(dir.path().join("scene.obj"), &mut gfx, &LoadOptions::default())
        .unwrap()
        .loaded()
        .unwrap();

    assert_eq!(model.meshes.len(), 2);
    assert_eq!(gfx.uploads(), 2);
    assert_eq!(model.meshes[0].index_count, 3);
    assert_eq!(model.meshes[1].index_count, 6);
    assert_eq!(model.meshes[1].vertex_count, 12);
    assert_eq!(model.meshes[1].material.diffuse, Vector4::new(0.0, 0.0, 1.0, 255.0));
}

#[test]
fn loaded_counts_follow_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quad.obj");
    fs::write(&path, QUAD).unwrap();

    let mut gfx = RecordingBackend::new();
    let model = load_model(&path, &mut gfx, &LoadOptions::default())
        .unwrap()
        .loaded()
        .unwrap();

    assert_eq!(model.meshes.len(), 1);
    let mesh = model.meshes[0];
    assert_eq!(mesh.vertex_count, 3 * 4);
    assert_eq!(mesh.index_count, 3 * 2);
    let uploaded = &gfx.meshes[&mesh.buffers];
    assert_eq!(uploaded.uvs.len(), 6);
    assert_eq!(uploaded.normals.len(), 6);
}

#[test]
fn one_mesh_per_usemtl() {
    let source = "\
mtllib m.mtl
v 0 0 0
v 1 0 0
v 0 1 0
usemtl a
f 1 2 3
usemtl b
f 1 2 3
usemtl a
f 1 2 3
";
    let library = MaterialLibrary::parse("newmtl a\nKa 1 0 0\nnewmtl b\nKa 0 1 0\n", "m.mtl");
    let meshes = parse_obj(source, "test.obj", &split(), |_| library.clone()).unwrap();
    let meshes_without_library =
        parse_obj(source, "test.obj", &split(), |_| MaterialLibrary::new());

    assert_eq!(meshes.len(), 3);
    let ambient: Vec<f32> = meshes.iter().map(|m| m.material.ambient.x).collect();
    assert_eq!(ambient, vec![1.0, 0.0, 1.0]);
    assert!(meshes.iter().all(|m| m.indices == vec![0, 1, 2]));
    // an empty library: lookups miss but the load goes on
    assert_eq!(meshes_without_library.unwrap().len(), 3);
}

#[test]
fn unreadable_model_is_an_empty_model() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    // a directory cannot be read as text
    let path = dir.path().join("folder.obj");
    fs::create_dir(&path).unwrap();

    let mut gfx = RecordingBackend::new();
    let model = load_model(&path, &mut gfx, &LoadOptions::default())
        .unwrap()
        .loaded()
        .unwrap();
    assert!(model.is_empty());
    assert_eq!(gfx.uploads(), 0);
}

#[test]
fn load_model_dispatches_on_extension() {
    init_logger();
    let mut gfx = RecordingBackend::new();

    for name in ["tank.3ds", "tank.fbx", "tank"] {
        let outcome = load_model(name, &mut gfx, &LoadOptions::default()).unwrap();
        assert!(outcome.is_unsupported(), "{name} should be unsupported");
    }
    assert_eq!(gfx.uploads(), 0);

    match load_model("missing/tank.OBJ", &mut gfx, &LoadOptions::default()).unwrap() {
        LoadOutcome::Loaded(model) => assert!(model.is_empty()),
        LoadOutcome::Unsupported { .. } => panic!("obj must be supported"),
    }
}
