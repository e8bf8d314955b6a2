use flow_batch::{
    data_structures::{
        model::Material,
        shapes::{self, SPHERE_RINGS, SPHERE_SEGMENTS},
    },
    resources::{
        ModelError,
        mesh::{MeshData, build_mesh, build_meshes},
    },
};

mod common;
use common::test_utils::RecordingBackend;

fn triangle() -> MeshData {
    MeshData {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        uvs: vec![[0.0, 0.0]; 3],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        indices: vec![0, 1, 2],
        material: Material::builtin(),
    }
}

#[test]
fn uploads_streams_verbatim() {
    let mut gfx = RecordingBackend::new();
    let data = triangle();
    let mesh = build_mesh(&mut gfx, "triangle", &data).unwrap();

    assert_eq!(mesh.vertex_count, 9);
    assert_eq!(mesh.index_count, 3);
    assert_eq!(mesh.material, Material::builtin());

    let uploaded = &gfx.meshes[&mesh.buffers];
    assert_eq!(uploaded.label, "triangle");
    assert_eq!(uploaded.positions, data.positions);
    assert_eq!(uploaded.uvs, data.uvs);
    assert_eq!(uploaded.normals, data.normals);
    assert_eq!(uploaded.indices, data.indices);
}

#[test]
fn empty_mesh_is_valid() {
    let mut gfx = RecordingBackend::new();
    let mesh = build_mesh(&mut gfx, "empty", &MeshData::default()).unwrap();
    assert_eq!(mesh.index_count, 0);
    assert_eq!(mesh.vertex_count, 0);
}

#[test]
fn partial_triangles_are_rejected_before_upload() {
    let mut gfx = RecordingBackend::new();
    let mut data = triangle();
    data.indices.push(0);

    let err = build_mesh(&mut gfx, "broken", &data).unwrap_err();
    assert!(matches!(err, ModelError::IndexCount(4)));
    assert_eq!(gfx.uploads(), 0);
}

#[test]
fn failed_build_releases_earlier_meshes() {
    let mut gfx = RecordingBackend::new();
    let mut broken = triangle();
    broken.indices.truncate(2);

    let result = build_meshes(&mut gfx, "model", &[triangle(), triangle(), broken]);
    assert!(matches!(result, Err(ModelError::IndexCount(2))));
    assert_eq!(gfx.uploads(), 2);
    assert_eq!(gfx.disposed().len(), 2);
    assert!(gfx.meshes.is_empty());
}

#[test]
fn builtin_shapes_are_vertex_aligned() {
    for data in [shapes::cube_data().unwrap(), shapes::billboard_data().unwrap()] {
        assert!(!data.indices.is_empty());
        assert_eq!(data.indices.len() % 3, 0);
        assert_eq!(data.uvs.len(), data.positions.len());
        assert_eq!(data.normals.len(), data.positions.len());
        assert!(data.indices.iter().all(|&i| (i as usize) < data.positions.len()));
        assert_eq!(data.material, Material::builtin());
    }
}

#[test]
fn sphere_is_a_closed_uv_sphere() {
    let sphere = shapes::sphere_data(SPHERE_RINGS, SPHERE_SEGMENTS);
    let rings = SPHERE_RINGS as usize;
    let segments = SPHERE_SEGMENTS as usize;

    assert_eq!(sphere.positions.len(), (rings + 1) * (segments + 1));
    assert_eq!(sphere.indices.len(), rings * segments * 6);
    assert!(sphere.indices.iter().all(|&i| (i as usize) < sphere.positions.len()));
    for p in &sphere.positions {
        let length = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        assert!((length - 1.0).abs() < 1e-5);
    }
}
