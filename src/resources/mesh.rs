//! Mesh building: CPU attribute streams in, GPU mesh handles out.
//!
//! [`MeshData`] is what the OBJ parser and the builtin shapes produce. The
//! builder hands its four streams to a [`GeometryService`] unchanged and only
//! checks that the index list describes whole triangles.

use crate::{
    data_structures::model::{Material, Mesh},
    resources::ModelError,
    services::{GeometryService, MeshBuffers},
};

/// CPU side attribute streams of one sub-mesh, ready for upload.
///
/// `indices` address `positions`. `uvs` and `normals` are in whatever order
/// the producer emitted them; the builder uploads them untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub material: Material,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Upload `data` and wrap the buffers in a [`Mesh`].
///
/// Vertices are neither reordered nor deduplicated. The index list has to
/// describe whole triangles, anything else is rejected before touching the GPU.
pub fn build_mesh(
    gfx: &mut impl GeometryService,
    label: &str,
    data: &MeshData,
) -> Result<Mesh, ModelError> {
    if data.indices.len() % 3 != 0 {
        return Err(ModelError::IndexCount(data.indices.len()));
    }

    let buffers = gfx.upload_mesh(
        label,
        MeshBuffers {
            positions: &data.positions,
            uvs: &data.uvs,
            normals: &data.normals,
            indices: &data.indices,
        },
    );

    Ok(Mesh {
        buffers,
        vertex_count: (data.positions.len() * 3) as u32,
        index_count: data.indices.len() as u32,
        material: data.material,
    })
}

/// Build every sub-mesh of a parsed model, releasing what was already
/// uploaded if one of them is rejected.
pub fn build_meshes(
    gfx: &mut impl GeometryService,
    label: &str,
    parts: &[MeshData],
) -> Result<Vec<Mesh>, ModelError> {
    let mut meshes = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        match build_mesh(gfx, &format!("{} #{}", label, idx), part) {
            Ok(mesh) => meshes.push(mesh),
            Err(e) => {
                meshes.iter().for_each(|mesh: &Mesh| mesh.dispose(gfx));
                return Err(e);
            }
        }
    }
    Ok(meshes)
}
