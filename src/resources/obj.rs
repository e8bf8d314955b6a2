//! Wavefront OBJ geometry parsing.
//!
//! The parser walks the file once, line by line, and produces one [`MeshData`]
//! per sub-mesh. Sub-meshes are delimited by `usemtl`: the first `usemtl` only
//! selects a material, every later one closes the current sub-mesh under the
//! previous material. End of file always closes one last sub-mesh, so a parse
//! never yields zero meshes.
//!
//! Indices always address positions. In the default [`AttributeLayout::FaceOrder`]
//! layout texture coordinates and normals are emitted once per processed face
//! vertex, so they only line up with positions when every vertex is referenced
//! exactly once, in order. [`AttributeLayout::PerVertex`] writes them into the
//! slot of the vertex they belong to instead (last write wins).

use std::collections::HashMap;

use crate::{
    data_structures::model::Material,
    resources::{
        ModelError,
        material::MaterialLibrary,
        mesh::MeshData,
        tokenizer::{Lines, fields, split},
    },
};

/// Texture coordinate used when a face references one that does not exist.
/// It is `(0, 0)` after the v-flip.
pub const MISSING_UV: [f32; 2] = [0.0, 1.0];
pub const MISSING_NORMAL: [f32; 3] = [0.0, 0.0, 0.0];

/// Where per-vertex attributes end up in the uploaded streams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttributeLayout {
    /// One uv/normal per processed face vertex, in face order.
    #[default]
    FaceOrder,
    /// One uv/normal per position, written at the referenced vertex slot.
    PerVertex,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// When `false` every sub-mesh carries all positions read so far and the
    /// index list of the whole file up to its end. When `true` each sub-mesh
    /// only gets the positions its own faces reference, renumbered locally.
    pub split_submesh_geometry: bool,
    pub layout: AttributeLayout,
}

/// Parse OBJ `source`. `label` names the file in diagnostics.
///
/// `load_mtl` is called with the raw argument of every `mtllib` directive and
/// returns the library that becomes active.
pub fn parse_obj<F>(
    source: &str,
    label: &str,
    options: &LoadOptions,
    load_mtl: F,
) -> Result<Vec<MeshData>, ModelError>
where
    F: FnMut(&str) -> MaterialLibrary,
{
    let mut parser = ObjParser::new(label, *options, load_mtl);
    for (number, line) in Lines::new(source) {
        parser.line(number, line)?;
    }
    Ok(parser.finish())
}

/// One `v/vt/vn` reference of a face, already resolved.
struct FaceVertex {
    vertex: u32,
    uv: [f32; 2],
    normal: [f32; 3],
}

struct ObjParser<'a, F> {
    label: &'a str,
    options: LoadOptions,
    load_mtl: F,

    positions: Vec<[f32; 3]>,
    raw_uvs: Vec<[f32; 2]>,
    raw_normals: Vec<[f32; 3]>,

    // Per sub-mesh accumulators. `indices` is global in the shared policy and
    // local (into `local_positions`) in the split policy.
    indices: Vec<u32>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    local_positions: Vec<[f32; 3]>,
    remap: HashMap<u32, u32>,
    slot_writes: Vec<(u32, [f32; 2], [f32; 3])>,

    library: Option<MaterialLibrary>,
    material: Material,
    material_switches: usize,
    meshes: Vec<MeshData>,
}

impl<'a, F> ObjParser<'a, F>
where
    F: FnMut(&str) -> MaterialLibrary,
{
    fn new(label: &'a str, options: LoadOptions, load_mtl: F) -> Self {
        Self {
            label,
            options,
            load_mtl,
            positions: Vec::new(),
            raw_uvs: Vec::new(),
            raw_normals: Vec::new(),
            indices: Vec::new(),
            uvs: Vec::new(),
            normals: Vec::new(),
            local_positions: Vec::new(),
            remap: HashMap::new(),
            slot_writes: Vec::new(),
            library: None,
            material: Material::zero(),
            material_switches: 0,
            meshes: Vec::new(),
        }
    }

    fn line(&mut self, number: usize, line: &str) -> Result<(), ModelError> {
        let tokens = fields(line);
        let Some(directive) = tokens.first().copied() else {
            return Ok(());
        };
        let args = &tokens[1..];

        match directive {
            "mtllib" => {
                let path = args.join(" ");
                if self.library.is_some() {
                    log::info!("[{}] Replacing active material library with {}", self.label, path);
                }
                self.library = Some((self.load_mtl)(&path));
            }
            "o" | "g" => {
                log::info!(
                    "[{}] Loading mesh group from .OBJ. ({})",
                    self.label,
                    args.join(" ")
                );
            }
            "v" => {
                let v = self.floats::<3>(number, directive, args, 3)?;
                self.positions.push(v);
            }
            "vt" => {
                let uv = self.floats::<2>(number, directive, args, 1)?;
                self.raw_uvs.push(uv);
            }
            "vn" => {
                let n = self.floats::<3>(number, directive, args, 3)?;
                self.raw_normals.push(n);
            }
            "f" => {
                if args.len() != 3 {
                    return Err(self.malformed(
                        number,
                        directive,
                        format!("expected 3 vertex references, found {}", args.len()),
                    ));
                }
                for reference in args {
                    let face_vertex = self.face_vertex(number, reference)?;
                    self.push_face_vertex(number, face_vertex)?;
                }
            }
            "usemtl" => {
                if self.material_switches != 0 {
                    self.finish_submesh();
                }
                let name = args.join(" ");
                self.material = match &self.library {
                    Some(library) => library.find(&name),
                    None => MaterialLibrary::new().find(&name),
                };
                self.material_switches += 1;
            }
            _ => (),
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<MeshData> {
        self.finish_submesh();
        self.meshes
    }

    /// Close the current sub-mesh under the active material.
    fn finish_submesh(&mut self) {
        let positions = if self.options.split_submesh_geometry {
            self.remap.clear();
            std::mem::take(&mut self.local_positions)
        } else {
            self.positions.clone()
        };
        let indices = if self.options.split_submesh_geometry {
            std::mem::take(&mut self.indices)
        } else {
            self.indices.clone()
        };

        let (uvs, normals) = match self.options.layout {
            AttributeLayout::FaceOrder => {
                (std::mem::take(&mut self.uvs), std::mem::take(&mut self.normals))
            }
            AttributeLayout::PerVertex => {
                let mut uvs = vec![[0.0; 2]; positions.len()];
                let mut normals = vec![[0.0; 3]; positions.len()];
                for (slot, uv, normal) in self.slot_writes.drain(..) {
                    if let Some(target) = uvs.get_mut(slot as usize) {
                        *target = uv;
                    }
                    if let Some(target) = normals.get_mut(slot as usize) {
                        *target = normal;
                    }
                }
                (uvs, normals)
            }
        };

        let mesh = MeshData {
            positions,
            uvs,
            normals,
            indices,
            material: self.material,
        };
        log::info!(
            "[{}] .obj mesh #{} loaded! ({} triangles)",
            self.label,
            self.meshes.len(),
            mesh.triangle_count()
        );
        self.meshes.push(mesh);
    }

    fn push_face_vertex(&mut self, number: usize, fv: FaceVertex) -> Result<(), ModelError> {
        let index = if self.options.split_submesh_geometry {
            let Some(position) = self.positions.get(fv.vertex as usize).copied() else {
                return Err(self.malformed(
                    number,
                    "f",
                    format!("vertex {} is not defined", fv.vertex + 1),
                ));
            };
            let next = self.local_positions.len() as u32;
            let local = *self.remap.entry(fv.vertex).or_insert(next);
            if local == next {
                self.local_positions.push(position);
            }
            local
        } else {
            if fv.vertex as usize >= self.positions.len() {
                log::warn!(
                    "[{}:{}] Face references vertex {} before it is defined",
                    self.label,
                    number,
                    fv.vertex + 1
                );
            }
            fv.vertex
        };
        self.indices.push(index);

        match self.options.layout {
            AttributeLayout::FaceOrder => {
                self.uvs.push(fv.uv);
                self.normals.push(fv.normal);
            }
            AttributeLayout::PerVertex => {
                if fv.vertex as usize >= self.positions.len() {
                    return Err(self.malformed(
                        number,
                        "f",
                        format!("vertex {} is not defined", fv.vertex + 1),
                    ));
                }
                self.slot_writes.push((index, fv.uv, fv.normal));
            }
        }
        Ok(())
    }

    /// Resolve one `v/vt/vn` reference. Only the vertex part is mandatory;
    /// missing or out-of-range texture coordinates and normals fall back to
    /// [`MISSING_UV`] and [`MISSING_NORMAL`].
    fn face_vertex(&self, number: usize, reference: &str) -> Result<FaceVertex, ModelError> {
        let parts = split(reference, '/');
        let vertex = match parts[0].parse::<u32>() {
            Ok(v) if v >= 1 => v - 1,
            _ => {
                return Err(self.malformed(
                    number,
                    "f",
                    format!("invalid vertex reference `{}`", reference),
                ));
            }
        };

        let uv = match lookup(&self.raw_uvs, parts.get(1).copied()) {
            Some(uv) => [uv[0], 1.0 - uv[1]],
            None => {
                log::warn!(
                    "[{}:{}] Texture coordinate of `{}` out of range, using {:?}",
                    self.label,
                    number,
                    reference,
                    MISSING_UV
                );
                MISSING_UV
            }
        };

        let normal = match lookup(&self.raw_normals, parts.get(2).copied()) {
            Some(normal) => normal,
            None => {
                log::debug!(
                    "[{}:{}] Normal of `{}` out of range",
                    self.label,
                    number,
                    reference
                );
                MISSING_NORMAL
            }
        };

        Ok(FaceVertex {
            vertex,
            uv,
            normal,
        })
    }

    /// Read `N` floats from `args`; components past `required` default to zero.
    fn floats<const N: usize>(
        &self,
        number: usize,
        directive: &str,
        args: &[&str],
        required: usize,
    ) -> Result<[f32; N], ModelError> {
        if args.len() < required {
            return Err(self.malformed(
                number,
                directive,
                format!("expected {} components, found {}", required, args.len()),
            ));
        }
        let mut out = [0.0; N];
        for (slot, token) in out.iter_mut().zip(args) {
            *slot = token.parse().map_err(|_| {
                self.malformed(number, directive, format!("`{}` is not a number", token))
            })?;
        }
        Ok(out)
    }

    fn malformed(&self, line: usize, directive: &str, reason: String) -> ModelError {
        ModelError::Malformed {
            path: self.label.to_string(),
            line,
            directive: directive.to_string(),
            reason,
        }
    }
}

/// 1-based lookup with explicit bounds checks instead of failing on a miss.
fn lookup<T: Copy>(items: &[T], reference: Option<&str>) -> Option<T> {
    let index = reference?.parse::<usize>().ok()?;
    items.get(index.checked_sub(1)?).copied()
}
