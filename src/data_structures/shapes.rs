//! Builtin primitive shapes.
//!
//! The cube and the billboard are embedded OBJ sources parsed with the
//! vertex-aligned attribute layout; the sphere is generated. All of them use
//! [`Material::builtin`]. They are immutable templates: a draw call never
//! mutates them, it queues their meshes together with its own transform.

use std::f32::consts::PI;

use crate::{
    data_structures::model::{Material, Mesh},
    resources::{
        ModelError,
        material::MaterialLibrary,
        mesh::{MeshData, build_mesh},
        obj::{AttributeLayout, LoadOptions, parse_obj},
    },
    services::GeometryService,
};

pub const CUBE_OBJ: &str = include_str!("../../assets/builtin/cube.obj");
pub const BILLBOARD_OBJ: &str = include_str!("../../assets/builtin/billboard.obj");

pub const SPHERE_RINGS: u32 = 16;
pub const SPHERE_SEGMENTS: u32 = 24;

fn builtin_from_obj(source: &str, label: &str) -> Result<MeshData, ModelError> {
    let options = LoadOptions {
        split_submesh_geometry: false,
        layout: AttributeLayout::PerVertex,
    };
    let mut parts = parse_obj(source, label, &options, |_| MaterialLibrary::new())?;
    let mut data = parts.pop().unwrap_or_default();
    data.material = Material::builtin();
    Ok(data)
}

pub fn cube_data() -> Result<MeshData, ModelError> {
    builtin_from_obj(CUBE_OBJ, "builtin cube")
}

pub fn billboard_data() -> Result<MeshData, ModelError> {
    builtin_from_obj(BILLBOARD_OBJ, "builtin billboard")
}

/// Unit UV sphere with `rings` latitude bands and `segments` longitude bands.
pub fn sphere_data(rings: u32, segments: u32) -> MeshData {
    let rings = rings.max(2);
    let segments = segments.max(3);
    let mut data = MeshData {
        material: Material::builtin(),
        ..Default::default()
    };

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let theta = v * PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let phi = u * 2.0 * PI;
            let p = [theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
            data.positions.push(p);
            data.normals.push(p);
            data.uvs.push([u, v]);
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            data.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    data
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Cube,
    Sphere,
    Billboard,
}

/// GPU copies of the builtin templates owned by one renderer.
#[derive(Clone, Debug)]
pub struct Builtins {
    pub cube: Vec<Mesh>,
    pub sphere: Vec<Mesh>,
    pub billboard: Vec<Mesh>,
}

impl Builtins {
    pub fn load(gfx: &mut impl GeometryService) -> Result<Self, ModelError> {
        let cube = build_mesh(gfx, "builtin cube", &cube_data()?)?;
        let sphere = build_mesh(
            gfx,
            "builtin sphere",
            &sphere_data(SPHERE_RINGS, SPHERE_SEGMENTS),
        )?;
        let billboard = build_mesh(gfx, "builtin billboard", &billboard_data()?)?;
        Ok(Self {
            cube: vec![cube],
            sphere: vec![sphere],
            billboard: vec![billboard],
        })
    }

    pub fn meshes(&self, shape: Shape) -> &[Mesh] {
        match shape {
            Shape::Cube => &self.cube,
            Shape::Sphere => &self.sphere,
            Shape::Billboard => &self.billboard,
        }
    }

    pub fn dispose(&mut self, gfx: &mut impl GeometryService) {
        for mesh in self
            .cube
            .drain(..)
            .chain(self.sphere.drain(..))
            .chain(self.billboard.drain(..))
        {
            mesh.dispose(gfx);
        }
    }
}
