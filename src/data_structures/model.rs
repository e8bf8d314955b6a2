//! Meshes, materials and models.
//!
//! A [`Model`] is an ordered list of [`Mesh`]es plus an instance [`Transform`]
//! and an optional texture. Meshes only hold handles to GPU buffers, so models
//! are cheap to copy into the draw pool once per draw call.

use cgmath::Vector4;

use crate::{
    data_structures::instance::Transform,
    services::{GeometryService, MeshHandle, TextureId},
};

/// Ambient, diffuse and specular colour of a mesh.
///
/// Colours read from a material library keep their file values for rgb and
/// get a fixed alpha of `255.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: Vector4<f32>,
    pub diffuse: Vector4<f32>,
    pub specular: Vector4<f32>,
}

impl Material {
    pub const ALPHA: f32 = 255.0;

    pub fn zero() -> Self {
        Self {
            ambient: Vector4::new(0.0, 0.0, 0.0, 0.0),
            diffuse: Vector4::new(0.0, 0.0, 0.0, 0.0),
            specular: Vector4::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Material used by the builtin shapes: full ambient, nothing else.
    pub fn builtin() -> Self {
        Self {
            ambient: Vector4::new(255.0, 255.0, 255.0, 255.0),
            ..Self::zero()
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::zero()
    }
}

/// One GPU resident drawable unit.
///
/// `vertex_count` counts position components (three per vertex), the way the
/// position buffer is sized. `index_count` counts indices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mesh {
    pub buffers: MeshHandle,
    pub vertex_count: u32,
    pub index_count: u32,
    pub material: Material,
}

impl Mesh {
    pub fn dispose(&self, gfx: &mut impl GeometryService) {
        gfx.dispose_mesh(self.buffers);
    }
}

/// A reusable template: meshes plus the transform and texture of its next draw.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub transform: Transform,
    pub texture: TextureId,
}

impl Model {
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            transform: Transform::default(),
            texture: TextureId::NONE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Release every mesh. The model must not be drawn afterwards.
    pub fn dispose(&mut self, gfx: &mut impl GeometryService) {
        for mesh in &self.meshes {
            mesh.dispose(gfx);
        }
        self.meshes.clear();
    }
}

/// Describes how one attribute stream is laid out in GPU memory.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Position stream, slot 0.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

/// Texture coordinate stream, slot 1.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UvVertex {
    pub tex_coords: [f32; 2],
}

/// Normal stream, slot 2.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NormalVertex {
    pub normal: [f32; 3],
}

impl Vertex for PositionVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<PositionVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}

impl Vertex for UvVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<UvVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

impl Vertex for NormalVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<NormalVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}
