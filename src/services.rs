//! Collaborator interfaces the renderer and loaders drive.
//!
//! The renderer never talks to a graphics API directly. Everything it needs
//! from the driver is expressed by the traits in this module:
//!
//! - [`GeometryService`] uploads and releases mesh buffers
//! - [`ShaderService`] activates a shader and uploads named uniforms
//! - [`TextureService`] binds textures to slots
//! - [`RasterState`] toggles blend / depth state and issues indexed draws
//!
//! [`crate::context::Context`] implements all of them on top of wgpu. Tests use
//! a recording implementation instead.

use cgmath::{Matrix4, Vector4};

/// Opaque texture identity. `0` is reserved for "no texture".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl TextureId {
    /// Sentinel for untextured, solid-colour draws.
    pub const NONE: TextureId = TextureId(0);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

/// Handle to a shader program owned by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Handle to the GPU buffer set (positions, uvs, normals, indices) of one mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// CPU-side attribute streams handed to [`GeometryService::upload_mesh`].
///
/// The streams are uploaded as they are: the position stream is addressed by
/// `indices`, the uv and normal streams are not required to line up with it.
#[derive(Clone, Copy, Debug)]
pub struct MeshBuffers<'a> {
    pub positions: &'a [[f32; 3]],
    pub uvs: &'a [[f32; 2]],
    pub normals: &'a [[f32; 3]],
    pub indices: &'a [u32],
}

pub trait GeometryService {
    /// Upload four parallel buffers and return a handle to them.
    fn upload_mesh(&mut self, label: &str, buffers: MeshBuffers<'_>) -> MeshHandle;

    /// Release the buffers behind `mesh`. Using the handle afterwards is caller error.
    fn dispose_mesh(&mut self, mesh: MeshHandle);
}

pub trait ShaderService {
    fn start(&mut self, shader: ShaderHandle);
    fn stop(&mut self);
    fn upload_mat4(&mut self, shader: ShaderHandle, name: &str, value: Matrix4<f32>);
    fn upload_vec4(&mut self, shader: ShaderHandle, name: &str, value: Vector4<f32>);
    fn upload_int(&mut self, shader: ShaderHandle, name: &str, value: i32);
    fn upload_bool(&mut self, shader: ShaderHandle, name: &str, value: bool);
}

pub trait TextureService {
    fn bind(&mut self, texture: TextureId, slot: u32);
    fn unbind(&mut self, slot: u32);
}

pub trait RasterState {
    fn set_blend(&mut self, enabled: bool);
    fn set_depth_test(&mut self, enabled: bool);
    /// Draw `index_count` indices of `mesh` as a triangle list.
    fn draw_indexed(&mut self, mesh: MeshHandle, index_count: u32);
}

/// Everything the frame renderer needs from a driver.
pub trait GraphicsBackend: GeometryService + ShaderService + TextureService + RasterState {}

impl<T> GraphicsBackend for T where
    T: GeometryService + ShaderService + TextureService + RasterState
{
}
