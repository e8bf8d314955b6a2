//! Texture-batched 3D frame rendering.
//!
//! [`Renderer3D`] is an explicit context object holding the draw pool, the
//! active shader and the builtin shape templates. A frame runs through
//! `idle -> recording -> idle`:
//!
//! 1. [`Renderer3D::begin`] binds a shader, sets blend/depth state and clears the pool
//! 2. `draw_*` calls queue a snapshot of a model (meshes, transform, texture)
//!    under its texture identity
//! 3. [`Renderer3D::end`] flushes the pool: one texture bind per group, then per
//!    instance a transform upload and per mesh a material upload plus one
//!    indexed draw
//!
//! Groups are flushed in no particular order. Within a group instances are
//! drawn in the order they were queued.

use std::collections::HashMap;

use cgmath::{Vector2, Vector3};

use crate::{
    data_structures::{
        instance::Transform,
        model::{Mesh, Model},
        shapes::{Builtins, Shape},
    },
    resources::ModelError,
    services::{GeometryService, GraphicsBackend, ShaderHandle, TextureId},
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("draw calls are only valid between begin() and end()")]
    NotRecording,
    #[error("begin() called while a frame is already being recorded")]
    AlreadyRecording,
}

/// Texture slot every group is bound to.
pub const TEXTURE_SLOT: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Recording { shader: ShaderHandle },
}

/// A model snapshot queued for the current frame.
#[derive(Clone, Debug)]
pub struct QueuedModel {
    pub meshes: Vec<Mesh>,
    pub transform: Transform,
}

/// Per-frame mapping from texture identity to the instances using it.
///
/// The pool only holds copies of mesh handles and never releases GPU resources.
#[derive(Debug, Default)]
pub struct DrawPool {
    groups: HashMap<TextureId, Vec<QueuedModel>>,
}

impl DrawPool {
    pub fn push(&mut self, texture: TextureId, model: QueuedModel) {
        self.groups.entry(texture).or_default().push(model);
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct texture groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of queued instances over all groups.
    pub fn instance_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn group(&self, texture: TextureId) -> Option<&[QueuedModel]> {
        self.groups.get(&texture).map(Vec::as_slice)
    }

    fn drain(&mut self) -> impl Iterator<Item = (TextureId, Vec<QueuedModel>)> + '_ {
        self.groups.drain()
    }
}

pub struct Renderer3D {
    pool: DrawPool,
    state: FrameState,
    builtins: Builtins,
}

impl Renderer3D {
    /// Create a renderer and upload its builtin shape templates.
    pub fn new(gfx: &mut impl GeometryService) -> Result<Self, ModelError> {
        Ok(Self {
            pool: DrawPool::default(),
            state: FrameState::Idle,
            builtins: Builtins::load(gfx)?,
        })
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn pool(&self) -> &DrawPool {
        &self.pool
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Start recording a frame with `shader` active.
    pub fn begin(
        &mut self,
        gfx: &mut impl GraphicsBackend,
        shader: ShaderHandle,
        blend: bool,
        depth_test: bool,
    ) -> Result<(), RenderError> {
        if let FrameState::Recording { .. } = self.state {
            return Err(RenderError::AlreadyRecording);
        }
        gfx.start(shader);
        gfx.set_blend(blend);
        gfx.set_depth_test(depth_test);
        self.pool.clear();
        self.state = FrameState::Recording { shader };
        Ok(())
    }

    /// Queue `model` with its current transform and texture.
    pub fn draw_model(&mut self, model: &Model) -> Result<(), RenderError> {
        self.queue(model.meshes.clone(), model.transform, model.texture)
    }

    pub fn draw_cube(
        &mut self,
        position: Vector3<f32>,
        scale: Vector3<f32>,
        rotation: Vector3<f32>,
        texture: TextureId,
    ) -> Result<(), RenderError> {
        let transform = Transform::from_parts(position, rotation, scale);
        self.queue_builtin(Shape::Cube, transform, texture)
    }

    pub fn draw_sphere(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        radius: f32,
        texture: TextureId,
    ) -> Result<(), RenderError> {
        let transform = Transform::from_parts(
            Vector3::new(x, y, z),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(radius, radius, radius),
        );
        self.queue_builtin(Shape::Sphere, transform, texture)
    }

    /// Billboard of `size` (width, height); the quad lies in its local YZ plane.
    ///
    /// Textured and solid-colour billboards share this shape: both are scaled
    /// by `(1, width, height)`, also when `texture` is [`TextureId::NONE`].
    pub fn draw_billboard(
        &mut self,
        position: Vector3<f32>,
        size: Vector2<f32>,
        rotation: Vector3<f32>,
        texture: TextureId,
    ) -> Result<(), RenderError> {
        let transform =
            Transform::from_parts(position, rotation, Vector3::new(1.0, size.x, size.y));
        self.queue_builtin(Shape::Billboard, transform, texture)
    }

    /// Billboard at a point, turned to face the default camera.
    pub fn draw_billboard_at(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        width: f32,
        height: f32,
        texture: TextureId,
    ) -> Result<(), RenderError> {
        self.draw_billboard(
            Vector3::new(x, y, z),
            Vector2::new(width, height),
            Vector3::new(180.0, 90.0, 0.0),
            texture,
        )
    }

    fn queue_builtin(
        &mut self,
        shape: Shape,
        transform: Transform,
        texture: TextureId,
    ) -> Result<(), RenderError> {
        let meshes = self.builtins.meshes(shape).to_vec();
        self.queue(meshes, transform, texture)
    }

    fn queue(
        &mut self,
        meshes: Vec<Mesh>,
        transform: Transform,
        texture: TextureId,
    ) -> Result<(), RenderError> {
        let FrameState::Recording { .. } = self.state else {
            return Err(RenderError::NotRecording);
        };
        self.pool.push(texture, QueuedModel { meshes, transform });
        Ok(())
    }

    /// Flush the pool and return to idle.
    pub fn end(&mut self, gfx: &mut impl GraphicsBackend) -> Result<(), RenderError> {
        let FrameState::Recording { shader } = self.state else {
            return Err(RenderError::NotRecording);
        };

        for (texture, models) in self.pool.drain() {
            gfx.bind(texture, TEXTURE_SLOT);
            gfx.upload_int(shader, "tex", TEXTURE_SLOT as i32);

            for model in &models {
                gfx.upload_mat4(shader, "transformation", model.transform.to_matrix());
                gfx.upload_bool(shader, "textureIsBound", !texture.is_none());

                for mesh in &model.meshes {
                    let material = &mesh.material;
                    gfx.upload_vec4(shader, "ambientColor", material.ambient);
                    gfx.upload_vec4(shader, "diffuseColor", material.diffuse);
                    gfx.upload_vec4(shader, "specularColor", material.specular);
                    gfx.draw_indexed(mesh.buffers, mesh.index_count);
                }
            }
            gfx.unbind(TEXTURE_SLOT);
        }

        gfx.stop();
        self.state = FrameState::Idle;
        Ok(())
    }

    /// Release the builtin templates.
    pub fn dispose(&mut self, gfx: &mut impl GeometryService) {
        self.builtins.dispose(gfx);
    }
}
