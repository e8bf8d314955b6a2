#![allow(dead_code)]

use std::collections::HashMap;

use flow_batch::{
    Matrix4, Vector4,
    services::{
        GeometryService, MeshBuffers, MeshHandle, RasterState, ShaderHandle, ShaderService,
        TextureId, TextureService,
    },
};

/// One service call as seen by the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Upload(MeshHandle),
    Dispose(MeshHandle),
    Start(ShaderHandle),
    Stop,
    Mat4(String, Matrix4<f32>),
    Vec4(String, Vector4<f32>),
    Int(String, i32),
    Bool(String, bool),
    Bind(TextureId, u32),
    Unbind(u32),
    Blend(bool),
    DepthTest(bool),
    Draw(MeshHandle, u32),
}

/// Buffers handed to `upload_mesh`, copied out verbatim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadedMesh {
    pub label: String,
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// A graphics backend that only records what it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub meshes: HashMap<MeshHandle, UploadedMesh>,
    next_mesh: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn uploads(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Upload(_)))
            .count()
    }

    pub fn disposed(&self) -> Vec<MeshHandle> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Dispose(mesh) => Some(*mesh),
                _ => None,
            })
            .collect()
    }

    pub fn binds(&self) -> Vec<TextureId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Bind(texture, _) => Some(*texture),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<(MeshHandle, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Draw(mesh, count) => Some((*mesh, *count)),
                _ => None,
            })
            .collect()
    }

    /// Every `transformation` upload, in call order.
    pub fn transformations(&self) -> Vec<Matrix4<f32>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Mat4(name, value) if name == "transformation" => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// The `(texture, draws)` sequence between each bind and its unbind.
    pub fn groups(&self) -> Vec<(TextureId, Vec<MeshHandle>)> {
        let mut groups = Vec::new();
        for call in &self.calls {
            match call {
                Call::Bind(texture, _) => groups.push((*texture, Vec::new())),
                Call::Draw(mesh, _) => {
                    if let Some((_, draws)) = groups.last_mut() {
                        draws.push(*mesh);
                    }
                }
                _ => (),
            }
        }
        groups
    }
}

impl GeometryService for RecordingBackend {
    fn upload_mesh(&mut self, label: &str, buffers: MeshBuffers<'_>) -> MeshHandle {
        let handle = MeshHandle(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(
            handle,
            UploadedMesh {
                label: label.to_string(),
                positions: buffers.positions.to_vec(),
                uvs: buffers.uvs.to_vec(),
                normals: buffers.normals.to_vec(),
                indices: buffers.indices.to_vec(),
            },
        );
        self.calls.push(Call::Upload(handle));
        handle
    }

    fn dispose_mesh(&mut self, mesh: MeshHandle) {
        self.meshes.remove(&mesh);
        self.calls.push(Call::Dispose(mesh));
    }
}

impl ShaderService for RecordingBackend {
    fn start(&mut self, shader: ShaderHandle) {
        self.calls.push(Call::Start(shader));
    }

    fn stop(&mut self) {
        self.calls.push(Call::Stop);
    }

    fn upload_mat4(&mut self, _: ShaderHandle, name: &str, value: Matrix4<f32>) {
        self.calls.push(Call::Mat4(name.to_string(), value));
    }

    fn upload_vec4(&mut self, _: ShaderHandle, name: &str, value: Vector4<f32>) {
        self.calls.push(Call::Vec4(name.to_string(), value));
    }

    fn upload_int(&mut self, _: ShaderHandle, name: &str, value: i32) {
        self.calls.push(Call::Int(name.to_string(), value));
    }

    fn upload_bool(&mut self, _: ShaderHandle, name: &str, value: bool) {
        self.calls.push(Call::Bool(name.to_string(), value));
    }
}

impl TextureService for RecordingBackend {
    fn bind(&mut self, texture: TextureId, slot: u32) {
        self.calls.push(Call::Bind(texture, slot));
    }

    fn unbind(&mut self, slot: u32) {
        self.calls.push(Call::Unbind(slot));
    }
}

impl RasterState for RecordingBackend {
    fn set_blend(&mut self, enabled: bool) {
        self.calls.push(Call::Blend(enabled));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(Call::DepthTest(enabled));
    }

    fn draw_indexed(&mut self, mesh: MeshHandle, index_count: u32) {
        self.calls.push(Call::Draw(mesh, index_count));
    }
}

/// Route `log` output to the test harness; safe to call from every test.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
