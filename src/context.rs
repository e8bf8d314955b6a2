//! The wgpu backed graphics context.
//!
//! [`Context`] owns the device and queue and implements every service trait
//! the renderer talks to. Service calls are recorded into a frame: uniform
//! uploads are staged CPU side, every indexed draw snapshots the staged
//! uniforms together with the bound texture and raster state. The recorded
//! frame is replayed into a single render pass by [`Context::render_to`].

use std::{collections::HashMap, iter};

use cgmath::{Matrix4, Vector4};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::{self, Texture},
    pipelines::{
        MODEL_SHADER,
        basic::{ModelUniform, UNIFORM_STRIDE, mk_model_pipeline, uniform_layout},
    },
    render::TEXTURE_SLOT,
    services::{
        GeometryService, MeshBuffers, MeshHandle, RasterState, ShaderHandle, ShaderService,
        TextureId, TextureService,
    },
};

struct GpuMesh {
    positions: wgpu::Buffer,
    uvs: wgpu::Buffer,
    normals: wgpu::Buffer,
    indices: wgpu::Buffer,
}

impl GpuMesh {
    fn is_drawable(&self) -> bool {
        [&self.positions, &self.uvs, &self.normals, &self.indices]
            .iter()
            .all(|buffer| buffer.size() > 0)
    }
}

struct ShaderProgram {
    label: String,
    // indexed by `pipeline_index(blend, depth_test)`
    pipelines: [wgpu::RenderPipeline; 4],
    uniforms: ModelUniform,
}

fn pipeline_index(blend: bool, depth_test: bool) -> usize {
    (usize::from(blend) << 1) | usize::from(depth_test)
}

struct DrawCommand {
    pipeline: (ShaderHandle, usize),
    texture: TextureId,
    mesh: MeshHandle,
    index_count: u32,
    uniform_slot: u32,
}

#[derive(Default)]
struct FrameRecorder {
    active: Option<ShaderHandle>,
    blend: bool,
    depth_test: bool,
    bound: HashMap<u32, TextureId>,
    commands: Vec<DrawCommand>,
    uniforms: Vec<ModelUniform>,
}

pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub clear_colour: wgpu::Color,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    meshes: HashMap<MeshHandle, GpuMesh>,
    next_mesh: u32,
    textures: HashMap<TextureId, wgpu::BindGroup>,
    blank_texture: wgpu::BindGroup,
    next_texture: u32,
    shaders: Vec<ShaderProgram>,
    default_shader: ShaderHandle,
    frame: FrameRecorder,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("format", &self.format)
            .field("meshes", &self.meshes.len())
            .field("textures", &self.textures.len())
            .field(
                "shaders",
                &self.shaders.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Context {
    /// Create a context without a window, rendering into `format` targets.
    ///
    /// Failing to acquire an adapter or device is fatal for the caller: there
    /// is no fallback rendering path.
    pub async fn new_headless(format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flow-batch device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;
        log::info!("GPU context created on {}", adapter.get_info().name);

        Ok(Self::from_device(device, queue, format))
    }

    /// Blocking wrapper around [`Context::new_headless`] for callers without an executor.
    pub fn new_headless_blocking(format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        futures::executor::block_on(Self::new_headless(format))
    }

    /// Wrap an existing device, e.g. one shared with a windowing layer.
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> Self {
        let uniform_layout = uniform_layout(&device);
        let texture_layout = texture::texture_layout(&device);
        let white = Texture::create_solid([255, 255, 255, 255], 1, 1, &device, &queue);
        let blank_texture =
            texture::texture_bind_group(&device, &texture_layout, &white, "blank texture");

        let mut ctx = Self {
            device,
            queue,
            format,
            clear_colour: wgpu::Color::BLACK,
            uniform_layout,
            texture_layout,
            meshes: HashMap::new(),
            next_mesh: 0,
            textures: HashMap::new(),
            blank_texture,
            next_texture: TextureId::NONE.0 + 1,
            shaders: Vec::new(),
            default_shader: ShaderHandle(0),
            frame: FrameRecorder::default(),
        };
        ctx.default_shader = ctx.create_shader("Model Shader", MODEL_SHADER);
        ctx
    }

    pub fn default_shader(&self) -> ShaderHandle {
        self.default_shader
    }

    /// Compile `wgsl` and build its pipeline variants.
    ///
    /// The shader must read [`ModelUniform`] at group 0 and a texture/sampler
    /// pair at group 1, with `vs_main` / `fs_main` entry points.
    pub fn create_shader(&mut self, label: &str, wgsl: &str) -> ShaderHandle {
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });
        let pipeline = |blend, depth_test| {
            mk_model_pipeline(
                &self.device,
                &module,
                self.format,
                &self.uniform_layout,
                &self.texture_layout,
                blend,
                depth_test,
            )
        };
        let pipelines = [
            pipeline(false, false),
            pipeline(false, true),
            pipeline(true, false),
            pipeline(true, true),
        ];
        self.shaders.push(ShaderProgram {
            label: label.to_string(),
            pipelines,
            uniforms: ModelUniform::default(),
        });
        ShaderHandle(self.shaders.len() as u32 - 1)
    }

    /// Make `texture` bindable under a fresh identity.
    pub fn register_texture(&mut self, texture: &Texture, label: &str) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        let group = texture::texture_bind_group(&self.device, &self.texture_layout, texture, label);
        self.textures.insert(id, group);
        id
    }

    pub fn dispose_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    /// Create an offscreen colour target and a matching depth texture.
    pub fn create_render_target(&self, width: u32, height: u32) -> (wgpu::Texture, Texture) {
        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Render target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        (target, depth)
    }

    /// Number of draws recorded since the last [`Context::render_to`].
    pub fn pending_draws(&self) -> usize {
        self.frame.commands.len()
    }

    /// Replay the recorded frame into `view` and submit it.
    pub fn render_to(&mut self, view: &wgpu::TextureView, depth: &Texture) {
        let commands = std::mem::take(&mut self.frame.commands);
        let uniforms = std::mem::take(&mut self.frame.uniforms);

        let stride = UNIFORM_STRIDE as usize;
        let mut contents = vec![0u8; stride * uniforms.len().max(1)];
        for (slot, uniform) in uniforms.iter().enumerate() {
            let bytes = bytemuck::bytes_of(uniform);
            contents[slot * stride..slot * stride + bytes.len()].copy_from_slice(bytes);
        }
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: &contents,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let uniform_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
                }),
            }],
            label: Some("frame_uniform_bind_group"),
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for command in &commands {
                let Some(mesh) = self.meshes.get(&command.mesh) else {
                    log::warn!("Skipping draw of disposed mesh {:?}", command.mesh);
                    continue;
                };
                if command.index_count == 0 || !mesh.is_drawable() {
                    continue;
                }
                let (shader, variant) = command.pipeline;
                let Some(program) = self.shaders.get(shader.0 as usize) else {
                    continue;
                };
                let texture_group = self
                    .textures
                    .get(&command.texture)
                    .unwrap_or(&self.blank_texture);
                let offset = command.uniform_slot * UNIFORM_STRIDE as u32;

                render_pass.set_pipeline(&program.pipelines[variant]);
                render_pass.set_bind_group(0, &uniform_group, &[offset]);
                render_pass.set_bind_group(1, texture_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.positions.slice(..));
                render_pass.set_vertex_buffer(1, mesh.uvs.slice(..));
                render_pass.set_vertex_buffer(2, mesh.normals.slice(..));
                render_pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..command.index_count, 0, 0..1);
            }
        }
        self.queue.submit(iter::once(encoder.finish()));
    }

    fn uniforms_mut(&mut self, shader: ShaderHandle) -> Option<&mut ModelUniform> {
        match self.shaders.get_mut(shader.0 as usize) {
            Some(program) => Some(&mut program.uniforms),
            None => {
                log::warn!("Unknown shader {:?}", shader);
                None
            }
        }
    }
}

impl GeometryService for Context {
    fn upload_mesh(&mut self, label: &str, buffers: MeshBuffers<'_>) -> MeshHandle {
        let vertex_buffer = |suffix: &str, contents: &[u8], usage| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} {} Buffer", label, suffix)),
                contents,
                usage,
            })
        };
        let mesh = GpuMesh {
            positions: vertex_buffer(
                "Position",
                bytemuck::cast_slice(buffers.positions),
                wgpu::BufferUsages::VERTEX,
            ),
            uvs: vertex_buffer("UV", bytemuck::cast_slice(buffers.uvs), wgpu::BufferUsages::VERTEX),
            normals: vertex_buffer(
                "Normal",
                bytemuck::cast_slice(buffers.normals),
                wgpu::BufferUsages::VERTEX,
            ),
            indices: vertex_buffer(
                "Index",
                bytemuck::cast_slice(buffers.indices),
                wgpu::BufferUsages::INDEX,
            ),
        };

        let handle = MeshHandle(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(handle, mesh);
        handle
    }

    fn dispose_mesh(&mut self, mesh: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&mesh) {
            mesh.positions.destroy();
            mesh.uvs.destroy();
            mesh.normals.destroy();
            mesh.indices.destroy();
        }
    }
}

impl ShaderService for Context {
    fn start(&mut self, shader: ShaderHandle) {
        self.frame.active = Some(shader);
    }

    fn stop(&mut self) {
        self.frame.active = None;
    }

    fn upload_mat4(&mut self, shader: ShaderHandle, name: &str, value: Matrix4<f32>) {
        let Some(uniforms) = self.uniforms_mut(shader) else {
            return;
        };
        let value: [[f32; 4]; 4] = value.into();
        match name {
            "projection" => uniforms.projection = value,
            "view" => uniforms.view = value,
            "transformation" => uniforms.transformation = value,
            _ => log::warn!("Unknown mat4 uniform {}", name),
        }
    }

    fn upload_vec4(&mut self, shader: ShaderHandle, name: &str, value: Vector4<f32>) {
        let Some(uniforms) = self.uniforms_mut(shader) else {
            return;
        };
        let value: [f32; 4] = value.into();
        match name {
            "ambientColor" => uniforms.ambient_color = value,
            "diffuseColor" => uniforms.diffuse_color = value,
            "specularColor" => uniforms.specular_color = value,
            _ => log::warn!("Unknown vec4 uniform {}", name),
        }
    }

    fn upload_int(&mut self, shader: ShaderHandle, name: &str, value: i32) {
        let Some(uniforms) = self.uniforms_mut(shader) else {
            return;
        };
        match name {
            "tex" => uniforms.tex = value,
            _ => log::warn!("Unknown int uniform {}", name),
        }
    }

    fn upload_bool(&mut self, shader: ShaderHandle, name: &str, value: bool) {
        let Some(uniforms) = self.uniforms_mut(shader) else {
            return;
        };
        match name {
            "textureIsBound" => uniforms.texture_is_bound = u32::from(value),
            _ => log::warn!("Unknown bool uniform {}", name),
        }
    }
}

impl TextureService for Context {
    fn bind(&mut self, texture: TextureId, slot: u32) {
        if !texture.is_none() && !self.textures.contains_key(&texture) {
            log::warn!("Binding unknown texture {:?}, drawing untextured", texture);
        }
        if slot != TEXTURE_SLOT {
            log::warn!("Only texture slot {} is sampled by the model shader", TEXTURE_SLOT);
        }
        self.frame.bound.insert(slot, texture);
    }

    fn unbind(&mut self, slot: u32) {
        self.frame.bound.remove(&slot);
    }
}

impl RasterState for Context {
    fn set_blend(&mut self, enabled: bool) {
        self.frame.blend = enabled;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.frame.depth_test = enabled;
    }

    fn draw_indexed(&mut self, mesh: MeshHandle, index_count: u32) {
        let Some(shader) = self.frame.active else {
            log::warn!("draw_indexed without an active shader");
            return;
        };
        let Some(program) = self.shaders.get(shader.0 as usize) else {
            log::warn!("Unknown shader {:?}", shader);
            return;
        };
        let uniform_slot = self.frame.uniforms.len() as u32;
        self.frame.uniforms.push(program.uniforms);
        self.frame.commands.push(DrawCommand {
            pipeline: (shader, pipeline_index(self.frame.blend, self.frame.depth_test)),
            texture: self
                .frame
                .bound
                .get(&TEXTURE_SLOT)
                .copied()
                .unwrap_or(TextureId::NONE),
            mesh,
            index_count,
            uniform_slot,
        });
    }
}
