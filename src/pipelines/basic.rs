use crate::data_structures::{
    model::{NormalVertex, PositionVertex, UvVertex, Vertex},
    texture::Texture,
};

/// Byte stride between two uniform snapshots in the per-frame uniform buffer.
/// Dynamic offsets have to be multiples of 256 on every backend.
pub const UNIFORM_STRIDE: wgpu::BufferAddress = 256;

/// The uniform block every model shader reads at group 0.
///
/// Fields map to the uniform names the frame renderer uploads:
/// `projection`, `view`, `transformation`, `ambientColor`, `diffuseColor`,
/// `specularColor`, `tex` and `textureIsBound`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub transformation: [[f32; 4]; 4],
    pub ambient_color: [f32; 4],
    pub diffuse_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub tex: i32,
    pub texture_is_bound: u32,
    // Due to uniforms requiring 16 byte spacing, we need to use a padding field here
    pub _padding: [u32; 2],
}

impl Default for ModelUniform {
    fn default() -> Self {
        use cgmath::SquareMatrix;
        let identity: [[f32; 4]; 4] = cgmath::Matrix4::<f32>::identity().into();
        Self {
            projection: identity,
            view: identity,
            transformation: identity,
            ambient_color: [0.0; 4],
            diffuse_color: [0.0; 4],
            specular_color: [0.0; 4],
            tex: 0,
            texture_is_bound: 0,
            _padding: [0; 2],
        }
    }
}

pub fn uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
            },
            count: None,
        }],
        label: Some("model_uniform_bind_group_layout"),
    })
}

/// Build the model pipeline for one blend / depth-test combination.
pub fn mk_model_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    uniform_layout: &wgpu::BindGroupLayout,
    texture_layout: &wgpu::BindGroupLayout,
    blend: bool,
    depth_test: bool,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Model Pipeline Layout"),
        bind_group_layouts: &[uniform_layout, texture_layout],
        push_constant_ranges: &[],
    });

    let blend = if blend {
        wgpu::BlendState::ALPHA_BLENDING
    } else {
        wgpu::BlendState::REPLACE
    };
    let depth_compare = if depth_test {
        wgpu::CompareFunction::Less
    } else {
        wgpu::CompareFunction::Always
    };

    mk_render_pipeline(
        device,
        &layout,
        color_format,
        Some(blend),
        Some((Texture::DEPTH_FORMAT, depth_compare, depth_test)),
        &[PositionVertex::desc(), UvVertex::desc(), NormalVertex::desc()],
        shader,
    )
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth: Option<(wgpu::TextureFormat, wgpu::CompareFunction, bool)>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // billboards are seen from both sides
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth.map(|(format, depth_compare, depth_write_enabled)| {
            wgpu::DepthStencilState {
                format,
                depth_write_enabled,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
