use crate::atlas::AtlasLayout;
use crate::camera::Camera;
use crate::raster::MapQuad;
use crate::resolver::SeamStrategy;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    /// Surface coordinate; passed through to the fragment stage unchanged.
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2,  // position
        1 => Float32x2,  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    /// Two triangles covering `quad`, uv (0, 0) at the top-left corner.
    pub fn quad(quad: &MapQuad) -> [QuadVertex; 6] {
        let (l, r, b, t) = (quad.min.x, quad.max.x, quad.min.y, quad.max.y);
        let tl = QuadVertex { position: [l, t], uv: [0.0, 0.0] };
        let tr = QuadVertex { position: [r, t], uv: [1.0, 0.0] };
        let bl = QuadVertex { position: [l, b], uv: [0.0, 1.0] };
        let br = QuadVertex { position: [r, b], uv: [1.0, 1.0] };
        [tl, bl, br, tl, br, tr]
    }
}

/// Group 0 uniform shared by both shaders (80 bytes, std140-compatible).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TilemapUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Tiles per atlas row for packed atlases, 0 for layered.
    pub packed_dim: u32,
    pub _pad: [u32; 3],
}

impl TilemapUniform {
    pub fn new(camera: &Camera, layout: AtlasLayout) -> Self {
        let packed_dim = match layout {
            AtlasLayout::Packed { dim } => dim,
            AtlasLayout::Layered => 0,
        };
        Self { view_proj: camera.uniform().view_proj, packed_dim, _pad: [0; 3] }
    }
}

/// Both fragment variants for one atlas layout, sharing bind group layouts
/// so the seam strategy can be switched without rebinding resources.
pub struct TilemapPipeline {
    pub grad_pipeline: wgpu::RenderPipeline,
    pub plain_pipeline: wgpu::RenderPipeline,
    pub uniform_bind_group_layout: wgpu::BindGroupLayout,
    pub resources_bind_group_layout: wgpu::BindGroupLayout,
    pub layout: AtlasLayout,
}

impl TilemapPipeline {
    pub fn for_strategy(&self, strategy: SeamStrategy) -> &wgpu::RenderPipeline {
        match strategy {
            SeamStrategy::DerivativeSubstitution => &self.grad_pipeline,
            SeamStrategy::PlainFiltered => &self.plain_pipeline,
        }
    }
}

/// Bind group layout for the per-draw resources: placement map, atlas, sampler.
pub fn create_resources_bind_group_layout(
    device: &wgpu::Device,
    layout: AtlasLayout,
) -> wgpu::BindGroupLayout {
    let atlas_dimension = match layout {
        AtlasLayout::Packed { .. } => wgpu::TextureViewDimension::D2,
        AtlasLayout::Layered => wgpu::TextureViewDimension::D2Array,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tilemap_resources_bgl"),
        entries: &[
            // Placement map: integer texture, only ever read with textureLoad.
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Uint,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: atlas_dimension,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_tilemap_pipeline(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    layout: AtlasLayout,
) -> TilemapPipeline {
    let shader = match layout {
        AtlasLayout::Packed { .. } => {
            device.create_shader_module(wgpu::include_wgsl!("shaders/tilemap_packed.wgsl"))
        }
        AtlasLayout::Layered => {
            device.create_shader_module(wgpu::include_wgsl!("shaders/tilemap_layered.wgsl"))
        }
    };

    let uniform_bind_group_layout =
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tilemap_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

    let resources_bind_group_layout = create_resources_bind_group_layout(device, layout);

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("tilemap_pipeline_layout"),
        bind_group_layouts: &[&uniform_bind_group_layout, &resources_bind_group_layout],
        ..Default::default()
    });

    let make = |fragment_entry: &str, label: &str| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    };

    TilemapPipeline {
        grad_pipeline: make("fs_grad", "tilemap_grad_pipeline"),
        plain_pipeline: make("fs_plain", "tilemap_plain_pipeline"),
        uniform_bind_group_layout,
        resources_bind_group_layout,
        layout,
    }
}
