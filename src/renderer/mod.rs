pub mod gpu_tilemap;
pub mod pipeline;

use std::sync::Arc;

use log::info;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use gpu_tilemap::GpuTilemap;
use pipeline::{QuadVertex, TilemapPipeline, TilemapUniform, create_tilemap_pipeline};

use crate::atlas::TileAtlas;
use crate::camera::Camera;
use crate::config::TilegridConfig;
use crate::error::{Result, TilegridError};
use crate::placement::PlacementMap;
use crate::raster::MapQuad;
use crate::resolver::SeamStrategy;

/// Windowed wgpu renderer drawing one tilemap quad per frame.
pub struct Renderer {
    pub window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: TilemapPipeline,
    strategy: SeamStrategy,
    /// Camera matrix + packed dimension (group 0).
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// Placement map, atlas and sampler (group 1), bound once per draw.
    tilemap: GpuTilemap,
    vertex_buffer: wgpu::Buffer,
    /// Background drawn beneath the map; shows through empty cells.
    pub clear_color: wgpu::Color,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        settings: &TilegridConfig,
        placement: &PlacementMap,
        atlas: &TileAtlas,
        quad: &MapQuad,
    ) -> Result<Self> {
        let expected = settings.layout;
        if expected != atlas.layout() {
            return Err(TilegridError::LayoutMismatch { expected, actual: atlas.layout() });
        }

        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| TilegridError::Device(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .map_err(|e| TilegridError::Device(format!("no suitable GPU adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| TilegridError::Device(e.to_string()))?;

        info!("renderer: using adapter {:?}", adapter.get_info().name);

        let caps = surface.get_capabilities(&adapter);
        let format = pick_surface_format(&caps.formats)
            .ok_or_else(|| TilegridError::Device("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let pipeline = create_tilemap_pipeline(&device, format, atlas.layout());

        let mut camera = Camera::default();
        camera.calc_aspect(config.width, config.height);
        let uniform = TilemapUniform::new(&camera, atlas.layout());
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tilemap_uniform_buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tilemap_uniform_bg"),
            layout: &pipeline.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let tilemap = GpuTilemap::new(
            &device,
            &queue,
            &pipeline.resources_bind_group_layout,
            placement,
            atlas,
            &settings.sampler,
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tilemap_quad"),
            contents: bytemuck::cast_slice(&QuadVertex::quad(quad)),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            pipeline,
            strategy: settings.strategy,
            uniform_buffer,
            uniform_bind_group,
            tilemap,
            vertex_buffer,
            clear_color: wgpu::Color { r: 0.1, g: 0.2, b: 0.3, a: 1.0 },
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Upload the camera matrix. Call once per frame before `render`.
    pub fn update_camera(&mut self, camera: &Camera) {
        let uniform = TilemapUniform::new(camera, self.pipeline.layout);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn update_placement(&mut self, placement: &PlacementMap) -> Result<()> {
        self.tilemap.update_placement(&self.queue, placement)
    }

    pub fn strategy(&self) -> SeamStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: SeamStrategy) {
        if strategy != self.strategy {
            info!("renderer: seam strategy -> {strategy:?}");
            self.strategy = strategy;
        }
    }

    /// Render one frame: clear to `clear_color`, then draw the map quad.
    pub fn render(&mut self) -> std::result::Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("tilemap_encoder") });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tilemap_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(self.pipeline.for_strategy(self.strategy));
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.tilemap.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..6, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Surface format for the swapchain. A non-sRGB format is preferred so the
/// shader's output bytes reach the screen unchanged, matching the CPU
/// [`Framebuffer`](crate::raster::Framebuffer) export. Falls back to the
/// first reported format.
pub fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats.iter().copied().find(|f| !f.is_srgb()).or_else(|| formats.first().copied())
}
