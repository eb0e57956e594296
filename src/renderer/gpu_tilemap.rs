use log::debug;

use crate::atlas::{AtlasLayout, TileAtlas};
use crate::error::{Result, TilegridError};
use crate::placement::PlacementMap;
use crate::sampler::SamplerDesc;

/// GPU copies of the placement map and atlas plus the atlas sampler, bound
/// together as group 1 of the tilemap pipeline. Built once, reused per draw.
pub struct GpuTilemap {
    pub layout: AtlasLayout,
    placement_texture: wgpu::Texture,
    placement_size: (u32, u32),
    _atlas_texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
}

impl GpuTilemap {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: &wgpu::BindGroupLayout,
        placement: &PlacementMap,
        atlas: &TileAtlas,
        sampler_desc: &SamplerDesc,
    ) -> Self {
        let layout = atlas.layout();

        let placement_texture = placement.to_texture(device, queue);
        let placement_view = placement_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let atlas_texture = atlas.to_texture(device, queue);
        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("tile_atlas_view"),
            dimension: Some(match layout {
                AtlasLayout::Packed { .. } => wgpu::TextureViewDimension::D2,
                AtlasLayout::Layered => wgpu::TextureViewDimension::D2Array,
            }),
            ..Default::default()
        });

        let sampler = device.create_sampler(&sampler_desc.to_wgpu());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tilemap_resources_bg"),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&placement_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        debug!(
            "gpu_tilemap: placement {}x{}, atlas {:?} with {} mip levels",
            placement.width(),
            placement.height(),
            layout,
            atlas.mip_levels()
        );

        Self {
            layout,
            placement_texture,
            placement_size: (placement.width(), placement.height()),
            _atlas_texture: atlas_texture,
            bind_group,
        }
    }

    /// Re-upload placement cells. The map size is fixed for the lifetime of
    /// the GPU copy; a resized map needs a new `GpuTilemap`.
    pub fn update_placement(&self, queue: &wgpu::Queue, placement: &PlacementMap) -> Result<()> {
        let (w, h) = self.placement_size;
        if (placement.width(), placement.height()) != (w, h) {
            return Err(TilegridError::Device(format!(
                "placement map resized from {w}x{h} to {}x{}",
                placement.width(),
                placement.height()
            )));
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.placement_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            placement.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w * std::mem::size_of::<u16>() as u32),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );
        Ok(())
    }
}
