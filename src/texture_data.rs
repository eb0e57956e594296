use wgpu::util::DeviceExt;

use crate::error::{Result, TilegridError};

// ── TextureData ──────────────────────────────────────────────────────────────

/// CPU-side texel storage for a 2D texture or 2D texture array.
///
/// Texels are stored layer-major, row-major inside a layer: the texel at
/// `(x, y)` of layer `l` lives at `l * width * height + y * width + x`.
/// That is exactly the byte order wgpu expects for a single mip level.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData<T: bytemuck::Pod> {
    pub width: u32,
    pub height: u32,
    /// Number of array layers (1 for a plain 2D texture).
    pub depth: u32,
    texels: Box<[T]>,
}

impl<T: bytemuck::Pod> TextureData<T> {
    /// Zero-filled storage. The total texel count must fit in a `u32`.
    pub fn new(width: u32, height: u32, depth: u32) -> Result<Self> {
        let count = texel_count_for(width, height, depth)?;
        Ok(Self {
            width,
            height,
            depth,
            texels: vec![T::zeroed(); count].into_boxed_slice(),
        })
    }

    /// Wrap an existing texel buffer. The buffer length must match the
    /// dimensions exactly.
    pub fn from_texels(width: u32, height: u32, depth: u32, texels: Vec<T>) -> Result<Self> {
        let expected = texel_count_for(width, height, depth)?;
        if texels.len() != expected {
            return Err(TilegridError::PixelCount { expected, actual: texels.len() });
        }
        Ok(Self { width, height, depth, texels: texels.into_boxed_slice() })
    }

    pub fn texel_count(&self) -> usize {
        self.texels.len()
    }

    fn layer_range(&self, layer: u32) -> std::ops::Range<usize> {
        assert!(layer < self.depth, "layer {layer} out of range (depth {})", self.depth);
        let stride = (self.width * self.height) as usize;
        let start = layer as usize * stride;
        start..start + stride
    }

    pub fn layer(&self, layer: u32) -> &[T] {
        let range = self.layer_range(layer);
        &self.texels[range]
    }

    pub fn layer_mut(&mut self, layer: u32) -> &mut [T] {
        let range = self.layer_range(layer);
        &mut self.texels[range]
    }

    pub fn texel(&self, x: u32, y: u32, layer: u32) -> &T {
        assert!(x < self.width && y < self.height, "texel ({x}, {y}) out of range");
        &self.layer(layer)[(y * self.width + x) as usize]
    }

    pub fn texel_mut(&mut self, x: u32, y: u32, layer: u32) -> &mut T {
        assert!(x < self.width && y < self.height, "texel ({x}, {y}) out of range");
        let width = self.width;
        &mut self.layer_mut(layer)[(y * width + x) as usize]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Upload a single-level texture. Array textures get one layer per `depth`.
    pub fn to_texture(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> wgpu::Texture {
        device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: self.extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            self.as_bytes(),
        )
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth,
        }
    }
}

fn texel_count_for(width: u32, height: u32, depth: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(depth))
        .map(|n| n as usize)
        .ok_or(TilegridError::TextureTooLarge { width, height, depth })
}

/// Upload a full mip chain (level 0 first) as one texture.
///
/// Every level must have the same `depth`. Data is handed to wgpu in
/// mip-major order, which is how the levels are already stored.
pub fn mip_chain_to_texture<T: bytemuck::Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    levels: &[TextureData<T>],
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    let base = &levels[0];
    let bytes: Vec<u8> = levels.iter().flat_map(|l| l.as_bytes().iter().copied()).collect();

    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: base.extent(),
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::MipMajor,
        &bytes,
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
