use std::path::{Path, PathBuf};

use glam::{UVec2, Vec2};
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TilegridError};
use crate::texture_data::{TextureData, mip_chain_to_texture};

/// One RGBA8 texel.
pub type Texel = [u8; 4];

/// GPU format of the atlas. Linear, so filtering and mip blending on the
/// GPU work on the stored bytes exactly as [`crate::Sampler`] does.
pub const ATLAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ── AtlasLayout ──────────────────────────────────────────────────────────────

/// How tiles are arranged inside the atlas texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AtlasLayout {
    /// One 2D image split into a `dim` x `dim` grid of square tiles.
    /// Tile `t` sits at column `t % dim`, row `t / dim`.
    Packed { dim: u32 },
    /// A 2D texture array with tile `t` stored as layer `t`.
    Layered,
}

impl Default for AtlasLayout {
    fn default() -> Self {
        AtlasLayout::Packed { dim: Self::DEFAULT_PACKED_DIM }
    }
}

impl AtlasLayout {
    pub const DEFAULT_PACKED_DIM: u32 = 8;
    /// Largest `dim` whose tile count `dim * dim` still fits in a `u32`.
    pub const MAX_PACKED_DIM: u32 = u16::MAX as u32;

    pub fn packed(dim: u32) -> Result<Self> {
        let layout = AtlasLayout::Packed { dim };
        layout.validate()?;
        Ok(layout)
    }

    /// Check a layout that did not come through [`AtlasLayout::packed`],
    /// e.g. one read from a config file.
    pub fn validate(&self) -> Result<()> {
        match *self {
            AtlasLayout::Packed { dim: 0 } => Err(TilegridError::ZeroPackedDim),
            AtlasLayout::Packed { dim } if dim > Self::MAX_PACKED_DIM => {
                Err(TilegridError::PackedDimTooLarge { dim, max: Self::MAX_PACKED_DIM })
            }
            _ => Ok(()),
        }
    }

    /// Maximum number of tiles, `None` when bounded only by the device's
    /// array layer limit.
    pub fn capacity(&self) -> Option<u64> {
        match *self {
            AtlasLayout::Packed { dim } => Some(u64::from(dim) * u64::from(dim)),
            AtlasLayout::Layered => None,
        }
    }

    /// Grid cell of `tile` in a packed atlas. Layered atlases put every tile
    /// at the origin of its own layer.
    pub fn packed_cell(&self, tile: u32) -> UVec2 {
        match *self {
            AtlasLayout::Packed { dim } => UVec2::new(tile % dim, tile / dim),
            AtlasLayout::Layered => UVec2::ZERO,
        }
    }

    /// Returns `(uv_min, uv_max)` of `tile` inside its image.
    pub fn uv_rect(&self, tile: u32) -> (Vec2, Vec2) {
        match *self {
            AtlasLayout::Packed { dim } => {
                let cell = self.packed_cell(tile).as_vec2();
                let d = dim as f32;
                (cell / d, (cell + Vec2::ONE) / d)
            }
            AtlasLayout::Layered => (Vec2::ZERO, Vec2::ONE),
        }
    }
}

// ── TileAtlas ────────────────────────────────────────────────────────────────

/// All tile graphics, in either packed or layered form, with a full mip chain.
///
/// Level 0 of a packed atlas is `dim * tile_size` pixels square with depth 1.
/// Level 0 of a layered atlas is `tile_size` square with one layer per tile.
#[derive(Clone, Debug)]
pub struct TileAtlas {
    layout: AtlasLayout,
    tile_size: u32,
    tile_count: u32,
    levels: Vec<TextureData<Texel>>,
}

impl TileAtlas {
    /// Build an atlas from square, equally sized tile images. Tile `i` of the
    /// slice is addressed by placement value `i + 1`.
    pub fn from_tiles(layout: AtlasLayout, tiles: &[RgbaImage]) -> Result<Self> {
        let first = tiles.first().ok_or(TilegridError::EmptyAtlas)?;
        let tile_size = first.width();
        for (index, tile) in tiles.iter().enumerate() {
            if tile.width() != tile_size || tile.height() != tile_size || tile_size == 0 {
                return Err(TilegridError::TileSizeMismatch {
                    index,
                    width: tile.width(),
                    height: tile.height(),
                    expected: tile_size,
                });
            }
        }
        let tile_count = tiles.len() as u32;
        layout.validate()?;

        let base = match layout {
            AtlasLayout::Packed { dim } => {
                let capacity = u64::from(dim) * u64::from(dim);
                if u64::from(tile_count) > capacity {
                    return Err(TilegridError::AtlasOverflow { tiles: tile_count, dim, capacity });
                }
                let side = dim.checked_mul(tile_size).ok_or(TilegridError::TextureTooLarge {
                    width: dim.saturating_mul(tile_size),
                    height: dim.saturating_mul(tile_size),
                    depth: 1,
                })?;
                let mut base = TextureData::new(side, side, 1)?;
                for (t, tile) in tiles.iter().enumerate() {
                    let origin = layout.packed_cell(t as u32) * tile_size;
                    blit(&mut base, tile, origin, 0);
                }
                base
            }
            AtlasLayout::Layered => {
                let mut base = TextureData::new(tile_size, tile_size, tile_count)?;
                for (t, tile) in tiles.iter().enumerate() {
                    blit(&mut base, tile, UVec2::ZERO, t as u32);
                }
                base
            }
        };

        let levels = build_mip_chain(base)?;
        debug!(
            "atlas: {:?}, {} tiles of {}px, {} mip levels",
            layout,
            tile_count,
            tile_size,
            levels.len()
        );

        Ok(Self { layout, tile_size, tile_count, levels })
    }

    /// Split a PNG tile sheet into `tile_size` squares (row-major) and build
    /// an atlas from them.
    pub fn from_sheet(layout: AtlasLayout, png_bytes: &[u8], tile_size: u32) -> Result<Self> {
        let sheet = image::load_from_memory(png_bytes)?.to_rgba8();
        let (w, h) = sheet.dimensions();
        if tile_size == 0 || w % tile_size != 0 || h % tile_size != 0 {
            return Err(TilegridError::SheetSize { width: w, height: h, tile_size });
        }

        let mut tiles = Vec::new();
        for row in 0..h / tile_size {
            for col in 0..w / tile_size {
                let tile = image::imageops::crop_imm(
                    &sheet,
                    col * tile_size,
                    row * tile_size,
                    tile_size,
                    tile_size,
                )
                .to_image();
                tiles.push(tile);
            }
        }
        Self::from_tiles(layout, &tiles)
    }

    /// Load every `.png` under `path` (recursively, sorted by path) as one
    /// tile each. Files that fail to decode are skipped.
    pub fn load_folder(layout: AtlasLayout, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("png"))
            .collect();
        files.sort();

        let mut tiles = Vec::with_capacity(files.len());
        for file in &files {
            match image::open(file) {
                Ok(img) => tiles.push(img.to_rgba8()),
                Err(e) => warn!("atlas: failed to load {}: {e}", file.display()),
            }
        }

        if tiles.is_empty() {
            return Err(TilegridError::NoTilesFound(path.display().to_string()));
        }
        Self::from_tiles(layout, &tiles)
    }

    pub fn layout(&self) -> AtlasLayout {
        self.layout
    }

    /// Edge length of one tile in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    pub fn mip_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &TextureData<Texel> {
        &self.levels[level]
    }

    pub fn levels(&self) -> &[TextureData<Texel>] {
        &self.levels
    }

    /// Pixel size of level 0 of the image the atlas coordinate addresses.
    pub fn base_size(&self) -> UVec2 {
        UVec2::new(self.levels[0].width, self.levels[0].height)
    }

    /// Upload with every mip level. Layered atlases must be viewed as
    /// `D2Array`, even with a single tile.
    pub fn to_texture(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Texture {
        mip_chain_to_texture(
            device,
            queue,
            "tile_atlas",
            &self.levels,
            ATLAS_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        )
    }
}

/// A `size` x `size` tile filled with one colour.
pub fn solid_tile(size: u32, rgba: Texel) -> RgbaImage {
    RgbaImage::from_pixel(size, size, Rgba(rgba))
}

fn blit(dst: &mut TextureData<Texel>, tile: &RgbaImage, origin: UVec2, layer: u32) {
    for (x, y, px) in tile.enumerate_pixels() {
        *dst.texel_mut(origin.x + x, origin.y + y, layer) = px.0;
    }
}

/// 2x2 box-filtered mip chain down to 1x1. Each layer is reduced on its own.
fn build_mip_chain(base: TextureData<Texel>) -> Result<Vec<TextureData<Texel>>> {
    let mut levels = vec![base];
    loop {
        let prev = &levels[levels.len() - 1];
        if prev.width == 1 && prev.height == 1 {
            break;
        }
        let w = (prev.width / 2).max(1);
        let h = (prev.height / 2).max(1);
        let mut next = TextureData::new(w, h, prev.depth)?;
        for layer in 0..prev.depth {
            for y in 0..h {
                for x in 0..w {
                    let mut sum = [0u32; 4];
                    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                        let sx = (2 * x + dx).min(prev.width - 1);
                        let sy = (2 * y + dy).min(prev.height - 1);
                        let t = prev.texel(sx, sy, layer);
                        for c in 0..4 {
                            sum[c] += t[c] as u32;
                        }
                    }
                    *next.texel_mut(x, y, layer) = sum.map(|s| ((s + 2) / 4) as u8);
                }
            }
        }
        levels.push(next);
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_cell_is_row_major() {
        let layout = AtlasLayout::packed(8).unwrap();
        assert_eq!(layout.packed_cell(0), UVec2::new(0, 0));
        assert_eq!(layout.packed_cell(9), UVec2::new(1, 1));
        assert_eq!(layout.packed_cell(63), UVec2::new(7, 7));
    }

    #[test]
    fn mip_chain_ends_at_one_texel() {
        let atlas = TileAtlas::from_tiles(AtlasLayout::Layered, &[solid_tile(8, [10, 20, 30, 255])])
            .unwrap();
        assert_eq!(atlas.mip_levels(), 4);
        let last = atlas.level(3);
        assert_eq!((last.width, last.height), (1, 1));
        assert_eq!(*last.texel(0, 0, 0), [10, 20, 30, 255]);
    }
}
