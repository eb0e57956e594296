use std::ops::{Index, IndexMut};

use glam::{UVec2, Vec2};

use crate::error::{Result, TilegridError};
use crate::texture_data::TextureData;

/// Placement value meaning "no tile in this cell".
pub const EMPTY: u16 = 0;

/// Grid of tile identifiers, one per map cell.
///
/// A cell value of `0` is empty; any other value `id` refers to atlas tile
/// `id - 1`. Row 0 is the top row, i.e. the row hit by coordinates with `y`
/// near 0. The grid resolution is a property of this data: every coordinate
/// computation reads it from here rather than from a constant.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementMap {
    cells: TextureData<u16>,
}

impl PlacementMap {
    /// An all-empty map of `width` x `height` cells.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TilegridError::EmptyPlacement { width, height });
        }
        Ok(Self { cells: TextureData::new(width, height, 1)? })
    }

    /// Build from rows of cell values, top row first.
    ///
    /// Short rows are padded with empty cells up to the longest row.
    pub fn from_rows(rows: &[Vec<u16>]) -> Result<Self> {
        let height = rows.len() as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut map = Self::new(width, height)?;
        for (y, row) in rows.iter().enumerate() {
            for (x, &id) in row.iter().enumerate() {
                map.set(UVec2::new(x as u32, y as u32), id);
            }
        }
        Ok(map)
    }

    pub fn width(&self) -> u32 {
        self.cells.width
    }

    pub fn height(&self) -> u32 {
        self.cells.height
    }

    /// Grid resolution `(W, H)` in cells.
    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.cells.width, self.cells.height)
    }

    pub fn get(&self, cell: UVec2) -> u16 {
        *self.cells.texel(cell.x, cell.y, 0)
    }

    pub fn set(&mut self, cell: UVec2, id: u16) {
        *self.cells.texel_mut(cell.x, cell.y, 0) = id;
    }

    /// Fill every cell with `id`.
    pub fn fill(&mut self, id: u16) {
        self.cells.layer_mut(0).fill(id);
    }

    /// Integer cell under a surface coordinate: `floor(coord * (W, H))`,
    /// clamped to the grid (clamp-to-edge addressing).
    pub fn cell_at(&self, coord: Vec2) -> UVec2 {
        let scaled = coord * self.dimensions().as_vec2();
        let clamp = |v: f32, size: u32| (v.floor() as i64).clamp(0, size as i64 - 1) as u32;
        UVec2::new(clamp(scaled.x, self.width()), clamp(scaled.y, self.height()))
    }

    /// Raw identifier under `coord`. Direct element fetch, never filtered.
    pub fn fetch(&self, coord: Vec2) -> u16 {
        self.get(self.cell_at(coord))
    }

    /// Position of `coord` inside its cell, in `[0, 1)` on both axes.
    pub fn local_coord(&self, coord: Vec2) -> Vec2 {
        let scaled = coord * self.dimensions().as_vec2();
        let wrap = |v: f32| {
            let f = v - v.floor();
            // Tiny negative inputs round up to exactly 1.0.
            if f >= 1.0 { 0.0 } else { f }
        };
        Vec2::new(wrap(scaled.x), wrap(scaled.y))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cells.as_bytes()
    }

    pub fn cells(&self) -> &TextureData<u16> {
        &self.cells
    }

    /// Upload as an `R16Uint` texture. Shaders read it with `textureLoad`.
    pub fn to_texture(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Texture {
        self.cells.to_texture(
            device,
            queue,
            "placement_map",
            wgpu::TextureFormat::R16Uint,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        )
    }
}

/// Zero-based atlas tile for a placement value, `None` for an empty cell.
pub fn tile_of(id: u16) -> Option<u32> {
    match id {
        EMPTY => None,
        id => Some(id as u32 - 1),
    }
}

impl Index<UVec2> for PlacementMap {
    type Output = u16;

    fn index(&self, cell: UVec2) -> &u16 {
        self.cells.texel(cell.x, cell.y, 0)
    }
}

impl IndexMut<UVec2> for PlacementMap {
    fn index_mut(&mut self, cell: UVec2) -> &mut u16 {
        self.cells.texel_mut(cell.x, cell.y, 0)
    }
}
