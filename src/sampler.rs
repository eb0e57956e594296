// =============================================================================
// SOFTWARE TEXTURE SAMPLING
//
// Mirrors what a GPU sampler does for the atlas texture:
// - Level-of-detail selection from explicit screen-space gradients
// - Nearest / bilinear filtering inside one mip level
// - Nearest / linear blending between mip levels
// - Clamp-to-edge or repeat addressing
//
// Only the atlas is ever sampled through here. The placement map is read by
// direct element fetch (see `PlacementMap::fetch`).
// =============================================================================

use glam::{IVec2, UVec2, Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::atlas::Texel;
use crate::texture_data::TextureData;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Filter and addressing state for the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerDesc {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    pub address_mode: AddressMode,
}

impl Default for SamplerDesc {
    /// Crisp pixels up close, smooth blending between mip levels far away.
    fn default() -> Self {
        Self {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        }
    }
}

impl SamplerDesc {
    pub fn to_wgpu(&self) -> wgpu::SamplerDescriptor<'static> {
        let filter = |f: FilterMode| match f {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let mipmap_filter = match self.mipmap_filter {
            FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
            FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
        };
        let address = match self.address_mode {
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
        };
        wgpu::SamplerDescriptor {
            label: Some("atlas_sampler"),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter(self.mag_filter),
            min_filter: filter(self.min_filter),
            mipmap_filter,
            ..Default::default()
        }
    }
}

// ── Sampler ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sampler {
    desc: SamplerDesc,
}

impl Sampler {
    pub fn new(desc: SamplerDesc) -> Self {
        Self { desc }
    }

    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    /// Unclamped level of detail for the given uv gradients:
    /// ```text
    /// lod = log2(max(|ddx * size|, |ddy * size|))
    /// ```
    /// where `size` is the level-0 image size in texels. Zero gradients give
    /// negative infinity (pure magnification).
    pub fn raw_lod(&self, base_size: UVec2, ddx: Vec2, ddy: Vec2) -> f32 {
        let size = base_size.as_vec2();
        let rho = (ddx * size).length().max((ddy * size).length());
        if rho > 0.0 { rho.log2() } else { f32::NEG_INFINITY }
    }

    /// Level of detail clamped to the available mip range.
    pub fn lod(&self, levels: &[TextureData<Texel>], ddx: Vec2, ddy: Vec2) -> f32 {
        let base = UVec2::new(levels[0].width, levels[0].height);
        let max_level = (levels.len() - 1) as f32;
        self.raw_lod(base, ddx, ddy).clamp(0.0, max_level)
    }

    /// Sample with explicit gradients, as `textureSampleGrad` does.
    pub fn sample_grad(
        &self,
        levels: &[TextureData<Texel>],
        uv: Vec2,
        layer: u32,
        ddx: Vec2,
        ddy: Vec2,
    ) -> Vec4 {
        let base = UVec2::new(levels[0].width, levels[0].height);
        let raw = self.raw_lod(base, ddx, ddy);
        if raw <= 0.0 {
            return self.sample_level(levels, uv, layer, 0, self.desc.mag_filter);
        }

        let max_level = (levels.len() - 1) as f32;
        let lod = raw.min(max_level);
        match self.desc.mipmap_filter {
            FilterMode::Nearest => {
                let level = (lod + 0.5).floor() as usize;
                self.sample_level(levels, uv, layer, level, self.desc.min_filter)
            }
            FilterMode::Linear => {
                let lo = lod.floor() as usize;
                let hi = (lo + 1).min(levels.len() - 1);
                let t = lod - lo as f32;
                let a = self.sample_level(levels, uv, layer, lo, self.desc.min_filter);
                if t == 0.0 || hi == lo {
                    return a;
                }
                let b = self.sample_level(levels, uv, layer, hi, self.desc.min_filter);
                a.lerp(b, t)
            }
        }
    }

    /// Sample one mip level. Layers past the end clamp to the last layer.
    pub fn sample_level(
        &self,
        levels: &[TextureData<Texel>],
        uv: Vec2,
        layer: u32,
        level: usize,
        filter: FilterMode,
    ) -> Vec4 {
        let tex = &levels[level.min(levels.len() - 1)];
        let layer = layer.min(tex.depth - 1);
        let size = Vec2::new(tex.width as f32, tex.height as f32);

        match filter {
            FilterMode::Nearest => {
                let p = (uv * size).floor().as_ivec2();
                self.fetch(tex, p, layer)
            }
            FilterMode::Linear => {
                let p = uv * size - Vec2::splat(0.5);
                let p0 = p.floor();
                let f = p - p0;
                let p0 = p0.as_ivec2();
                let t00 = self.fetch(tex, p0, layer);
                let t10 = self.fetch(tex, p0 + IVec2::X, layer);
                let t01 = self.fetch(tex, p0 + IVec2::Y, layer);
                let t11 = self.fetch(tex, p0 + IVec2::ONE, layer);
                t00.lerp(t10, f.x).lerp(t01.lerp(t11, f.x), f.y)
            }
        }
    }

    /// Single texel through the addressing mode, normalised to `[0, 1]`.
    fn fetch(&self, tex: &TextureData<Texel>, p: IVec2, layer: u32) -> Vec4 {
        let x = self.address(p.x, tex.width);
        let y = self.address(p.y, tex.height);
        let t = tex.texel(x, y, layer);
        Vec4::new(t[0] as f32, t[1] as f32, t[2] as f32, t[3] as f32) / 255.0
    }

    fn address(&self, i: i32, size: u32) -> u32 {
        match self.desc.address_mode {
            AddressMode::ClampToEdge => i.clamp(0, size as i32 - 1) as u32,
            AddressMode::Repeat => i.rem_euclid(size as i32) as u32,
        }
    }
}
