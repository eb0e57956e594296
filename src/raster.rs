//! CPU rasterization of a tilemap quad.
//!
//! Each pixel resolves independently, so rows are handed to rayon as a
//! plain parallel map. Discarded fragments leave whatever the framebuffer
//! already holds, which is how a background pass drawn beforehand shows
//! through empty cells.

use std::path::Path;

use glam::{Vec2, Vec4};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::error::Result;
use crate::resolver::{Fragment, FragmentOutput, RenderResources, TileResolver};

// ── Framebuffer ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Vec4>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, clear: Vec4) -> Self {
        Self { width, height, pixels: vec![clear; (width * height) as usize] }
    }

    pub fn clear(&mut self, color: Vec4) {
        self.pixels.fill(color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn to_rgba8(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let c = (self.pixel(x, y).clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
            Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8])
        })
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_rgba8().save(path)?;
        Ok(())
    }
}

// ── MapQuad ──────────────────────────────────────────────────────────────────

/// World-space rectangle the tilemap is drawn on. Its top-left corner has
/// texture coordinate `(0, 0)`, its bottom-right `(1, 1)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapQuad {
    pub min: Vec2,
    pub max: Vec2,
}

impl MapQuad {
    /// Quad centred on the origin, `size` world units across.
    pub fn centered(size: Vec2) -> Self {
        Self { min: -size / 2.0, max: size / 2.0 }
    }

    /// Texture coordinate of a world point; may fall outside `[0, 1]`.
    pub fn texcoord(&self, world: Vec2) -> Vec2 {
        let extent = self.max - self.min;
        Vec2::new((world.x - self.min.x) / extent.x, (self.max.y - world.y) / extent.y)
    }

    pub fn contains(&self, world: Vec2) -> bool {
        world.x >= self.min.x && world.x < self.max.x && world.y > self.min.y && world.y <= self.max.y
    }
}

/// Fragment counts from one rasterization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub written: usize,
    pub discarded: usize,
}

impl std::ops::Add for RasterStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { written: self.written + rhs.written, discarded: self.discarded + rhs.discarded }
    }
}

// ── rasterize ────────────────────────────────────────────────────────────────

/// Draw `quad` as seen through `camera`. Pixels outside the quad are untouched.
///
/// Derivatives are one-pixel differences of the texture coordinate, the
/// same values a GPU computes across a 2x2 quad.
pub fn rasterize(
    resolver: &dyn TileResolver,
    resources: &RenderResources,
    camera: &Camera,
    quad: &MapQuad,
    framebuffer: &mut Framebuffer,
) -> RasterStats {
    let (w, h) = (framebuffer.width as f32, framebuffer.height as f32);
    let world_at = |x: f32, y: f32| {
        let ndc = Vec2::new(x / w * 2.0 - 1.0, 1.0 - y / h * 2.0);
        camera.ndc_to_world(ndc)
    };

    let origin = quad.texcoord(world_at(0.5, 0.5));
    let ddx = quad.texcoord(world_at(1.5, 0.5)) - origin;
    let ddy = quad.texcoord(world_at(0.5, 1.5)) - origin;

    shade(resolver, resources, framebuffer, |x, y| {
        let world = world_at(x as f32 + 0.5, y as f32 + 0.5);
        quad.contains(world)
            .then(|| Fragment::with_derivatives(quad.texcoord(world), ddx, ddy))
    })
}

/// Draw the map over the whole framebuffer, pixel centres mapping to
/// `((x + 0.5) / width, (y + 0.5) / height)`.
pub fn rasterize_surface(
    resolver: &dyn TileResolver,
    resources: &RenderResources,
    framebuffer: &mut Framebuffer,
) -> RasterStats {
    let size = Vec2::new(framebuffer.width as f32, framebuffer.height as f32);
    let ddx = Vec2::new(1.0 / size.x, 0.0);
    let ddy = Vec2::new(0.0, 1.0 / size.y);

    shade(resolver, resources, framebuffer, |x, y| {
        let coord = (Vec2::new(x as f32, y as f32) + 0.5) / size;
        Some(Fragment::with_derivatives(coord, ddx, ddy))
    })
}

fn shade<F>(
    resolver: &dyn TileResolver,
    resources: &RenderResources,
    framebuffer: &mut Framebuffer,
    fragment_at: F,
) -> RasterStats
where
    F: Fn(u32, u32) -> Option<Fragment> + Sync,
{
    let width = framebuffer.width as usize;
    if width == 0 {
        return RasterStats::default();
    }

    framebuffer
        .pixels
        .par_chunks_mut(width)
        .enumerate()
        .map(|(y, row)| {
            let mut stats = RasterStats::default();
            for (x, px) in row.iter_mut().enumerate() {
                let Some(fragment) = fragment_at(x as u32, y as u32) else { continue };
                match resolver.resolve(resources, &fragment) {
                    FragmentOutput::Color(c) => {
                        *px = c;
                        stats.written += 1;
                    }
                    FragmentOutput::Discard => stats.discarded += 1,
                }
            }
            stats
        })
        .reduce(RasterStats::default, |a, b| a + b)
}
