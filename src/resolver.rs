//! Per-fragment tile resolution.
//!
//! Every fragment runs the same four steps, with no state shared between
//! fragments:
//!
//! 1. grid lookup: `cell = floor(coord * (W, H))`, `id = placement[cell]`
//! 2. empty gate: `id == 0` discards the fragment
//! 3. local coordinate: `local = fract(coord * (W, H))`
//! 4. atlas sample at the tile's region (packed) or layer (layered)
//!
//! Only step 4 differs between atlas layouts, so both resolvers share
//! [`resolve_fragment`] and supply nothing but an [`AtlasLayout`].

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::atlas::{AtlasLayout, TileAtlas};
use crate::error::{Result, TilegridError};
use crate::placement::{PlacementMap, tile_of};
use crate::sampler::Sampler;

// ── Fragment ─────────────────────────────────────────────────────────────────

/// One fragment's interpolated surface coordinate and its screen-space
/// derivatives (change of `coord` per pixel step in x and y).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub coord: Vec2,
    pub ddx: Vec2,
    pub ddy: Vec2,
}

impl Fragment {
    /// A fragment with zero derivatives (always samples mip level 0).
    pub fn at(coord: Vec2) -> Self {
        Self { coord, ddx: Vec2::ZERO, ddy: Vec2::ZERO }
    }

    pub fn with_derivatives(coord: Vec2, ddx: Vec2, ddy: Vec2) -> Self {
        Self { coord, ddx, ddy }
    }
}

/// Result of resolving one fragment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FragmentOutput {
    Color(Vec4),
    /// Empty cell: nothing is written, blended or depth-tested.
    Discard,
}

impl FragmentOutput {
    pub fn color(&self) -> Option<Vec4> {
        match *self {
            FragmentOutput::Color(c) => Some(c),
            FragmentOutput::Discard => None,
        }
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, FragmentOutput::Discard)
    }
}

// ── SeamStrategy ─────────────────────────────────────────────────────────────

/// Where the sampling gradients come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeamStrategy {
    /// Gradients of the continuous scaled coordinate `coord * (W, H)`, taken
    /// before the per-cell wrap, so mip selection ignores the jump at cell
    /// edges.
    ///
    /// This fixes the mip level only. In a packed atlas a `Linear` mag or
    /// min filter still takes taps from the neighbouring sub-tile near a
    /// tile edge, even at level 0, and coarse mips are filtered across
    /// tile borders. Use `Nearest` filtering or a layered atlas when tile
    /// edges must stay clean.
    #[default]
    DerivativeSubstitution,
    /// Gradients inferred from the final atlas coordinate, like an ordinary
    /// `textureSample`. The jump at every cell edge inflates them, so tile
    /// borders show seams under minification.
    PlainFiltered,
}

// ── RenderResources ──────────────────────────────────────────────────────────

/// Everything a draw reads, bound once and shared read-only by all fragments.
#[derive(Clone, Copy)]
pub struct RenderResources<'a> {
    pub placement: &'a PlacementMap,
    pub atlas: &'a TileAtlas,
    pub sampler: &'a Sampler,
}

impl<'a> RenderResources<'a> {
    pub fn new(placement: &'a PlacementMap, atlas: &'a TileAtlas, sampler: &'a Sampler) -> Self {
        Self { placement, atlas, sampler }
    }
}

/// Where a tile lands in the atlas for one fragment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasCoord {
    pub uv: Vec2,
    pub layer: u32,
}

// ── TileResolver ─────────────────────────────────────────────────────────────

/// A per-fragment tile resolver for one atlas layout.
///
/// Placement values must stay within the atlas's tile count. Larger ids are
/// not checked per fragment: packed addresses fall outside the atlas and are
/// handled by the sampler's address mode, layered ids clamp to the last layer.
pub trait TileResolver: Send + Sync {
    fn addressing(&self) -> AtlasLayout;

    fn seam_strategy(&self) -> SeamStrategy;

    /// Verify the bound atlas matches this resolver's addressing.
    fn check(&self, resources: &RenderResources) -> Result<()> {
        let expected = self.addressing();
        let actual = resources.atlas.layout();
        if expected != actual {
            return Err(TilegridError::LayoutMismatch { expected, actual });
        }
        Ok(())
    }

    fn resolve(&self, resources: &RenderResources, fragment: &Fragment) -> FragmentOutput {
        resolve_fragment(self.addressing(), self.seam_strategy(), resources, fragment)
    }

    /// Clamped mip level the sample for `fragment` would use, `None` when
    /// the fragment is discarded.
    fn selected_lod(&self, resources: &RenderResources, fragment: &Fragment) -> Option<f32> {
        let tile = tile_of(resources.placement.fetch(fragment.coord))?;
        let (_, ddx, ddy) =
            sample_inputs(self.addressing(), self.seam_strategy(), resources, fragment, tile);
        Some(resources.sampler.lod(resources.atlas.levels(), ddx, ddy))
    }
}

/// Resolver for a single image split into a `dim` x `dim` tile grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackedResolver {
    pub dim: u32,
    pub strategy: SeamStrategy,
}

impl PackedResolver {
    pub fn new(dim: u32, strategy: SeamStrategy) -> Self {
        Self { dim, strategy }
    }
}

impl TileResolver for PackedResolver {
    fn addressing(&self) -> AtlasLayout {
        AtlasLayout::Packed { dim: self.dim }
    }

    fn seam_strategy(&self) -> SeamStrategy {
        self.strategy
    }
}

/// Resolver for a texture array with one tile per layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayeredResolver {
    pub strategy: SeamStrategy,
}

impl LayeredResolver {
    pub fn new(strategy: SeamStrategy) -> Self {
        Self { strategy }
    }
}

impl TileResolver for LayeredResolver {
    fn addressing(&self) -> AtlasLayout {
        AtlasLayout::Layered
    }

    fn seam_strategy(&self) -> SeamStrategy {
        self.strategy
    }
}

pub fn resolver_for(layout: AtlasLayout, strategy: SeamStrategy) -> Box<dyn TileResolver> {
    match layout {
        AtlasLayout::Packed { dim } => Box::new(PackedResolver::new(dim, strategy)),
        AtlasLayout::Layered => Box::new(LayeredResolver::new(strategy)),
    }
}

// ── Shared routine ───────────────────────────────────────────────────────────

/// Grid lookup, empty gate, local coordinate and atlas sample for one fragment.
pub fn resolve_fragment(
    addressing: AtlasLayout,
    strategy: SeamStrategy,
    resources: &RenderResources,
    fragment: &Fragment,
) -> FragmentOutput {
    let Some(tile) = tile_of(resources.placement.fetch(fragment.coord)) else {
        return FragmentOutput::Discard;
    };

    let (at, ddx, ddy) = sample_inputs(addressing, strategy, resources, fragment, tile);
    let color = resources
        .sampler
        .sample_grad(resources.atlas.levels(), at.uv, at.layer, ddx, ddy);
    FragmentOutput::Color(color)
}

/// Map `(tile, local)` to an atlas coordinate.
///
/// Packed: `cell / dim + local / dim`. Layered: `local` on layer `tile`.
pub fn atlas_coord(addressing: AtlasLayout, tile: u32, local: Vec2) -> AtlasCoord {
    match addressing {
        AtlasLayout::Packed { dim } => {
            let d = dim as f32;
            let cell = addressing.packed_cell(tile).as_vec2();
            AtlasCoord { uv: cell / d + local / d, layer: 0 }
        }
        AtlasLayout::Layered => AtlasCoord { uv: local, layer: tile },
    }
}

fn sample_inputs(
    addressing: AtlasLayout,
    strategy: SeamStrategy,
    resources: &RenderResources,
    fragment: &Fragment,
    tile: u32,
) -> (AtlasCoord, Vec2, Vec2) {
    let placement = resources.placement;
    let local = placement.local_coord(fragment.coord);
    let at = atlas_coord(addressing, tile, local);

    let (ddx, ddy) = match strategy {
        SeamStrategy::DerivativeSubstitution => {
            let grid = placement.dimensions().as_vec2();
            let per_atlas = match addressing {
                AtlasLayout::Packed { dim } => 1.0 / dim as f32,
                AtlasLayout::Layered => 1.0,
            };
            (fragment.ddx * grid * per_atlas, fragment.ddy * grid * per_atlas)
        }
        SeamStrategy::PlainFiltered => {
            // Hardware derivatives: difference of the final coordinate
            // between neighbouring fragments of the same quad.
            let neighbour_uv = |step: Vec2| {
                let coord = fragment.coord + step;
                let tile = tile_of(placement.fetch(coord)).unwrap_or(tile);
                atlas_coord(addressing, tile, placement.local_coord(coord)).uv
            };
            (neighbour_uv(fragment.ddx) - at.uv, neighbour_uv(fragment.ddy) - at.uv)
        }
    };

    (at, ddx, ddy)
}
