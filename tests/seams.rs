use glam::{UVec2, Vec2, Vec4};
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tilegrid::atlas::solid_tile;
use tilegrid::raster::{Framebuffer, rasterize_surface};
use tilegrid::{
    AtlasLayout, Fragment, LayeredResolver, PackedResolver, PlacementMap, RenderResources, Sampler,
    SamplerDesc, SeamStrategy, TileAtlas, TileResolver,
};
use tilegrid::sampler::FilterMode;

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

fn linear_sampler() -> Sampler {
    Sampler::new(SamplerDesc {
        min_filter: FilterMode::Linear,
        mag_filter: FilterMode::Linear,
        ..Default::default()
    })
}

fn rgb_tiles() -> Vec<RgbaImage> {
    vec![
        solid_tile(4, [255, 0, 0, 255]),
        solid_tile(4, [0, 255, 0, 255]),
        solid_tile(4, [0, 0, 255, 255]),
    ]
}

// Helper: tiles whose texels all differ, so any addressing mistake shows.
fn patterned_tiles() -> Vec<RgbaImage> {
    (0..3u8)
        .map(|t| {
            RgbaImage::from_fn(4, 4, |x, y| Rgba([t * 80, x as u8 * 60, y as u8 * 60, 255]))
        })
        .collect()
}

// Helper: 16x16 map, left half tile 0 (red), right half tile 2 (blue).
// Tiles 0 and 2 are two cells apart in a packed atlas.
fn split_map() -> PlacementMap {
    let mut map = PlacementMap::new(16, 16).unwrap();
    for y in 0..16 {
        for x in 0..16 {
            map.set(UVec2::new(x, y), if x < 8 { 1 } else { 3 });
        }
    }
    map
}

// Fragment one pixel left of the vertical tile edge at x = 0.5, with 4
// pixels per cell (one atlas texel per pixel for 4px tiles).
fn edge_fragment() -> Fragment {
    Fragment::with_derivatives(
        Vec2::new(0.5 - 1.0 / 64.0, 0.25 + 1.0 / 128.0),
        Vec2::new(1.0 / 64.0, 0.0),
        Vec2::new(0.0, 1.0 / 64.0),
    )
}

// ── Mip selection ─────────────────────────────────────────────────────────────

#[test]
fn substitution_lod_not_above_plain_inside_tiles() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut map = PlacementMap::new(16, 16).unwrap();
    for y in 0..16 {
        for x in 0..16 {
            map.set(UVec2::new(x, y), rng.gen_range(1..=3));
        }
    }
    let atlas = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &rgb_tiles()).unwrap();
    let sampler = Sampler::default();
    let res = RenderResources::new(&map, &atlas, &sampler);
    let substituted = PackedResolver::new(8, SeamStrategy::DerivativeSubstitution);
    let plain = PackedResolver::new(8, SeamStrategy::PlainFiltered);

    let mut checked = 0;
    for _ in 0..3000 {
        let coord = Vec2::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
        let step = rng.gen_range(1e-4..0.02);
        let frag = Fragment::with_derivatives(coord, Vec2::new(step, 0.0), Vec2::new(0.0, step));
        let cell = map.cell_at(coord);
        if map.cell_at(coord + frag.ddx) != cell || map.cell_at(coord + frag.ddy) != cell {
            continue;
        }
        let a = substituted.selected_lod(&res, &frag).unwrap();
        let b = plain.selected_lod(&res, &frag).unwrap();
        assert!(a <= b + 1e-3, "coord {coord} step {step}: {a} > {b}");
        checked += 1;
    }
    assert!(checked > 100);
}

#[test]
fn plain_lod_jumps_at_tile_edge() {
    let map = split_map();
    let atlas = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &rgb_tiles()).unwrap();
    let sampler = Sampler::default();
    let res = RenderResources::new(&map, &atlas, &sampler);
    let frag = edge_fragment();

    let substituted = PackedResolver::new(8, SeamStrategy::DerivativeSubstitution)
        .selected_lod(&res, &frag)
        .unwrap();
    let plain = PackedResolver::new(8, SeamStrategy::PlainFiltered)
        .selected_lod(&res, &frag)
        .unwrap();
    assert_eq!(substituted, 0.0);
    assert!((plain - 5f32.log2()).abs() < 1e-4, "plain lod {plain}");
}

// ── Tile edges ────────────────────────────────────────────────────────────────

#[test]
fn substitution_keeps_edge_pixel_inside_tile() {
    let map = split_map();
    let sampler = Sampler::default();
    let frag = edge_fragment();

    let packed = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &rgb_tiles()).unwrap();
    let res = RenderResources::new(&map, &packed, &sampler);
    let out = PackedResolver::new(8, SeamStrategy::DerivativeSubstitution).resolve(&res, &frag);
    assert_eq!(out.color(), Some(RED));

    let layered = TileAtlas::from_tiles(AtlasLayout::Layered, &rgb_tiles()).unwrap();
    let res = RenderResources::new(&map, &layered, &sampler);
    let out = LayeredResolver::new(SeamStrategy::DerivativeSubstitution).resolve(&res, &frag);
    assert_eq!(out.color(), Some(RED));
}

#[test]
fn substitution_keeps_edge_pixel_inside_tile_when_minified() {
    let map = split_map();
    let atlas = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &rgb_tiles()).unwrap();
    let sampler = Sampler::default();
    let res = RenderResources::new(&map, &atlas, &sampler);

    // Two pixels per cell: mip level 1.
    let frag = Fragment::with_derivatives(
        Vec2::new(0.5 - 1.0 / 32.0, 0.25 + 1.0 / 64.0),
        Vec2::new(1.0 / 32.0, 0.0),
        Vec2::new(0.0, 1.0 / 32.0),
    );
    let resolver = PackedResolver::new(8, SeamStrategy::DerivativeSubstitution);
    assert_eq!(resolver.selected_lod(&res, &frag), Some(1.0));
    assert_eq!(resolver.resolve(&res, &frag).color(), Some(RED));
}

#[test]
fn layered_minified_edge_stays_inside_tile() {
    let map = split_map();
    let atlas = TileAtlas::from_tiles(AtlasLayout::Layered, &rgb_tiles()).unwrap();
    let sampler = linear_sampler();
    let res = RenderResources::new(&map, &atlas, &sampler);
    let resolver = LayeredResolver::new(SeamStrategy::DerivativeSubstitution);

    // Two pixels per cell, and 1.5 pixels per cell, one pixel left of x = 0.5.
    for (step, lod) in [(1.0 / 32.0, 1.0), (1.0 / 24.0, (8.0f32 / 3.0).log2())] {
        let frag = Fragment::with_derivatives(
            Vec2::new(0.5 - step, 0.25 + step / 2.0),
            Vec2::new(step, 0.0),
            Vec2::new(0.0, step),
        );
        let selected = resolver.selected_lod(&res, &frag).unwrap();
        assert!((selected - lod).abs() < 1e-4, "step {step}: lod {selected}");
        let color = resolver.resolve(&res, &frag).color().unwrap();
        assert!((color - RED).length() < 1e-5, "step {step}: {color}");
    }
}

#[test]
fn packed_linear_filter_bleeds_at_level_zero() {
    // Bilinear taps reach the neighbouring sub-tile of a packed atlas even
    // without minification. Layers clamp at their own edge.
    let map = split_map();
    let sampler = linear_sampler();
    let frag = Fragment::at(Vec2::new(7.9375 / 16.0, 0.25 + 1.0 / 128.0));

    let packed = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &rgb_tiles()).unwrap();
    let res = RenderResources::new(&map, &packed, &sampler);
    let resolver = PackedResolver::new(8, SeamStrategy::DerivativeSubstitution);
    assert_eq!(resolver.selected_lod(&res, &frag), Some(0.0));
    let color = resolver.resolve(&res, &frag).color().unwrap();
    // A quarter of the green tile next to red in the atlas.
    assert!((color - Vec4::new(0.75, 0.25, 0.0, 1.0)).length() < 1e-5, "got {color}");

    let layered = TileAtlas::from_tiles(AtlasLayout::Layered, &rgb_tiles()).unwrap();
    let res = RenderResources::new(&map, &layered, &sampler);
    let color = LayeredResolver::new(SeamStrategy::DerivativeSubstitution)
        .resolve(&res, &frag)
        .color()
        .unwrap();
    assert!((color - RED).length() < 1e-5, "got {color}");
}

#[test]
fn plain_filtering_bleeds_neighbours_in_packed_atlas() {
    let map = split_map();
    let atlas = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &rgb_tiles()).unwrap();
    let sampler = Sampler::default();
    let res = RenderResources::new(&map, &atlas, &sampler);

    let color = PackedResolver::new(8, SeamStrategy::PlainFiltered)
        .resolve(&res, &edge_fragment())
        .color()
        .unwrap();
    assert!((color - RED).length() > 0.1, "expected a seam, got {color}");
}

// ── Packed vs layered ─────────────────────────────────────────────────────────

#[test]
fn packed_and_layered_render_identically() {
    let map = PlacementMap::from_rows(&[vec![1, 0], vec![2, 3]]).unwrap();
    let packed = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &patterned_tiles()).unwrap();
    let layered = TileAtlas::from_tiles(AtlasLayout::Layered, &patterned_tiles()).unwrap();
    let sampler = Sampler::default();
    let background = Vec4::new(0.1, 0.2, 0.3, 1.0);

    // Magnified, one texel per pixel, and minified to one pixel per cell.
    for size in [64, 16, 4, 2] {
        let mut a = Framebuffer::new(size, size, background);
        let mut b = Framebuffer::new(size, size, background);
        let stats_a = rasterize_surface(
            &PackedResolver::new(8, SeamStrategy::DerivativeSubstitution),
            &RenderResources::new(&map, &packed, &sampler),
            &mut a,
        );
        let stats_b = rasterize_surface(
            &LayeredResolver::new(SeamStrategy::DerivativeSubstitution),
            &RenderResources::new(&map, &layered, &sampler),
            &mut b,
        );
        assert_eq!(stats_a, stats_b);
        for (i, (pa, pb)) in a.pixels().iter().zip(b.pixels()).enumerate() {
            assert!((*pa - *pb).length() < 1e-4, "size {size} pixel {i}: {pa} vs {pb}");
        }
    }
}

#[test]
fn packed_and_layered_agree_at_tile_centres() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut map = PlacementMap::new(7, 5).unwrap();
    for y in 0..5 {
        for x in 0..7 {
            map.set(UVec2::new(x, y), rng.gen_range(0..=3));
        }
    }
    let packed = TileAtlas::from_tiles(AtlasLayout::packed(8).unwrap(), &patterned_tiles()).unwrap();
    let layered = TileAtlas::from_tiles(AtlasLayout::Layered, &patterned_tiles()).unwrap();
    let sampler = Sampler::default();
    let res_packed = RenderResources::new(&map, &packed, &sampler);
    let res_layered = RenderResources::new(&map, &layered, &sampler);
    let dims = map.dimensions().as_vec2();

    for y in 0..5 {
        for x in 0..7 {
            // Texel centres of the 4x4 tile.
            for (tx, ty) in [(0, 0), (1, 2), (3, 3), (2, 1)] {
                let local = (Vec2::new(tx as f32, ty as f32) + 0.5) / 4.0;
                let coord = (Vec2::new(x as f32, y as f32) + local) / dims;
                let frag = Fragment::at(coord);
                let a = PackedResolver::new(8, SeamStrategy::DerivativeSubstitution)
                    .resolve(&res_packed, &frag);
                let b = LayeredResolver::new(SeamStrategy::DerivativeSubstitution)
                    .resolve(&res_layered, &frag);
                assert_eq!(a, b, "cell ({x}, {y}) texel ({tx}, {ty})");
            }
        }
    }
}
