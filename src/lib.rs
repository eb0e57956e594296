//! Tilemap rendering through a small placement texture.
//!
//! Each map cell stores an index into a shared tile atlas (`0` = empty,
//! `id` = atlas tile `id - 1`). A single quad covers the whole map and every
//! fragment works out its own tile, its position inside that tile and the
//! atlas colour there. The atlas is either packed into one image or split
//! across the layers of a texture array.
//!
//! [`resolver`] is the per-fragment algorithm on the CPU, [`raster`] runs it
//! over a framebuffer, and [`renderer`] runs the same algorithm as WGSL on
//! the GPU.

pub mod atlas;
pub mod camera;
pub mod config;
pub mod error;
pub mod placement;
pub mod raster;
pub mod renderer;
pub mod resolver;
pub mod sampler;
pub mod texture_data;

pub use atlas::{AtlasLayout, TileAtlas};
pub use camera::Camera;
pub use config::TilegridConfig;
pub use error::{Result, TilegridError};
pub use placement::PlacementMap;
pub use resolver::{
    Fragment, FragmentOutput, LayeredResolver, PackedResolver, RenderResources, SeamStrategy,
    TileResolver,
};
pub use sampler::{Sampler, SamplerDesc};
