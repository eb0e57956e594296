//! Central error type for tilegrid.
//!
//! Errors only come from building or binding resources. Resolving a single
//! fragment never fails: it either yields a colour or a discard.

use crate::atlas::AtlasLayout;

#[derive(thiserror::Error, Debug)]
pub enum TilegridError {
    #[error("placement map must be at least 1x1, got {width}x{height}")]
    EmptyPlacement { width: u32, height: u32 },

    #[error("atlas needs at least one tile")]
    EmptyAtlas,

    #[error("atlas holds {tiles} tiles but a {dim}x{dim} packed layout fits only {capacity}")]
    AtlasOverflow { tiles: u32, dim: u32, capacity: u64 },

    #[error("packed atlas dimension must be at least 1")]
    ZeroPackedDim,

    #[error("packed atlas dimension {dim} exceeds the maximum of {max}")]
    PackedDimTooLarge { dim: u32, max: u32 },

    #[error("texture of {width}x{height}x{depth} texels is too large")]
    TextureTooLarge { width: u32, height: u32, depth: u32 },

    #[error("tile {index} is {width}x{height}, expected {expected}x{expected}")]
    TileSizeMismatch {
        index: usize,
        width: u32,
        height: u32,
        expected: u32,
    },

    #[error("tile sheet of {width}x{height} is not a whole number of {tile_size}px tiles")]
    SheetSize {
        width: u32,
        height: u32,
        tile_size: u32,
    },

    #[error("pixel buffer holds {actual} texels, expected {expected}")]
    PixelCount { expected: usize, actual: usize },

    #[error("resolver expects a {expected:?} atlas but the bound atlas is {actual:?}")]
    LayoutMismatch {
        expected: AtlasLayout,
        actual: AtlasLayout,
    },

    #[error("no png tiles found in {0}")]
    NoTilesFound(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TilegridError>;
