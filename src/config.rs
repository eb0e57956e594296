use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::atlas::AtlasLayout;
use crate::error::Result;
use crate::resolver::{SeamStrategy, TileResolver, resolver_for};
use crate::sampler::SamplerDesc;

// ── WindowSettings ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self { width: 1280, height: 720, title: "tilegrid".to_string() }
    }
}

// ── TilegridConfig ────────────────────────────────────────────────────────────

/// Rendering configuration, loadable from JSON. Missing fields take their
/// defaults, so `{}` is a valid config.
///
/// ```json
/// {
///   "layout":   { "kind": "packed", "dim": 8 },
///   "strategy": "derivative_substitution",
///   "sampler":  { "min_filter": "linear" },
///   "window":   { "width": 800, "height": 600 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilegridConfig {
    pub layout: AtlasLayout,
    pub strategy: SeamStrategy,
    pub sampler: SamplerDesc,
    pub window: WindowSettings,
    /// Directory of `.png` tiles. The demo generates tiles when unset.
    pub atlas_folder: Option<String>,
}

impl TilegridConfig {
    /// Parse and validate. An out-of-range packed `dim` is rejected here
    /// rather than when the atlas is built.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.layout.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!("config: loaded {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resolver(&self) -> Box<dyn TileResolver> {
        resolver_for(self.layout, self.strategy)
    }
}
