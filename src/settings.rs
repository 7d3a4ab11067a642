use crate::error::LoadError;
use crate::loader::json_loader::read_json;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pixel layout of a source texture as imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum TextureFormat {
    /// 8-bit RGBA, the only layout the slicer reads.
    #[default]
    Rgba32,
    /// 8-bit RGB without alpha.
    Rgb24,
    /// Alpha channel only.
    Alpha8,
    /// Any block-compressed format.
    Compressed,
}

/// What the texture was imported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum TextureKind {
    /// Sliceable sprite sheet.
    #[default]
    Sprite,
    /// Plain texture with no sprite data.
    Default,
    /// Normal map.
    NormalMap,
    /// Single channel mask.
    SingleChannel,
}

/// Import settings the texture slicer must comply with.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Largest dimension the importer keeps, in pixels.
    pub max_texture_size: u32,
    /// Pixel layout after import.
    pub format: TextureFormat,
    /// Import type; only sprites can be sliced.
    pub kind: TextureKind,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        PlatformSettings {
            max_texture_size: 2048,
            format: TextureFormat::Rgba32,
            kind: TextureKind::Sprite,
        }
    }
}

/// What to do when more tiles stack on one cell than there are grid layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum OverflowPolicy {
    /// Fail the whole placement pass.
    #[default]
    Reject,
    /// Keep writing into layer 0, replacing whatever is there.
    ClampToTop,
}

/// Configuration shared by the builder, the importer and layer placement.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Pixels per world unit. `None` uses the tileset grid size.
    pub pixels_per_unit: Option<u32>,
    /// Texture standing in for embedded-atlas tilesets.
    pub internal_icons_texture: Option<PathBuf>,
    /// Upper bound on grid layers per document layer. `None` sizes the stack
    /// to the deepest cell.
    pub max_grid_layers: Option<usize>,
    /// Applied when a cell stacks deeper than the grid layers allow.
    pub overflow_policy: OverflowPolicy,
    /// Expected texture import settings.
    pub platform: PlatformSettings,
}

impl BuildSettings {
    /// Reads settings from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        read_json(path)
    }

    /// Pixels per unit for a tileset with the given grid size. Never zero.
    pub fn pixels_per_unit_for(&self, grid_size: u32) -> u32 {
        self.pixels_per_unit.unwrap_or(grid_size).max(1)
    }

    /// Grid layers for a layer whose deepest cell holds `deepest` tiles.
    pub fn grid_layers_for(&self, deepest: usize) -> usize {
        let wanted = deepest.max(1);
        match self.max_grid_layers {
            Some(cap) => wanted.min(cap.max(1)),
            None => wanted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let settings: BuildSettings =
            serde_json::from_str(r#"{ "overflow_policy": "ClampToTop" }"#).expect("parse");
        assert_eq!(settings.overflow_policy, OverflowPolicy::ClampToTop);
        assert_eq!(settings.platform.max_texture_size, 2048);
        assert_eq!(settings.platform.format, TextureFormat::Rgba32);
        assert_eq!(settings.platform.kind, TextureKind::Sprite);
        assert_eq!(settings.max_grid_layers, None);
        assert_eq!(settings.pixels_per_unit_for(16), 16);
    }

    #[test]
    fn explicit_pixels_per_unit_wins() {
        let settings = BuildSettings {
            pixels_per_unit: Some(32),
            ..Default::default()
        };
        assert_eq!(settings.pixels_per_unit_for(16), 32);
    }

    #[test]
    fn grid_layers_follow_the_deepest_cell_up_to_the_cap() {
        let open = BuildSettings::default();
        assert_eq!(open.grid_layers_for(0), 1);
        assert_eq!(open.grid_layers_for(5), 5);

        let capped = BuildSettings {
            max_grid_layers: Some(2),
            ..Default::default()
        };
        assert_eq!(capped.grid_layers_for(5), 2);
        assert_eq!(capped.grid_layers_for(1), 1);
    }
}
