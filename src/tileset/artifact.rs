use crate::error::LoadError;
use crate::loader::json_loader::read_json;
use crate::spatial::PixelRect;
use crate::tileset::annotation::AnimationSpec;
use crate::tileset::cache::{ArtifactCache, ArtifactId, ArtifactKey};
use macroquad::math::Vec2;
use macroquad::texture::Image;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Corners of a one-unit square centred on the origin.
const GRID_CORNERS: [Vec2; 4] = [
    Vec2::new(-0.5, -0.5),
    Vec2::new(-0.5, 0.5),
    Vec2::new(0.5, 0.5),
    Vec2::new(0.5, -0.5),
];
const CORNER_EPSILON: f32 = 1e-5;

/// Physics shape assigned to a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderType {
    /// No outline.
    None,
    /// The tile's full cell.
    Grid,
    /// A custom outline.
    Sprite,
}

impl ColliderType {
    /// Classifies outlines given in units, relative to the tile centre.
    pub fn classify(outlines: &[Vec<Vec2>]) -> ColliderType {
        match outlines {
            [] => ColliderType::None,
            [single] if is_grid_outline(single) => ColliderType::Grid,
            _ => ColliderType::Sprite,
        }
    }
}

fn is_grid_outline(outline: &[Vec2]) -> bool {
    outline.len() == 4
        && GRID_CORNERS
            .iter()
            .all(|corner| outline.iter().any(|p| p.abs_diff_eq(*corner, CORNER_EPSILON)))
}

/// A grid tile: its image region plus everything a tilemap needs to use it.
pub struct TileArtifact {
    /// Artifact name.
    pub name: String,
    /// Tile id in the definition.
    pub tile_id: usize,
    /// Bottom-up slice space.
    pub rect: PixelRect,
    /// Sliced pixels.
    pub image: Image,
    /// Physics shape kind.
    pub collider: ColliderType,
    /// Physics outlines in pixels, origin at the region's bottom-left corner.
    pub outlines: Vec<Vec<Vec2>>,
    /// Raw annotation text.
    pub custom_data: Option<String>,
    /// Enum values tagging this tile.
    pub enum_tags: Vec<String>,
    /// Animation, when the custom data declares one.
    pub animation: Option<AnimationSpec>,
}

/// A field-referenced region. Sliced, but carries no tile metadata.
pub struct AdditionalSprite {
    /// Artifact name.
    pub name: String,
    /// Bottom-up slice space.
    pub rect: PixelRect,
    /// Sliced pixels.
    pub image: Image,
    /// Index into the tileset file's `rects`.
    pub rect_index: usize,
}

/// Everything one tileset build produces. Replaced wholesale on rebuild.
pub struct ArtifactSet {
    /// `_{identifier}_Artifacts`.
    pub name: String,
    /// Tileset identifier, also the artifact key texture.
    pub texture: String,
    /// Texture height in pixels.
    pub texture_height: u32,
    /// Tile edge in pixels.
    pub grid_size: u32,
    /// Grid tiles in tile-id order.
    pub tiles: ArtifactCache<TileArtifact>,
    /// Field-referenced sprites.
    pub additional: ArtifactCache<AdditionalSprite>,
}

impl ArtifactSet {
    /// An empty set for the named tileset.
    pub fn new(identifier: &str, texture_height: u32, grid_size: u32) -> Self {
        ArtifactSet {
            name: format!("_{identifier}_Artifacts"),
            texture: identifier.to_owned(),
            texture_height,
            grid_size,
            tiles: ArtifactCache::new(),
            additional: ArtifactCache::new(),
        }
    }

    /// True when nothing was built.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.additional.is_empty()
    }

    /// Tile by position in the standard list.
    pub fn tile(&self, index: usize) -> Option<&TileArtifact> {
        self.tiles.get_by_id(ArtifactId(index))
    }

    /// Tile by artifact name.
    pub fn tile_by_name(&self, name: &str) -> Option<&TileArtifact> {
        self.tiles.get_by_name(name)
    }

    /// Tile by content address.
    pub fn find(&self, key: &ArtifactKey) -> Option<&TileArtifact> {
        self.tiles.get(key)
    }

    /// Every region name: tiles first, then additional sprites.
    pub fn region_names(&self) -> Vec<&str> {
        self.tiles
            .values()
            .map(|t| t.name.as_str())
            .chain(self.additional.values().map(|s| s.name.as_str()))
            .collect()
    }

    /// Drops the pixels and keeps everything placement needs.
    pub fn to_manifest(&self) -> ArtifactManifest {
        let regions = self
            .tiles
            .values()
            .map(|t| RegionRecord {
                name: t.name.clone(),
                rect: t.rect,
                additional: false,
            })
            .chain(self.additional.values().map(|s| RegionRecord {
                name: s.name.clone(),
                rect: s.rect,
                additional: true,
            }))
            .collect();

        let tiles = self
            .tiles
            .values()
            .map(|t| TileRecord {
                name: t.name.clone(),
                tile_id: t.tile_id,
                collider: t.collider,
                outlines: t
                    .outlines
                    .iter()
                    .map(|o| o.iter().map(|p| p.to_array()).collect())
                    .collect(),
                custom_data: t.custom_data.clone(),
                enum_tags: t.enum_tags.clone(),
                animation: t.animation.clone(),
            })
            .collect();

        ArtifactManifest {
            name: self.name.clone(),
            texture: self.texture.clone(),
            texture_height: self.texture_height,
            grid_size: self.grid_size,
            regions,
            tiles,
        }
    }
}

/// Resolves tile names for the placement engine.
pub trait TileLookup {
    /// Texture identity used when building artifact keys.
    fn texture_identity(&self) -> &str;
    /// Texture height in pixels, for flipping document rects.
    fn texture_height(&self) -> u32;
    /// Tile edge in pixels.
    fn tile_grid_size(&self) -> u32;
    /// Tile id of the artifact with this name.
    fn tile_id_by_name(&self, name: &str) -> Option<usize>;
}

impl TileLookup for ArtifactSet {
    fn texture_identity(&self) -> &str {
        &self.texture
    }

    fn texture_height(&self) -> u32 {
        self.texture_height
    }

    fn tile_grid_size(&self) -> u32 {
        self.grid_size
    }

    fn tile_id_by_name(&self, name: &str) -> Option<usize> {
        self.tiles.get_by_name(name).map(|t| t.tile_id)
    }
}

/// Name and rect of one sliced region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Artifact name.
    pub name: String,
    /// Bottom-up slice space.
    pub rect: PixelRect,
    /// Field-referenced rather than a grid tile.
    pub additional: bool,
}

/// Tile metadata without pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Artifact name.
    pub name: String,
    /// Tile id in the definition.
    pub tile_id: usize,
    /// Physics shape kind.
    pub collider: ColliderType,
    /// Physics outlines in pixels.
    pub outlines: Vec<Vec<[f32; 2]>>,
    /// Raw annotation text.
    pub custom_data: Option<String>,
    /// Enum values tagging this tile.
    pub enum_tags: Vec<String>,
    /// Animation, when the custom data declares one.
    pub animation: Option<AnimationSpec>,
}

/// Persisted form of an [`ArtifactSet`]: region list plus a parallel tile list.
/// Enough to place tiles again without re-slicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Artifact name.
    pub name: String,
    /// Tileset identifier.
    pub texture: String,
    /// Texture height in pixels.
    pub texture_height: u32,
    /// Tile edge in pixels.
    pub grid_size: u32,
    /// Tiles first, then additional sprites.
    pub regions: Vec<RegionRecord>,
    /// Tile metadata in tile-id order.
    pub tiles: Vec<TileRecord>,
}

impl ArtifactManifest {
    /// Reads a JSON file written by `save`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        read_json(path)
    }

    /// Writes pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        let txt = serde_json::to_string_pretty(self).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, txt).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Name lookup usable for placement.
    pub fn index(&self) -> ManifestIndex<'_> {
        ManifestIndex {
            manifest: self,
            by_name: self
                .tiles
                .iter()
                .map(|t| (t.name.as_str(), t.tile_id))
                .collect(),
        }
    }
}

/// Name lookup over a loaded manifest.
pub struct ManifestIndex<'m> {
    manifest: &'m ArtifactManifest,
    by_name: HashMap<&'m str, usize>,
}

impl TileLookup for ManifestIndex<'_> {
    fn texture_identity(&self) -> &str {
        &self.manifest.texture
    }

    fn texture_height(&self) -> u32 {
        self.manifest.texture_height
    }

    fn tile_grid_size(&self) -> u32 {
        self.manifest.grid_size
    }

    fn tile_id_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}
