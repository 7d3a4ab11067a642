// src/loader/json_loader.rs
use crate::error::LoadError;
use crate::spatial::{self, Cell, PixelRect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Extensions accepted for tileset documents.
pub const TILESET_EXTENSIONS: [&str; 2] = ["ldtkt", "json"];

/// Declared decomposition of one texture into tiles.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetDefinition {
    /// Unique name, also the artifact name prefix.
    pub identifier: String,
    /// Editor uid.
    #[serde(default)]
    pub uid: i64,
    /// Texture path relative to the document. `None` together with no embedded
    /// atlas means the tileset has no image at all.
    #[serde(default)]
    pub rel_path: Option<String>,
    /// Name of the editor's built-in atlas, when used instead of a file.
    #[serde(default)]
    pub embed_atlas: Option<String>,
    /// Declared texture width in pixels.
    pub px_wid: u32,
    /// Declared texture height in pixels.
    pub px_hei: u32,
    /// Tile edge in pixels.
    pub tile_grid_size: u32,
    /// Gap between tiles in pixels.
    #[serde(default)]
    pub spacing: u32,
    /// Border around the whole grid in pixels.
    #[serde(default)]
    pub padding: u32,
    /// Columns.
    #[serde(rename = "__cWid")]
    pub c_wid: u32,
    /// Rows.
    #[serde(rename = "__cHei")]
    pub c_hei: u32,
    /// Per-tile annotation text.
    #[serde(default)]
    pub custom_data: Vec<TileCustomData>,
    /// Enum values and the tiles tagged with them.
    #[serde(default)]
    pub enum_tags: Vec<EnumTagValue>,
}

/// Custom data attached to one tile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileCustomData {
    /// Tile id.
    pub tile_id: u32,
    /// Raw annotation text, see [`crate::tileset::annotation`].
    pub data: String,
}

/// One enum value and the tiles it tags.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumTagValue {
    /// Enum value name.
    pub enum_value_id: String,
    /// Tagged tile ids.
    pub tile_ids: Vec<u32>,
}

impl TilesetDefinition {
    /// Whether the tileset uses the built-in atlas.
    pub fn is_embed_atlas(&self) -> bool {
        self.embed_atlas.is_some()
    }

    /// A tileset with neither a texture path nor an embedded atlas.
    pub fn is_null_tileset(&self) -> bool {
        !self.is_embed_atlas() && self.rel_path.is_none()
    }

    /// Custom data keyed by tile id. Later entries win.
    pub fn custom_data_by_tile(&self) -> BTreeMap<u32, &str> {
        self.custom_data
            .iter()
            .map(|cd| (cd.tile_id, cd.data.as_str()))
            .collect()
    }

    /// Enum tags grouped per tile, in declaration order.
    pub fn enum_tags_by_tile(&self) -> BTreeMap<u32, Vec<String>> {
        let mut out: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for tag in &self.enum_tags {
            for &tile_id in &tag.tile_ids {
                out.entry(tile_id)
                    .or_default()
                    .push(tag.enum_value_id.clone());
            }
        }
        out
    }

    /// Grid rectangles in document space, row-major. Index == tile id.
    pub fn grid_rects(&self) -> Vec<PixelRect> {
        let size = self.tile_grid_size as i32;
        let step = size + self.spacing as i32;
        let pad = self.padding as i32;

        let mut rects = Vec::with_capacity((self.c_wid * self.c_hei) as usize);
        for row in 0..self.c_hei as i32 {
            for col in 0..self.c_wid as i32 {
                rects.push(PixelRect::new(pad + col * step, pad + row * step, size, size));
            }
        }
        rects
    }
}

/// A non-grid region referenced from entity or level fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetRectangle {
    /// Owning tileset uid.
    #[serde(default)]
    pub tileset_uid: i64,
    /// Left edge, top-down pixels.
    pub x: i32,
    /// Top edge, top-down pixels.
    pub y: i32,
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
}

impl TilesetRectangle {
    /// As a [`PixelRect`], still top-down.
    pub fn to_pixel_rect(self) -> PixelRect {
        PixelRect::new(self.x, self.y, self.w, self.h)
    }
}

/// On-disk tileset document: the definition plus the field-referenced rects.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TilesetFile {
    /// The tileset definition.
    pub def: TilesetDefinition,
    /// Field-referenced rects, in document order.
    #[serde(default)]
    pub rects: Vec<TilesetRectangle>,
}

/// One placed tile occurrence in a layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TileInstance {
    /// Pixel position in the layer.
    pub px: [i32; 2],
    /// Pixel position in the tileset texture.
    pub src: [i32; 2],
    /// Flip bits: bit 0 = X, bit 1 = Y.
    #[serde(default)]
    pub f: u32,
    /// Tile id in the tileset.
    pub t: u32,
    /// `[ruleId, coordId]` for auto-layer tiles, `[coordId]` otherwise.
    #[serde(default)]
    pub d: Vec<i64>,
}

impl TileInstance {
    /// Layer pixel position as a vector.
    #[inline]
    pub fn px(&self) -> Cell {
        Cell::from(self.px)
    }

    /// Texture pixel position as a vector.
    #[inline]
    pub fn src(&self) -> Cell {
        Cell::from(self.src)
    }

    /// Mirrored horizontally.
    #[inline]
    pub fn flip_x(&self) -> bool {
        spatial::flip_x(self.f)
    }

    /// Mirrored vertically.
    #[inline]
    pub fn flip_y(&self) -> bool {
        spatial::flip_y(self.f)
    }
}

/// Kind of document layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LayerType {
    /// Integer grid; may carry auto-layer tiles.
    IntGrid,
    /// Entity instances only.
    Entities,
    /// Hand-placed tiles.
    Tiles,
    /// Rule-generated tiles.
    AutoLayer,
}

/// One layer of a level document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LayerInstance {
    /// Layer name.
    #[serde(rename = "__identifier")]
    pub identifier: String,
    /// Layer kind.
    #[serde(rename = "__type")]
    pub layer_type: LayerType,
    /// Width in cells.
    #[serde(rename = "__cWid")]
    pub c_wid: u32,
    /// Height in cells.
    #[serde(rename = "__cHei")]
    pub c_hei: u32,
    /// Cell edge in pixels.
    #[serde(rename = "__gridSize")]
    pub grid_size: u32,
    /// Texture of the tileset the layer draws from.
    #[serde(rename = "__tilesetRelPath", default)]
    pub tileset_rel_path: Option<String>,
    /// Hand-placed tiles.
    #[serde(rename = "gridTiles", default)]
    pub grid_tiles: Vec<TileInstance>,
    /// Rule-generated tiles.
    #[serde(rename = "autoLayerTiles", default)]
    pub auto_layer_tiles: Vec<TileInstance>,
}

impl LayerInstance {
    /// Whether the layer draws from `auto_layer_tiles`.
    pub fn is_auto_layer(&self) -> bool {
        matches!(self.layer_type, LayerType::AutoLayer | LayerType::IntGrid)
    }

    /// The tiles this layer draws, in document draw order.
    pub fn tiles(&self) -> &[TileInstance] {
        if self.is_auto_layer() {
            &self.auto_layer_tiles
        } else {
            &self.grid_tiles
        }
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let txt = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&txt).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a tileset document. Only `.ldtkt` and `.json` are accepted.
pub fn load_tileset_file(path: &Path) -> Result<TilesetFile, LoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    if !ext.is_some_and(|e| TILESET_EXTENSIONS.contains(&e)) {
        return Err(LoadError::UnsupportedFormat(path.display().to_string()));
    }
    read_json(path)
}
