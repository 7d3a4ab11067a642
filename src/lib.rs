//! Builds tileset artifacts (sliced tile sprites with collision, animation and
//! tag metadata) from level-editor tileset documents, and places document
//! tile layers onto stacked grid layers.
//!
//! Everything runs synchronously on CPU-side [`macroquad::texture::Image`]s;
//! no graphics context is needed.

#![warn(missing_docs)]

/// Source-file dependencies of a tileset document.
pub mod dependency;
/// Error types.
pub mod error;
/// File-level entry point that ties loading, building and persistence together.
pub mod importer;
/// Grid layers that placement writes into.
pub mod layer;
/// Readers for on-disk documents.
pub mod loader {
    /// Level-editor JSON documents.
    pub mod json_loader;
}
/// Places document tile layers onto stacked grid layers.
pub mod placement;
/// Build configuration.
pub mod settings;
/// Rects, cells and coordinate conversions.
pub mod spatial;
/// Tileset artifact building.
pub mod tileset;

pub use dependency::{compute_dependencies, texture_path};
pub use error::{BuildError, LoadError, PlacementError};
pub use importer::import_tileset;
pub use layer::{GridLayer, PlacedTile};
pub use loader::json_loader::{
    load_tileset_file, LayerInstance, LayerType, TileInstance, TilesetDefinition, TilesetFile,
    TilesetRectangle,
};
pub use placement::{
    build_layer, flip_transform, max_stack_depth, place_tiles, GridDimensions, Placement,
    PlacementWarning,
};
pub use settings::{BuildSettings, OverflowPolicy, PlatformSettings, TextureFormat, TextureKind};
pub use spatial::{cell_from_pixel, convert_cell, image_slice_rect, Cell, PixelRect};
pub use tileset::annotation::{parse_annotation, AnimationSpec, AnnotationWarning, MinMax};
pub use tileset::artifact::{
    AdditionalSprite, ArtifactManifest, ArtifactSet, ColliderType, TileArtifact, TileLookup,
};
pub use tileset::builder::{BuildWarning, TilesetBuild, TilesetBuilder};
pub use tileset::cache::{ArtifactCache, ArtifactId, ArtifactKey};
pub use tileset::slicer::{AtlasSlicer, ImageSlicer, SliceOutput, SlicedRegion};
pub use tileset::sprite_rect::{SpriteRect, SpriteRectStore};
pub use tileset::texture::{
    PlatformSettingsValidator, SourceTexture, TextureIssue, TextureValidator,
};
