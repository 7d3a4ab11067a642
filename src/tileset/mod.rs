//! Tileset artifact building: texture checks, slicing, caching and the
//! per-tile metadata that rides along with each sliced region.

/// The per-tile custom-data mini-language.
pub mod annotation;
/// Artifact sets, their persisted manifest and tile lookup.
pub mod artifact;
/// The two-pass tileset build.
pub mod builder;
/// Content-addressed artifact storage.
pub mod cache;
/// Cuts texture regions for each sprite rect.
pub mod slicer;
/// Persisted, editable sprite rects.
pub mod sprite_rect;
/// Source textures and their import checks.
pub mod texture;
