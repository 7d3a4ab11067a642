use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::spatial::Cell;
use crate::tileset::texture::TextureIssue;

/// Errors raised while reading documents, settings or textures from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// JSON parse error
    #[error("failed to parse JSON in {path}: {source}")]
    Json {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// The texture file could not be decoded
    #[error("failed to decode image {path}: {message}")]
    Image {
        /// Image file
        path: PathBuf,
        /// Decoder message
        message: String,
    },
    /// Unsupported file format
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Fatal tileset build errors. No artifact set is published when one of these is returned.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The texture's pixels cannot be read back
    #[error("texture \"{0}\" is not pixel-readable; enable read/write on it")]
    TextureNotReadable(String),
    /// Format or size constraints are not met
    #[error("texture \"{texture}\" has {} import issue(s): {}", issues.len(), join_issues(issues))]
    TextureIssues {
        /// Texture identity
        texture: String,
        /// Every issue found
        issues: Vec<TextureIssue>,
    },
    /// The definition points at an empty relative path
    #[error("tileset \"{0}\" has an empty texture path")]
    MissingTexturePath(String),
    /// A tileset with an image path was built without its texture
    #[error("tileset \"{0}\" references a texture but none was supplied")]
    MissingTexture(String),
    /// An embed-atlas tileset was built without an internal icons texture configured
    #[error("tileset \"{0}\" uses the embedded atlas, but no internal icons texture is configured")]
    EmbedAtlasNotConfigured(String),
    /// The texture does not match the size the definition declares
    #[error("texture is {actual_w}x{actual_h} but tileset \"{tileset}\" declares {expected_w}x{expected_h}")]
    TextureSizeMismatch {
        /// Tileset identifier
        tileset: String,
        /// Declared width
        expected_w: u32,
        /// Declared height
        expected_h: u32,
        /// Texture width
        actual_w: u32,
        /// Texture height
        actual_h: u32,
    },
    /// The slicing service returned errors
    #[error("image slicing failed: {}", .0.join("; "))]
    SlicerFailed(Vec<String>),
    /// The slicing service produced no regions
    #[error("no image regions were generated for tileset \"{0}\"")]
    NoRegionsGenerated(String),
    /// The slicing service did not honour one-region-per-rect
    #[error("slicer returned {actual} regions for {expected} rects")]
    RegionCountMismatch {
        /// Rects requested
        expected: usize,
        /// Regions returned
        actual: usize,
    },
    /// Two regions resolved to the same artifact key
    #[error("region \"{0}\" was produced twice")]
    DuplicateRegion(String),
    /// Reading an input failed
    #[error(transparent)]
    Load(#[from] LoadError),
}

fn join_issues(issues: &[TextureIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fatal placement errors. No layers are published when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    /// Placement was requested with zero grid layers
    #[error("at least one grid layer is required")]
    NoLayers,
    /// The layer declares a zero pixel grid size
    #[error("grid size must be non-zero")]
    ZeroGridSize,
    /// More tiles stack on one cell than there are layers
    #[error("more than {layer_count} tiles stacked on cell ({}, {})", cell.x, cell.y)]
    StackOverflow {
        /// Cell in document space
        cell: Cell,
        /// Layers available
        layer_count: usize,
    },
    /// A tile lands outside the layer grid
    #[error("tile at cell ({}, {}) is outside the {columns}x{rows} grid", cell.x, cell.y)]
    CellOutOfBounds {
        /// Cell in document space
        cell: Cell,
        /// Grid width in cells
        columns: u32,
        /// Grid height in cells
        rows: u32,
    },
}
