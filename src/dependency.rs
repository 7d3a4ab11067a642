use crate::loader::json_loader::{load_tileset_file, TilesetDefinition};
use crate::settings::BuildSettings;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Where the tileset's texture should be, whether or not it exists.
/// `None` for image-less tilesets, an empty path, or an unconfigured embed atlas.
pub fn texture_path(
    doc_path: &Path,
    def: &TilesetDefinition,
    settings: &BuildSettings,
) -> Option<PathBuf> {
    if def.is_embed_atlas() {
        return settings.internal_icons_texture.clone();
    }
    let rel = def.rel_path.as_deref().filter(|p| !p.is_empty())?;
    let base = doc_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("./"));
    Some(base.join(rel))
}

/// Files a tileset document depends on: its texture, if it exists right now.
/// Never fails; an unreadable document has no known dependencies.
pub fn compute_dependencies(doc_path: &Path, settings: &BuildSettings) -> Vec<PathBuf> {
    let file = match load_tileset_file(doc_path) {
        Ok(file) => file,
        Err(err) => {
            warn!("Cannot read dependencies of {}: {err}", doc_path.display());
            return Vec::new();
        }
    };

    match texture_path(doc_path, &file.def, settings) {
        Some(path) if path.is_file() => vec![path],
        Some(path) => {
            debug!("Texture {} does not exist yet", path.display());
            Vec::new()
        }
        None => Vec::new(),
    }
}
