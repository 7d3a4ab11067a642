use crate::dependency::texture_path;
use crate::loader::json_loader::load_tileset_file;
use crate::settings::BuildSettings;
use crate::tileset::builder::{TilesetBuild, TilesetBuilder};
use crate::tileset::sprite_rect::SpriteRectStore;
use crate::tileset::texture::SourceTexture;
use anyhow::Context;
use log::info;
use std::path::{Path, PathBuf};

/// Sidecar holding the persisted sprite rects of a tileset document.
pub fn sprite_rects_path(doc_path: &Path) -> PathBuf {
    doc_path.with_extension("rects.json")
}

/// Sidecar holding the artifact manifest of a tileset document.
pub fn manifest_path(doc_path: &Path) -> PathBuf {
    doc_path.with_extension("artifacts.json")
}

/// Reads a tileset document and its texture from disk and builds it.
///
/// Sprite rect edits are read from and written back to the document's
/// `.rects.json` sidecar, and the manifest is written to `.artifacts.json`.
/// Sidecars are only written when the build succeeds.
pub fn import_tileset(path: &Path, settings: &BuildSettings) -> anyhow::Result<TilesetBuild> {
    let file = load_tileset_file(path)
        .with_context(|| format!("Loading tileset document {}", path.display()))?;

    let texture = match texture_path(path, &file.def, settings) {
        Some(tex_path) => Some(
            SourceTexture::from_file(&tex_path, settings.platform.clone())
                .with_context(|| format!("Loading texture {}", tex_path.display()))?,
        ),
        None => None,
    };

    let rects_path = sprite_rects_path(path);
    let mut store = if rects_path.is_file() {
        SpriteRectStore::load(&rects_path)
            .with_context(|| format!("Loading sprite rects {}", rects_path.display()))?
    } else {
        SpriteRectStore::default()
    };

    let build = TilesetBuilder::new(settings)
        .build(&file, texture.as_ref(), &mut store)
        .with_context(|| format!("Building tileset {}", file.def.identifier))?;

    if build.rects_changed {
        store
            .save(&rects_path)
            .with_context(|| format!("Saving sprite rects {}", rects_path.display()))?;
    }

    let manifest = manifest_path(path);
    build
        .artifacts
        .to_manifest()
        .save(&manifest)
        .with_context(|| format!("Saving manifest {}", manifest.display()))?;

    info!("Imported {} -> {}", path.display(), manifest.display());
    Ok(build)
}
