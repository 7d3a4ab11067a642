use crate::error::LoadError;
use crate::loader::json_loader::read_json;
use crate::spatial::PixelRect;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Pivot preset of a sprite rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpriteAlignment {
    /// Centre of the rect.
    #[default]
    Center,
    /// Top-left corner.
    TopLeft,
    /// Middle of the top edge.
    TopCenter,
    /// Top-right corner.
    TopRight,
    /// Middle of the left edge.
    LeftCenter,
    /// Middle of the right edge.
    RightCenter,
    /// Bottom-left corner.
    BottomLeft,
    /// Middle of the bottom edge.
    BottomCenter,
    /// Bottom-right corner.
    BottomRight,
    /// Pivot taken from `pivot`.
    Custom,
}

/// Whether a rect comes from the tileset grid or from a field reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RectOrigin {
    /// A tileset grid cell.
    Standard,
    /// Sliced, but never shown for editing.
    Additional,
}

/// A named slice of the texture plus its editable metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteRect {
    /// Derived from the name, so stable across rebuilds.
    pub id: Uuid,
    /// Artifact name.
    pub name: String,
    /// Bottom-up slice space.
    pub rect: PixelRect,
    /// Grid or field reference.
    pub origin: RectOrigin,
    /// left, bottom, right, top
    pub border: [i32; 4],
    /// Normalized pivot.
    pub pivot: [f32; 2],
    /// Pivot preset.
    pub alignment: SpriteAlignment,
    /// Physics outlines in pixels, relative to the rect centre.
    #[serde(default)]
    pub outlines: Vec<Vec<[f32; 2]>>,
}

impl SpriteRect {
    /// A centred rect with no border or outlines.
    pub fn new(name: impl Into<String>, rect: PixelRect, origin: RectOrigin) -> Self {
        let name = name.into();
        SpriteRect {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()),
            name,
            rect,
            origin,
            border: [0; 4],
            pivot: [0.5, 0.5],
            alignment: SpriteAlignment::Center,
            outlines: Vec::new(),
        }
    }

    /// Outline covering the whole rect, relative to its centre.
    pub fn full_outline(&self) -> Vec<[f32; 2]> {
        let hw = self.rect.width as f32 * 0.5;
        let hh = self.rect.height as f32 * 0.5;
        vec![[-hw, -hh], [-hw, hh], [hw, hh], [hw, -hh]]
    }
}

/// Standard sprite rects persisted between rebuilds so edits survive reimport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpriteRectStore {
    /// In tile-id order.
    pub rects: Vec<SpriteRect>,
}

impl SpriteRectStore {
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

    /// Rect by name.
    pub fn get(&self, name: &str) -> Option<&SpriteRect> {
        self.rects.iter().find(|r| r.name == name)
    }

    /// Mutable rect by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SpriteRect> {
        self.rects.iter_mut().find(|r| r.name == name)
    }

    /// Brings the store in line with freshly derived rects, keeping the edit
    /// metadata of every name that survives. Result order follows `incoming`.
    /// Returns true when anything was added, removed, moved or resized.
    pub fn reconcile(&mut self, incoming: &[SpriteRect]) -> bool {
        let mut changed = incoming.len() != self.rects.len();
        let mut next = Vec::with_capacity(incoming.len());

        for (i, fresh) in incoming.iter().enumerate() {
            match self.rects.iter().position(|r| r.name == fresh.name) {
                Some(pos) => {
                    let mut kept = self.rects[pos].clone();
                    if pos != i || kept.rect != fresh.rect {
                        changed = true;
                    }
                    kept.rect = fresh.rect;
                    kept.origin = fresh.origin;
                    next.push(kept);
                }
                None => {
                    changed = true;
                    next.push(fresh.clone());
                }
            }
        }

        self.rects = next;
        changed
    }
}
