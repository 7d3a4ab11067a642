use crate::error::LoadError;
use crate::loader::json_loader::TilesetDefinition;
use crate::settings::{PlatformSettings, TextureFormat, TextureKind};
use macroquad::texture::Image;
use std::fmt;
use std::path::Path;

/// Texture sizes an importer can be configured to.
pub const MAX_SIZES: [u32; 10] = [32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384];

/// A source texture handed to the builder, together with its import settings.
pub struct SourceTexture {
    /// Texture identity used in logs and errors.
    pub name: String,
    /// RGBA8 pixels, rows top-down.
    pub image: Image,
    /// Pixels can be read back on the CPU.
    pub readable: bool,
    /// Settings the texture was imported with.
    pub settings: PlatformSettings,
}

impl SourceTexture {
    /// Wraps an already decoded, readable image.
    pub fn new(name: impl Into<String>, image: Image, settings: PlatformSettings) -> Self {
        SourceTexture {
            name: name.into(),
            image,
            readable: true,
            settings,
        }
    }

    /// Decodes an image file (format detected from its bytes).
    pub fn from_file(path: &Path, settings: PlatformSettings) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Image::from_file_with_format(&bytes, None).map_err(|err| LoadError::Image {
            path: path.to_path_buf(),
            message: format!("{err:?}"),
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned();
        Ok(Self::new(name, image, settings))
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width as u32
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height as u32
    }

    /// Byte length is consistent with the declared dimensions.
    pub fn has_pixel_data(&self) -> bool {
        let expected = self.width() as usize * self.height() as usize * 4;
        expected > 0 && self.image.bytes.len() == expected
    }
}

/// One reason a texture cannot be sliced as imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureIssue {
    /// The importer's max size is below the tileset dimensions.
    MaxSizeTooSmall {
        /// Configured max size.
        max_texture_size: u32,
        /// Smallest supported size that fits the tileset.
        required: u32,
    },
    /// The slicer only accepts uncompressed RGBA32.
    WrongFormat(TextureFormat),
    /// Only sprite textures carry slice data.
    WrongKind(TextureKind),
    /// Reported by an external validator.
    Other(String),
}

impl fmt::Display for TextureIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureIssue::MaxSizeTooSmall {
                max_texture_size,
                required,
            } => write!(
                f,
                "max texture size is {max_texture_size} but needs to be at least {required}"
            ),
            TextureIssue::WrongFormat(found) => write!(
                f,
                "compression format is {found:?} but needs to be {:?}",
                TextureFormat::Rgba32
            ),
            TextureIssue::WrongKind(found) => write!(
                f,
                "texture type is {found:?} but needs to be {:?}",
                TextureKind::Sprite
            ),
            TextureIssue::Other(reason) => f.write_str(reason),
        }
    }
}

/// Checks a texture's import settings before any slicing happens.
pub trait TextureValidator {
    /// Every issue found, or `Ok` when the texture can be sliced.
    fn validate(
        &self,
        definition: &TilesetDefinition,
        texture: &SourceTexture,
    ) -> Result<(), Vec<TextureIssue>>;
}

/// Validates size and format against the texture's platform settings. Never auto-fixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformSettingsValidator;

impl TextureValidator for PlatformSettingsValidator {
    fn validate(
        &self,
        definition: &TilesetDefinition,
        texture: &SourceTexture,
    ) -> Result<(), Vec<TextureIssue>> {
        let mut issues = Vec::new();
        let max = texture.settings.max_texture_size;

        if max < definition.px_wid || max < definition.px_hei {
            issues.push(TextureIssue::MaxSizeTooSmall {
                max_texture_size: max,
                required: required_resolution(definition.px_wid.max(definition.px_hei)),
            });
        }

        if texture.settings.format != TextureFormat::Rgba32 {
            issues.push(TextureIssue::WrongFormat(texture.settings.format));
        }

        if texture.settings.kind != TextureKind::Sprite {
            issues.push(TextureIssue::WrongKind(texture.settings.kind));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// Smallest importer size that holds `highest` pixels.
pub fn required_resolution(highest: u32) -> u32 {
    MAX_SIZES
        .iter()
        .copied()
        .find(|&size| highest <= size)
        .unwrap_or(16384)
}
