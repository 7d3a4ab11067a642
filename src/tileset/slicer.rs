use crate::settings::PlatformSettings;
use crate::spatial::{image_slice_rect, PixelRect};
use crate::tileset::sprite_rect::SpriteRect;
use macroquad::math::Vec2;
use macroquad::texture::Image;

/// One cut-out region, in the same order as the rect it was cut for.
pub struct SlicedRegion {
    /// Name of the rect this region was cut for.
    pub name: String,
    /// Bottom-up slice space.
    pub rect: PixelRect,
    /// The cut-out pixels, rows top-down.
    pub image: Image,
    /// Physics outlines in pixels, relative to the region centre.
    pub outlines: Vec<Vec<Vec2>>,
}

/// Everything one `generate` call produced.
#[derive(Default)]
pub struct SliceOutput {
    /// One per requested rect, in request order.
    pub regions: Vec<SlicedRegion>,
    /// Non-fatal remarks.
    pub warnings: Vec<String>,
    /// Any entry fails the build.
    pub errors: Vec<String>,
}

/// The image generation service. Must return one region per rect, in order.
pub trait ImageSlicer {
    /// `pixels` are RGBA8, rows top-down; `rects` are bottom-up.
    fn generate(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        rects: &[SpriteRect],
        platform: &PlatformSettings,
    ) -> SliceOutput;
}

/// Cuts regions straight out of a CPU-side RGBA8 image.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtlasSlicer;

impl ImageSlicer for AtlasSlicer {
    fn generate(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        rects: &[SpriteRect],
        _platform: &PlatformSettings,
    ) -> SliceOutput {
        let mut out = SliceOutput::default();

        let (Ok(w16), Ok(h16)) = (u16::try_from(width), u16::try_from(height)) else {
            out.errors.push(format!(
                "{width}x{height} texture exceeds the {}px image limit",
                u16::MAX
            ));
            return out;
        };

        if pixels.len() != width as usize * height as usize * 4 {
            out.errors.push(format!(
                "pixel buffer holds {} bytes, expected {width}x{height} RGBA8",
                pixels.len()
            ));
            return out;
        }

        let source = Image {
            bytes: pixels.to_vec(),
            width: w16,
            height: h16,
        };

        for sprite in rects {
            if !sprite.rect.fits_within(width, height) {
                out.errors.push(format!(
                    "rect \"{}\" ({:?}) lies outside the {width}x{height} texture",
                    sprite.name, sprite.rect
                ));
                continue;
            }

            // Back to the image's own top-down rows.
            let top_down = image_slice_rect(sprite.rect, height);
            let image = source.sub_image(top_down.to_rect());

            if is_fully_transparent(&image) {
                out.warnings
                    .push(format!("region \"{}\" is fully transparent", sprite.name));
            }

            out.regions.push(SlicedRegion {
                name: sprite.name.clone(),
                rect: sprite.rect,
                image,
                outlines: sprite
                    .outlines
                    .iter()
                    .map(|outline| outline.iter().copied().map(Vec2::from).collect())
                    .collect(),
            });
        }

        out
    }
}

fn is_fully_transparent(image: &Image) -> bool {
    image.bytes.chunks_exact(4).all(|px| px[3] == 0)
}
