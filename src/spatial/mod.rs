//! Coordinate conventions shared by the tileset builder and the placement engine.
//!
//! Documents describe pixels top-down (row 0 is the top of the image). The image
//! slicer and the target grids are bottom-up, so both rects and cells get flipped
//! on the vertical axis on their way in.

use macroquad::math::{IVec2, Rect};
use serde::{Deserialize, Serialize};

/// A grid cell, or an integer pixel position.
pub type Cell = IVec2;

/// Horizontal flip bit.
pub const FLIP_X: u32 = 0b01; // bit 0
/// Vertical flip bit.
pub const FLIP_Y: u32 = 0b10; // bit 1

/// Integer pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Bottom or top edge, depending on the space.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl PixelRect {
    /// A rect from its origin and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive far edge on the y axis.
    #[inline]
    pub fn top(&self) -> i32 {
        self.y + self.height
    }

    /// True when the rect lies entirely inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && self.right() as i64 <= width as i64
            && self.top() as i64 <= height as i64
    }

    /// As a float [`Rect`].
    #[inline]
    pub fn to_rect(self) -> Rect {
        Rect::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

/// Maps a top-down document rect into the bottom-up space the slicer works in.
#[inline]
pub fn image_slice_rect(rect: PixelRect, image_height: u32) -> PixelRect {
    PixelRect {
        y: image_height as i32 - rect.y - rect.height,
        ..rect
    }
}

/// Cell containing a pixel position. `grid_size` must be non-zero.
#[inline]
pub fn cell_from_pixel(px: Cell, grid_size: u32) -> Cell {
    let g = grid_size as i32;
    Cell::new(px.x.div_euclid(g), px.y.div_euclid(g))
}

/// Flips the row axis. Applying it twice is the identity.
#[inline]
pub fn convert_cell(cell: Cell, row_count: u32) -> Cell {
    Cell::new(cell.x, row_count as i32 - 1 - cell.y)
}

/// Whether `flags` mirror horizontally.
#[inline]
pub fn flip_x(flags: u32) -> bool {
    flags & FLIP_X != 0
}

/// Whether `flags` mirror vertically.
#[inline]
pub fn flip_y(flags: u32) -> bool {
    flags & FLIP_Y != 0
}
