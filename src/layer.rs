use crate::spatial::Cell;
use macroquad::math::Mat4;
use std::collections::HashMap;

/// A tile written into a grid layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedTile {
    /// Artifact name, resolvable against the artifact set or its manifest.
    pub artifact: String,
    /// Tile id in the source tileset.
    pub tile_id: usize,
    /// Orientation only; translation is always zero.
    pub transform: Mat4,
}

/// One depth slice of a tilemap. Cells are in the bottom-up target grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayer {
    /// 0 is the top-most layer.
    pub depth: usize,
    /// Width in cells.
    pub columns: u32,
    /// Height in cells.
    pub rows: u32,
    cells: HashMap<Cell, PlacedTile>,
    dirty: bool,
}

impl GridLayer {
    /// An empty, clean layer.
    pub fn new(depth: usize, columns: u32, rows: u32) -> Self {
        GridLayer {
            depth,
            columns,
            rows,
            cells: HashMap::new(),
            dirty: false,
        }
    }

    /// Writes a tile, returning whatever it replaced.
    pub fn set(&mut self, cell: Cell, tile: PlacedTile) -> Option<PlacedTile> {
        self.dirty = true;
        self.cells.insert(cell, tile)
    }

    /// The tile at `cell`, if any.
    pub fn get(&self, cell: Cell) -> Option<&PlacedTile> {
        self.cells.get(&cell)
    }

    /// Number of occupied cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cell is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the layer changed since it was created or last marked clean.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag once the layer has been published.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Occupied cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Cell, &PlacedTile)> {
        self.cells.iter()
    }
}
