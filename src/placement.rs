//! Distributes tile instances over a fixed stack of grid layers.
//!
//! The first tile drawn on a cell lands in the bottom-most layer
//! (`layer_count - 1`); every later tile on the same cell rises one layer,
//! so document draw order is kept as depth order.

use crate::error::PlacementError;
use crate::layer::{GridLayer, PlacedTile};
use crate::loader::json_loader::{LayerInstance, TileInstance};
use crate::settings::{BuildSettings, OverflowPolicy};
use crate::spatial::{cell_from_pixel, convert_cell, image_slice_rect, Cell, PixelRect};
use crate::tileset::artifact::TileLookup;
use crate::tileset::cache::ArtifactKey;
use log::{debug, info, warn};
use macroquad::math::{Mat4, Quat};
use std::collections::HashMap;
use std::f32::consts::PI;
use std::fmt;

/// Size of the layer a set of instances is placed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    /// Width in cells.
    pub columns: u32,
    /// Height in cells.
    pub rows: u32,
    /// Pixels per cell in the source layer.
    pub grid_size: u32,
}

/// Non-fatal placement findings, logged and returned with the layers.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementWarning {
    /// No artifact matches the tile's source rect; the tile was not placed.
    MissingArtifact {
        /// Name the tile resolved to.
        artifact: String,
        /// Cell in document space.
        cell: Cell,
    },
    /// The cell ran out of layers and the tile overwrote layer 0.
    Clamped {
        /// Artifact that was written.
        artifact: String,
        /// Cell in document space.
        cell: Cell,
    },
}

impl fmt::Display for PlacementWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementWarning::MissingArtifact { artifact, cell } => write!(
                f,
                "no artifact \"{artifact}\" for tile at cell ({}, {})",
                cell.x, cell.y
            ),
            PlacementWarning::Clamped { artifact, cell } => write!(
                f,
                "tile \"{artifact}\" at cell ({}, {}) exceeded the layer stack and was written to layer 0",
                cell.x, cell.y
            ),
        }
    }
}

/// The filled layers, index == depth, plus anything worth reporting.
#[derive(Debug)]
pub struct Placement {
    /// One layer per depth, 0 on top.
    pub layers: Vec<GridLayer>,
    /// Everything skipped or clamped.
    pub warnings: Vec<PlacementWarning>,
}

/// Places every instance into exactly one of `layer_count` layers.
///
/// Nothing is returned on error; the caller's previous layers stay valid.
pub fn place_tiles(
    instances: &[TileInstance],
    layer_count: usize,
    grid: GridDimensions,
    lookup: &impl TileLookup,
    policy: OverflowPolicy,
) -> Result<Placement, PlacementError> {
    if layer_count == 0 {
        return Err(PlacementError::NoLayers);
    }
    if grid.grid_size == 0 {
        return Err(PlacementError::ZeroGridSize);
    }

    let mut layers: Vec<GridLayer> = (0..layer_count)
        .map(|depth| GridLayer::new(depth, grid.columns, grid.rows))
        .collect();
    let mut warnings = Vec::new();
    let mut next_depth: HashMap<Cell, isize> = HashMap::new();
    let tile_size = lookup.tile_grid_size() as i32;

    for instance in instances {
        let cell = cell_from_pixel(instance.px(), grid.grid_size);
        if !in_bounds(cell, grid) {
            return Err(PlacementError::CellOutOfBounds {
                cell,
                columns: grid.columns,
                rows: grid.rows,
            });
        }

        let src = instance.src();
        let key = ArtifactKey::new(
            lookup.texture_identity(),
            image_slice_rect(
                PixelRect::new(src.x, src.y, tile_size, tile_size),
                lookup.texture_height(),
            ),
        );
        let artifact = key.name();
        let Some(tile_id) = lookup.tile_id_by_name(&artifact) else {
            warn!("No artifact \"{artifact}\" for tile at ({}, {})", cell.x, cell.y);
            warnings.push(PlacementWarning::MissingArtifact { artifact, cell });
            continue;
        };

        let depth = next_depth
            .entry(cell)
            .and_modify(|d| *d -= 1)
            .or_insert(layer_count as isize - 1);

        let depth = match usize::try_from(*depth) {
            Ok(d) => d,
            Err(_) => match policy {
                OverflowPolicy::Reject => {
                    return Err(PlacementError::StackOverflow { cell, layer_count });
                }
                OverflowPolicy::ClampToTop => {
                    warn!(
                        "Tile \"{artifact}\" at ({}, {}) exceeds {layer_count} layers; clamping",
                        cell.x, cell.y
                    );
                    warnings.push(PlacementWarning::Clamped {
                        artifact: artifact.clone(),
                        cell,
                    });
                    0
                }
            },
        };

        let target = convert_cell(cell, grid.rows);
        layers[depth].set(
            target,
            PlacedTile {
                artifact,
                tile_id,
                transform: flip_transform(instance.flip_x(), instance.flip_y()),
            },
        );
    }

    info!(
        "Placed {} tiles over {layer_count} layers ({} warnings)",
        instances.len(),
        warnings.len()
    );
    Ok(Placement { layers, warnings })
}

fn in_bounds(cell: Cell, grid: GridDimensions) -> bool {
    cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < grid.columns && (cell.y as u32) < grid.rows
}

/// Orientation for a flipped tile: X flips rotate half a turn about Y,
/// Y flips half a turn about X. No translation.
pub fn flip_transform(flip_x: bool, flip_y: bool) -> Mat4 {
    let about_y = if flip_x { PI } else { 0.0 };
    let about_x = if flip_y { PI } else { 0.0 };
    Mat4::from_quat(Quat::from_rotation_y(about_y) * Quat::from_rotation_x(about_x))
}

/// The deepest stack of tiles on any one cell. Zero for a zero grid size.
pub fn max_stack_depth(instances: &[TileInstance], grid_size: u32) -> usize {
    if grid_size == 0 {
        return 0;
    }
    let mut counts: HashMap<Cell, usize> = HashMap::new();
    for instance in instances {
        *counts
            .entry(cell_from_pixel(instance.px(), grid_size))
            .or_default() += 1;
    }
    counts.into_values().max().unwrap_or(0)
}

/// Places a document layer into as many grid layers as its deepest stack
/// needs, capped by `settings.max_grid_layers`. Cells deeper than the cap are
/// handled by `settings.overflow_policy`.
pub fn build_layer(
    layer: &LayerInstance,
    lookup: &impl TileLookup,
    settings: &BuildSettings,
) -> Result<Placement, PlacementError> {
    let tiles = layer.tiles();
    let layer_count = settings.grid_layers_for(max_stack_depth(tiles, layer.grid_size));
    debug!(
        "Layer \"{}\": {} tiles, {layer_count} grid layers",
        layer.identifier,
        tiles.len()
    );
    place_tiles(
        tiles,
        layer_count,
        GridDimensions {
            columns: layer.c_wid,
            rows: layer.c_hei,
            grid_size: layer.grid_size,
        },
        lookup,
        settings.overflow_policy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::math::Vec3;

    /// 2x2 tiles of 16px, texture 32px high.
    struct Lookup;

    impl TileLookup for Lookup {
        fn texture_identity(&self) -> &str {
            "T"
        }

        fn texture_height(&self) -> u32 {
            32
        }

        fn tile_grid_size(&self) -> u32 {
            16
        }

        fn tile_id_by_name(&self, name: &str) -> Option<usize> {
            ["T_0_16_16_16", "T_16_16_16_16", "T_0_0_16_16", "T_16_0_16_16"]
                .iter()
                .position(|n| *n == name)
        }
    }

    fn inst(px: [i32; 2], src: [i32; 2], f: u32) -> TileInstance {
        TileInstance {
            px,
            src,
            f,
            t: 0,
            d: Vec::new(),
        }
    }

    const GRID: GridDimensions = GridDimensions {
        columns: 4,
        rows: 3,
        grid_size: 16,
    };

    #[test]
    fn stacked_tiles_rise_from_the_bottom_layer() {
        let tiles = [inst([16, 0], [0, 0], 0), inst([16, 0], [16, 0], 0)];
        let placement = place_tiles(&tiles, 2, GRID, &Lookup, OverflowPolicy::Reject)
            .expect("placement");

        // Document row 0 is the top row of the target grid.
        let target = Cell::new(1, 2);
        assert_eq!(placement.layers[1].get(target).map(|t| t.tile_id), Some(0));
        assert_eq!(placement.layers[0].get(target).map(|t| t.tile_id), Some(1));
        assert!(placement.layers.iter().all(GridLayer::is_dirty));
    }

    #[test]
    fn third_tile_on_two_layers_is_rejected() {
        let tiles = [
            inst([0, 0], [0, 0], 0),
            inst([0, 0], [16, 0], 0),
            inst([0, 0], [0, 16], 0),
        ];
        let err = place_tiles(&tiles, 2, GRID, &Lookup, OverflowPolicy::Reject)
            .expect_err("overflow");
        assert_eq!(
            err,
            PlacementError::StackOverflow {
                cell: Cell::new(0, 0),
                layer_count: 2
            }
        );
    }

    #[test]
    fn third_tile_on_two_layers_clamps_when_asked() {
        let tiles = [
            inst([0, 0], [0, 0], 0),
            inst([0, 0], [16, 0], 0),
            inst([0, 0], [0, 16], 0),
        ];
        let placement = place_tiles(&tiles, 2, GRID, &Lookup, OverflowPolicy::ClampToTop)
            .expect("placement");
        let top = placement.layers[0].get(Cell::new(0, 2)).expect("top");
        assert_eq!(top.artifact, "T_0_0_16_16");
        assert!(matches!(
            placement.warnings.as_slice(),
            [PlacementWarning::Clamped { .. }]
        ));
    }

    #[test]
    fn out_of_grid_tiles_are_errors() {
        let tiles = [inst([64, 0], [0, 0], 0)];
        let err = place_tiles(&tiles, 1, GRID, &Lookup, OverflowPolicy::Reject)
            .expect_err("bounds");
        assert!(matches!(err, PlacementError::CellOutOfBounds { columns: 4, rows: 3, .. }));
    }

    #[test]
    fn zero_layers_is_an_error() {
        let err =
            place_tiles(&[], 0, GRID, &Lookup, OverflowPolicy::Reject).expect_err("no layers");
        assert_eq!(err, PlacementError::NoLayers);
    }

    #[test]
    fn unknown_source_rects_are_reported_and_skipped() {
        let tiles = [inst([0, 0], [48, 48], 0), inst([0, 0], [0, 0], 0)];
        let placement = place_tiles(&tiles, 1, GRID, &Lookup, OverflowPolicy::Reject)
            .expect("placement");
        assert_eq!(placement.warnings.len(), 1);
        assert_eq!(placement.layers[0].len(), 1);
    }

    #[test]
    fn flips_rotate_without_translating() {
        let fx = flip_transform(true, false);
        assert!(fx.transform_vector3(Vec3::X).abs_diff_eq(-Vec3::X, 1e-5));
        assert!(fx.transform_vector3(Vec3::Y).abs_diff_eq(Vec3::Y, 1e-5));

        let fy = flip_transform(false, true);
        assert!(fy.transform_vector3(Vec3::Y).abs_diff_eq(-Vec3::Y, 1e-5));
        assert!(fy.transform_vector3(Vec3::X).abs_diff_eq(Vec3::X, 1e-5));

        let both = flip_transform(true, true);
        assert!(both.transform_vector3(Vec3::X).abs_diff_eq(-Vec3::X, 1e-5));
        assert!(both.transform_vector3(Vec3::Y).abs_diff_eq(-Vec3::Y, 1e-5));
        assert!(both.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::ZERO, 1e-5));

        assert!(flip_transform(false, false).abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn flip_bits_reach_the_placed_tile() {
        let tiles = [inst([0, 0], [0, 0], 0b01)];
        let placement = place_tiles(&tiles, 1, GRID, &Lookup, OverflowPolicy::Reject)
            .expect("placement");
        let placed = placement.layers[0].get(Cell::new(0, 2)).expect("tile");
        assert!(placed.transform.abs_diff_eq(flip_transform(true, false), 1e-6));
    }

    #[test]
    fn max_stack_depth_counts_per_cell() {
        let tiles = [
            inst([0, 0], [0, 0], 0),
            inst([4, 4], [0, 0], 0),
            inst([16, 0], [0, 0], 0),
        ];
        assert_eq!(max_stack_depth(&tiles, 16), 2);
        assert_eq!(max_stack_depth(&[], 16), 0);
    }

    fn stacked_layer(grid_size: u32) -> LayerInstance {
        serde_json::from_value(serde_json::json!({
            "__identifier": "Ground",
            "__type": "Tiles",
            "__cWid": 4,
            "__cHei": 3,
            "__gridSize": grid_size,
            "gridTiles": [
                {"px": [0, 0], "src": [0, 0], "t": 0},
                {"px": [0, 0], "src": [16, 0], "t": 1},
                {"px": [0, 0], "src": [0, 16], "t": 2}
            ]
        }))
        .expect("layer")
    }

    #[test]
    fn zero_grid_size_is_an_error() {
        let tiles = [inst([0, 0], [0, 0], 0)];
        let grid = GridDimensions {
            grid_size: 0,
            ..GRID
        };
        let err = place_tiles(&tiles, 1, grid, &Lookup, OverflowPolicy::Reject)
            .expect_err("zero grid");
        assert_eq!(err, PlacementError::ZeroGridSize);

        let err = build_layer(&stacked_layer(0), &Lookup, &BuildSettings::default())
            .expect_err("zero grid");
        assert_eq!(err, PlacementError::ZeroGridSize);
    }

    #[test]
    fn build_layer_sizes_the_stack_to_the_deepest_cell() {
        let placement = build_layer(&stacked_layer(16), &Lookup, &BuildSettings::default())
            .expect("placement");
        assert_eq!(placement.layers.len(), 3);
        assert!(placement.warnings.is_empty());
    }

    #[test]
    fn build_layer_applies_the_configured_overflow_policy() {
        let reject = BuildSettings {
            max_grid_layers: Some(2),
            ..BuildSettings::default()
        };
        let err = build_layer(&stacked_layer(16), &Lookup, &reject).expect_err("overflow");
        assert!(matches!(err, PlacementError::StackOverflow { layer_count: 2, .. }));

        let clamp = BuildSettings {
            max_grid_layers: Some(2),
            overflow_policy: OverflowPolicy::ClampToTop,
            ..BuildSettings::default()
        };
        let placement = build_layer(&stacked_layer(16), &Lookup, &clamp).expect("placement");
        assert_eq!(placement.layers.len(), 2);
        assert!(matches!(
            placement.warnings.as_slice(),
            [PlacementWarning::Clamped { .. }]
        ));
        let top = placement.layers[0].get(Cell::new(0, 2)).expect("top");
        assert_eq!(top.artifact, "T_0_0_16_16");
    }
}
