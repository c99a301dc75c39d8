//! Slippy map tile enumeration over Web Mercator.
use std::fmt;

use serde::{Deserialize, Serialize};
use slippy_map_tilenames::{lonlat2tile, tile2lonlat};

use crate::geojson::BoundingBox;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Zoom level the map feature layers are published at.
pub const DEFAULT_ZOOM: u8 = 14;

/// Deepest zoom a tile source may be configured with.
pub const MAX_ZOOM: u8 = 22;

// Pulls east/south edges just inside the bbox so an edge lying exactly on a
// tile border does not drag in the neighbouring tile.
const EDGE_EPSILON: f64 = 1e-11;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoordinate {
    pub fn new(x: u32, y: u32, z: u8) -> TileCoordinate {
        TileCoordinate { x, y, z }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Every tile at `zoom` that intersects or contains the bbox.
///
/// Tiles come out column by column: x ascending, then y ascending within a
/// column. A bbox with `west > east` is taken to cross the antimeridian and is
/// split in two, the western half enumerated first.
pub fn tiles_in_bbox(bbox: &BoundingBox, zoom: u8) -> Vec<TileCoordinate> {
    if bbox.crosses_antimeridian() {
        let mut tiles = tiles_in_bbox(
            &BoundingBox::new(-180.0, bbox.south, bbox.east, bbox.north),
            zoom,
        );
        tiles.extend(tiles_in_bbox(
            &BoundingBox::new(bbox.west, bbox.south, 180.0, bbox.north),
            zoom,
        ));
        return tiles;
    }

    let west = bbox.west.max(-180.0);
    let east = bbox.east.min(180.0);
    let south = bbox.south.max(-MAX_LATITUDE);
    let north = bbox.north.min(MAX_LATITUDE);

    let (min_x, min_y) = clamped_tile(west, north, zoom);
    let (max_x, max_y) = clamped_tile(east - EDGE_EPSILON, south + EDGE_EPSILON, zoom);

    (min_x..=max_x)
        .flat_map(|x| (min_y..=max_y).map(move |y| TileCoordinate::new(x, y, zoom)))
        .collect()
}

/// The lon/lat extent of a tile.
pub fn tile_bounds(tile: &TileCoordinate) -> BoundingBox {
    let (west, north) = tile2lonlat(tile.x, tile.y, tile.z);
    let (east, south) = tile2lonlat(tile.x + 1, tile.y + 1, tile.z);

    BoundingBox::new(west, south, east, north)
}

fn clamped_tile(lon: f64, lat: f64, zoom: u8) -> (u32, u32) {
    let last = 1u32
        .checked_shl(u32::from(zoom))
        .map_or(u32::MAX, |count| count - 1);
    let (x, y) = lonlat2tile(lon, lat, zoom);

    (x.min(last), y.min(last))
}
