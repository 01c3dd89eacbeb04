use std::fmt;

use crate::error::ProjectionError;
use crate::geo::Extent;
use crate::map::projection::{planar_to_tile_fraction, tile_index_to_bounds, tiles_per_axis};

/// Relative tolerance for treating a corner fraction as lying on a tile
/// edge. Scaled by the tiles per axis it stays near 4 cm on the ground at
/// every zoom, well above the rounding noise of the projection round trip.
const EDGE_SNAP: f64 = 1e-9;

/// Slippy-map tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Column (east-west), 0 at 180°W
    pub x: u32,
    /// Row (north-south), 0 at the north edge
    pub y: u32,
    pub zoom: u8,
}

impl TileIndex {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A tile together with its planar bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub index: TileIndex,
    pub bounds: Extent,
}

/// Inclusive rectangle of tile indices covering an extent at one zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    /// Tiles covering `extent`: the top-left corner gives the minimum
    /// indices, the bottom-right corner the maximum.
    pub fn covering(extent: &Extent, zoom: u8) -> Result<Self, ProjectionError> {
        let n = tiles_per_axis(zoom)? as f64;
        let last = n - 1.0;
        let tolerance = EDGE_SNAP * n;
        let (left, top) = planar_to_tile_fraction(extent.min_x(), extent.max_y(), zoom)?;
        let (right, bottom) = planar_to_tile_fraction(extent.max_x(), extent.min_y(), zoom)?;

        let min_x = lower_index(snap_to_edge(left, tolerance), last);
        let min_y = lower_index(snap_to_edge(top, tolerance), last);
        let max_x = upper_index(snap_to_edge(right, tolerance), last).max(min_x);
        let max_y = upper_index(snap_to_edge(bottom, tolerance), last).max(min_y);

        Ok(Self {
            zoom,
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn width(&self) -> u64 {
        (self.max_x - self.min_x) as u64 + 1
    }

    pub fn height(&self) -> u64 {
        (self.max_y - self.min_y) as u64 + 1
    }

    /// Number of tiles in the range
    pub fn len(&self) -> u64 {
        self.width() * self.height()
    }

    /// A range always holds at least one tile
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: &TileIndex) -> bool {
        index.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&index.x)
            && (self.min_y..=self.max_y).contains(&index.y)
    }

    /// Lazily iterate every tile of the range with its planar bounds
    pub fn tiles(&self, tile_size: u32) -> TileIter {
        TileIter {
            range: *self,
            tile_size,
            next_x: self.min_x,
            next_y: self.min_y,
            remaining: self.len(),
        }
    }
}

impl fmt::Display for TileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{} x {}..={} y {}..={}",
            self.zoom, self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Round a fraction onto the nearest tile edge when it is within `tolerance`
#[inline(always)]
fn snap_to_edge(fraction: f64, tolerance: f64) -> f64 {
    let edge = fraction.round();
    if (fraction - edge).abs() <= tolerance {
        edge
    } else {
        fraction
    }
}

#[inline(always)]
fn lower_index(fraction: f64, last: f64) -> u32 {
    fraction.floor().clamp(0.0, last) as u32
}

/// A max corner on an edge excludes the tile beyond it; anywhere past the
/// edge includes it
#[inline(always)]
fn upper_index(fraction: f64, last: f64) -> u32 {
    (fraction.ceil() - 1.0).clamp(0.0, last) as u32
}

/// Iterator over the tiles of a [`TileRange`], columns outer, rows inner.
///
/// Cloning restarts from the clone's position; bounds are computed on demand.
#[derive(Debug, Clone)]
pub struct TileIter {
    range: TileRange,
    tile_size: u32,
    next_x: u32,
    next_y: u32,
    remaining: u64,
}

impl Iterator for TileIter {
    type Item = Result<Tile, ProjectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let index = TileIndex::new(self.next_x, self.next_y, self.range.zoom);
        self.remaining -= 1;

        if self.next_y == self.range.max_y {
            self.next_y = self.range.min_y;
            self.next_x = self.next_x.saturating_add(1);
        } else {
            self.next_y += 1;
        }

        Some(
            tile_index_to_bounds(index.x, index.y, index.zoom, self.tile_size)
                .map(|bounds| Tile { index, bounds }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, usize::try_from(self.remaining).ok())
    }
}

impl ExactSizeIterator for TileIter {}

/// Tiles covering `extent` at `zoom`, each paired with its planar bounds
pub fn iterate_tiles(extent: &Extent, zoom: u8, tile_size: u32) -> Result<TileIter, ProjectionError> {
    if tile_size == 0 {
        return Err(ProjectionError::InvalidTileSize(tile_size));
    }
    Ok(TileRange::covering(extent, zoom)?.tiles(tile_size))
}
