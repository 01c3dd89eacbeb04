use std::f64::consts::PI;

use crate::error::ProjectionError;
use crate::geo::Extent;
use crate::map::TileIndex;

/// Radius of the spherical Web Mercator model (meters)
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the projected world width, π·R (20037508.342789244 m)
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;

/// Standard slippy-map tile edge in pixels
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Largest zoom whose per-axis tile count still fits in a u32
pub const MAX_TILE_ZOOM: u8 = 30;

/// Meters per pixel at zoom 0 (156543.03392804062 for 256 px tiles)
#[inline]
pub fn initial_resolution(tile_size: u32) -> f64 {
    2.0 * PI * EARTH_RADIUS / tile_size as f64
}

/// Meters per pixel at the given zoom
#[inline]
pub fn resolution(zoom: u8, tile_size: u32) -> f64 {
    initial_resolution(tile_size) / 2.0_f64.powi(zoom as i32)
}

/// Number of tiles along one axis at the given zoom
pub fn tiles_per_axis(zoom: u8) -> Result<u32, ProjectionError> {
    check_zoom(zoom)?;
    Ok(1u32 << zoom)
}

#[inline]
fn check_zoom(zoom: u8) -> Result<(), ProjectionError> {
    if zoom > MAX_TILE_ZOOM {
        return Err(ProjectionError::ZoomOutOfRange(zoom));
    }
    Ok(())
}

/// Project a WGS84 coordinate (degrees) to Web Mercator meters.
///
/// Latitude must lie strictly inside (-90, 90); the poles map to infinity.
pub fn project_to_planar(lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFiniteCoordinate { x: lon, y: lat });
    }
    if lat <= -90.0 || lat >= 90.0 {
        return Err(ProjectionError::LatitudeOutOfDomain(lat));
    }

    let x = lon.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;

    Ok((x, y))
}

/// Unproject Web Mercator meters back to a WGS84 `(lon, lat)` in degrees
pub fn planar_to_geographic(x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(ProjectionError::NonFiniteCoordinate { x, y });
    }

    let lon = x / ORIGIN_SHIFT * 180.0;
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();

    Ok((lon, lat))
}

/// Continuous slippy-map tile coordinates for a planar point.
///
/// The integer part is the tile index; values may fall outside the grid for
/// points beyond the projected world and are clamped by callers.
pub fn planar_to_tile_fraction(x: f64, y: f64, zoom: u8) -> Result<(f64, f64), ProjectionError> {
    let n = tiles_per_axis(zoom)? as f64;
    let (lon, lat) = planar_to_geographic(x, y)?;

    let fx = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let fy = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

    if fx.is_nan() || fy.is_nan() {
        return Err(ProjectionError::NonFiniteCoordinate { x, y });
    }

    Ok((fx, fy))
}

/// Tile index containing a planar point, clamped to `[0, 2^zoom - 1]`
pub fn planar_to_tile_index(x: f64, y: f64, zoom: u8) -> Result<(u32, u32), ProjectionError> {
    let (fx, fy) = planar_to_tile_fraction(x, y, zoom)?;
    let last = (tiles_per_axis(zoom)? - 1) as f64;

    Ok((
        fx.floor().clamp(0.0, last) as u32,
        fy.floor().clamp(0.0, last) as u32,
    ))
}

/// Convert global pixel coordinates to planar meters.
///
/// Pixel row 0 is the north edge while planar Y grows northward, so the
/// vertical axis is flipped around the origin shift.
#[inline]
pub fn pixel_to_meters(px: f64, py: f64, zoom: u8, tile_size: u32) -> (f64, f64) {
    let res = resolution(zoom, tile_size);
    (px * res - ORIGIN_SHIFT, ORIGIN_SHIFT - py * res)
}

/// Planar bounds of one tile
pub fn tile_index_to_bounds(
    tile_x: u32,
    tile_y: u32,
    zoom: u8,
    tile_size: u32,
) -> Result<Extent, ProjectionError> {
    let n = tiles_per_axis(zoom)?;
    if tile_x >= n || tile_y >= n {
        return Err(ProjectionError::TileOutOfRange(TileIndex::new(
            tile_x, tile_y, zoom,
        )));
    }
    if tile_size == 0 {
        return Err(ProjectionError::InvalidTileSize(tile_size));
    }

    let size = tile_size as f64;
    let (minx, maxy) = pixel_to_meters(tile_x as f64 * size, tile_y as f64 * size, zoom, tile_size);
    let (maxx, miny) = pixel_to_meters(
        (tile_x as f64 + 1.0) * size,
        (tile_y as f64 + 1.0) * size,
        zoom,
        tile_size,
    );

    Extent::new(minx, miny, maxx, maxy)
}
