mod projection;
mod spatial;
mod tiles;

pub use projection::{
    initial_resolution, pixel_to_meters, planar_to_geographic, planar_to_tile_fraction,
    planar_to_tile_index, project_to_planar, resolution, tile_index_to_bounds, tiles_per_axis,
    DEFAULT_TILE_SIZE, EARTH_RADIUS, MAX_TILE_ZOOM, ORIGIN_SHIFT,
};
pub use spatial::{SpatialGrid, DEFAULT_CELL_SIZE};
pub use tiles::{iterate_tiles, Tile, TileIndex, TileIter, TileRange};
