use std::collections::HashMap;

use glam::DVec2;

use crate::geo::Extent;

/// Default grid cell edge in planar meters
pub const DEFAULT_CELL_SIZE: f64 = 50_000.0;

/// Spatial hash grid over planar meters for bounding-box queries.
/// Items are bucketed by the cell their point falls in; a box query visits
/// only the cells the box overlaps and then filters exactly.
pub struct SpatialGrid<T> {
    /// Grid cells indexed by (cell_x, cell_y)
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// All items with their planar positions, in insertion order
    items: Vec<(DVec2, T)>,
    /// Cell size in meters
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    /// Create a new spatial grid with given cell size in meters
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    /// Convert planar meters to cell coordinates
    #[inline(always)]
    fn to_cell(&self, x: f64, y: f64) -> (i32, i32) {
        let cx = (x / self.cell_size).floor() as i32;
        let cy = (y / self.cell_size).floor() as i32;
        (cx, cy)
    }

    /// Insert an item at a planar position
    pub fn insert(&mut self, position: DVec2, item: T) {
        let idx = self.items.len();
        self.items.push((position, item));

        let cell = self.to_cell(position.x, position.y);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Indices of items whose position lies inside `bounds`
    /// (per [`Extent::contains`]), in insertion order
    pub fn query_bbox(&self, bounds: &Extent) -> Vec<usize> {
        let min_cell = self.to_cell(bounds.min_x(), bounds.min_y());
        let max_cell = self.to_cell(bounds.max_x(), bounds.max_y());

        let mut results = Vec::new();

        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend(indices.iter().copied().filter(|&idx| {
                        let p = self.items[idx].0;
                        bounds.contains(p.x, p.y)
                    }));
                }
            }
        }

        results.sort_unstable();
        results
    }

    /// Get item by index
    #[inline(always)]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx).map(|(_, item)| item)
    }

    /// Iterate all items with their positions
    pub fn iter(&self) -> impl Iterator<Item = (DVec2, &T)> {
        self.items.iter().map(|(p, item)| (*p, item))
    }

    /// Number of items
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_bbox_filters_exactly() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(DVec2::new(10.0, 10.0), "a");
        grid.insert(DVec2::new(150.0, 10.0), "b");
        grid.insert(DVec2::new(-250.0, -40.0), "c");

        let bounds = Extent::new(0.0, 0.0, 120.0, 50.0).unwrap();
        let hits: Vec<_> = grid.query_bbox(&bounds).into_iter().map(|i| *grid.get(i).unwrap()).collect();
        assert_eq!(hits, vec!["a"]);

        let all = Extent::new(-300.0, -300.0, 300.0, 300.0).unwrap();
        assert_eq!(grid.query_bbox(&all), vec![0, 1, 2]);
    }

    #[test]
    fn test_query_spanning_many_cells_keeps_insertion_order() {
        let mut grid = SpatialGrid::new(10.0);
        for i in 0..20 {
            grid.insert(DVec2::new(95.0 - i as f64 * 5.0, 0.5), i);
        }
        let bounds = Extent::new(0.0, 0.0, 100.0, 1.0).unwrap();
        assert_eq!(grid.query_bbox(&bounds), (0..20).collect::<Vec<_>>());
        assert_eq!(grid.len(), 20);
        assert!(!grid.is_empty());
    }
}
