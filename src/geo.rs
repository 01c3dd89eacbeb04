use std::fmt;

use glam::DVec2;

use crate::error::ProjectionError;
use crate::map::ORIGIN_SHIFT;

/// Slack when deciding whether a bound lies on the world's east/north edge (meters)
const WORLD_EDGE_TOLERANCE: f64 = 1e-6;

/// Axis-aligned bounding box in Web Mercator meters (EPSG:3857).
///
/// Always satisfies `min.x < max.x` and `min.y < max.y` with finite corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    min: DVec2,
    max: DVec2,
}

impl Extent {
    /// Build an extent from `(minx, miny, maxx, maxy)`, rejecting empty or non-finite boxes
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Result<Self, ProjectionError> {
        let finite = [minx, miny, maxx, maxy].iter().all(|v| v.is_finite());
        if !finite || minx >= maxx || miny >= maxy {
            return Err(ProjectionError::DegenerateExtent {
                minx,
                miny,
                maxx,
                maxy,
            });
        }

        Ok(Self {
            min: DVec2::new(minx, miny),
            max: DVec2::new(maxx, maxy),
        })
    }

    /// The whole projected world, ±π·R on both axes
    pub fn world() -> Self {
        Self {
            min: DVec2::splat(-ORIGIN_SHIFT),
            max: DVec2::splat(ORIGIN_SHIFT),
        }
    }

    #[inline(always)]
    pub fn min_x(&self) -> f64 {
        self.min.x
    }

    #[inline(always)]
    pub fn min_y(&self) -> f64 {
        self.min.y
    }

    #[inline(always)]
    pub fn max_x(&self) -> f64 {
        self.max.x
    }

    #[inline(always)]
    pub fn max_y(&self) -> f64 {
        self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    /// Point-in-box test used to assign points to tiles.
    ///
    /// Min edges are closed and max edges open, so a point on an edge shared
    /// by two adjacent tiles lands in exactly one of them. Max edges lying on
    /// the world boundary are closed so points at 180°E are not lost.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let within_x = x < self.max.x || (x == self.max.x && on_world_edge(self.max.x));
        let within_y = y < self.max.y || (y == self.max.y && on_world_edge(self.max.y));
        x >= self.min.x && y >= self.min.y && within_x && within_y
    }

    /// Area of the overlap with another extent (0 when they only touch)
    pub fn intersection_area(&self, other: &Extent) -> f64 {
        let lo = self.min.max(other.min);
        let hi = self.max.min(other.max);
        let size = (hi - lo).max(DVec2::ZERO);
        size.x * size.y
    }

    /// Bounding box of the points grown by `pad` meters on every side.
    ///
    /// With `pad > 0` every point lies strictly inside the result, so the
    /// half-open [`Extent::contains`] never rejects a point on the box edge.
    pub fn from_points(points: impl IntoIterator<Item = DVec2>, pad: f64) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min = min.min(p);
            max = max.max(p);
        }

        let pad = DVec2::splat(pad);
        let (min, max) = (min - pad, max + pad);
        Self::new(min.x, min.y, max.x, max.y).ok()
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, {:.3})",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}

#[inline(always)]
fn on_world_edge(v: f64) -> bool {
    v >= ORIGIN_SHIFT - WORLD_EDGE_TOLERANCE
}
