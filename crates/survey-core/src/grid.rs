//! Obstacle grid rasterized from the mission polygons.

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;
use crate::models::{Bounds, GeoPoint, Polygon};

/// Upper bound on grid size; keeps a single search short enough to run
/// without an internal deadline.
pub const MAX_GRID_CELLS: usize = 4_000_000;

/// Where the vehicle may fly: inside the flight region, outside the
/// sensitive area. Boundaries are inclusive for both polygons.
#[derive(Debug, Clone, Copy)]
pub struct Corridor<'a> {
    pub flight_region: &'a Polygon,
    pub sensitive: &'a Polygon,
}

impl<'a> Corridor<'a> {
    pub fn new(flight_region: &'a Polygon, sensitive: &'a Polygon) -> Self {
        Self {
            flight_region,
            sensitive,
        }
    }

    pub fn permits_point(&self, point: &GeoPoint) -> bool {
        self.flight_region.contains(point) && !self.sensitive.contains(point)
    }

    /// A straight hop is allowed when the flight region covers it and it
    /// never touches the sensitive area.
    pub fn permits_segment(&self, a: &GeoPoint, b: &GeoPoint) -> bool {
        self.flight_region.covers_segment(a, b) && !self.sensitive.intersects_segment(a, b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn is_adjacent(&self, other: &Cell) -> bool {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        dr <= 1 && dc <= 1 && (dr, dc) != (0, 0)
    }
}

/// Fixed-resolution occupancy grid. Row `i` is latitude
/// `origin.lat + i * resolution`, column `j` is longitude
/// `origin.lon + j * resolution`.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    origin: GeoPoint,
    resolution: f64,
    rows: usize,
    cols: usize,
    blocked: Vec<bool>,
}

impl OccupancyGrid {
    /// Rasterize the corridor over `bounds`.
    pub fn from_bounds(
        bounds: Bounds,
        resolution: f64,
        corridor: Corridor<'_>,
    ) -> Result<Self, PlanningError> {
        if !(resolution > 0.0 && resolution.is_finite()) {
            return Err(PlanningError::InvalidResolution(resolution));
        }

        // Sized in f64 first; tiny resolutions overflow usize.
        let rows_f = (bounds.lat_span() / resolution).floor() + 1.0;
        let cols_f = (bounds.lon_span() / resolution).floor() + 1.0;
        let total_f = rows_f * cols_f;
        if !total_f.is_finite() || total_f > MAX_GRID_CELLS as f64 {
            return Err(PlanningError::GridTooLarge(total_f.min(usize::MAX as f64) as usize));
        }
        let rows = rows_f as usize;
        let cols = cols_f as usize;
        let total = rows * cols;

        let origin = GeoPoint::new(bounds.min_lat, bounds.min_lon);
        let mut blocked = Vec::with_capacity(total);
        for i in 0..rows {
            for j in 0..cols {
                let center = GeoPoint::new(
                    origin.lat + i as f64 * resolution,
                    origin.lon + j as f64 * resolution,
                );
                blocked.push(!corridor.permits_point(&center));
            }
        }

        Ok(Self {
            origin,
            resolution,
            rows,
            cols,
            blocked,
        })
    }

    /// Grid spanning both endpoints and every polygon vertex, padded by
    /// `margin` so the endpoints always land inside.
    pub fn build(
        corridor: Corridor<'_>,
        resolution: f64,
        start: GeoPoint,
        goal: GeoPoint,
        margin: f64,
    ) -> Result<Self, PlanningError> {
        let mut bounds = Bounds::of([&start, &goal]).ok_or(PlanningError::EndpointOutsideGrid("start"))?;
        for vertex in corridor
            .flight_region
            .vertices()
            .iter()
            .chain(corridor.sensitive.vertices())
        {
            bounds.include(vertex);
        }
        Self::from_bounds(bounds.expand(margin.max(0.0)), resolution, corridor)
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains_cell(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Out-of-range cells report as blocked.
    pub fn is_blocked(&self, cell: Cell) -> bool {
        if !self.contains_cell(cell) {
            return true;
        }
        self.blocked[cell.row * self.cols + cell.col]
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|b| **b).count()
    }

    pub fn cell_center(&self, cell: Cell) -> GeoPoint {
        GeoPoint::new(
            self.origin.lat + cell.row as f64 * self.resolution,
            self.origin.lon + cell.col as f64 * self.resolution,
        )
    }

    /// Cell whose index range contains `point` (truncating), if any.
    pub fn cell_of(&self, point: &GeoPoint) -> Option<Cell> {
        let i = ((point.lat - self.origin.lat) / self.resolution).floor();
        let j = ((point.lon - self.origin.lon) / self.resolution).floor();
        if i < 0.0 || j < 0.0 || !i.is_finite() || !j.is_finite() {
            return None;
        }
        let cell = Cell::new(i as usize, j as usize);
        self.contains_cell(cell).then_some(cell)
    }

    /// In-bounds 8-connected neighbours, orthogonal first.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        const DIRECTIONS: [(isize, isize); 8] = [
            (-1, 0),
            (1, 0),
            (0, -1),
            (0, 1),
            (-1, -1),
            (-1, 1),
            (1, -1),
            (1, 1),
        ];
        DIRECTIONS.iter().filter_map(move |(dr, dc)| {
            let row = cell.row.checked_add_signed(*dr)?;
            let col = cell.col.checked_add_signed(*dc)?;
            let next = Cell::new(row, col);
            self.contains_cell(next).then_some(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Polygon {
        Polygon::new(vec![
            GeoPoint::new(min_lat, min_lon),
            GeoPoint::new(min_lat, max_lon),
            GeoPoint::new(max_lat, max_lon),
            GeoPoint::new(max_lat, min_lon),
        ])
    }

    #[test]
    fn cell_counts_follow_floor_plus_one() {
        let flight = rect(0.0, 0.0, 1.0, 2.0);
        let sensitive = Polygon::empty();
        let bounds = Bounds::of(flight.vertices()).unwrap();
        let grid = OccupancyGrid::from_bounds(bounds, 0.25, Corridor::new(&flight, &sensitive))
            .unwrap();
        assert_eq!(grid.rows(), 5);
        assert_eq!(grid.cols(), 9);
        assert_eq!(grid.blocked_count(), 0);
    }

    #[test]
    fn blocked_iff_outside_flight_or_inside_sensitive() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = rect(0.4, 0.4, 0.6, 0.6);
        let corridor = Corridor::new(&flight, &sensitive);
        let grid = OccupancyGrid::build(
            corridor,
            0.05,
            GeoPoint::new(0.1, 0.1),
            GeoPoint::new(0.9, 0.9),
            0.2,
        )
        .unwrap();

        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let cell = Cell::new(row, col);
                let center = grid.cell_center(cell);
                let expected = !flight.contains(&center) || sensitive.contains(&center);
                assert_eq!(grid.is_blocked(cell), expected, "cell {cell:?}");
            }
        }
        assert!(grid.blocked_count() > 0);
    }

    #[test]
    fn same_inputs_give_same_grid() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = rect(0.2, 0.2, 0.3, 0.3);
        let corridor = Corridor::new(&flight, &sensitive);
        let a = GeoPoint::new(0.1, 0.1);
        let b = GeoPoint::new(0.9, 0.8);
        let g1 = OccupancyGrid::build(corridor, 0.1, a, b, 0.1).unwrap();
        let g2 = OccupancyGrid::build(corridor, 0.1, a, b, 0.1).unwrap();
        assert_eq!(g1, g2);
    }

    #[test]
    fn endpoints_land_inside_grid() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = Polygon::empty();
        let start = GeoPoint::new(-0.5, 0.5);
        let goal = GeoPoint::new(0.5, 1.7);
        let grid =
            OccupancyGrid::build(Corridor::new(&flight, &sensitive), 0.1, start, goal, 0.05)
                .unwrap();
        assert!(grid.cell_of(&start).is_some());
        assert!(grid.cell_of(&goal).is_some());
    }

    #[test]
    fn rejects_non_positive_resolution() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = Polygon::empty();
        let bounds = Bounds::of(flight.vertices()).unwrap();
        assert_eq!(
            OccupancyGrid::from_bounds(bounds, 0.0, Corridor::new(&flight, &sensitive)),
            Err(PlanningError::InvalidResolution(0.0))
        );
    }

    #[test]
    fn vanishing_resolution_is_too_large_not_a_panic() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = Polygon::empty();
        let bounds = Bounds::of(flight.vertices()).unwrap();
        assert!(matches!(
            OccupancyGrid::from_bounds(bounds, 1e-300, Corridor::new(&flight, &sensitive)),
            Err(PlanningError::GridTooLarge(_))
        ));
        assert!(matches!(
            OccupancyGrid::from_bounds(bounds, 1e-5, Corridor::new(&flight, &sensitive)),
            Err(PlanningError::GridTooLarge(_))
        ));
    }

    #[test]
    fn neighbors_clip_at_edges() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = Polygon::empty();
        let bounds = Bounds::of(flight.vertices()).unwrap();
        let grid =
            OccupancyGrid::from_bounds(bounds, 0.5, Corridor::new(&flight, &sensitive)).unwrap();
        assert_eq!(grid.neighbors(Cell::new(0, 0)).count(), 3);
        assert_eq!(grid.neighbors(Cell::new(1, 1)).count(), 8);
    }
}
