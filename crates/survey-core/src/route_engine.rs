//! Grid A* search and line-of-sight path smoothing.
//!
//! Every move, diagonal included, costs 1. The Euclidean heuristic is in
//! cell units, so results are short but not guaranteed optimal.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::config::PlannerConfig;
use crate::error::PlanningError;
use crate::grid::{Cell, Corridor, OccupancyGrid};
use crate::models::{AreaConfig, GeoPoint};

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Frontier entry. Equal `f` scores pop in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f_score: FloatOrd,
    sequence: u64,
    cell: Cell,
    g_score: u32,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

fn heuristic(a: Cell, b: Cell) -> f64 {
    let dr = a.row as f64 - b.row as f64;
    let dc = a.col as f64 - b.col as f64;
    dr.hypot(dc)
}

/// Cells from start to goal inclusive, plus search effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPath {
    pub cells: Vec<Cell>,
    pub nodes_expanded: usize,
}

impl GridPath {
    /// Number of moves; equals the accumulated step cost.
    pub fn cost(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }
}

/// 8-connected A* from `start` to `goal`. Blocked cells are never expanded.
pub fn search(grid: &OccupancyGrid, start: Cell, goal: Cell) -> Result<GridPath, PlanningError> {
    if !grid.contains_cell(start) {
        return Err(PlanningError::EndpointOutsideGrid("start"));
    }
    if !grid.contains_cell(goal) {
        return Err(PlanningError::EndpointOutsideGrid("goal"));
    }
    if grid.is_blocked(start) {
        return Err(PlanningError::EndpointBlocked("start"));
    }
    if grid.is_blocked(goal) {
        return Err(PlanningError::EndpointBlocked("goal"));
    }

    let mut sequence = 0u64;
    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    open_set.push(Reverse(OpenNode {
        f_score: FloatOrd(heuristic(start, goal)),
        sequence,
        cell: start,
        g_score: 0,
    }));
    let mut closed_set: HashSet<Cell> = HashSet::new();
    let mut g_score: HashMap<Cell, u32> = HashMap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    g_score.insert(start, 0);

    let mut nodes_expanded = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        if !closed_set.insert(current.cell) {
            continue;
        }
        nodes_expanded += 1;

        if current.cell == goal {
            let mut cells = vec![goal];
            let mut cursor = goal;
            while let Some(prev) = came_from.get(&cursor) {
                cells.push(*prev);
                cursor = *prev;
            }
            cells.reverse();
            return Ok(GridPath {
                cells,
                nodes_expanded,
            });
        }

        let tentative_g = current.g_score + 1;
        for next in grid.neighbors(current.cell) {
            if grid.is_blocked(next) || closed_set.contains(&next) {
                continue;
            }
            if tentative_g < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                came_from.insert(next, current.cell);
                g_score.insert(next, tentative_g);
                sequence += 1;
                open_set.push(Reverse(OpenNode {
                    f_score: FloatOrd(tentative_g as f64 + heuristic(next, goal)),
                    sequence,
                    cell: next,
                    g_score: tentative_g,
                }));
            }
        }
    }

    Err(PlanningError::NoPath {
        expanded: nodes_expanded,
    })
}

/// Greedy longest-hop simplification.
///
/// From each kept waypoint the scan extends one waypoint at a time while the
/// straight hop stays inside the corridor and stops at the first refusal.
/// First and last waypoints are always kept.
pub fn smooth_path(raw_path: &[GeoPoint], corridor: Corridor<'_>) -> Vec<GeoPoint> {
    if raw_path.len() < 2 {
        return raw_path.to_vec();
    }

    let mut smoothed = vec![raw_path[0]];
    let mut current_idx = 0usize;

    while current_idx < raw_path.len() - 1 {
        let mut furthest_valid = current_idx + 1;
        for target_idx in (current_idx + 2)..raw_path.len() {
            if !corridor.permits_segment(&raw_path[current_idx], &raw_path[target_idx]) {
                break;
            }
            furthest_valid = target_idx;
        }
        smoothed.push(raw_path[furthest_valid]);
        current_idx = furthest_valid;
    }

    smoothed
}

/// A planned leg between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPath {
    pub waypoints: Vec<GeoPoint>,
    pub raw_points: usize,
    pub nodes_expanded: usize,
    pub grid_rows: usize,
    pub grid_cols: usize,
}

/// Build a fresh grid for `start -> goal`, search it, and smooth the result.
///
/// Waypoints are cell centers, so the first and last points are the grid
/// snaps of `start` and `goal`.
pub fn plan_path(
    area: &AreaConfig,
    start: GeoPoint,
    goal: GeoPoint,
    config: &PlannerConfig,
) -> Result<PlannedPath, PlanningError> {
    let corridor = Corridor::new(&area.flight_region, &area.sensitive);
    let grid = OccupancyGrid::build(
        corridor,
        config.grid_resolution_deg,
        start,
        goal,
        config.grid_margin_deg,
    )?;

    let start_cell = grid
        .cell_of(&start)
        .ok_or(PlanningError::EndpointOutsideGrid("start"))?;
    let goal_cell = grid
        .cell_of(&goal)
        .ok_or(PlanningError::EndpointOutsideGrid("goal"))?;

    let path = search(&grid, start_cell, goal_cell)?;
    let raw: Vec<GeoPoint> = path.cells.iter().map(|c| grid.cell_center(*c)).collect();
    let waypoints = smooth_path(&raw, corridor);

    Ok(PlannedPath {
        waypoints,
        raw_points: raw.len(),
        nodes_expanded: path.nodes_expanded,
        grid_rows: grid.rows(),
        grid_cols: grid.cols(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bounds, Polygon};

    fn rect(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Polygon {
        Polygon::new(vec![
            GeoPoint::new(min_lat, min_lon),
            GeoPoint::new(min_lat, max_lon),
            GeoPoint::new(max_lat, max_lon),
            GeoPoint::new(max_lat, min_lon),
        ])
    }

    fn grid_over(flight: &Polygon, sensitive: &Polygon, resolution: f64) -> OccupancyGrid {
        let bounds = Bounds::of(flight.vertices()).unwrap();
        OccupancyGrid::from_bounds(bounds, resolution, Corridor::new(flight, sensitive)).unwrap()
    }

    fn assert_valid_path(grid: &OccupancyGrid, path: &GridPath, start: Cell, goal: Cell) {
        assert_eq!(path.cells.first(), Some(&start));
        assert_eq!(path.cells.last(), Some(&goal));
        for pair in path.cells.windows(2) {
            assert!(pair[0].is_adjacent(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
        for cell in &path.cells {
            assert!(!grid.is_blocked(*cell));
        }
    }

    #[test]
    fn open_grid_path_uses_diagonals() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = Polygon::empty();
        let grid = grid_over(&flight, &sensitive, 0.1);
        let start = Cell::new(0, 0);
        let goal = Cell::new(10, 10);

        let path = search(&grid, start, goal).unwrap();
        assert_valid_path(&grid, &path, start, goal);
        assert_eq!(path.cost(), 10);
    }

    #[test]
    fn path_detours_around_wall() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        // Wall across most of the grid at lat 0.5, gap near lon 1.0.
        let sensitive = rect(0.45, -0.1, 0.55, 0.75);
        let grid = grid_over(&flight, &sensitive, 0.05);
        let start = Cell::new(2, 2);
        let goal = Cell::new(18, 2);

        let path = search(&grid, start, goal).unwrap();
        assert_valid_path(&grid, &path, start, goal);
        assert!(path.cells.iter().any(|c| c.col > 15));
    }

    #[test]
    fn disconnected_goal_reports_no_path() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = rect(0.45, -0.1, 0.55, 1.1);
        let grid = grid_over(&flight, &sensitive, 0.05);

        let result = search(&grid, Cell::new(2, 2), Cell::new(18, 2));
        assert!(matches!(result, Err(PlanningError::NoPath { .. })));
    }

    #[test]
    fn blocked_endpoint_is_rejected() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = rect(0.4, 0.4, 0.6, 0.6);
        let grid = grid_over(&flight, &sensitive, 0.1);
        assert_eq!(
            search(&grid, Cell::new(5, 5), Cell::new(0, 0)),
            Err(PlanningError::EndpointBlocked("start"))
        );
    }

    #[test]
    fn start_equals_goal_is_single_cell() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = Polygon::empty();
        let grid = grid_over(&flight, &sensitive, 0.1);
        let path = search(&grid, Cell::new(3, 3), Cell::new(3, 3)).unwrap();
        assert_eq!(path.cells, vec![Cell::new(3, 3)]);
    }

    #[test]
    fn smoothing_collapses_straight_run() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = Polygon::empty();
        let corridor = Corridor::new(&flight, &sensitive);
        let raw: Vec<GeoPoint> = (0..=10)
            .map(|i| GeoPoint::new(0.1 + i as f64 * 0.05, 0.2))
            .collect();

        let smoothed = smooth_path(&raw, corridor);
        assert_eq!(smoothed, vec![raw[0], raw[10]]);
    }

    #[test]
    fn smoothing_keeps_corner_around_obstacle() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let sensitive = rect(0.4, 0.4, 0.6, 0.6);
        let corridor = Corridor::new(&flight, &sensitive);
        let raw = vec![
            GeoPoint::new(0.2, 0.2),
            GeoPoint::new(0.2, 0.5),
            GeoPoint::new(0.2, 0.8),
            GeoPoint::new(0.5, 0.7),
            GeoPoint::new(0.8, 0.8),
        ];

        let smoothed = smooth_path(&raw, corridor);
        assert_eq!(smoothed.first(), raw.first());
        assert_eq!(smoothed.last(), raw.last());
        assert!(smoothed.len() >= 3);
        for pair in smoothed.windows(2) {
            assert!(corridor.permits_segment(&pair[0], &pair[1]));
        }
        // Output is a subsequence of the input.
        let mut it = raw.iter();
        assert!(smoothed.iter().all(|p| it.any(|q| q == p)));
    }

    #[test]
    fn plan_path_with_vanishing_resolution_fails_cleanly() {
        let flight = rect(0.0, 0.0, 1.0, 1.0);
        let area = AreaConfig {
            takeoff: GeoPoint::new(0.1, 0.1),
            sensitive: Polygon::empty(),
            survey: rect(0.5, 0.5, 0.9, 0.9),
            flight_region: flight,
        };
        let config = PlannerConfig {
            grid_resolution_deg: 1e-300,
            ..PlannerConfig::default()
        };
        let result = plan_path(&area, GeoPoint::new(0.1, 0.1), GeoPoint::new(0.9, 0.9), &config);
        assert!(matches!(result, Err(PlanningError::GridTooLarge(_))));
    }

    #[test]
    fn plan_path_connects_takeoff_to_survey_corner() {
        let area = AreaConfig::from_kml(crate::area::tests::SAMPLE_KML).unwrap();
        let goal = GeoPoint::new(51.4230, -2.6680);
        let plan = plan_path(&area, area.takeoff, goal, &PlannerConfig::default()).unwrap();

        assert!(plan.waypoints.len() >= 2);
        assert!(plan.waypoints.len() <= plan.raw_points);
        let corridor = Corridor::new(&area.flight_region, &area.sensitive);
        for point in &plan.waypoints {
            assert!(corridor.permits_point(point));
        }
        let first = plan.waypoints[0];
        let last = plan.waypoints[plan.waypoints.len() - 1];
        assert!(first.planar_distance(&area.takeoff) < 2.0 * 0.0001);
        assert!(last.planar_distance(&goal) < 2.0 * 0.0001);
    }
}
