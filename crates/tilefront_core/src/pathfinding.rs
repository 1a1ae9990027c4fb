//! Grid-based pathfinding using the A* algorithm.
//!
//! Movement costs one step per tile. The open set is ordered by `f = g + h`
//! and ties are broken by insertion order, so identical inputs always yield
//! the identical path.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GameError;
use crate::map::{Map, Passability, TilePos};

/// Movement capability of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mobility {
    /// Walks or drives on open ground only.
    #[default]
    Ground,
    /// Hovers over open ground and water.
    Hover,
}

impl Mobility {
    /// Whether this mover may enter a tile of the given passability.
    #[must_use]
    pub const fn can_enter(self, passability: Passability) -> bool {
        match (self, passability) {
            (_, Passability::Open) => true,
            (Self::Hover, Passability::SpecialOnly) => true,
            _ => false,
        }
    }
}

/// Neighbourhood used when expanding nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Orthogonal steps with a Manhattan heuristic.
    #[default]
    FourWay,
    /// Orthogonal and diagonal steps with a Chebyshev heuristic. Diagonals
    /// may not cut past a corner the mover could not enter.
    EightWay,
}

/// Direction offsets for orthogonal movement.
const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Direction offsets for diagonal movement.
const DIAGONAL: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

/// Pathfinding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// Start or goal lies off the grid.
    #[error("Tile ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(TilePos),
    /// The open set ran dry before the goal was reached.
    #[error("No path from ({}, {}) to ({}, {})", from.x, from.y, to.x, to.y)]
    Unreachable {
        /// Search origin.
        from: TilePos,
        /// Search target.
        to: TilePos,
    },
}

impl PathError {
    /// Convert into a [`GameError::NoPath`] for the given endpoints.
    #[must_use]
    pub const fn into_game_error(self, from: TilePos, to: TilePos) -> GameError {
        match self {
            Self::Unreachable { from, to } => GameError::NoPath { from, to },
            Self::OutOfBounds(_) => GameError::NoPath { from, to },
        }
    }
}

impl From<PathError> for GameError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Unreachable { from, to } => Self::NoPath { from, to },
            PathError::OutOfBounds(pos) => Self::NoPath { from: pos, to: pos },
        }
    }
}

/// Passability grid derived from a [`Map`], plus structure occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavGrid {
    width: u32,
    height: u32,
    /// Row-major passability.
    cells: Vec<Passability>,
    /// Row-major structure occupancy.
    occupied: Vec<bool>,
    connectivity: Connectivity,
}

impl NavGrid {
    /// Fully open grid.
    #[must_use]
    pub fn open(width: u32, height: u32, connectivity: Connectivity) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![Passability::Open; count],
            occupied: vec![false; count],
            connectivity,
        }
    }

    /// Build from the current state of a map.
    #[must_use]
    pub fn from_map(map: &Map, connectivity: Connectivity) -> Self {
        let mut grid = Self::open(map.width(), map.height(), connectivity);
        for (i, tile) in map.tiles().enumerate() {
            grid.cells[i] = tile.passability();
            grid.occupied[i] = tile.occupied;
        }
        grid
    }

    /// Re-read one tile from the map after it changed.
    pub fn refresh_tile(&mut self, map: &Map, pos: TilePos) {
        if let (Some(i), Some(tile)) = (self.index(pos), map.tile(pos)) {
            self.cells[i] = tile.passability();
            self.occupied[i] = tile.occupied;
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Neighbourhood in use.
    #[must_use]
    pub const fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Check if a position lies on the grid.
    #[must_use]
    pub const fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: TilePos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y as usize) * (self.width as usize) + (pos.x as usize))
    }

    #[inline]
    fn position(&self, index: usize) -> TilePos {
        let w = self.width as usize;
        TilePos::new((index % w) as u32, (index / w) as u32)
    }

    /// Passability at a position.
    #[must_use]
    pub fn passability(&self, pos: TilePos) -> Option<Passability> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Overwrite passability. Returns `false` when out of bounds.
    pub fn set_passability(&mut self, pos: TilePos, passability: Passability) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.cells[i] = passability;
                true
            }
            None => false,
        }
    }

    /// Mark or clear structure occupancy.
    pub fn set_occupied(&mut self, pos: TilePos, occupied: bool) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.occupied[i] = occupied;
                true
            }
            None => false,
        }
    }

    /// Whether a structure occupies the tile.
    #[must_use]
    pub fn is_occupied(&self, pos: TilePos) -> bool {
        self.index(pos).is_some_and(|i| self.occupied[i])
    }

    /// Whether a mover with `mobility` may stand on `pos`.
    #[must_use]
    pub fn is_enterable(&self, pos: TilePos, mobility: Mobility) -> bool {
        self.index(pos)
            .is_some_and(|i| !self.occupied[i] && mobility.can_enter(self.cells[i]))
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    index: usize,
    f_score: u32,
    /// Insertion sequence. Earlier entries win ties.
    sequence: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys for lowest-first.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the shortest path from `start` to `goal`.
///
/// The returned path excludes `start` and ends with `goal`; it is empty when
/// the two are equal. The start tile itself is never checked for
/// passability.
///
/// # Errors
///
/// [`PathError::OutOfBounds`] if either endpoint is off the grid,
/// [`PathError::Unreachable`] if no route exists for `mobility`.
pub fn find_path(
    grid: &NavGrid,
    start: TilePos,
    goal: TilePos,
    mobility: Mobility,
) -> Result<Vec<TilePos>, PathError> {
    check_bounds(grid, start)?;
    check_bounds(grid, goal)?;

    if start == goal {
        return Ok(Vec::new());
    }
    if !grid.is_enterable(goal, mobility) {
        return Err(PathError::Unreachable {
            from: start,
            to: goal,
        });
    }

    let connectivity = grid.connectivity();
    search(
        grid,
        start,
        goal,
        mobility,
        |pos| pos == goal,
        |pos| heuristic(connectivity, pos, goal, 0),
    )
}

/// Find the shortest path to any enterable tile within one step (Chebyshev
/// distance 1) of `target`, including `target` itself.
///
/// Used to walk up to something that cannot be stood on, such as a forest
/// tile. Returns an empty path when `start` is already in reach.
///
/// # Errors
///
/// Same as [`find_path`].
pub fn find_path_adjacent(
    grid: &NavGrid,
    start: TilePos,
    target: TilePos,
    mobility: Mobility,
) -> Result<Vec<TilePos>, PathError> {
    check_bounds(grid, start)?;
    check_bounds(grid, target)?;

    if start.chebyshev_distance(target) <= 1 {
        return Ok(Vec::new());
    }

    let connectivity = grid.connectivity();
    search(
        grid,
        start,
        target,
        mobility,
        |pos| pos.chebyshev_distance(target) <= 1,
        |pos| heuristic(connectivity, pos, target, 1),
    )
}

fn check_bounds(grid: &NavGrid, pos: TilePos) -> Result<(), PathError> {
    if grid.in_bounds(pos) {
        Ok(())
    } else {
        Err(PathError::OutOfBounds(pos))
    }
}

/// Admissible distance estimate, reduced by `slack` tiles on each axis.
#[inline]
fn heuristic(connectivity: Connectivity, from: TilePos, to: TilePos, slack: u32) -> u32 {
    let dx = from.x.abs_diff(to.x).saturating_sub(slack);
    let dy = from.y.abs_diff(to.y).saturating_sub(slack);
    match connectivity {
        Connectivity::FourWay => dx + dy,
        Connectivity::EightWay => dx.max(dy),
    }
}

fn search(
    grid: &NavGrid,
    start: TilePos,
    target: TilePos,
    mobility: Mobility,
    is_goal: impl Fn(TilePos) -> bool,
    estimate: impl Fn(TilePos) -> u32,
) -> Result<Vec<TilePos>, PathError> {
    let cell_count = (grid.width as usize) * (grid.height as usize);
    let mut g_score = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<usize>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];
    let mut open_set = BinaryHeap::new();
    let mut sequence = 0u64;

    let Some(start_index) = grid.index(start) else {
        return Err(PathError::OutOfBounds(start));
    };
    g_score[start_index] = 0;
    open_set.push(AStarNode {
        index: start_index,
        f_score: estimate(start),
        sequence,
    });

    while let Some(current) = open_set.pop() {
        if closed[current.index] {
            continue;
        }
        closed[current.index] = true;

        let pos = grid.position(current.index);
        if is_goal(pos) {
            return Ok(reconstruct_path(grid, &came_from, current.index));
        }

        let current_g = g_score[current.index];
        for neighbor in neighbors(grid, pos, mobility) {
            let Some(ni) = grid.index(neighbor) else {
                continue;
            };
            if closed[ni] {
                continue;
            }
            let tentative_g = current_g + 1;
            if tentative_g < g_score[ni] {
                g_score[ni] = tentative_g;
                came_from[ni] = Some(current.index);
                sequence += 1;
                open_set.push(AStarNode {
                    index: ni,
                    f_score: tentative_g + estimate(neighbor),
                    sequence,
                });
            }
        }
    }

    Err(PathError::Unreachable {
        from: start,
        to: target,
    })
}

/// Enterable neighbours of `pos` in expansion order.
fn neighbors(grid: &NavGrid, pos: TilePos, mobility: Mobility) -> Vec<TilePos> {
    let mut out: Vec<TilePos> = ORTHOGONAL
        .iter()
        .filter_map(|&(dx, dy)| pos.offset(dx, dy))
        .filter(|&p| grid.is_enterable(p, mobility))
        .collect();

    if grid.connectivity() == Connectivity::EightWay {
        for &(dx, dy) in &DIAGONAL {
            let Some(diag) = pos.offset(dx, dy) else {
                continue;
            };
            let corners_clear = pos
                .offset(dx, 0)
                .is_some_and(|p| grid.is_enterable(p, mobility))
                && pos
                    .offset(0, dy)
                    .is_some_and(|p| grid.is_enterable(p, mobility));
            if corners_clear && grid.is_enterable(diag, mobility) {
                out.push(diag);
            }
        }
    }
    out
}

fn reconstruct_path(grid: &NavGrid, came_from: &[Option<usize>], goal: usize) -> Vec<TilePos> {
    let mut path = Vec::new();
    let mut current = goal;
    while let Some(prev) = came_from[current] {
        path.push(grid.position(current));
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn pos(x: u32, y: u32) -> TilePos {
        TilePos::new(x, y)
    }

    fn wall(grid: &mut NavGrid, x: u32, ys: std::ops::RangeInclusive<u32>) {
        for y in ys {
            grid.set_passability(pos(x, y), Passability::Blocked);
        }
    }

    /// Breadth-first distance, the ground truth for unit-cost grids.
    fn bfs_distance(grid: &NavGrid, start: TilePos, goal: TilePos) -> Option<usize> {
        let mut dist = vec![usize::MAX; (grid.width() * grid.height()) as usize];
        let mut queue = VecDeque::new();
        dist[grid.index(start)?] = 0;
        queue.push_back(start);
        while let Some(p) = queue.pop_front() {
            if p == goal {
                return Some(dist[grid.index(p)?]);
            }
            let d = dist[grid.index(p)?];
            for n in neighbors(grid, p, Mobility::Ground) {
                let ni = grid.index(n)?;
                if dist[ni] == usize::MAX {
                    dist[ni] = d + 1;
                    queue.push_back(n);
                }
            }
        }
        None
    }

    fn assert_contiguous(start: TilePos, path: &[TilePos]) {
        let mut prev = start;
        for &step in path {
            assert_eq!(prev.manhattan_distance(step), 1, "{prev:?} -> {step:?}");
            prev = step;
        }
    }

    #[test]
    fn test_straight_path_excludes_start() {
        let grid = NavGrid::open(10, 10, Connectivity::FourWay);
        let path = find_path(&grid, pos(1, 1), pos(4, 1), Mobility::Ground).unwrap();

        assert_eq!(path, vec![pos(2, 1), pos(3, 1), pos(4, 1)]);
    }

    #[test]
    fn test_same_start_and_goal_is_empty() {
        let grid = NavGrid::open(10, 10, Connectivity::FourWay);
        let path = find_path(&grid, pos(3, 3), pos(3, 3), Mobility::Ground).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_path_around_wall() {
        let mut grid = NavGrid::open(10, 10, Connectivity::FourWay);
        wall(&mut grid, 5, 0..=8);

        let path = find_path(&grid, pos(2, 2), pos(8, 2), Mobility::Ground).unwrap();

        assert_eq!(path.last(), Some(&pos(8, 2)));
        assert!(path.iter().all(|p| p.x != 5 || p.y == 9));
        assert_contiguous(pos(2, 2), &path);
        assert_eq!(path.len(), bfs_distance(&grid, pos(2, 2), pos(8, 2)).unwrap());
    }

    #[test]
    fn test_enclosed_goal_is_unreachable() {
        let mut grid = NavGrid::open(10, 10, Connectivity::FourWay);
        for (x, y) in [(4, 5), (6, 5), (5, 4), (5, 6)] {
            grid.set_passability(pos(x, y), Passability::Blocked);
        }

        let err = find_path(&grid, pos(0, 0), pos(5, 5), Mobility::Ground).unwrap_err();
        assert_eq!(
            err,
            PathError::Unreachable {
                from: pos(0, 0),
                to: pos(5, 5)
            }
        );
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = NavGrid::open(10, 10, Connectivity::FourWay);
        let err = find_path(&grid, pos(0, 0), pos(10, 3), Mobility::Ground).unwrap_err();
        assert_eq!(err, PathError::OutOfBounds(pos(10, 3)));
    }

    #[test]
    fn test_hover_crosses_water_ground_does_not() {
        let mut grid = NavGrid::open(10, 10, Connectivity::FourWay);
        for y in 0..10 {
            grid.set_passability(pos(5, y), Passability::SpecialOnly);
        }

        assert!(find_path(&grid, pos(2, 2), pos(8, 2), Mobility::Ground).is_err());
        let path = find_path(&grid, pos(2, 2), pos(8, 2), Mobility::Hover).unwrap();
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_occupied_tiles_block_but_start_is_allowed() {
        let mut grid = NavGrid::open(5, 1, Connectivity::FourWay);
        grid.set_occupied(pos(0, 0), true);

        let path = find_path(&grid, pos(0, 0), pos(2, 0), Mobility::Ground).unwrap();
        assert_eq!(path, vec![pos(1, 0), pos(2, 0)]);

        grid.set_occupied(pos(3, 0), true);
        assert!(find_path(&grid, pos(0, 0), pos(4, 0), Mobility::Hover).is_err());
    }

    #[test]
    fn test_eight_way_takes_diagonals() {
        let grid = NavGrid::open(10, 10, Connectivity::EightWay);
        let path = find_path(&grid, pos(0, 0), pos(4, 4), Mobility::Ground).unwrap();
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_eight_way_does_not_cut_corners() {
        let mut grid = NavGrid::open(3, 3, Connectivity::EightWay);
        grid.set_passability(pos(1, 0), Passability::Blocked);

        let path = find_path(&grid, pos(0, 0), pos(1, 1), Mobility::Ground).unwrap();
        assert_eq!(path, vec![pos(0, 1), pos(1, 1)]);
    }

    #[test]
    fn test_adjacent_stops_next_to_blocked_target() {
        let mut grid = NavGrid::open(10, 10, Connectivity::FourWay);
        grid.set_passability(pos(7, 3), Passability::Blocked);

        let path = find_path_adjacent(&grid, pos(1, 3), pos(7, 3), Mobility::Ground).unwrap();
        assert_eq!(path.last(), Some(&pos(6, 3)));
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_adjacent_already_in_reach() {
        let grid = NavGrid::open(10, 10, Connectivity::FourWay);
        let path = find_path_adjacent(&grid, pos(4, 4), pos(5, 5), Mobility::Ground).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_path_is_deterministic() {
        let mut grid = NavGrid::open(20, 20, Connectivity::FourWay);
        wall(&mut grid, 10, 2..=17);

        let first = find_path(&grid, pos(2, 10), pos(18, 10), Mobility::Ground).unwrap();
        for _ in 0..5 {
            let again = find_path(&grid, pos(2, 10), pos(18, 10), Mobility::Ground).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_path_error_converts_to_no_path() {
        let err: GameError = PathError::Unreachable {
            from: pos(1, 1),
            to: pos(2, 2),
        }
        .into();
        assert_eq!(
            err,
            GameError::NoPath {
                from: pos(1, 1),
                to: pos(2, 2)
            }
        );
    }

    proptest! {
        #[test]
        fn prop_path_is_optimal_around_rectangle(
            rx in 2u32..12,
            ry in 2u32..12,
            rw in 1u32..6,
            rh in 1u32..6,
            sx in 0u32..16,
            sy in 0u32..16,
            gx in 0u32..16,
            gy in 0u32..16,
        ) {
            let mut grid = NavGrid::open(16, 16, Connectivity::FourWay);
            for x in rx..(rx + rw).min(16) {
                for y in ry..(ry + rh).min(16) {
                    grid.set_passability(pos(x, y), Passability::Blocked);
                }
            }
            let start = pos(sx, sy);
            let goal = pos(gx, gy);
            prop_assume!(grid.is_enterable(start, Mobility::Ground));
            prop_assume!(grid.is_enterable(goal, Mobility::Ground));

            let path = find_path(&grid, start, goal, Mobility::Ground).unwrap();
            let expected = bfs_distance(&grid, start, goal).unwrap();

            prop_assert_eq!(path.len(), expected);
            assert_contiguous(start, &path);
            prop_assert!(path.iter().all(|p| grid.is_enterable(*p, Mobility::Ground)));
        }

        #[test]
        fn prop_identical_inputs_identical_paths(
            sx in 0u32..16, sy in 0u32..16, gx in 0u32..16, gy in 0u32..16,
        ) {
            let mut grid = NavGrid::open(16, 16, Connectivity::EightWay);
            wall(&mut grid, 8, 3..=12);
            prop_assume!(sx != 8 || !(3..=12).contains(&sy));
            prop_assume!(gx != 8 || !(3..=12).contains(&gy));

            let a = find_path(&grid, pos(sx, sy), pos(gx, gy), Mobility::Ground);
            let b = find_path(&grid, pos(sx, sy), pos(gx, gy), Mobility::Ground);
            prop_assert_eq!(a, b);
        }
    }
}
