use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::Pos;
use crate::bbox::Aabb;
use crate::rule_set::RuleSet;

/// Offsets of the 8 cells of the Moore neighborhood.
const NEIGHBORS: [Pos; 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    /// There is no bounding box around an empty generation.
    #[error("Bounding box of an empty generation is undefined")]
    EmptyState,

    /// Stepping produced an empty generation. The (empty) generation is still published.
    #[error("Population went extinct at generation {generation}")]
    Extinction { generation: u64 },
}

/// One generation of a Life-like automaton on an unbounded grid, stored as the set of its live
/// cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    cells: HashSet<Pos>,

    /// Tight box around `cells`. `None` iff `cells` is empty.
    bbox: Option<Aabb>,

    rules: RuleSet,

    /// Number of steps taken to reach this generation
    generation: u64,
}

impl GridState {
    /// Build the initial generation under Conway's rules. Duplicate positions collapse.
    pub fn new<I>(live_cells: I) -> Self
    where
        I: IntoIterator<Item = Pos>,
    {
        Self::with_rules(live_cells, RuleSet::default())
    }

    pub fn with_rules<I>(live_cells: I, rules: RuleSet) -> Self
    where
        I: IntoIterator<Item = Pos>,
    {
        let cells: HashSet<Pos> = live_cells.into_iter().collect();
        let bbox = Aabb::from_points(&cells);

        Self {
            cells,
            bbox,
            rules,
            generation: 0,
        }
    }

    /// Tight box around the live cells.
    pub fn bounding_box(&self) -> Result<Aabb, GridError> {
        self.bbox.ok_or(GridError::EmptyState)
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: &Pos) -> bool {
        self.cells.contains(pos)
    }

    /// Live cells, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = &Pos> + '_ {
        self.cells.iter()
    }

    /// Number of live cells among the 8 neighbors of `(x, y)`. Neighbors past the edge of the
    /// world don't exist and count as dead.
    pub fn neighbor_count(&self, (x, y): Pos) -> u8 {
        NEIGHBORS
            .iter()
            .filter_map(|&(dx, dy)| Some((x.checked_add(dx)?, y.checked_add(dy)?)))
            .filter(|p| self.cells.contains(p))
            .count() as u8
    }

    /// Compute the next generation into a fresh `GridState`, leaving `self` untouched.
    ///
    /// Only the previous bounding box grown by one cell is visited. Without births on 0, a cell
    /// further out has no live neighbors and stays dead.
    pub fn successor(&self) -> Result<GridState, GridError> {
        let bbox = self.bounding_box()?.expand(1);

        let mut next = HashSet::with_capacity(self.cells.len());
        let mut next_bbox: Option<Aabb> = None;

        for y in bbox.ys() {
            for x in bbox.xs() {
                let pos = (x, y);
                let alive = self.cells.contains(&pos);

                if !self.rules.next_state(alive, self.neighbor_count(pos)) {
                    continue;
                }

                match next_bbox.as_mut() {
                    Some(b) => b.add(&pos),
                    None => next_bbox = Some(Aabb::point(pos)),
                }

                next.insert(pos);
            }
        }

        Ok(GridState {
            cells: next,
            bbox: next_bbox,
            rules: self.rules,
            generation: self.generation + 1,
        })
    }

    /// Advance one generation.
    ///
    /// Fails with [`GridError::EmptyState`] when there is nothing to step, in which case `self`
    /// is unchanged. When the population dies out the empty generation replaces `self` and
    /// [`GridError::Extinction`] is returned.
    pub fn step(&mut self) -> Result<(), GridError> {
        *self = self.successor()?;

        if self.is_empty() {
            return Err(GridError::Extinction {
                generation: self.generation,
            });
        }

        Ok(())
    }
}

impl FromIterator<Pos> for GridState {
    fn from_iter<I: IntoIterator<Item = Pos>>(iter: I) -> Self {
        GridState::new(iter)
    }
}

/// Draws the bounding box, top row first (largest `y`), with `o` for live cells and `.` for dead
/// ones. An empty generation draws nothing.
impl fmt::Display for GridState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(bbox) = self.bbox else {
            return Ok(());
        };

        for (i, y) in bbox.ys().rev().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            for x in bbox.xs() {
                let c = if self.cells.contains(&(x, y)) { 'o' } else { '.' };
                write!(f, "{c}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use insta::assert_snapshot;

    use super::GridError;
    use super::GridState;
    use crate::Pos;
    use crate::bbox::Aabb;

    fn set(cells: &[Pos]) -> HashSet<Pos> {
        cells.iter().copied().collect()
    }

    fn live(grid: &GridState) -> HashSet<Pos> {
        grid.cells().copied().collect()
    }

    #[test]
    fn single_cell_dies() {
        let mut grid = GridState::new([(7, -3)]);

        assert_eq!(grid.step(), Err(GridError::Extinction { generation: 1 }));
        assert!(grid.is_empty());
        assert_eq!(grid.bounding_box(), Err(GridError::EmptyState));
    }

    #[test]
    fn block_is_still() {
        let block = [(0, 0), (1, 0), (0, 1), (1, 1)];
        let mut grid = GridState::new(block);

        grid.step().unwrap();

        assert_eq!(live(&grid), set(&block));
        assert_eq!(grid.generation(), 1);
    }

    #[test]
    fn blinker_has_period_two() {
        let blinker = [(-1, 0), (0, 0), (1, 0)];
        let mut grid = GridState::new(blinker);

        grid.step().unwrap();
        assert_eq!(live(&grid), set(&[(0, -1), (0, 0), (0, 1)]));

        grid.step().unwrap();
        assert_eq!(live(&grid), set(&blinker));
    }

    #[test]
    fn vertical_bar_turns_horizontal() {
        // o$o$o!
        let mut grid = GridState::new([(0, 0), (0, -1), (0, -2)]);

        grid.step().unwrap();

        assert_eq!(live(&grid), set(&[(-1, -1), (0, -1), (1, -1)]));
        assert_eq!(
            grid.bounding_box(),
            Ok(Aabb {
                min_x: -1,
                min_y: -1,
                max_x: 1,
                max_y: -1
            })
        );
    }

    #[test]
    fn empty_state() {
        let mut grid = GridState::new([]);

        assert_eq!(grid.bounding_box(), Err(GridError::EmptyState));
        assert_eq!(grid.step(), Err(GridError::EmptyState));
        assert_eq!(grid.generation(), 0);
    }

    #[test]
    fn duplicates_collapse() {
        let grid = GridState::new([(1, 1), (1, 1), (2, 5)]);

        assert_eq!(grid.len(), 2);
        assert_eq!(
            grid.bounding_box(),
            Ok(Aabb {
                min_x: 1,
                min_y: 1,
                max_x: 2,
                max_y: 5
            })
        );
    }

    #[test]
    fn successor_leaves_self() {
        let grid = GridState::new([(-1, 0), (0, 0), (1, 0)]);
        let next = grid.successor().unwrap();

        assert_eq!(grid.generation(), 0);
        assert!(grid.contains(&(-1, 0)));
        assert!(!next.contains(&(-1, 0)));
        assert_eq!(next.generation(), 1);
    }

    #[test]
    fn neighbor_count() {
        let grid = GridState::new([(0, 0), (1, 0), (0, 1), (1, 1)]);

        assert_eq!(grid.neighbor_count((0, 0)), 3);
        assert_eq!(grid.neighbor_count((2, 2)), 1);
        assert_eq!(grid.neighbor_count((5, 5)), 0);
    }

    #[test]
    fn steps_at_world_edge() {
        let mut grid = GridState::new([(i64::MAX, 0), (i64::MAX, 1), (i64::MAX, -1)]);

        grid.step().unwrap();

        assert_eq!(live(&grid), set(&[(i64::MAX - 1, 0), (i64::MAX, 0)]));
        assert_eq!(grid.neighbor_count((i64::MAX, i64::MAX)), 0);

        let mut corner = GridState::new([(i64::MIN, i64::MIN), (i64::MIN + 1, i64::MIN)]);
        assert_eq!(corner.step(), Err(GridError::Extinction { generation: 1 }));
    }

    #[test]
    fn glider_moves() {
        // bo$2bo$3o!
        let mut grid = GridState::new([(1, 0), (2, -1), (0, -2), (1, -2), (2, -2)]);

        assert_snapshot!(grid.to_string(), @r"
        .o.
        ..o
        ooo
        ");

        for _ in 0..4 {
            grid.step().unwrap();
        }

        assert_snapshot!(grid.to_string(), @r"
        .o.
        ..o
        ooo
        ");
        assert_eq!(
            grid.bounding_box(),
            Ok(Aabb {
                min_x: 1,
                min_y: -3,
                max_x: 3,
                max_y: -1
            })
        );
    }
}
