use cubecl::prelude::CubeCount;

use super::GlobalOrder;
use crate::components::{CubeCountPlan, GroupedB2bProblem};

/// Output tile of one problem of a group.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, new)]
pub struct TileCoordinate {
    /// Index of the problem in its group.
    pub instance: u32,
    /// Tile index along the rows of the output.
    pub row_tile: u32,
    /// Tile index along the columns of the output.
    pub col_tile: u32,
}

/// Most cubes along the first dimension of a launch.
const MAX_CUBE_COUNT_X: u32 = u16::MAX as u32;

#[derive(Clone, Copy, Debug)]
struct InstanceGrid {
    m_tiles: u32,
    n_tiles: u32,
    order: GlobalOrder,
}

/// Assigns every output tile of every problem of a group to exactly one cube.
///
/// Tiles are numbered problem after problem, each problem in its [GlobalOrder]. Cube `c` out
/// of `num_cubes` visits tiles `c`, `c + num_cubes`, `c + 2 * num_cubes`, and so on.
#[derive(Clone, Debug)]
pub struct GroupedScheduler {
    grids: Vec<InstanceGrid>,
    // Linear index of the first tile of each problem, followed by the total.
    tile_offsets: Vec<u32>,
    num_cubes: u32,
}

impl GroupedScheduler {
    /// Numbers the tiles of every problem, `None` when the schedule of the group can't be
    /// indexed with 32 bits.
    pub fn new(
        problem: &GroupedB2bProblem,
        tile_m: u32,
        tile_n: u32,
        global_order: GlobalOrder,
        plan: CubeCountPlan,
        num_streaming_multiprocessors: u32,
    ) -> Option<Self> {
        let mut grids = Vec::with_capacity(problem.len());
        let mut tile_offsets = Vec::with_capacity(problem.len() + 1);
        let mut total = 0u32;

        for instance in problem.instances.iter() {
            let (m_tiles, n_tiles) = instance.num_tiles(tile_m, tile_n);
            grids.push(InstanceGrid {
                m_tiles,
                n_tiles,
                order: global_order.effective(m_tiles, n_tiles),
            });
            tile_offsets.push(total);
            total = total.checked_add(m_tiles.checked_mul(n_tiles)?)?;
        }
        tile_offsets.push(total);
        total.checked_mul(SCHEDULE_WORDS)?;

        let num_cubes = match plan {
            CubeCountPlan::FromProblem => total,
            CubeCountPlan::Fixed(num_cubes) => num_cubes.max(1).min(total),
            CubeCountPlan::PerSm(cubes_per_sm) => cubes_per_sm
                .max(1)
                .saturating_mul(num_streaming_multiprocessors.max(1))
                .min(total),
        };

        Some(Self {
            grids,
            tile_offsets,
            num_cubes,
        })
    }

    /// Number of output tiles over all problems.
    pub fn total_tiles(&self) -> u32 {
        self.tile_offsets.last().copied().unwrap_or(0)
    }

    pub fn num_cubes(&self) -> u32 {
        self.num_cubes
    }

    /// Launch grid of [num_cubes](Self::num_cubes) cubes, spilling into a second dimension
    /// past the first dimension limit. Cubes past `num_cubes` have nothing to do.
    pub fn cube_count(&self) -> CubeCount {
        let x = self.num_cubes.clamp(1, MAX_CUBE_COUNT_X);
        CubeCount::Static(x, self.num_cubes.div_ceil(x), 1)
    }

    /// The tile at a linear index, which must be below [total_tiles](Self::total_tiles).
    pub fn tile_coordinate(&self, linear: u32) -> TileCoordinate {
        // Empty problems share their offset with the next one, the last match is the owner.
        let instance = self.tile_offsets[..self.grids.len()]
            .partition_point(|&start| start <= linear)
            - 1;
        let grid = &self.grids[instance];
        let local = linear - self.tile_offsets[instance];
        let (row_tile, col_tile) = grid.order.to_row_col(local, grid.m_tiles, grid.n_tiles);

        TileCoordinate::new(instance as u32, row_tile, col_tile)
    }

    /// Coordinates of every tile in linear order, [SCHEDULE_WORDS] words each.
    ///
    /// Cube `c` reads the tiles at `c`, `c + num_cubes`, `c + 2 * num_cubes` and so on.
    pub fn schedule(&self) -> Vec<u32> {
        (0..self.total_tiles())
            .flat_map(|linear| {
                let tile = self.tile_coordinate(linear);
                [tile.instance, tile.row_tile, tile.col_tile]
            })
            .collect()
    }
}

/// Words describing one tile in a [schedule](GroupedScheduler::schedule).
pub const SCHEDULE_WORDS: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::B2bProblem;

    fn scheduler(
        problems: &[(u32, u32)],
        global_order: GlobalOrder,
        plan: CubeCountPlan,
    ) -> GroupedScheduler {
        let problem = problems
            .iter()
            .map(|&(m, n1)| B2bProblem::new(m, 64, 32, n1))
            .collect::<GroupedB2bProblem>();

        GroupedScheduler::new(
            &problem,
            64,
            32,
            global_order,
            plan,
            108,
        )
        .unwrap()
    }

    fn cube_tiles(scheduler: &GroupedScheduler, cube: u32) -> Vec<TileCoordinate> {
        let schedule = scheduler.schedule();
        (cube..scheduler.total_tiles())
            .step_by(scheduler.num_cubes() as usize)
            .map(|linear| {
                let start = (linear * SCHEDULE_WORDS) as usize;
                TileCoordinate::new(schedule[start], schedule[start + 1], schedule[start + 2])
            })
            .collect()
    }

    fn visited(scheduler: &GroupedScheduler) -> Vec<TileCoordinate> {
        let mut visited: Vec<_> = (0..scheduler.num_cubes())
            .flat_map(|cube| cube_tiles(scheduler, cube))
            .collect();
        visited.sort();
        visited
    }

    fn expected(problems: &[(u32, u32)]) -> Vec<TileCoordinate> {
        problems
            .iter()
            .enumerate()
            .flat_map(|(instance, &(m, n1))| {
                let (m_tiles, n_tiles) = B2bProblem::new(m, 64, 32, n1).num_tiles(64, 32);
                (0..m_tiles).flat_map(move |row| {
                    (0..n_tiles).map(move |col| TileCoordinate::new(instance as u32, row, col))
                })
            })
            .collect()
    }

    #[test]
    fn one_cube_per_tile() {
        let problems = [(128, 64), (64, 32)];
        let scheduler = scheduler(&problems, GlobalOrder::RowMajor, CubeCountPlan::FromProblem);

        assert_eq!(scheduler.total_tiles(), 5);
        assert_eq!(scheduler.num_cubes(), 5);
        pretty_assertions::assert_eq!(visited(&scheduler), expected(&problems));
    }

    #[test]
    fn persistent_cubes_visit_every_tile_once() {
        let problems = [(200, 100), (1, 1), (64, 256), (300, 33)];

        for plan in [
            CubeCountPlan::Fixed(1),
            CubeCountPlan::Fixed(3),
            CubeCountPlan::Fixed(7),
            CubeCountPlan::PerSm(1),
        ] {
            for order in [
                GlobalOrder::RowMajor,
                GlobalOrder::ColMajor,
                GlobalOrder::SwizzleRowMajor(2),
                GlobalOrder::SwizzleColMajor(2),
            ] {
                let scheduler = scheduler(&problems, order, plan);
                pretty_assertions::assert_eq!(visited(&scheduler), expected(&problems));
            }
        }
    }

    #[test]
    fn empty_problems_are_skipped() {
        let problems = [(0, 64), (64, 32), (64, 0), (65, 32)];
        let scheduler = scheduler(&problems, GlobalOrder::RowMajor, CubeCountPlan::FromProblem);

        assert_eq!(scheduler.total_tiles(), 3);
        assert_eq!(
            scheduler.tile_coordinate(0),
            TileCoordinate::new(1, 0, 0)
        );
        assert_eq!(
            scheduler.tile_coordinate(2),
            TileCoordinate::new(3, 1, 0)
        );
    }

    #[test]
    fn cube_visits_strided_tiles() {
        let problems = [(256, 64)];
        let scheduler = scheduler(&problems, GlobalOrder::RowMajor, CubeCountPlan::Fixed(3));

        let tiles = cube_tiles(&scheduler, 1);
        assert_eq!(
            tiles,
            vec![
                TileCoordinate::new(0, 0, 1),
                TileCoordinate::new(0, 2, 0),
                TileCoordinate::new(0, 3, 1),
            ]
        );
    }

    #[test]
    fn per_sm_plan_saturates_instead_of_wrapping() {
        let problems = [(64 * 10, 32)];
        let scheduler = scheduler(&problems, GlobalOrder::RowMajor, CubeCountPlan::PerSm(u32::MAX));

        assert_eq!(scheduler.num_cubes(), 10);
    }

    #[test]
    fn large_launches_spill_into_a_second_dimension() {
        let problems = [(64 * 70_000, 32)];
        let scheduler = scheduler(&problems, GlobalOrder::RowMajor, CubeCountPlan::FromProblem);

        match scheduler.cube_count() {
            CubeCount::Static(x, y, z) => {
                assert_eq!((x, y, z), (MAX_CUBE_COUNT_X, 2, 1));
                assert!(x * y >= scheduler.num_cubes());
            }
            _ => panic!("Expected a static cube count"),
        }
    }

    #[test]
    fn unindexable_groups_are_refused() {
        let problem = GroupedB2bProblem::new(vec![B2bProblem::new(u32::MAX, 64, 32, u32::MAX)]);

        assert!(
            GroupedScheduler::new(
                &problem,
                1,
                1,
                GlobalOrder::RowMajor,
                CubeCountPlan::FromProblem,
                108
            )
            .is_none()
        );
    }
}
