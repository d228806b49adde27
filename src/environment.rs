use std::collections::BTreeSet;

use rand::Rng;

use crate::config::SimConfig;
use crate::error::{Rejection, SimError, SimResult};
use crate::geometry::{CellKind, GridPos, Offset};
use crate::pheromones::PheromoneField;
use crate::substrate::{Candidate, Substrate};

/// Occupancy grid: nest, food and obstacle cells.
///
/// The nest, food and obstacle sets never overlap; every food position is a
/// `Food` cell and every obstacle position an `Obstacle` cell.
#[derive(Debug, Clone)]
pub struct SpatialEnvironment {
    extent: [i32; 3],
    dimensions: usize,
    cells: Vec<CellKind>,
    nest: GridPos,
    food: BTreeSet<GridPos>,
    obstacles: BTreeSet<GridPos>,
}

impl SpatialEnvironment {
    /// Empty grid holding only the nest.
    pub fn new(extent: [i32; 3], dimensions: usize, nest: GridPos) -> SimResult<Self> {
        if !(2..=3).contains(&dimensions) {
            return Err(SimError::config(format!("dimensions must be 2 or 3, got {dimensions}")));
        }
        let mut extent = extent;
        for axis in extent.iter_mut().skip(dimensions) {
            *axis = 1;
        }
        if extent.iter().any(|&len| len <= 0) {
            return Err(SimError::config(format!(
                "extent must be positive on every axis, got {extent:?}"
            )));
        }
        let size = extent.iter().map(|&len| len as usize).product();

        let mut env = Self {
            extent,
            dimensions,
            cells: vec![CellKind::Empty; size],
            nest,
            food: BTreeSet::new(),
            obstacles: BTreeSet::new(),
        };
        let idx = env
            .index(nest)
            .ok_or_else(|| SimError::config(format!("nest {nest} lies outside the extent")))?;
        env.cells[idx] = CellKind::Nest;
        Ok(env)
    }

    /// Marks the nest, then scatters food and obstacles over empty cells.
    pub fn initialize(
        extent: [i32; 3],
        dimensions: usize,
        nest: GridPos,
        food_count: usize,
        obstacle_count: usize,
        rng: &mut impl Rng,
    ) -> SimResult<Self> {
        let mut env = Self::new(extent, dimensions, nest)?;
        let requested = food_count as u64 + obstacle_count as u64 + 1;
        if requested > env.cells.len() as u64 {
            return Err(SimError::config(format!(
                "{food_count} food + {obstacle_count} obstacles + nest do not fit in {} cells",
                env.cells.len()
            )));
        }
        env.place_random(food_count, CellKind::Food, rng);
        env.place_random(obstacle_count, CellKind::Obstacle, rng);
        Ok(env)
    }

    pub fn from_config(config: &SimConfig, rng: &mut impl Rng) -> SimResult<Self> {
        config.validate()?;
        Self::initialize(
            config.extent,
            config.dimensions,
            config.nest_position(),
            config.food_count,
            config.obstacle_count,
            rng,
        )
    }

    fn place_random(&mut self, count: usize, kind: CellKind, rng: &mut impl Rng) {
        let mut placed = 0;
        while placed < count {
            let at = GridPos::new(
                rng.gen_range(0..self.extent[0]),
                rng.gen_range(0..self.extent[1]),
                rng.gen_range(0..self.extent[2]),
            );
            if self.kind_at(at) == Some(CellKind::Empty) {
                self.set(at, kind);
                placed += 1;
            }
        }
    }

    pub fn extent(&self) -> [i32; 3] {
        self.extent
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn nest(&self) -> GridPos {
        self.nest
    }

    pub fn food(&self) -> &BTreeSet<GridPos> {
        &self.food
    }

    pub fn obstacles(&self) -> &BTreeSet<GridPos> {
        &self.obstacles
    }

    pub fn contains(&self, at: GridPos) -> bool {
        self.index(at).is_some()
    }

    fn index(&self, at: GridPos) -> Option<usize> {
        let [w, h, d] = self.extent;
        if (0..w).contains(&at.x) && (0..h).contains(&at.y) && (0..d).contains(&at.z) {
            Some(((at.z * h + at.y) * w + at.x) as usize)
        } else {
            None
        }
    }

    fn kind_at(&self, at: GridPos) -> Option<CellKind> {
        self.index(at).map(|idx| self.cells[idx])
    }

    /// Writes the cell and keeps the food and obstacle sets in step with it.
    fn set(&mut self, at: GridPos, kind: CellKind) {
        let Some(idx) = self.index(at) else {
            return;
        };
        match self.cells[idx] {
            CellKind::Food => {
                self.food.remove(&at);
            }
            CellKind::Obstacle => {
                self.obstacles.remove(&at);
            }
            _ => {}
        }
        self.cells[idx] = kind;
        match kind {
            CellKind::Food => {
                self.food.insert(at);
            }
            CellKind::Obstacle => {
                self.obstacles.insert(at);
            }
            _ => {}
        }
    }

    /// In-bounds axis neighbours, each with the step that reaches it.
    /// Order: axis 0 then 1 then 2, the negative step before the positive one.
    pub fn neighbors(&self, at: GridPos) -> impl Iterator<Item = (GridPos, Offset)> + '_ {
        Offset::axis_steps(self.dimensions)
            .map(move |step| (at + step, step))
            .filter(|(next, _)| self.contains(*next))
    }

    pub fn kind_of(&self, at: GridPos) -> SimResult<CellKind> {
        self.kind_at(at).ok_or(SimError::OutOfBounds(at))
    }

    pub fn is_obstacle(&self, at: GridPos) -> bool {
        self.kind_at(at) == Some(CellKind::Obstacle)
    }

    pub fn is_food(&self, at: GridPos) -> bool {
        self.kind_at(at) == Some(CellKind::Food)
    }

    pub fn is_nest(&self, at: GridPos) -> bool {
        at == self.nest
    }

    /// Clears a food cell back to empty. Anything else is left alone.
    pub fn remove_food(&mut self, at: GridPos) {
        if self.is_food(at) {
            self.set(at, CellKind::Empty);
        }
    }

    fn check_placement(&self, at: GridPos) -> Result<(), Rejection> {
        match self.kind_at(at) {
            None => Err(Rejection::OutsideExtent),
            Some(CellKind::Nest) => Err(Rejection::NestCell),
            Some(CellKind::Empty) => Ok(()),
            Some(kind) => Err(Rejection::Occupied(kind)),
        }
    }

    pub fn add_food(&mut self, at: GridPos) -> Result<(), Rejection> {
        self.check_placement(at)?;
        self.set(at, CellKind::Food);
        Ok(())
    }

    pub fn add_obstacle(&mut self, at: GridPos) -> Result<(), Rejection> {
        self.check_placement(at)?;
        self.set(at, CellKind::Obstacle);
        Ok(())
    }

    /// Clears whichever food or obstacle cell lies closest to `at`. Food is
    /// chosen only when strictly closer than every obstacle.
    pub fn remove_nearest(&mut self, at: GridPos) -> Result<(GridPos, CellKind), Rejection> {
        let nearest = |set: &BTreeSet<GridPos>| set.iter().copied().min_by_key(|p| p.manhattan(at));
        let target = match (nearest(&self.food), nearest(&self.obstacles)) {
            (Some(food), Some(rock)) if food.manhattan(at) < rock.manhattan(at) => food,
            (_, Some(rock)) => rock,
            (Some(food), None) => food,
            (None, None) => return Err(Rejection::NothingToRemove),
        };
        let kind = self.kind_at(target).unwrap_or_default();
        self.set(target, CellKind::Empty);
        Ok((target, kind))
    }
}

impl Substrate for SpatialEnvironment {
    type Point = GridPos;
    type Heading = Offset;
    type Field = PheromoneField;

    fn candidates(&self, from: GridPos, out: &mut Vec<Candidate<GridPos, Offset>>) {
        out.extend(self.neighbors(from).map(|(target, heading)| Candidate {
            target,
            heading,
            probe: target,
        }));
    }

    fn is_blocked(&self, at: GridPos) -> bool {
        self.is_obstacle(at)
    }

    fn contains(&self, at: GridPos) -> bool {
        SpatialEnvironment::contains(self, at)
    }

    fn is_food(&self, at: GridPos) -> bool {
        SpatialEnvironment::is_food(self, at)
    }

    fn is_nest(&self, at: GridPos) -> bool {
        SpatialEnvironment::is_nest(self, at)
    }

    fn nest(&self) -> GridPos {
        self.nest
    }

    fn nest_distance(&self, at: GridPos) -> f32 {
        at.manhattan(self.nest) as f32
    }

    fn remove_food(&mut self, at: GridPos) {
        SpatialEnvironment::remove_food(self, at);
    }

    fn food_remaining(&self) -> usize {
        self.food.len()
    }

    fn is_reversal(&self, previous: Offset, next: Offset) -> bool {
        next == -previous
    }

    fn advance(
        &self,
        _from: GridPos,
        candidate: &Candidate<GridPos, Offset>,
        _speed: f32,
    ) -> GridPos {
        // One cell per tick regardless of speed.
        candidate.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn empty_10x10() -> SpatialEnvironment {
        SpatialEnvironment::new([10, 10, 1], 2, GridPos::flat(5, 5)).expect("grid")
    }

    #[test]
    fn neighbors_skip_out_of_range_cells() {
        let env = empty_10x10();
        let corner: Vec<_> = env.neighbors(GridPos::flat(0, 0)).collect();
        assert_eq!(
            corner,
            vec![
                (GridPos::flat(1, 0), Offset::new(1, 0, 0)),
                (GridPos::flat(0, 1), Offset::new(0, 1, 0)),
            ]
        );
        assert_eq!(env.neighbors(GridPos::flat(4, 4)).count(), 4);
    }

    #[test]
    fn three_dimensional_neighbors() {
        let env = SpatialEnvironment::new([4, 4, 4], 3, GridPos::new(2, 2, 2)).expect("grid");
        assert_eq!(env.neighbors(GridPos::new(1, 1, 1)).count(), 6);
        assert_eq!(env.neighbors(GridPos::new(0, 0, 0)).count(), 3);
    }

    #[test]
    fn two_dimensional_grid_ignores_third_axis() {
        let env = SpatialEnvironment::new([5, 5, 9], 2, GridPos::flat(2, 2)).expect("grid");
        assert_eq!(env.extent(), [5, 5, 1]);
        assert_eq!(env.cell_count(), 25);
    }

    #[test]
    fn remove_food_is_idempotent() {
        let mut env = empty_10x10();
        let at = GridPos::flat(7, 7);
        env.add_food(at).expect("food");
        env.remove_food(at);
        assert!(env.food().is_empty());
        assert_eq!(env.kind_of(at), Ok(CellKind::Empty));
        env.remove_food(at);
        env.remove_food(GridPos::flat(5, 5));
        assert_eq!(env.kind_of(GridPos::flat(5, 5)), Ok(CellKind::Nest));
    }

    #[test]
    fn edits_respect_disjointness() {
        let mut env = empty_10x10();
        assert_eq!(env.add_food(GridPos::flat(5, 5)), Err(Rejection::NestCell));
        assert_eq!(env.add_obstacle(GridPos::flat(5, 5)), Err(Rejection::NestCell));
        env.add_obstacle(GridPos::flat(1, 1)).expect("rock");
        assert_eq!(
            env.add_food(GridPos::flat(1, 1)),
            Err(Rejection::Occupied(CellKind::Obstacle))
        );
        assert_eq!(env.add_food(GridPos::flat(10, 0)), Err(Rejection::OutsideExtent));
        assert!(env.food().is_empty());
    }

    #[test]
    fn remove_nearest_prefers_strictly_closer_food() {
        let mut env = empty_10x10();
        env.add_food(GridPos::flat(2, 0)).expect("food");
        env.add_obstacle(GridPos::flat(0, 2)).expect("rock");

        // Equal distance: the obstacle goes.
        let removed = env.remove_nearest(GridPos::flat(0, 0)).expect("removed");
        assert_eq!(removed, (GridPos::flat(0, 2), CellKind::Obstacle));

        let removed = env.remove_nearest(GridPos::flat(9, 9)).expect("removed");
        assert_eq!(removed, (GridPos::flat(2, 0), CellKind::Food));
        assert_eq!(env.remove_nearest(GridPos::flat(0, 0)), Err(Rejection::NothingToRemove));
    }

    #[test]
    fn kind_of_rejects_outside_queries() {
        let env = empty_10x10();
        assert_eq!(
            env.kind_of(GridPos::flat(-1, 3)),
            Err(SimError::OutOfBounds(GridPos::flat(-1, 3)))
        );
        assert!(!env.is_obstacle(GridPos::flat(-1, 3)));
    }

    #[test]
    fn initialize_rejects_overfull_requests() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result =
            SpatialEnvironment::initialize([2, 2, 1], 2, GridPos::flat(0, 0), 2, 2, &mut rng);
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn initialize_fills_a_full_grid() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let env = SpatialEnvironment::initialize([3, 3, 1], 2, GridPos::flat(1, 1), 4, 4, &mut rng)
            .expect("grid");
        assert_eq!(env.food().len(), 4);
        assert_eq!(env.obstacles().len(), 4);
    }

    proptest! {
        #[test]
        fn placement_keeps_kinds_disjoint(
            seed in any::<u64>(),
            food in 0usize..20,
            rocks in 0usize..20,
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let nest = GridPos::flat(3, 3);
            let env = SpatialEnvironment::initialize([7, 6, 1], 2, nest, food, rocks, &mut rng)
                .expect("grid");
            prop_assert_eq!(env.food().len(), food);
            prop_assert_eq!(env.obstacles().len(), rocks);
            prop_assert!(env.food().is_disjoint(env.obstacles()));
            prop_assert!(!env.food().contains(&env.nest()));
            prop_assert!(!env.obstacles().contains(&env.nest()));
            for p in env.food() {
                prop_assert_eq!(env.kind_of(*p), Ok(CellKind::Food));
            }
            for p in env.obstacles() {
                prop_assert_eq!(env.kind_of(*p), Ok(CellKind::Obstacle));
            }
        }
    }
}
