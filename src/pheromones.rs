use bevy::math::Vec2;
use rayon::prelude::*;

use crate::geometry::GridPos;

/// Scalar trail concentration over some space of points.
pub trait ScentField<P> {
    /// Zero anywhere nothing was ever deposited, including outside the field.
    fn get(&self, at: P) -> f32;
    fn deposit(&mut self, at: P, amount: f32);
    /// Multiply every cell by `1 - decay_rate`.
    fn evaporate(&mut self, decay_rate: f32);
    /// Total mass over the whole field.
    fn total(&self) -> f32;
}

fn decay_all(values: &mut [f32], decay_rate: f32) {
    let keep = 1.0 - decay_rate;
    values.par_iter_mut().for_each(|val| *val *= keep);
}

fn sum(values: &[f32]) -> f32 {
    values.iter().map(|&v| v as f64).sum::<f64>() as f32
}

/// Concentration per grid cell, same extent as the environment.
#[derive(Debug, Clone)]
pub struct PheromoneField {
    extent: [i32; 3],
    values: Vec<f32>,
}

impl PheromoneField {
    pub fn new(extent: [i32; 3]) -> Self {
        let size = extent.iter().map(|&len| len.max(0) as usize).product();
        Self {
            extent,
            values: vec![0.0; size],
        }
    }

    pub fn extent(&self) -> [i32; 3] {
        self.extent
    }

    pub fn index(&self, at: GridPos) -> Option<usize> {
        let [w, h, d] = self.extent;
        if (0..w).contains(&at.x) && (0..h).contains(&at.y) && (0..d).contains(&at.z) {
            Some(((at.z * h + at.y) * w + at.x) as usize)
        } else {
            None
        }
    }

    /// Raw cells, x fastest, then y, then z.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// One axis-aligned plane with `axis` fixed at `index`, or `None` when the
    /// plane lies outside the extent. Returned row-major over the two remaining
    /// axes in ascending axis order.
    pub fn slice(&self, axis: usize, index: i32) -> Option<FieldSlice> {
        if axis > 2 || !(0..self.extent[axis]).contains(&index) {
            return None;
        }
        let free: Vec<usize> = (0..3).filter(|&a| a != axis).collect();
        let (col_axis, row_axis) = (free[0], free[1]);
        let width = self.extent[col_axis];
        let height = self.extent[row_axis];

        let mut values = Vec::with_capacity((width * height) as usize);
        for row in 0..height {
            for col in 0..width {
                let mut coords = [0; 3];
                coords[axis] = index;
                coords[col_axis] = col;
                coords[row_axis] = row;
                let at = GridPos::new(coords[0], coords[1], coords[2]);
                values.push(self.get(at));
            }
        }
        Some(FieldSlice {
            width: width as usize,
            height: height as usize,
            values,
        })
    }
}

impl ScentField<GridPos> for PheromoneField {
    fn get(&self, at: GridPos) -> f32 {
        self.index(at).map_or(0.0, |idx| self.values[idx])
    }

    fn deposit(&mut self, at: GridPos, amount: f32) {
        if let Some(idx) = self.index(at) {
            self.values[idx] += amount.max(0.0);
        }
    }

    fn evaporate(&mut self, decay_rate: f32) {
        decay_all(&mut self.values, decay_rate);
    }

    fn total(&self) -> f32 {
        sum(&self.values)
    }
}

/// Two-dimensional view of part of a field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldSlice {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl FieldSlice {
    pub fn at(&self, col: usize, row: usize) -> f32 {
        self.values[row * self.width + col]
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }
}

/// Pheromone grid laid over continuous space, one cell per `resolution` units.
#[derive(Debug, Clone)]
pub struct QuantizedField {
    pub width: usize,
    pub height: usize,
    resolution: f32,
    values: Vec<f32>,
}

impl QuantizedField {
    pub fn new(world_width: f32, world_height: f32, resolution: f32) -> Self {
        let width = (world_width / resolution).ceil().max(1.0) as usize;
        let height = (world_height / resolution).ceil().max(1.0) as usize;
        Self {
            width,
            height,
            resolution,
            values: vec![0.0; width * height],
        }
    }

    pub fn world_to_grid(&self, at: Vec2) -> Option<usize> {
        if !at.x.is_finite() || !at.y.is_finite() || at.x < 0.0 || at.y < 0.0 {
            return None;
        }
        let grid_x = (at.x / self.resolution) as usize;
        let grid_y = (at.y / self.resolution) as usize;
        // The far edge belongs to the last cell.
        let grid_x = if grid_x == self.width && at.x <= self.width as f32 * self.resolution {
            grid_x - 1
        } else {
            grid_x
        };
        let grid_y = if grid_y == self.height && at.y <= self.height as f32 * self.resolution {
            grid_y - 1
        } else {
            grid_y
        };

        if grid_x < self.width && grid_y < self.height {
            Some(grid_y * self.width + grid_x)
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> FieldSlice {
        FieldSlice {
            width: self.width,
            height: self.height,
            values: self.values.clone(),
        }
    }
}

impl ScentField<Vec2> for QuantizedField {
    fn get(&self, at: Vec2) -> f32 {
        self.world_to_grid(at).map_or(0.0, |idx| self.values[idx])
    }

    fn deposit(&mut self, at: Vec2, amount: f32) {
        if let Some(idx) = self.world_to_grid(at) {
            self.values[idx] += amount.max(0.0);
        }
    }

    fn evaporate(&mut self, decay_rate: f32) {
        decay_all(&mut self.values, decay_rate);
    }

    fn total(&self) -> f32 {
        sum(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn untouched_cells_read_zero() {
        let field = PheromoneField::new([4, 4, 1]);
        assert_eq!(field.get(GridPos::flat(2, 3)), 0.0);
        assert_eq!(field.get(GridPos::flat(-1, 0)), 0.0);
        assert_eq!(field.get(GridPos::flat(4, 0)), 0.0);
    }

    #[test]
    fn deposit_adds_exactly() {
        let mut field = PheromoneField::new([4, 4, 1]);
        let at = GridPos::flat(1, 2);
        field.deposit(at, 0.2);
        let before = field.get(at);
        field.deposit(at, 1.0);
        assert!((field.get(at) - (before + 1.0)).abs() < 1e-6);
        assert!((field.total() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn deposit_outside_is_ignored() {
        let mut field = PheromoneField::new([4, 4, 1]);
        field.deposit(GridPos::flat(9, 9), 5.0);
        assert_eq!(field.total(), 0.0);
    }

    #[test]
    fn slice_picks_the_requested_plane() {
        let mut field = PheromoneField::new([3, 2, 4]);
        field.deposit(GridPos::new(2, 1, 3), 5.0);
        field.deposit(GridPos::new(0, 0, 1), 1.0);

        let z3 = field.slice(2, 3).expect("z plane");
        assert_eq!((z3.width, z3.height), (3, 2));
        assert_eq!(z3.at(2, 1), 5.0);
        assert_eq!(z3.values.iter().sum::<f32>(), 5.0);

        let x0 = field.slice(0, 0).expect("x plane");
        assert_eq!((x0.width, x0.height), (2, 4));
        assert_eq!(x0.at(0, 1), 1.0);

        assert!(field.slice(2, 4).is_none());
        assert!(field.slice(3, 0).is_none());
    }

    #[test]
    fn quantized_field_buckets_points() {
        let mut field = QuantizedField::new(10.0, 5.0, 2.0);
        assert_eq!((field.width, field.height), (5, 3));
        field.deposit(Vec2::new(3.9, 0.5), 1.0);
        assert_eq!(field.get(Vec2::new(2.1, 1.9)), 1.0);
        assert_eq!(field.get(Vec2::new(4.1, 0.5)), 0.0);
        assert!(field.world_to_grid(Vec2::new(10.0, 5.0)).is_some());
        assert!(field.world_to_grid(Vec2::new(-0.1, 1.0)).is_none());
        field.evaporate(0.5);
        assert!((field.total() - 0.5).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn evaporation_scales_mass(
            deposits in prop::collection::vec((0i32..6, 0i32..6, 0.0f32..10.0), 0..40),
            rate in 0.0f32..0.99,
        ) {
            let mut field = PheromoneField::new([6, 6, 1]);
            for (x, y, amount) in deposits {
                field.deposit(GridPos::flat(x, y), amount);
            }
            let before = field.total();
            field.evaporate(rate);
            let after = field.total();
            prop_assert!((after - before * (1.0 - rate)).abs() <= 1e-3 * before.max(1.0));
            prop_assert!(field.values().iter().all(|&v| v >= 0.0));
        }
    }
}
