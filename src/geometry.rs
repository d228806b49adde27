use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg};

/// Integer cell coordinate. 2D grids keep `z` at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn flat(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }

    pub fn axis(&self, axis: usize) -> i32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn manhattan(&self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Add<Offset> for GridPos {
    type Output = GridPos;

    fn add(self, rhs: Offset) -> GridPos {
        GridPos::new(self.x + rhs.dx, self.y + rhs.dy, self.z + rhs.dz)
    }
}

/// Unit step between neighbouring cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
}

impl Offset {
    pub const fn new(dx: i32, dy: i32, dz: i32) -> Self {
        Self { dx, dy, dz }
    }

    /// -1 then +1 along each axis, axis 0 first.
    pub fn axis_steps(dimensions: usize) -> impl Iterator<Item = Offset> {
        (0..dimensions.min(3)).flat_map(|axis| {
            [-1, 1].into_iter().map(move |sign| match axis {
                0 => Offset::new(sign, 0, 0),
                1 => Offset::new(0, sign, 0),
                _ => Offset::new(0, 0, sign),
            })
        })
    }
}

impl Neg for Offset {
    type Output = Offset;

    fn neg(self) -> Offset {
        Offset::new(-self.dx, -self.dy, -self.dz)
    }
}

/// Axis-aligned obstacle in continuous space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Edges count as inside.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Whether the segment from `a` to `b` touches the rectangle, edges
    /// included.
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        let delta = b - a;
        let slabs = [
            (a.x, delta.x, self.x, self.x + self.width),
            (a.y, delta.y, self.y, self.y + self.height),
        ];
        let (mut enter, mut exit) = (0.0_f32, 1.0_f32);
        for (start, step, lo, hi) in slabs {
            if step == 0.0 {
                if start < lo || start > hi {
                    return false;
                }
                continue;
            }
            let (t_lo, t_hi) = ((lo - start) / step, (hi - start) / step);
            enter = enter.max(t_lo.min(t_hi));
            exit = exit.min(t_lo.max(t_hi));
            if enter > exit {
                return false;
            }
        }
        true
    }
}

/// Classification of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    Obstacle,
    Food,
    Nest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_steps_follow_fixed_order() {
        let steps: Vec<_> = Offset::axis_steps(2).collect();
        assert_eq!(
            steps,
            vec![
                Offset::new(-1, 0, 0),
                Offset::new(1, 0, 0),
                Offset::new(0, -1, 0),
                Offset::new(0, 1, 0),
            ]
        );
        assert_eq!(Offset::axis_steps(3).count(), 6);
    }

    #[test]
    fn manhattan_counts_every_axis() {
        let a = GridPos::new(1, 2, 3);
        let b = GridPos::new(4, 0, 3);
        assert_eq!(a.manhattan(b), 5);
        assert_eq!(b.manhattan(a), 5);
        assert_eq!(a + Offset::new(3, -2, 0), b);
        assert_eq!(-Offset::new(1, 0, -1), Offset::new(-1, 0, 1));
    }

    #[test]
    fn segments_crossing_thin_rects_are_caught() {
        let wall = Rect::new(10.2, 9.0, 0.4, 2.0);
        let from = Vec2::new(10.0, 10.0);
        assert!(wall.intersects_segment(from, Vec2::new(11.0, 10.0)));
        assert!(!wall.intersects_segment(from, Vec2::new(10.1, 10.0)));
        assert!(!wall.intersects_segment(from, Vec2::new(10.0, 12.0)));
        // Diagonal passing above the wall's top edge.
        assert!(!wall.intersects_segment(Vec2::new(9.5, 10.5), Vec2::new(11.0, 12.0)));
        assert!(wall.intersects_segment(Vec2::new(9.0, 12.0), Vec2::new(12.0, 9.0)));
    }

    #[test]
    fn rect_contains_its_edges() {
        let rect = Rect::new(10.0, 10.0, 5.0, 2.0);
        assert!(rect.contains(Vec2::new(10.0, 10.0)));
        assert!(rect.contains(Vec2::new(15.0, 12.0)));
        assert!(!rect.contains(Vec2::new(15.1, 11.0)));
        assert_eq!(rect.center(), Vec2::new(12.5, 11.0));
    }
}
