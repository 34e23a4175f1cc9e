//! Geometric primitives shared across the world model.
//!
//! Map geometry is authored on an integer lattice (`Point`), while the
//! simulation itself runs on continuous coordinates (`Vec2`). One map unit
//! corresponds to one tile; time is handled elsewhere in milliseconds.

use serde::{Deserialize, Serialize};

/// Integer lattice point used by map-authored geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Width and height of a map-authored rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

/// Axis-aligned rectangle anchored at its top-left lattice point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub position: Point,
    pub size: Size,
}

/// Rendering offset attached to delivery offices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

/// Continuous 2D coordinate; doubles as a velocity in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The lattice cell this position rounds to.
    pub fn nearest_cell(self) -> Point {
        Point {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
        }
    }
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(f64::from(p.x), f64::from(p.y))
    }
}

/// Compass direction a dog is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

impl Direction {
    /// One-letter form used by the HTTP API.
    pub fn as_letter(self) -> &'static str {
        match self {
            Direction::North => "U",
            Direction::South => "D",
            Direction::West => "L",
            Direction::East => "R",
        }
    }

    pub fn from_letter(letter: &str) -> Option<Direction> {
        match letter {
            "U" => Some(Direction::North),
            "D" => Some(Direction::South),
            "L" => Some(Direction::West),
            "R" => Some(Direction::East),
            _ => None,
        }
    }

    /// Velocity vector for a dog facing this way at the given speed.
    pub fn velocity(self, speed: f64) -> Vec2 {
        match self {
            Direction::North => Vec2::new(0.0, -speed),
            Direction::South => Vec2::new(0.0, speed),
            Direction::West => Vec2::new(-speed, 0.0),
            Direction::East => Vec2::new(speed, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_cell_rounds_to_closest_lattice_point() {
        assert_eq!(Vec2::new(4.9, 0.2).nearest_cell(), Point { x: 5, y: 0 });
        assert_eq!(Vec2::new(-0.4, 1.5).nearest_cell(), Point { x: 0, y: 2 });
    }

    #[test]
    fn direction_letters_roundtrip() {
        for dir in [
            Direction::North,
            Direction::South,
            Direction::West,
            Direction::East,
        ] {
            assert_eq!(Direction::from_letter(dir.as_letter()), Some(dir));
        }
        assert_eq!(Direction::from_letter("X"), None);
    }

    #[test]
    fn velocity_points_along_the_facing_axis() {
        assert_eq!(Direction::North.velocity(2.0), Vec2::new(0.0, -2.0));
        assert_eq!(Direction::East.velocity(0.5), Vec2::new(0.5, 0.0));
    }
}
