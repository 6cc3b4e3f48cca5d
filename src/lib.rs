//! Region Quadtree.
//! # Contracts:
//! - A node holds at most `quadtree::CAPACITY` points of its own, except leaves at
//!   `quadtree::MAX_DEPTH` which keep the surplus in an overflow list
//! - Points are never moved once stored
//!
pub mod error;
pub mod quadtree;
pub mod spawner;

pub use error::{Error, Result};

use std::ops::{Add, AddAssign, Deref, Div, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate(pub [f64; 2]);

impl AddAssign for Coordinate {
    fn add_assign(&mut self, p: Self) {
        self.0[0] += p.0[0];
        self.0[1] += p.0[1];
    }
}

impl Deref for Coordinate {
    type Target = [f64; 2];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Add for Coordinate {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sub for Coordinate {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self([self[0] - rhs[0], self[1] - rhs[1]])
    }
}

impl Mul for Coordinate {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self([self[0] * rhs[0], self[1] * rhs[1]])
    }
}

impl Div for Coordinate {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self([self[0] / rhs[0], self[1] / rhs[1]])
    }
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self([x, y])
    }

    pub fn x(&self) -> f64 {
        self[0]
    }

    pub fn y(&self) -> f64 {
        self[1]
    }
}

/// Axis aligned square given by its center and half of its side length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSquare {
    pub center: Coordinate,
    pub half_dimension: f64,
}

impl BoundingSquare {
    pub fn new(center: Coordinate, half_dimension: f64) -> Self {
        Self {
            center,
            half_dimension,
        }
    }

    /// Lower left corner
    pub fn min(&self) -> Coordinate {
        let h = self.half_dimension;
        self.center - Coordinate::new(h, h)
    }

    /// Upper right corner
    pub fn max(&self) -> Coordinate {
        let h = self.half_dimension;
        self.center + Coordinate::new(h, h)
    }

    /// Inclusive on every edge, so points on a shared edge are contained by both neighbours.
    pub fn contains_point(&self, point: &Coordinate) -> bool {
        let [cx, cy] = *self.center;
        let h = self.half_dimension;
        let [x, y] = **point;

        cx - h <= x && x <= cx + h && cy - h <= y && y <= cy + h
    }

    /// Closed interval overlap on both axes. Touching squares intersect.
    pub fn intersects(&self, other: &BoundingSquare) -> bool {
        let [from, to] = [self.min(), self.max()];
        let [ofrom, oto] = [other.min(), other.max()];

        if to[0] < ofrom[0] || from[0] > oto[0] {
            return false;
        }
        if to[1] < ofrom[1] || from[1] > oto[1] {
            return false;
        }
        true
    }

    /// The four equal sub-squares in NW, NE, SW, SE order.
    pub fn quadrants(&self) -> [BoundingSquare; 4] {
        let quarter = self.half_dimension / 2.0;
        let at = |dx: f64, dy: f64| {
            Self::new(self.center + Coordinate::new(dx, dy), quarter)
        };

        [
            at(-quarter, quarter),
            at(quarter, quarter),
            at(-quarter, -quarter),
            at(quarter, -quarter),
        ]
    }
}
