//! Geometry primitives.
//!
//! Integer voxel coordinates and box extents on the discrete grid, plus
//! their real-valued counterparts used at the caller's boundary.
//!
//! # Axes
//!
//! | Axis | Voxel | Dimensions | Meaning |
//! |------|-------|------------|---------|
//! | x | `x` | `width` | Side to side |
//! | y | `y` | `height` | Floor (y = 0) upwards |
//! | z | `z` | `length` | Far wall (z = 0) towards the door |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// A unit cell of the discretized truck volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Voxel {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Voxel {
    /// Creates a voxel at (x, y, z).
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// The grid origin.
    pub const fn origin() -> Self {
        Self::new(0, 0, 0)
    }

    /// The voxel directly beneath this one.
    #[inline]
    pub fn below(self) -> Self {
        self + Voxel::new(0, -1, 0)
    }
}

impl Add for Voxel {
    type Output = Voxel;

    fn add(self, other: Voxel) -> Voxel {
        Voxel::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl fmt::Display for Voxel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}, {}>", self.x, self.y, self.z)
    }
}

/// Axis-aligned integer extent on the grid.
///
/// Components are expected to be at least 1; `validation` rejects zero
/// extents before they reach the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub length: u32,
}

impl Dimensions {
    /// Creates an extent.
    pub const fn new(width: u32, height: u32, length: u32) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    /// Number of voxels covered.
    pub fn volume(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * u64::from(self.length)
    }

    /// Whether every component is at least 1.
    pub fn is_positive(&self) -> bool {
        self.width >= 1 && self.height >= 1 && self.length >= 1
    }

    /// Every voxel occupied when placed at the origin.
    pub fn voxels(&self) -> Vec<Voxel> {
        let mut voxels = Vec::with_capacity(self.volume() as usize);
        for x in 0..i64::from(self.width) {
            for y in 0..i64::from(self.height) {
                for z in 0..i64::from(self.length) {
                    voxels.push(Voxel::new(x, y, z));
                }
            }
        }
        voxels
    }

    /// Whether the voxel lies inside this extent placed at the origin.
    #[inline]
    pub fn contains(&self, voxel: &Voxel) -> bool {
        (0..i64::from(self.width)).contains(&voxel.x)
            && (0..i64::from(self.height)).contains(&voxel.y)
            && (0..i64::from(self.length)).contains(&voxel.z)
    }

    /// Whether `other` fits inside this extent along every axis.
    pub fn fits(&self, other: &Dimensions) -> bool {
        other.width <= self.width && other.height <= self.height && other.length <= self.length
    }

    /// Dense index of a contained voxel (x fastest, then z, then y).
    pub fn index_of(&self, voxel: &Voxel) -> Option<usize> {
        if !self.contains(voxel) {
            return None;
        }
        let width = i64::from(self.width);
        let length = i64::from(self.length);
        Some(((voxel.y * length + voxel.z) * width + voxel.x) as usize)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}×{}", self.width, self.height, self.length)
    }
}

/// Real-valued extent in the caller's units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
    pub length: f64,
}

impl Extent {
    /// Creates an extent.
    pub const fn new(width: f64, height: f64, length: f64) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    /// Product of the three components.
    pub fn volume(&self) -> f64 {
        self.width * self.height * self.length
    }

    /// Whether every component is finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        [self.width, self.height, self.length]
            .iter()
            .all(|c| c.is_finite() && *c > 0.0)
    }

    /// Whether `other` fits inside this extent along every axis.
    pub fn fits(&self, other: &Extent) -> bool {
        other.width <= self.width && other.height <= self.height && other.length <= self.length
    }

    /// Components as an array (width, height, length).
    pub fn to_array(self) -> [f64; 3] {
        [self.width, self.height, self.length]
    }
}

impl From<Dimensions> for Extent {
    fn from(d: Dimensions) -> Self {
        Extent::new(f64::from(d.width), f64::from(d.height), f64::from(d.length))
    }
}

impl From<[f64; 3]> for Extent {
    fn from(c: [f64; 3]) -> Self {
        Extent::new(c[0], c[1], c[2])
    }
}

/// Real-valued box origin in the caller's units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Creates a position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Components as an array (x, y, z).
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}
