//! Planar geometry for the sector RRT: bounds, circular obstacles and
//! discretized segment collision checks.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A point in the planning plane
pub type Point = Point2<f64>;

/// Default number of evenly spaced samples used when checking a segment
pub const DEFAULT_COLLISION_SAMPLES: usize = 10;

/// Axis-aligned rectangular planning region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Bounds {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// True when both extents are finite and strictly positive.
    ///
    /// Finite corners are not enough: `x_max - x_min` can still overflow.
    pub fn is_valid(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_min < self.x_max
            && self.y_min < self.y_max
            && self.width().is_finite()
            && self.height().is_finite()
    }

    /// Inclusive containment test
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(0.0, 0.0, 10.0, 10.0)
    }
}

/// A circular obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleObstacle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl CircleObstacle {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Inclusive: a point exactly on the rim is inside
    pub fn contains(&self, p: &Point) -> bool {
        nalgebra::distance_squared(&self.center(), p) <= self.radius * self.radius
    }
}

/// Check a straight segment against a set of obstacles.
///
/// The segment is discretized into `samples` evenly spaced points including
/// both endpoints. Any sampled point inside an obstacle (rim inclusive) is a
/// collision. Obstacles thinner than the sampling pitch can slip between two
/// samples, so callers should keep segment length small relative to the
/// smallest obstacle radius.
pub fn segment_collides(
    p1: &Point,
    p2: &Point,
    obstacles: &[CircleObstacle],
    samples: usize,
) -> bool {
    if obstacles.is_empty() {
        return false;
    }
    let samples = samples.max(2);
    let delta = p2 - p1;
    (0..samples).any(|i| {
        let t = i as f64 / (samples - 1) as f64;
        let p = p1 + delta * t;
        obstacles.iter().any(|obs| obs.contains(&p))
    })
}

/// Convenience inverse of [`segment_collides`]
pub fn is_collision_free(
    p1: &Point,
    p2: &Point,
    obstacles: &[CircleObstacle],
    samples: usize,
) -> bool {
    !segment_collides(p1, p2, obstacles, samples)
}

/// Index of the first obstacle containing `p`, if any
pub fn point_in_obstacle(p: &Point, obstacles: &[CircleObstacle]) -> Option<usize> {
    obstacles.iter().position(|obs| obs.contains(p))
}

/// Bearing from `from` to `to` in degrees, 0 along +x, counter-clockwise
pub fn bearing_deg(from: &Point, to: &Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).to_degrees()
}

/// Wrap an angle in degrees into `[0, 360)`
pub fn normalize_angle_deg(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
