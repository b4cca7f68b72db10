//! Planar geometry helpers shared by the flight core.
//!
//! All coordinates are map units in a flat 2D city frame, origin at the
//! top-left corner of the map.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remaining distances below this snap onto the target.
const SNAP_TOLERANCE: f64 = 1e-9;

/// A point on the city map.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle of the vector from `self` to `other`, in radians (atan2 convention).
    pub fn angle_to(&self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Linear interpolation; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Offset by `radius` along `angle_rad`.
    pub fn offset_polar(&self, radius: f64, angle_rad: f64) -> Point {
        Point::new(
            self.x + radius * angle_rad.cos(),
            self.y + radius * angle_rad.sin(),
        )
    }

    /// Step from `self` toward `target` by at most `step` units.
    ///
    /// Never overshoots: if the target is closer than `step` the target
    /// itself is returned.
    pub fn move_toward(&self, target: Point, step: f64) -> Point {
        if step <= 0.0 {
            return *self;
        }
        let distance = self.distance(target);
        if distance <= step + SNAP_TOLERANCE {
            return target;
        }
        Point::new(
            self.x + (target.x - self.x) / distance * step,
            self.y + (target.y - self.y) / distance * step,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Playable extent of the city map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub width: f64,
    pub height: f64,
    /// Border strip excluded from landing searches and random destinations.
    #[serde(default)]
    pub edge_margin: f64,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 1000.0,
            edge_margin: 20.0,
        }
    }
}

impl MapBounds {
    pub fn new(width: f64, height: f64, edge_margin: f64) -> Self {
        Self {
            width,
            height,
            edge_margin,
        }
    }

    /// True when the point lies on the map (margins ignored).
    pub fn contains(&self, point: Point) -> bool {
        point.is_finite()
            && point.x >= 0.0
            && point.y >= 0.0
            && point.x <= self.width
            && point.y <= self.height
    }

    /// True when the point lies inside the map shrunk by the edge margin.
    pub fn contains_inner(&self, point: Point) -> bool {
        point.is_finite()
            && point.x >= self.edge_margin
            && point.y >= self.edge_margin
            && point.x <= self.width - self.edge_margin
            && point.y <= self.height - self.edge_margin
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Inner rectangle as `(min, max)` corners.
    pub fn inner_extent(&self) -> (Point, Point) {
        (
            Point::new(self.edge_margin, self.edge_margin),
            Point::new(
                (self.width - self.edge_margin).max(self.edge_margin),
                (self.height - self.edge_margin).max(self.edge_margin),
            ),
        )
    }
}
