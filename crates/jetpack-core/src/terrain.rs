//! Water/land classification and the spiral land search.
//!
//! The classification surface itself belongs to the map provider; the core
//! only needs a predicate over map coordinates.

use crate::config::LandSearch;
use crate::error::TerrainError;
use crate::geometry::{MapBounds, Point};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainKind {
    Water,
    Land,
}

/// Backing land/water surface supplied by the map provider.
pub trait TerrainSurface: Send + Sync {
    fn classify(&self, point: Point) -> TerrainKind;
}

impl<F> TerrainSurface for F
where
    F: Fn(Point) -> TerrainKind + Send + Sync,
{
    fn classify(&self, point: Point) -> TerrainKind {
        self(point)
    }
}

/// Cell raster over the map; cells are `cell_size` units square.
///
/// Points outside the raster classify as land.
#[derive(Debug, Clone)]
pub struct TerrainRaster {
    cell_size: f64,
    cols: usize,
    rows: usize,
    cells: Vec<TerrainKind>,
}

impl TerrainRaster {
    /// Raster of uniform terrain.
    pub fn filled(cols: usize, rows: usize, cell_size: f64, kind: TerrainKind) -> Self {
        Self {
            cell_size: cell_size.max(f64::EPSILON),
            cols,
            rows,
            cells: vec![kind; cols * rows],
        }
    }

    /// Build from text rows; `~` is water, anything else is land.
    ///
    /// Short rows are padded with land.
    pub fn from_rows<S: AsRef<str>>(rows: &[S], cell_size: f64) -> Self {
        let cols = rows
            .iter()
            .map(|row| row.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        let mut raster = Self::filled(cols, rows.len(), cell_size, TerrainKind::Land);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.as_ref().chars().enumerate() {
                if ch == '~' {
                    raster.cells[row * cols + col] = TerrainKind::Water;
                }
            }
        }
        raster
    }

    /// Paint a filled circle of the given terrain.
    pub fn paint_circle(&mut self, center: Point, radius: f64, kind: TerrainKind) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell_center = Point::new(
                    (col as f64 + 0.5) * self.cell_size,
                    (row as f64 + 0.5) * self.cell_size,
                );
                if cell_center.distance(center) <= radius {
                    self.cells[row * self.cols + col] = kind;
                }
            }
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn water_fraction(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let water = self
            .cells
            .iter()
            .filter(|kind| **kind == TerrainKind::Water)
            .count();
        water as f64 / self.cells.len() as f64
    }
}

impl TerrainSurface for TerrainRaster {
    fn classify(&self, point: Point) -> TerrainKind {
        if !point.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return TerrainKind::Land;
        }
        let col = (point.x / self.cell_size).floor() as usize;
        let row = (point.y / self.cell_size).floor() as usize;
        if col >= self.cols || row >= self.rows {
            return TerrainKind::Land;
        }
        self.cells[row * self.cols + col]
    }
}

/// Water/land oracle consulted by the emergency handler.
#[derive(Clone)]
pub struct TerrainOracle {
    surface: Arc<dyn TerrainSurface>,
    bounds: MapBounds,
    search: LandSearch,
}

impl TerrainOracle {
    pub fn new(surface: Arc<dyn TerrainSurface>, bounds: MapBounds, search: LandSearch) -> Self {
        Self {
            surface,
            bounds,
            search,
        }
    }

    /// Oracle over a map with no water at all.
    pub fn all_land(bounds: MapBounds, search: LandSearch) -> Self {
        Self::new(Arc::new(|_: Point| TerrainKind::Land), bounds, search)
    }

    pub fn is_water(&self, point: Point) -> bool {
        self.surface.classify(point) == TerrainKind::Water
    }

    pub fn search(&self) -> &LandSearch {
        &self.search
    }

    /// Nearest land point found by an expanding spiral scan.
    ///
    /// Rings grow by `radius_step` up to `max_radius`; within each ring the
    /// angle sweeps from 0 in `angle_step_deg` increments. Candidates outside
    /// the map's inner extent are skipped.
    pub fn find_nearest_land(&self, origin: Point, max_radius: f64) -> Result<Point, TerrainError> {
        if !self.is_water(origin) {
            return Ok(origin);
        }

        let step = self.search.radius_step.max(f64::EPSILON);
        let angle_step = self.search.angle_step_deg.clamp(0.1, 360.0).to_radians();
        let samples = (std::f64::consts::TAU / angle_step).round().max(1.0) as usize;

        let mut ring = 1usize;
        loop {
            let radius = step * ring as f64;
            if radius > max_radius {
                break;
            }
            for k in 0..samples {
                let candidate = origin.offset_polar(radius, angle_step * k as f64);
                if !self.bounds.contains_inner(candidate) {
                    continue;
                }
                if !self.is_water(candidate) {
                    return Ok(candidate);
                }
            }
            ring += 1;
        }

        Err(TerrainError::NoLandWithin { origin, max_radius })
    }
}

impl std::fmt::Debug for TerrainOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainOracle")
            .field("bounds", &self.bounds)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle(surface: impl TerrainSurface + 'static) -> TerrainOracle {
        TerrainOracle::new(
            Arc::new(surface),
            MapBounds::new(1000.0, 1000.0, 10.0),
            LandSearch::default(),
        )
    }

    #[test]
    fn test_raster_from_rows() {
        let raster = TerrainRaster::from_rows(&["..~~", ".~~~"], 10.0);
        assert_eq!(raster.dimensions(), (4, 2));
        assert_eq!(raster.classify(Point::new(5.0, 5.0)), TerrainKind::Land);
        assert_eq!(raster.classify(Point::new(25.0, 5.0)), TerrainKind::Water);
        assert_eq!(raster.classify(Point::new(15.0, 15.0)), TerrainKind::Water);
        // off-raster is land
        assert_eq!(raster.classify(Point::new(500.0, 5.0)), TerrainKind::Land);
        assert!((raster.water_fraction() - 5.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_land_origin_is_returned_as_is() {
        let oracle = oracle(|_: Point| TerrainKind::Land);
        let origin = Point::new(300.0, 300.0);
        assert_eq!(oracle.find_nearest_land(origin, 100.0), Ok(origin));
    }

    #[test]
    fn test_spiral_finds_land_within_one_step() {
        // Land for x >= 437, water elsewhere: nearest land is 137 units east.
        let shore = 437.0;
        let oracle = oracle(move |p: Point| {
            if p.x >= shore {
                TerrainKind::Land
            } else {
                TerrainKind::Water
            }
        });
        let origin = Point::new(300.0, 500.0);
        let expected = shore - origin.x;

        let land = oracle.find_nearest_land(origin, 500.0).unwrap();
        let found = origin.distance(land);
        assert!(!oracle.is_water(land));
        assert!(found >= expected);
        assert!(found - expected <= oracle.search().radius_step);
    }

    #[test]
    fn test_spiral_skips_candidates_outside_inner_bounds() {
        // Only the area beyond the map edge is "land"; it must never be returned.
        let oracle = oracle(|p: Point| {
            if p.x < 5.0 {
                TerrainKind::Land
            } else {
                TerrainKind::Water
            }
        });
        let result = oracle.find_nearest_land(Point::new(50.0, 500.0), 200.0);
        assert_eq!(
            result,
            Err(TerrainError::NoLandWithin {
                origin: Point::new(50.0, 500.0),
                max_radius: 200.0
            })
        );
    }

    #[test]
    fn test_spiral_exhaustion_on_open_water() {
        let oracle = oracle(|_: Point| TerrainKind::Water);
        assert!(oracle.find_nearest_land(Point::new(500.0, 500.0), 50.0).is_err());
    }

    #[test]
    fn test_painted_island_is_found() {
        let mut raster = TerrainRaster::filled(100, 100, 10.0, TerrainKind::Water);
        raster.paint_circle(Point::new(700.0, 500.0), 40.0, TerrainKind::Land);
        let oracle = oracle(raster);

        let land = oracle.find_nearest_land(Point::new(500.0, 500.0), 400.0).unwrap();
        assert!(!oracle.is_water(land));
        assert!(land.distance(Point::new(700.0, 500.0)) <= 50.0);
    }
}
