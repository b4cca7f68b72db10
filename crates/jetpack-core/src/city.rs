//! Demo city generator: a coastline with a bay, a grid of landing pads on
//! dry land, and a fleet of jetpacks with random land-to-land trips.

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::geometry::{MapBounds, Point};
use crate::simulation::Simulation;
use crate::terrain::{TerrainKind, TerrainRaster, TerrainSurface};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MAX_PLACEMENT_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CityLayout {
    pub bounds: MapBounds,
    /// Terrain raster resolution
    pub cell_size: f64,
    pub bay_center: Point,
    pub bay_radius: f64,
    /// Distance between neighboring landing pads
    pub slot_spacing: f64,
    pub agent_count: usize,
    pub speed_range: (f64, f64),
    pub seed: u64,
}

impl Default for CityLayout {
    fn default() -> Self {
        Self::for_bounds(MapBounds::default())
    }
}

impl CityLayout {
    /// Default layout scaled to `bounds`: the bay sits in the south-east corner.
    pub fn for_bounds(bounds: MapBounds) -> Self {
        Self {
            bay_center: Point::new(bounds.width * 0.85, bounds.height * 0.8),
            bay_radius: bounds.height * 0.35,
            bounds,
            cell_size: 10.0,
            slot_spacing: 160.0,
            agent_count: 40,
            speed_range: (2.0, 6.0),
            seed: 42,
        }
    }
}

/// Generated city ready to seed a simulation.
#[derive(Debug, Clone)]
pub struct City {
    pub terrain: TerrainRaster,
    pub slots: Vec<Point>,
    /// `(origin, destination, base_speed)` per agent
    pub fleet: Vec<(Point, Point, f64)>,
}

impl CityLayout {
    pub fn build(&self) -> City {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let cols = (self.bounds.width / self.cell_size).ceil() as usize;
        let rows = (self.bounds.height / self.cell_size).ceil() as usize;
        let mut terrain = TerrainRaster::filled(cols, rows, self.cell_size, TerrainKind::Land);
        terrain.paint_circle(self.bay_center, self.bay_radius, TerrainKind::Water);

        let (min, max) = self.bounds.inner_extent();
        let spacing = self.slot_spacing.max(self.cell_size);
        let mut slots = Vec::new();
        let mut y = min.y + spacing / 2.0;
        while y < max.y {
            let mut x = min.x + spacing / 2.0;
            while x < max.x {
                let pad = Point::new(x, y);
                if terrain.classify(pad) == TerrainKind::Land {
                    slots.push(pad);
                }
                x += spacing;
            }
            y += spacing;
        }

        let (low, high) = self.speed_range;
        let fleet = (0..self.agent_count)
            .map(|_| {
                let origin = self.random_land_point(&terrain, &mut rng);
                let destination = self.random_land_point(&terrain, &mut rng);
                let speed = if high > low {
                    rng.random_range(low..high)
                } else {
                    low
                };
                (origin, destination, speed)
            })
            .collect();

        City {
            terrain,
            slots,
            fleet,
        }
    }

    fn random_land_point(&self, terrain: &TerrainRaster, rng: &mut StdRng) -> Point {
        let (min, max) = self.bounds.inner_extent();
        let mut candidate = self.bounds.center();
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            candidate = Point::new(
                rng.random_range(min.x..=max.x),
                rng.random_range(min.y..=max.y),
            );
            if terrain.classify(candidate) == TerrainKind::Land {
                break;
            }
        }
        candidate
    }

    /// Build the city and a simulation populated with its fleet.
    pub fn populate(&self, mut config: SimulationConfig) -> Result<Simulation, ConfigError> {
        config.bounds = self.bounds;
        let city = self.build();
        let mut simulation = Simulation::new(config, Arc::new(city.terrain), city.slots)?;
        for (origin, destination, speed) in city.fleet {
            simulation.spawn_agent(origin, destination, speed);
        }
        tracing::info!(
            "City populated: {} agents, {} parking slots",
            simulation.agents().len(),
            simulation.registry().len()
        );
        Ok(simulation)
    }
}
