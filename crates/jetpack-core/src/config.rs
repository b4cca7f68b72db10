//! Simulation tuning parameters.

use crate::error::ConfigError;
use crate::geometry::MapBounds;
use serde::{Deserialize, Serialize};

/// Distance tiers used by the collision sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityThresholds {
    /// Below this distance two agents collide
    pub accident: f64,
    /// Below this distance a critical proximity is reported
    pub critical: f64,
    /// Below this distance a warning is reported
    pub warning: f64,
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self {
            accident: 20.0,
            critical: 50.0,
            warning: 100.0,
        }
    }
}

/// Speed multipliers applied per active hazard; the most restrictive wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardMultipliers {
    pub inclement_weather: f64,
    pub building_collapse: f64,
    pub accident_hazard: f64,
    pub restricted_activity: f64,
}

impl Default for HazardMultipliers {
    fn default() -> Self {
        Self {
            inclement_weather: 0.5,
            building_collapse: 0.5,
            accident_hazard: 0.5,
            restricted_activity: 0.5,
        }
    }
}

/// What the emergency handler does when the land search comes up empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingFallback {
    /// Use the map center as the provisional landing point
    #[default]
    MapCenter,
    /// Keep the agent's current position as the provisional landing point
    HoldPosition,
}

/// Spiral land-search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandSearch {
    /// Radius increment between rings
    pub radius_step: f64,
    /// Angular increment within a ring, in degrees
    pub angle_step_deg: f64,
    /// Largest ring radius tried
    pub max_radius: f64,
    pub fallback: LandingFallback,
}

impl Default for LandSearch {
    fn default() -> Self {
        Self {
            radius_step: 10.0,
            angle_step_deg: 15.0,
            max_radius: 500.0,
            fallback: LandingFallback::MapCenter,
        }
    }
}

/// Complete configuration of a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub bounds: MapBounds,
    /// Wall-clock duration of one tick in milliseconds
    pub tick_interval_ms: u64,
    /// Weather changes once every this many milliseconds
    pub weather_interval_ms: u64,
    pub proximity: ProximityThresholds,
    pub hazards: HazardMultipliers,
    /// A target counts as reached below this distance
    pub arrival_epsilon: f64,
    /// Altitude change per tick toward a radio altitude
    pub climb_rate: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub cruise_altitude: f64,
    pub land_search: LandSearch,
    /// Emergency landings only consider slots within this radius
    pub slot_search_radius: f64,
    /// Dwell range on a parking slot, in ticks (inclusive)
    pub dwell_ticks: (u32, u32),
    /// Motion runs on the rayon pool once the fleet reaches this size
    pub parallel_threshold: usize,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            bounds: MapBounds::default(),
            tick_interval_ms: 50,
            weather_interval_ms: 10_000,
            proximity: ProximityThresholds::default(),
            hazards: HazardMultipliers::default(),
            arrival_epsilon: 1.0,
            climb_rate: 1.0,
            min_altitude: 0.0,
            max_altitude: 300.0,
            cruise_altitude: 60.0,
            land_search: LandSearch::default(),
            slot_search_radius: 2_000.0,
            dwell_ticks: (100, 400),
            parallel_threshold: 64,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.proximity;
        if !(p.accident > 0.0 && p.accident < p.critical && p.critical < p.warning)
            || !p.warning.is_finite()
        {
            return Err(ConfigError::ThresholdOrder);
        }

        let positives = [
            ("bounds.width", self.bounds.width),
            ("bounds.height", self.bounds.height),
            ("arrival_epsilon", self.arrival_epsilon),
            ("climb_rate", self.climb_rate),
            ("land_search.radius_step", self.land_search.radius_step),
            ("land_search.angle_step_deg", self.land_search.angle_step_deg),
            ("land_search.max_radius", self.land_search.max_radius),
            ("slot_search_radius", self.slot_search_radius),
        ];
        for (name, value) in positives {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NonPositive(name));
            }
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::NonPositive("tick_interval_ms"));
        }
        if self.weather_interval_ms == 0 {
            return Err(ConfigError::NonPositive("weather_interval_ms"));
        }

        let multipliers = [
            ("inclement_weather", self.hazards.inclement_weather),
            ("building_collapse", self.hazards.building_collapse),
            ("accident_hazard", self.hazards.accident_hazard),
            ("restricted_activity", self.hazards.restricted_activity),
        ];
        for (name, value) in multipliers {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::MultiplierRange(name));
            }
        }

        let (min_dwell, max_dwell) = self.dwell_ticks;
        if min_dwell == 0 || min_dwell > max_dwell {
            return Err(ConfigError::DwellRange(min_dwell, max_dwell));
        }
        if self.min_altitude > self.max_altitude {
            return Err(ConfigError::AltitudeRange(self.min_altitude, self.max_altitude));
        }

        Ok(())
    }
}
