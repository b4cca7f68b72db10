//! Error types surfaced by the flight core.
//!
//! None of these escape the tick loop: they are returned at the
//! instruction boundary or resolved by an explicit fallback.

use crate::geometry::Point;
use crate::models::AgentId;
use thiserror::Error;

/// Rejection of an external radio instruction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstructionError {
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),
    #[error("point {0} is outside the map")]
    OutOfBounds(Point),
    #[error("altitude {0} outside allowed range {1}..={2}")]
    InvalidAltitude(f64, f64, f64),
    #[error("agent {0} is parked")]
    AgentParked(AgentId),
    #[error("agent {0} is handling an emergency")]
    AgentInEmergency(AgentId),
}

/// Failure of the spiral land search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("no land within {max_radius} units of {origin}")]
    NoLandWithin { origin: Point, max_radius: f64 },
}

/// Invalid simulation configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("proximity thresholds must be finite and satisfy 0 < accident < critical < warning")]
    ThresholdOrder,
    #[error("{0} must be positive and finite")]
    NonPositive(&'static str),
    #[error("hazard multiplier {0} must be within 0..=1")]
    MultiplierRange(&'static str),
    #[error("dwell range {0}..={1} is empty")]
    DwellRange(u32, u32),
    #[error("altitude range {0}..={1} is empty")]
    AltitudeRange(f64, f64),
}
