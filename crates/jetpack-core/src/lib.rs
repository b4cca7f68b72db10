pub mod agent;
pub mod arbitration;
pub mod city;
pub mod collision;
pub mod config;
pub mod emergency;
pub mod error;
pub mod events;
pub mod geometry;
pub mod models;
pub mod parking;
pub mod simulation;
pub mod terrain;
pub mod weather;

pub use agent::{FlightAgent, InstructionSink, LandingPlan};
pub use arbitration::{advance, resolve_speed, resolve_target, MotionStep, ResolvedTarget, TargetSource};
pub use city::{City, CityLayout};
pub use collision::{CollisionDetector, Proximity, ProximityTier, SweepOutcome};
pub use config::{HazardMultipliers, LandSearch, LandingFallback, ProximityThresholds, SimulationConfig};
pub use emergency::{EmergencyHandler, EmergencyOutcome};
pub use error::{ConfigError, InstructionError, TerrainError};
pub use events::{SimEvent, TickReport};
pub use geometry::{MapBounds, Point};
pub use models::{
    AccidentRecord, AccidentSeverity, AgentId, AgentStatus, Hazard, HazardFlags, ParkingPhase,
    ParkingSlot, SlotId,
};
pub use parking::{ParkingLifecycle, ParkingRegistry, ParkingTransition};
pub use simulation::{AgentSnapshot, Instruction, Simulation, SimulationSnapshot};
pub use terrain::{TerrainKind, TerrainOracle, TerrainRaster, TerrainSurface};
pub use weather::{WeatherCondition, WeatherModel, WeatherState, UNSAFE_SEVERITY};
