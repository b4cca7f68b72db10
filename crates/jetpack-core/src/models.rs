//! Core data models shared across the flight core.

use crate::geometry::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a flight agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JP{:03}", self.0)
    }
}

/// Identifier of a parking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:03}", self.0)
    }
}

/// Flight status as seen by operators and the rendering layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    /// Flying its normal route
    #[default]
    Active,
    /// Flying toward a radio-issued destination
    FollowingInstruction,
    /// Flying a detour sequence
    Detour,
    /// Stopped in place after an accident or emergency call
    EmergencyHalt,
    /// Routed to a safe landing slot
    EmergencyLanding,
    /// Resting on a parking slot
    Parked,
}

impl AgentStatus {
    pub fn is_emergency(self) -> bool {
        matches!(self, AgentStatus::EmergencyHalt | AgentStatus::EmergencyLanding)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentStatus::Active => "ACTIVE",
            AgentStatus::FollowingInstruction => "FOLLOWING_INSTRUCTION",
            AgentStatus::Detour => "DETOUR",
            AgentStatus::EmergencyHalt => "EMERGENCY_HALT",
            AgentStatus::EmergencyLanding => "EMERGENCY_LANDING",
            AgentStatus::Parked => "PARKED",
        };
        f.pad(label)
    }
}

/// Position of an agent in the rest/park/depart cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkingPhase {
    #[default]
    EnRoute,
    Arriving,
    Parked,
    Departing,
}

impl fmt::Display for ParkingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParkingPhase::EnRoute => "EN_ROUTE",
            ParkingPhase::Arriving => "ARRIVING",
            ParkingPhase::Parked => "PARKED",
            ParkingPhase::Departing => "DEPARTING",
        };
        f.pad(label)
    }
}

/// Independent hazard conditions pushed onto an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardFlags {
    pub inclement_weather: bool,
    pub building_collapse: bool,
    pub accident_hazard: bool,
    pub restricted_activity: bool,
    pub emergency_halt: bool,
}

/// Names a single hazard flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hazard {
    InclementWeather,
    BuildingCollapse,
    AccidentHazard,
    RestrictedActivity,
    EmergencyHalt,
}

impl HazardFlags {
    pub fn get(&self, hazard: Hazard) -> bool {
        match hazard {
            Hazard::InclementWeather => self.inclement_weather,
            Hazard::BuildingCollapse => self.building_collapse,
            Hazard::AccidentHazard => self.accident_hazard,
            Hazard::RestrictedActivity => self.restricted_activity,
            Hazard::EmergencyHalt => self.emergency_halt,
        }
    }

    pub fn set(&mut self, hazard: Hazard, value: bool) {
        match hazard {
            Hazard::InclementWeather => self.inclement_weather = value,
            Hazard::BuildingCollapse => self.building_collapse = value,
            Hazard::AccidentHazard => self.accident_hazard = value,
            Hazard::RestrictedActivity => self.restricted_activity = value,
            Hazard::EmergencyHalt => self.emergency_halt = value,
        }
    }

    pub fn any(&self) -> bool {
        self.inclement_weather
            || self.building_collapse
            || self.accident_hazard
            || self.restricted_activity
            || self.emergency_halt
    }
}

/// A landing pad agents can rest on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingSlot {
    pub id: SlotId,
    pub position: Point,
    pub occupied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccidentSeverity {
    Minor,
    Major,
    Severe,
}

/// An accident created by the collision sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccidentRecord {
    pub id: u64,
    pub position: Point,
    pub severity: AccidentSeverity,
    pub timestamp: DateTime<Utc>,
    /// Simulation tick the accident occurred on
    pub tick: u64,
    /// Involved agents, lower id first
    pub agents: (AgentId, AgentId),
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hazard_flags_get_set() {
        let mut flags = HazardFlags::default();
        assert!(!flags.any());

        flags.set(Hazard::BuildingCollapse, true);
        assert!(flags.get(Hazard::BuildingCollapse));
        assert!(flags.any());

        flags.set(Hazard::BuildingCollapse, false);
        assert!(!flags.any());
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&AgentStatus::EmergencyLanding).unwrap();
        assert_eq!(json, "\"EMERGENCY_LANDING\"");
        assert_eq!(AgentStatus::FollowingInstruction.to_string(), "FOLLOWING_INSTRUCTION");
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(AgentId(7).to_string(), "JP007");
        assert_eq!(SlotId(12).to_string(), "P012");
    }
}
