//! Per-jetpack flight state.

use crate::error::InstructionError;
use crate::geometry::Point;
use crate::models::{AgentId, AgentStatus, HazardFlags, ParkingPhase, SlotId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Landing decision taken by the emergency handler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandingPlan {
    /// Safe (land) point the agent heads to first
    pub provisional: Point,
    /// Slot chosen near the provisional point, if any was free
    pub slot: Option<SlotId>,
}

/// A single simulated jetpack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightAgent {
    pub id: AgentId,
    pub callsign: String,
    pub position: Point,
    pub altitude: f64,
    pub base_speed: f64,
    /// Speed used on the last tick, derived from `base_speed` and hazards
    pub effective_speed: f64,
    pub destination: Point,
    pub waypoints: VecDeque<Point>,
    pub detour: VecDeque<Point>,
    pub radio_destination: Option<Point>,
    pub radio_altitude: Option<f64>,
    pub hazards: HazardFlags,
    pub status: AgentStatus,
    pub parking: ParkingPhase,
    pub parked_slot: Option<SlotId>,
    /// Ticks left on the current parking dwell
    pub dwell_remaining: u32,
    pub landing: Option<LandingPlan>,
}

impl FlightAgent {
    pub fn new(
        id: AgentId,
        callsign: impl Into<String>,
        origin: Point,
        destination: Point,
        base_speed: f64,
    ) -> Self {
        let base_speed = base_speed.max(0.0);
        Self {
            id,
            callsign: callsign.into(),
            position: origin,
            altitude: 0.0,
            base_speed,
            effective_speed: base_speed,
            destination,
            waypoints: VecDeque::new(),
            detour: VecDeque::new(),
            radio_destination: None,
            radio_altitude: None,
            hazards: HazardFlags::default(),
            status: AgentStatus::Active,
            parking: ParkingPhase::EnRoute,
            parked_slot: None,
            dwell_remaining: 0,
            landing: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_waypoints(mut self, waypoints: impl IntoIterator<Item = Point>) -> Self {
        self.waypoints = waypoints.into_iter().collect();
        self
    }

    pub fn is_parked(&self) -> bool {
        self.status == AgentStatus::Parked
    }

    /// Replace the final destination, keeping queued waypoints.
    pub fn set_destination(&mut self, destination: Point) {
        self.destination = destination;
        self.leave_arrival();
    }

    /// Queue a detour; it takes priority over waypoints once set.
    pub fn set_detour(&mut self, points: impl IntoIterator<Item = Point>) {
        self.detour = points.into_iter().collect();
        if !self.detour.is_empty() {
            self.leave_arrival();
        }
        self.refresh_status();
    }

    /// A new route while waiting for a slot means the agent has not arrived.
    fn leave_arrival(&mut self) {
        if self.parking == ParkingPhase::Arriving {
            self.parking = ParkingPhase::EnRoute;
        }
    }

    /// Stop in place: used by the collision sweep and emergency calls.
    pub fn halt(&mut self) {
        self.hazards.emergency_halt = true;
        self.status = AgentStatus::EmergencyHalt;
        self.effective_speed = 0.0;
    }

    /// Re-derive the flight status from the active authority.
    ///
    /// Emergency and parked statuses are sticky and left alone.
    pub fn refresh_status(&mut self) {
        if self.status.is_emergency() || self.status == AgentStatus::Parked {
            return;
        }
        self.status = if self.radio_destination.is_some() {
            AgentStatus::FollowingInstruction
        } else if !self.detour.is_empty() {
            AgentStatus::Detour
        } else {
            AgentStatus::Active
        };
    }

    fn accepts_instructions(&self) -> Result<(), InstructionError> {
        if self.status.is_emergency() {
            return Err(InstructionError::AgentInEmergency(self.id));
        }
        if self.status == AgentStatus::Parked {
            return Err(InstructionError::AgentParked(self.id));
        }
        Ok(())
    }
}

/// Typed entry points for radio instructions.
pub trait InstructionSink {
    fn set_radio_destination(&mut self, point: Point) -> Result<(), InstructionError>;
    fn set_radio_altitude(&mut self, altitude: f64) -> Result<(), InstructionError>;
    fn issue_emergency_landing(&mut self) -> Result<(), InstructionError>;
}

impl InstructionSink for FlightAgent {
    fn set_radio_destination(&mut self, point: Point) -> Result<(), InstructionError> {
        self.accepts_instructions()?;
        self.radio_destination = Some(point);
        self.leave_arrival();
        self.refresh_status();
        Ok(())
    }

    fn set_radio_altitude(&mut self, altitude: f64) -> Result<(), InstructionError> {
        if self.status == AgentStatus::Parked {
            return Err(InstructionError::AgentParked(self.id));
        }
        self.radio_altitude = Some(altitude);
        Ok(())
    }

    fn issue_emergency_landing(&mut self) -> Result<(), InstructionError> {
        self.accepts_instructions()?;
        self.halt();
        Ok(())
    }
}
