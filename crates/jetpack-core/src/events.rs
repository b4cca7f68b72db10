//! Notifications handed to the logging collaborator.

use crate::collision::Proximity;
use crate::emergency::EmergencyOutcome;
use crate::models::{AccidentRecord, AgentId};
use crate::parking::ParkingTransition;
use crate::weather::WeatherState;
use serde::{Deserialize, Serialize};

/// Fire-and-forget event emitted by a simulation tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimEvent {
    Proximity(Proximity),
    Accident(AccidentRecord),
    Emergency(EmergencyOutcome),
    Parking(ParkingTransition),
    WeatherChanged(WeatherState),
    /// A landing slot claim was lost to another agent; the loser retries
    ClaimLost { agent: AgentId },
}

/// Events produced by one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<SimEvent>,
}

impl TickReport {
    pub fn accidents(&self) -> impl Iterator<Item = &AccidentRecord> {
        self.events.iter().filter_map(|event| match event {
            SimEvent::Accident(record) => Some(record),
            _ => None,
        })
    }

    pub fn parking_transitions(&self) -> impl Iterator<Item = &ParkingTransition> {
        self.events.iter().filter_map(|event| match event {
            SimEvent::Parking(transition) => Some(transition),
            _ => None,
        })
    }
}
