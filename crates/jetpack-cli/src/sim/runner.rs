//! Headless scenario execution.

use super::scenarios::Scenario;
use jetpack_core::{
    AgentId, EmergencyOutcome, ParkingPhase, ProximityTier, SimEvent, SimulationSnapshot,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// What happened during a run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub ticks: u64,
    pub accidents: usize,
    pub emergency_routes: usize,
    pub water_routes: usize,
    pub critical_proximities: usize,
    pub parkings: usize,
    pub departures: usize,
    pub lost_claims: usize,
    /// Tick on which each agent first parked
    pub first_parked: BTreeMap<AgentId, u64>,
    pub final_state: SimulationSnapshot,
}

/// Tick `scenario` `ticks` times and tally its events.
pub fn run(mut scenario: Scenario, ticks: u64) -> ScenarioSummary {
    let mut accidents = 0;
    let mut emergency_routes = 0;
    let mut water_routes = 0;
    let mut critical_proximities = 0;
    let mut parkings = 0;
    let mut departures = 0;
    let mut lost_claims = 0;
    let mut first_parked = BTreeMap::new();

    tracing::info!("Running scenario {} for {} ticks", scenario.name, ticks);
    for _ in 0..ticks {
        let report = scenario.simulation.tick();
        for event in &report.events {
            match event {
                SimEvent::Accident(record) => {
                    accidents += 1;
                    tracing::warn!(
                        "Tick {}: accident #{} between {} and {} at {}",
                        report.tick,
                        record.id,
                        record.agents.0,
                        record.agents.1,
                        record.position
                    );
                }
                SimEvent::Emergency(EmergencyOutcome::Routed { over_water, .. }) => {
                    emergency_routes += 1;
                    if *over_water {
                        water_routes += 1;
                    }
                }
                SimEvent::Proximity(p) if p.tier == ProximityTier::Critical => {
                    critical_proximities += 1;
                }
                SimEvent::Parking(transition) => match transition.to {
                    ParkingPhase::Parked => {
                        parkings += 1;
                        first_parked.entry(transition.agent).or_insert(report.tick);
                    }
                    ParkingPhase::Departing => departures += 1,
                    _ => {}
                },
                SimEvent::ClaimLost { .. } => lost_claims += 1,
                _ => {}
            }
        }
    }

    ScenarioSummary {
        scenario: scenario.name,
        ticks,
        accidents,
        emergency_routes,
        water_routes,
        critical_proximities,
        parkings,
        departures,
        lost_claims,
        first_parked,
        final_state: scenario.simulation.snapshot(),
    }
}
