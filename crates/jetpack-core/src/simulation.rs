//! The simulation clock.
//!
//! Owns every agent, the parking registry and the accident log, and runs one
//! tick in a fixed phase order:
//!
//! 1. push the current weather onto every agent
//! 2. emergency handling for agents halted on the previous tick
//! 3. arbitration and motion (parallel above `parallel_threshold`)
//! 4. collision sweep over the post-motion positions
//! 5. parking lifecycle, single writer, ascending agent id
//!
//! Consumers never see the live state; they get [`SimulationSnapshot`]s.

use crate::agent::{FlightAgent, InstructionSink};
use crate::arbitration::{advance, MotionStep};
use crate::collision::CollisionDetector;
use crate::config::SimulationConfig;
use crate::emergency::EmergencyHandler;
use crate::error::{ConfigError, InstructionError};
use crate::events::{SimEvent, TickReport};
use crate::geometry::Point;
use crate::models::{
    AccidentRecord, AgentId, AgentStatus, Hazard, HazardFlags, ParkingPhase, ParkingSlot,
};
use crate::parking::{ParkingLifecycle, ParkingRegistry, ParkingTransition};
use crate::terrain::{TerrainOracle, TerrainSurface};
use crate::weather::WeatherState;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Radio instruction issued by the external radio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    SetRadioDestination { agent: AgentId, point: Point },
    SetRadioAltitude { agent: AgentId, altitude: f64 },
    EmergencyLanding { agent: AgentId },
}

impl Instruction {
    pub fn agent(&self) -> AgentId {
        match self {
            Instruction::SetRadioDestination { agent, .. }
            | Instruction::SetRadioAltitude { agent, .. }
            | Instruction::EmergencyLanding { agent } => *agent,
        }
    }
}

/// Read-only view of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub callsign: String,
    pub position: Point,
    pub altitude: f64,
    pub status: AgentStatus,
    pub parking: ParkingPhase,
    pub effective_speed: f64,
    pub hazards: HazardFlags,
}

/// Immutable per-tick view for rendering and logging consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub agents: BTreeMap<AgentId, AgentSnapshot>,
    pub accidents: Vec<AccidentRecord>,
    pub weather: WeatherState,
    pub slots: Vec<ParkingSlot>,
}

impl SimulationSnapshot {
    pub fn count_status(&self, status: AgentStatus) -> usize {
        self.agents.values().filter(|a| a.status == status).count()
    }
}

pub struct Simulation {
    config: SimulationConfig,
    agents: Vec<FlightAgent>,
    registry: ParkingRegistry,
    terrain: TerrainOracle,
    detector: CollisionDetector,
    emergency: EmergencyHandler,
    lifecycle: ParkingLifecycle,
    weather: WeatherState,
    accidents: Vec<AccidentRecord>,
    pending: Vec<SimEvent>,
    tick: u64,
    next_agent_id: u32,
    rng: StdRng,
}

impl Simulation {
    /// Create a simulation over the given terrain and parking slots.
    pub fn new(
        config: SimulationConfig,
        surface: Arc<dyn TerrainSurface>,
        slots: impl IntoIterator<Item = Point>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let terrain = TerrainOracle::new(surface, config.bounds, config.land_search);
        Ok(Self {
            registry: ParkingRegistry::new(slots),
            terrain,
            detector: CollisionDetector::new(config.proximity),
            emergency: EmergencyHandler::new(
                config.land_search,
                config.slot_search_radius,
                config.bounds,
            ),
            lifecycle: ParkingLifecycle::new(config.dwell_ticks, config.bounds),
            weather: WeatherState::clear(),
            agents: Vec::new(),
            accidents: Vec::new(),
            pending: Vec::new(),
            tick: 0,
            next_agent_id: 1,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn terrain(&self) -> &TerrainOracle {
        &self.terrain
    }

    pub fn registry(&self) -> &ParkingRegistry {
        &self.registry
    }

    pub fn weather(&self) -> WeatherState {
        self.weather
    }

    /// Add an agent flying from `origin` to `destination` at cruise altitude.
    pub fn spawn_agent(&mut self, origin: Point, destination: Point, base_speed: f64) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        let agent = FlightAgent::new(id, id.to_string(), origin, destination, base_speed)
            .with_altitude(self.config.cruise_altitude);
        tracing::debug!("Spawned {} at {} bound for {}", id, origin, destination);
        // Ids are handed out in increasing order, so the list stays sorted.
        self.agents.push(agent);
        id
    }

    pub fn agents(&self) -> &[FlightAgent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&FlightAgent> {
        let idx = self.index_of(id)?;
        Some(&self.agents[idx])
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut FlightAgent> {
        let idx = self.index_of(id)?;
        Some(&mut self.agents[idx])
    }

    fn index_of(&self, id: AgentId) -> Option<usize> {
        self.agents.binary_search_by_key(&id, |agent| agent.id).ok()
    }

    pub fn accidents(&self) -> &[AccidentRecord] {
        &self.accidents
    }

    pub fn active_accidents(&self) -> impl Iterator<Item = &AccidentRecord> {
        self.accidents.iter().filter(|record| record.active)
    }

    /// Operator-facing: mark an accident as cleared.
    pub fn clear_accident(&mut self, id: u64) -> bool {
        match self.accidents.iter_mut().find(|record| record.id == id) {
            Some(record) if record.active => {
                record.active = false;
                tracing::info!("Accident #{} cleared", id);
                true
            }
            _ => false,
        }
    }

    /// Publish a new weather reading; takes effect on the next tick.
    pub fn apply_weather(&mut self, weather: WeatherState) {
        if weather != self.weather {
            tracing::info!(
                "Weather now {} (severity {}, safe to fly: {})",
                weather.condition,
                weather.severity,
                weather.safe_to_fly
            );
            self.pending.push(SimEvent::WeatherChanged(weather));
        }
        self.weather = weather;
    }

    /// Raise or lower a hazard flag on one agent.
    ///
    /// `inclement_weather` is rewritten from the weather state every tick.
    pub fn set_hazard(
        &mut self,
        id: AgentId,
        hazard: Hazard,
        value: bool,
    ) -> Result<(), InstructionError> {
        let agent = self
            .agent_mut(id)
            .ok_or(InstructionError::UnknownAgent(id))?;
        if hazard == Hazard::EmergencyHalt && value {
            return agent.issue_emergency_landing();
        }
        agent.hazards.set(hazard, value);
        Ok(())
    }

    /// Validate and apply a radio instruction.
    pub fn instruct(&mut self, instruction: Instruction) -> Result<(), InstructionError> {
        match instruction {
            Instruction::SetRadioDestination { point, .. } => {
                if !self.config.bounds.contains(point) {
                    return Err(InstructionError::OutOfBounds(point));
                }
            }
            Instruction::SetRadioAltitude { altitude, .. } => {
                let (min, max) = (self.config.min_altitude, self.config.max_altitude);
                if !altitude.is_finite() || altitude < min || altitude > max {
                    return Err(InstructionError::InvalidAltitude(altitude, min, max));
                }
            }
            Instruction::EmergencyLanding { .. } => {}
        }

        let id = instruction.agent();
        let agent = self
            .agent_mut(id)
            .ok_or(InstructionError::UnknownAgent(id))?;
        match instruction {
            Instruction::SetRadioDestination { point, .. } => agent.set_radio_destination(point),
            Instruction::SetRadioAltitude { altitude, .. } => agent.set_radio_altitude(altitude),
            Instruction::EmergencyLanding { .. } => agent.issue_emergency_landing(),
        }?;
        tracing::debug!("Applied {:?}", instruction);
        Ok(())
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let mut events = std::mem::take(&mut self.pending);

        let inclement = !self.weather.safe_to_fly;
        for agent in &mut self.agents {
            agent.hazards.inclement_weather = inclement;
        }

        for agent in &mut self.agents {
            if let Some(outcome) = self.emergency.handle(agent, &self.terrain, &self.registry) {
                events.push(SimEvent::Emergency(outcome));
            }
        }

        let steps = self.advance_all();
        let arrivals = steps.iter().filter(|step| step.arrived).count();
        if arrivals > 0 {
            tracing::debug!("Tick {}: {} agent(s) reached destination", self.tick, arrivals);
        }

        let sweep = self.detector.sweep(&mut self.agents, self.tick);
        for proximity in &sweep.proximities {
            tracing::debug!(
                "{:?} proximity {} <-> {} at {:.1}",
                proximity.tier,
                proximity.first,
                proximity.second,
                proximity.distance
            );
        }
        events.extend(sweep.proximities.into_iter().map(SimEvent::Proximity));
        for record in sweep.accidents {
            events.push(SimEvent::Accident(record.clone()));
            self.accidents.push(record);
        }

        for agent in &mut self.agents {
            if agent.status == AgentStatus::EmergencyLanding && agent.detour.is_empty() {
                if let Some(slot) = agent.landing.and_then(|plan| plan.slot) {
                    let from = agent.parking;
                    if self.registry.claim(slot, agent.id) {
                        self.lifecycle.park(agent, slot, &mut self.rng);
                        tracing::info!("{} landed safely on {}", agent.callsign, slot);
                        events.push(SimEvent::Parking(ParkingTransition {
                            agent: agent.id,
                            from,
                            to: ParkingPhase::Parked,
                            slot: Some(slot),
                        }));
                    } else if let Some(plan) = agent.landing.as_mut() {
                        plan.slot = None;
                        tracing::debug!("{} lost landing slot {}", agent.callsign, slot);
                        events.push(SimEvent::ClaimLost { agent: agent.id });
                    }
                }
                continue;
            }
            if agent.status.is_emergency() {
                continue;
            }
            if let Some(transition) =
                self.lifecycle
                    .evaluate(agent, &self.registry, &mut self.rng)
            {
                events.push(SimEvent::Parking(transition));
            }
        }

        TickReport {
            tick: self.tick,
            events,
        }
    }

    fn advance_all(&mut self) -> Vec<MotionStep> {
        let config = &self.config;
        if self.agents.len() >= config.parallel_threshold {
            self.agents
                .par_iter_mut()
                .map(|agent| advance(agent, config))
                .collect()
        } else {
            self.agents
                .iter_mut()
                .map(|agent| advance(agent, config))
                .collect()
        }
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        let agents = self
            .agents
            .iter()
            .map(|agent| {
                (
                    agent.id,
                    AgentSnapshot {
                        callsign: agent.callsign.clone(),
                        position: agent.position,
                        altitude: agent.altitude,
                        status: agent.status,
                        parking: agent.parking,
                        effective_speed: agent.effective_speed,
                        hazards: agent.hazards,
                    },
                )
            })
            .collect();

        SimulationSnapshot {
            tick: self.tick,
            timestamp: Utc::now(),
            agents,
            accidents: self.accidents.clone(),
            weather: self.weather,
            slots: self.registry.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotId;
    use crate::terrain::TerrainKind;
    use crate::weather::WeatherCondition;

    fn land() -> Arc<dyn TerrainSurface> {
        Arc::new(|_: Point| TerrainKind::Land)
    }

    fn simulation(slots: Vec<Point>) -> Simulation {
        Simulation::new(SimulationConfig::default(), land(), slots).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = SimulationConfig::default();
        config.proximity.accident = 0.0;
        assert!(Simulation::new(config, land(), Vec::new()).is_err());
    }

    #[test]
    fn test_instruction_validation_happens_before_mutation() {
        let mut sim = simulation(vec![]);
        let id = sim.spawn_agent(Point::new(100.0, 100.0), Point::new(300.0, 100.0), 5.0);

        let outside = Point::new(-5.0, 100.0);
        assert_eq!(
            sim.instruct(Instruction::SetRadioDestination {
                agent: id,
                point: outside
            }),
            Err(InstructionError::OutOfBounds(outside))
        );
        assert_eq!(sim.agent(id).unwrap().radio_destination, None);

        assert!(matches!(
            sim.instruct(Instruction::SetRadioAltitude {
                agent: id,
                altitude: f64::NAN
            }),
            Err(InstructionError::InvalidAltitude(..))
        ));

        assert_eq!(
            sim.instruct(Instruction::EmergencyLanding { agent: AgentId(99) }),
            Err(InstructionError::UnknownAgent(AgentId(99)))
        );
    }

    #[test]
    fn test_radio_destination_followed_then_route_resumes() {
        let mut sim = simulation(vec![]);
        let id = sim.spawn_agent(Point::new(100.0, 100.0), Point::new(300.0, 100.0), 5.0);
        sim.instruct(Instruction::SetRadioDestination {
            agent: id,
            point: Point::new(100.0, 120.0),
        })
        .unwrap();

        sim.tick();
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.status, AgentStatus::FollowingInstruction);
        assert_eq!(agent.position, Point::new(100.0, 105.0));

        for _ in 0..3 {
            sim.tick();
        }
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.position, Point::new(100.0, 120.0));
        assert_eq!(agent.radio_destination, None);
        assert_eq!(agent.status, AgentStatus::Active);
    }

    #[test]
    fn test_radio_order_while_waiting_to_park_is_flown_first() {
        let mut config = SimulationConfig::default();
        config.dwell_ticks = (20, 20);
        let mut sim = Simulation::new(config, land(), vec![Point::new(500.0, 500.0)]).unwrap();
        assert!(sim.registry().claim(SlotId(1), AgentId(99)));

        let id = sim.spawn_agent(Point::new(0.0, 300.0), Point::new(100.0, 300.0), 5.0);
        for _ in 0..25 {
            sim.tick();
        }
        assert_eq!(sim.agent(id).unwrap().parking, ParkingPhase::Arriving);

        let radio = Point::new(700.0, 300.0);
        sim.instruct(Instruction::SetRadioDestination { agent: id, point: radio })
            .unwrap();
        assert_eq!(sim.agent(id).unwrap().parking, ParkingPhase::EnRoute);
        assert!(sim.registry().release(SlotId(1), AgentId(99)));

        // A free slot must not pull the agent down mid-flight.
        for _ in 0..120 {
            sim.tick();
            assert_ne!(sim.agent(id).unwrap().status, AgentStatus::Parked);
        }
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.position, radio);
        assert_eq!(agent.radio_destination, None);

        // Back at the original destination it parks as usual.
        for _ in 0..120 {
            sim.tick();
        }
        let agent = sim.agent(id).unwrap();
        assert_eq!(agent.status, AgentStatus::Parked);
        assert_eq!(agent.position, Point::new(100.0, 300.0));
        assert_eq!(agent.parked_slot, Some(SlotId(1)));
    }

    #[test]
    fn test_weather_is_pushed_onto_agents() {
        let mut sim = simulation(vec![]);
        let id = sim.spawn_agent(Point::new(100.0, 100.0), Point::new(300.0, 100.0), 4.0);
        sim.apply_weather(WeatherState::new(WeatherCondition::Thunderstorm, 5));

        let report = sim.tick();
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::WeatherChanged(_))));
        let agent = sim.agent(id).unwrap();
        assert!(agent.hazards.inclement_weather);
        assert_eq!(agent.effective_speed, 2.0);

        sim.apply_weather(WeatherState::clear());
        sim.tick();
        assert!(!sim.agent(id).unwrap().hazards.inclement_weather);
    }

    #[test]
    fn test_clear_accident_only_once() {
        let mut sim = simulation(vec![Point::new(500.0, 500.0)]);
        sim.spawn_agent(Point::new(100.0, 100.0), Point::new(300.0, 100.0), 5.0);
        sim.spawn_agent(Point::new(110.0, 100.0), Point::new(300.0, 300.0), 5.0);

        let report = sim.tick();
        let id = report.accidents().next().unwrap().id;
        assert!(sim.clear_accident(id));
        assert!(!sim.clear_accident(id));
        assert_eq!(sim.active_accidents().count(), 0);
        assert_eq!(sim.accidents().len(), 1);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut sim = simulation(vec![Point::new(500.0, 500.0)]);
        let id = sim.spawn_agent(Point::new(100.0, 100.0), Point::new(300.0, 100.0), 5.0);
        sim.tick();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.agents[&id].position, Point::new(105.0, 100.0));
        assert_eq!(snapshot.agents[&id].callsign, "JP001");
        assert_eq!(snapshot.slots.len(), 1);
        assert_eq!(snapshot.count_status(AgentStatus::Active), 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["agents"]["1"]["status"], "ACTIVE");
    }

    #[test]
    fn test_parallel_motion_matches_sequential() {
        let mut sequential_config = SimulationConfig::default();
        sequential_config.parallel_threshold = usize::MAX;
        let mut parallel_config = SimulationConfig::default();
        parallel_config.parallel_threshold = 1;

        let mut sequential = Simulation::new(sequential_config, land(), Vec::new()).unwrap();
        let mut parallel = Simulation::new(parallel_config, land(), Vec::new()).unwrap();
        for i in 0..40 {
            let origin = Point::new(50.0 + 30.0 * i as f64, 100.0 + 15.0 * i as f64);
            let destination = Point::new(1500.0 - 30.0 * i as f64, 900.0 - 15.0 * i as f64);
            sequential.spawn_agent(origin, destination, 3.0 + i as f64 % 5.0);
            parallel.spawn_agent(origin, destination, 3.0 + i as f64 % 5.0);
        }

        for _ in 0..30 {
            sequential.tick();
            parallel.tick();
        }
        for (a, b) in sequential.agents().iter().zip(parallel.agents()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.status, b.status);
        }
        assert_eq!(sequential.accidents().len(), parallel.accidents().len());
    }
}
