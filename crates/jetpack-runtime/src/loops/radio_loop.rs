//! Radio dispatcher.
//!
//! Stands in for the city's radio operators: every period it picks one
//! cruising agent from the latest snapshot and calls in a reroute, an
//! altitude change or, rarely, an emergency landing. Calls go through the
//! instruction queue and are validated by the simulation like any other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::AppState;
use jetpack_core::{
    AgentId, AgentStatus, Instruction, MapBounds, Point, SimulationConfig, SimulationSnapshot,
};

/// Ticks before the same agent can be called again.
const CALL_COOLDOWN_TICKS: u64 = 200;

#[derive(Debug)]
pub struct RadioDispatcher {
    rng: StdRng,
    bounds: MapBounds,
    altitude_range: (f64, f64),
    emergency_probability: f64,
    last_call: HashMap<AgentId, u64>,
}

impl RadioDispatcher {
    pub fn new(config: &SimulationConfig, emergency_probability: f64) -> Self {
        Self {
            // Offset so radio traffic does not replay the simulation's own draws.
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            bounds: config.bounds,
            altitude_range: (config.min_altitude, config.max_altitude),
            emergency_probability: emergency_probability.clamp(0.0, 1.0),
            last_call: HashMap::new(),
        }
    }

    fn can_call(&self, agent: AgentId, tick: u64) -> bool {
        self.last_call
            .get(&agent)
            .map_or(true, |last| tick.saturating_sub(*last) >= CALL_COOLDOWN_TICKS)
    }

    /// Choose the next call for `snapshot`, if any agent is available.
    pub fn next_call(&mut self, snapshot: &SimulationSnapshot) -> Option<Instruction> {
        let eligible: Vec<AgentId> = snapshot
            .agents
            .iter()
            .filter(|(_, agent)| matches!(agent.status, AgentStatus::Active | AgentStatus::Detour))
            .map(|(id, _)| *id)
            .filter(|id| self.can_call(*id, snapshot.tick))
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let agent = eligible[self.rng.random_range(0..eligible.len())];
        let call = if self.rng.random_bool(self.emergency_probability) {
            Instruction::EmergencyLanding { agent }
        } else if self.rng.random_bool(0.5) {
            let (min, max) = self.bounds.inner_extent();
            let point = Point::new(
                self.rng.random_range(min.x..=max.x),
                self.rng.random_range(min.y..=max.y),
            );
            Instruction::SetRadioDestination { agent, point }
        } else {
            let (low, high) = self.altitude_range;
            Instruction::SetRadioAltitude {
                agent,
                altitude: self.rng.random_range(low..=high),
            }
        };
        self.last_call.insert(agent, snapshot.tick);
        Some(call)
    }
}

pub async fn run_radio_loop(
    state: Arc<AppState>,
    mut dispatcher: RadioDispatcher,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Radio loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                state.mark_loop_heartbeat("radio");
                let snapshot = state.snapshot();
                let Some(call) = dispatcher.next_call(&snapshot) else {
                    continue;
                };
                match call {
                    Instruction::EmergencyLanding { agent } => {
                        tracing::warn!("Radio: {} ordered to make an emergency landing", agent)
                    }
                    Instruction::SetRadioDestination { agent, point } => {
                        tracing::info!("Radio: {} rerouted to {}", agent, point)
                    }
                    Instruction::SetRadioAltitude { agent, altitude } => {
                        tracing::info!("Radio: {} cleared to altitude {:.0}", agent, altitude)
                    }
                }
                state.send_instruction(call);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jetpack_core::{Simulation, TerrainKind};

    fn simulation(agents: usize) -> Simulation {
        let mut simulation = Simulation::new(
            SimulationConfig::default(),
            Arc::new(|_: Point| TerrainKind::Land),
            Vec::new(),
        )
        .unwrap();
        for i in 0..agents {
            let y = 100.0 + 150.0 * i as f64;
            simulation.spawn_agent(Point::new(100.0, y), Point::new(900.0, y), 3.0);
        }
        simulation
    }

    #[test]
    fn test_no_call_without_eligible_agents() {
        let simulation = simulation(0);
        let mut dispatcher = RadioDispatcher::new(simulation.config(), 0.0);
        assert_eq!(dispatcher.next_call(&simulation.snapshot()), None);
    }

    #[test]
    fn test_calls_stay_within_map_and_altitude_limits() {
        let mut simulation = simulation(3);
        let config = simulation.config().clone();
        let mut dispatcher = RadioDispatcher::new(&config, 0.0);

        let mut calls = 0;
        for _ in 0..2_000 {
            simulation.tick();
            let Some(call) = dispatcher.next_call(&simulation.snapshot()) else {
                continue;
            };
            calls += 1;
            match call {
                Instruction::SetRadioDestination { point, .. } => {
                    assert!(config.bounds.contains_inner(point))
                }
                Instruction::SetRadioAltitude { altitude, .. } => {
                    assert!(altitude >= config.min_altitude && altitude <= config.max_altitude)
                }
                Instruction::EmergencyLanding { .. } => panic!("emergency calls are disabled"),
            }
            assert!(simulation.instruct(call).is_ok());
        }
        assert!(calls > 0);
    }

    #[test]
    fn test_same_agent_is_not_called_again_within_cooldown() {
        let simulation = simulation(1);
        let mut dispatcher = RadioDispatcher::new(simulation.config(), 0.0);
        let mut snapshot = simulation.snapshot();

        assert!(dispatcher.next_call(&snapshot).is_some());
        snapshot.tick = CALL_COOLDOWN_TICKS - 1;
        assert_eq!(dispatcher.next_call(&snapshot), None);
        snapshot.tick = CALL_COOLDOWN_TICKS;
        assert!(dispatcher.next_call(&snapshot).is_some());
    }

    #[test]
    fn test_certain_emergency_probability() {
        let simulation = simulation(2);
        let mut dispatcher = RadioDispatcher::new(simulation.config(), 1.0);
        let call = dispatcher.next_call(&simulation.snapshot()).unwrap();
        assert!(matches!(call, Instruction::EmergencyLanding { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_queues_calls() {
        let simulation = simulation(2);
        let (state, mut receivers) = AppState::new(simulation.snapshot(), 16);
        let state = Arc::new(state);
        let dispatcher = RadioDispatcher::new(simulation.config(), 0.0);
        let (shutdown_tx, _) = broadcast::channel(1);

        let handle = tokio::spawn(run_radio_loop(
            state.clone(),
            dispatcher,
            Duration::from_secs(1),
            shutdown_tx.subscribe(),
        ));
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        // Two agents, two calls; the snapshot never advances so both are then on cooldown.
        assert!(receivers.instructions.try_recv().is_ok());
        assert!(receivers.instructions.try_recv().is_ok());
        assert!(receivers.instructions.try_recv().is_err());

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
