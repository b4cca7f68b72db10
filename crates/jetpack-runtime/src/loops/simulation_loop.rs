//! The flight clock.
//!
//! Owns the [`Simulation`], applies queued radio instructions and the last
//! published weather before each tick, then publishes a fresh snapshot and
//! forwards the tick's events to the event log.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};

use crate::state::AppState;
use jetpack_core::{Instruction, Simulation};

/// Run the tick loop until shutdown; hands the simulation back for reporting.
pub async fn run_simulation_loop(
    state: Arc<AppState>,
    mut simulation: Simulation,
    mut instructions: mpsc::Receiver<Instruction>,
    mut shutdown: broadcast::Receiver<()>,
) -> Simulation {
    let period = Duration::from_millis(simulation.config().tick_interval_ms);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Simulation loop shutting down at tick {}", simulation.current_tick());
                break;
            }
            _ = ticker.tick() => {
                state.mark_loop_heartbeat("simulation");
                simulation.apply_weather(state.weather());
                drain_instructions(&mut simulation, &mut instructions);

                let report = simulation.tick();
                if report.accidents().next().is_some() {
                    tracing::warn!(
                        "Tick {}: {} active accident(s)",
                        report.tick,
                        simulation.active_accidents().count()
                    );
                }
                for event in report.events {
                    state.forward_event(event);
                }
                state.publish_snapshot(simulation.snapshot());
            }
        }
    }

    simulation
}

fn drain_instructions(simulation: &mut Simulation, rx: &mut mpsc::Receiver<Instruction>) {
    while let Ok(instruction) = rx.try_recv() {
        if let Err(err) = simulation.instruct(instruction) {
            tracing::debug!("Rejected {:?}: {}", instruction, err);
        }
    }
}
