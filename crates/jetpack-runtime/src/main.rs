//! Jetpack runtime - always-on host for the city flight simulation

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jetpack_core::{AgentStatus, CityLayout, WeatherModel};
use jetpack_runtime::config::Config;
use jetpack_runtime::loops::{event_log_loop, radio_loop, simulation_loop, weather_loop};
use jetpack_runtime::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("jetpack_runtime=debug".parse()?)
        .add_directive("jetpack_core=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting jetpack runtime...");

    let sim_config = config.simulation.clone();
    let layout = CityLayout {
        agent_count: config.agent_count,
        seed: sim_config.seed,
        ..CityLayout::for_bounds(sim_config.bounds)
    };
    let simulation = layout.populate(sim_config.clone())?;

    let (state, receivers) = AppState::new(simulation.snapshot(), config.channel_capacity);
    let state = Arc::new(state);
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start background loops
    let event_log = tokio::spawn(event_log_loop::run_event_log_loop(
        state.clone(),
        receivers.events,
        shutdown_tx.subscribe(),
    ));
    let weather = tokio::spawn(weather_loop::run_weather_loop(
        state.clone(),
        WeatherModel::new(sim_config.seed),
        Duration::from_millis(sim_config.weather_interval_ms),
        shutdown_tx.subscribe(),
    ));
    let radio = tokio::spawn(radio_loop::run_radio_loop(
        state.clone(),
        radio_loop::RadioDispatcher::new(&sim_config, config.emergency_call_probability),
        Duration::from_millis(config.radio_interval_ms),
        shutdown_tx.subscribe(),
    ));
    let clock = tokio::spawn(simulation_loop::run_simulation_loop(
        state.clone(),
        simulation,
        receivers.instructions,
        shutdown_tx.subscribe(),
    ));

    tracing::info!(
        "Running {} agents at {} ms per tick",
        config.agent_count,
        sim_config.tick_interval_ms
    );

    match config.run_for_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    tracing::info!("Run time of {}s elapsed", secs)
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            tracing::info!("Interrupted");
        }
    }

    // Receivers may already be gone if a loop exited early.
    let _ = shutdown_tx.send(());
    let simulation = clock.await?;
    radio.await?;
    weather.await?;
    let tally = event_log.await?;

    let snapshot = simulation.snapshot();
    tracing::info!(
        "Stopped after {} ticks: {} parked, {} in emergency, {} accident(s), {} active",
        snapshot.tick,
        snapshot.count_status(AgentStatus::Parked),
        snapshot.agents.values().filter(|a| a.status.is_emergency()).count(),
        snapshot.accidents.len(),
        simulation.active_accidents().count()
    );
    tracing::info!("Event totals: {:?}", tally.counts);

    Ok(())
}
