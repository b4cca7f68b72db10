//! Headless runner for the named flight scenarios.

use clap::{Parser, ValueEnum};
use jetpack_cli::sim::{
    create_city_scenario, create_converging_scenario, create_routine_scenario,
    create_water_landing_scenario, create_weather_scenario, run,
};
use jetpack_core::{AgentStatus, SimulationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Available scenarios
#[derive(Debug, Clone, ValueEnum)]
enum ScenarioType {
    /// One agent, clear skies, 100 units at speed 5
    Routine,
    /// The routine flight through a thunderstorm
    Weather,
    /// Four agents converging on the map center
    Converging,
    /// Emergency landing ordered over a lake
    WaterLanding,
    /// Generated city with a bay and many agents
    City,
}

/// Run a jetpack flight scenario without a renderer
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario to run
    #[arg(long, value_enum, default_value = "routine")]
    scenario: ScenarioType,

    /// Number of ticks (defaults to the scenario's own length)
    #[arg(long)]
    ticks: Option<u64>,

    /// Fleet size for the city scenario
    #[arg(long, default_value_t = 40)]
    agents: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Optional JSON file with simulation settings
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Log every tick's detail
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)))
        .init();

    let mut config = match &args.config {
        Some(path) => serde_json::from_str::<SimulationConfig>(&std::fs::read_to_string(path)?)?,
        None => SimulationConfig::default(),
    };
    config.seed = args.seed;

    let scenario = match args.scenario {
        ScenarioType::Routine => create_routine_scenario(config)?,
        ScenarioType::Weather => create_weather_scenario(config)?,
        ScenarioType::Converging => create_converging_scenario(config)?,
        ScenarioType::WaterLanding => create_water_landing_scenario(config)?,
        ScenarioType::City => create_city_scenario(config, args.agents, args.seed)?,
    };
    let ticks = args.ticks.unwrap_or(scenario.suggested_ticks);
    let summary = run(scenario, ticks);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let state = &summary.final_state;
    println!("\nScenario: {} ({} ticks)", summary.scenario, summary.ticks);
    println!("  Accidents:            {}", summary.accidents);
    println!("  Emergency routes:     {} ({} over water)", summary.emergency_routes, summary.water_routes);
    println!("  Critical proximities: {}", summary.critical_proximities);
    println!("  Parkings / departures: {} / {}", summary.parkings, summary.departures);
    println!("  Lost slot claims:     {}", summary.lost_claims);
    println!(
        "  Weather:              {} (severity {})",
        state.weather.condition, state.weather.severity
    );
    println!("\nFinal state:");
    for status in [
        AgentStatus::Active,
        AgentStatus::FollowingInstruction,
        AgentStatus::Detour,
        AgentStatus::EmergencyHalt,
        AgentStatus::EmergencyLanding,
        AgentStatus::Parked,
    ] {
        let count = state.count_status(status);
        if count > 0 {
            println!("  {:<22} {}", status, count);
        }
    }
    for (id, tick) in summary.first_parked.iter().take(10) {
        println!("  {} first parked on tick {}", id, tick);
    }

    Ok(())
}
