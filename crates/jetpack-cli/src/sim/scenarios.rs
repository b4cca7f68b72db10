//! Pre-defined flight scenarios.

use jetpack_core::{
    CityLayout, ConfigError, Instruction, Point, Simulation, SimulationConfig, TerrainKind,
    TerrainRaster, TerrainSurface, WeatherCondition, WeatherState,
};
use std::sync::Arc;

/// A named, ready-to-run simulation.
pub struct Scenario {
    pub name: String,
    pub simulation: Simulation,
    /// Ticks needed for the interesting part to play out
    pub suggested_ticks: u64,
}

fn open_land() -> Arc<dyn TerrainSurface> {
    Arc::new(|_: Point| TerrainKind::Land)
}

/// One agent flying 100 units east at speed 5: lands on tick 20.
pub fn create_routine_scenario(config: SimulationConfig) -> Result<Scenario, ConfigError> {
    let mut simulation = Simulation::new(config, open_land(), vec![Point::new(200.0, 200.0)])?;
    simulation.spawn_agent(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 5.0);

    Ok(Scenario {
        name: "routine".to_string(),
        simulation,
        suggested_ticks: 30,
    })
}

/// The routine flight under a thunderstorm: half speed, lands on tick 40.
pub fn create_weather_scenario(config: SimulationConfig) -> Result<Scenario, ConfigError> {
    let mut scenario = create_routine_scenario(config)?;
    scenario
        .simulation
        .apply_weather(WeatherState::new(WeatherCondition::Thunderstorm, 5));
    scenario.name = "weather".to_string();
    scenario.suggested_ticks = 50;
    Ok(scenario)
}

/// Four agents converging on the map center from the cardinal directions.
pub fn create_converging_scenario(config: SimulationConfig) -> Result<Scenario, ConfigError> {
    let center = config.bounds.center();
    let offset = 300.0;
    let slots = [
        Point::new(center.x - 400.0, center.y - 300.0),
        Point::new(center.x + 400.0, center.y - 300.0),
        Point::new(center.x - 400.0, center.y + 300.0),
        Point::new(center.x + 400.0, center.y + 300.0),
    ];
    let mut simulation = Simulation::new(config, open_land(), slots)?;

    for angle in [0.0_f64, 90.0, 180.0, 270.0] {
        let start = center.offset_polar(offset, angle.to_radians());
        // Aim past the center so nobody parks before the paths cross.
        let end = center.offset_polar(offset, (angle + 180.0).to_radians());
        simulation.spawn_agent(start, end, 8.0);
    }

    Ok(Scenario {
        name: "converging".to_string(),
        simulation,
        suggested_ticks: 400,
    })
}

/// An agent ordered down over a lake: it must reach the shore before heading
/// for a landing pad.
pub fn create_water_landing_scenario(config: SimulationConfig) -> Result<Scenario, ConfigError> {
    let bounds = config.bounds;
    let cell = 10.0;
    let cols = (bounds.width / cell).ceil() as usize;
    let rows = (bounds.height / cell).ceil() as usize;
    let mut terrain = TerrainRaster::filled(cols, rows, cell, TerrainKind::Land);
    let lake = Point::new(bounds.width * 0.3, bounds.height * 0.5);
    terrain.paint_circle(lake, 200.0, TerrainKind::Water);

    let slots = [
        Point::new(lake.x + 400.0, lake.y - 200.0),
        Point::new(lake.x + 400.0, lake.y + 200.0),
    ];
    let mut simulation = Simulation::new(config, Arc::new(terrain), slots)?;
    let agent = simulation.spawn_agent(lake, Point::new(bounds.width - 100.0, lake.y), 4.0);
    if let Err(err) = simulation.instruct(Instruction::EmergencyLanding { agent }) {
        tracing::warn!("Emergency call for {} rejected: {}", agent, err);
    }

    Ok(Scenario {
        name: "water_landing".to_string(),
        simulation,
        suggested_ticks: 300,
    })
}

/// Generated city with a bay and a grid of landing pads.
pub fn create_city_scenario(
    mut config: SimulationConfig,
    agent_count: usize,
    seed: u64,
) -> Result<Scenario, ConfigError> {
    config.seed = seed;
    let layout = CityLayout {
        agent_count,
        seed,
        ..CityLayout::for_bounds(config.bounds)
    };
    Ok(Scenario {
        name: "city".to_string(),
        simulation: layout.populate(config)?,
        suggested_ticks: 2_000,
    })
}
