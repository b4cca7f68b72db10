//! Scenario construction and headless execution.

mod runner;
mod scenarios;

pub use runner::{run, ScenarioSummary};
pub use scenarios::{
    create_city_scenario, create_converging_scenario, create_routine_scenario,
    create_water_landing_scenario, create_weather_scenario, Scenario,
};
