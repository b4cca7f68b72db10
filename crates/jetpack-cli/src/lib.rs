//! Jetpack CLI - headless runs of named flight scenarios.
//!
//! The `run_scenario` binary builds one of the scenarios in [`sim`], ticks it
//! for a fixed number of steps and prints a summary.

pub mod sim;

pub use sim::{run, Scenario, ScenarioSummary};
