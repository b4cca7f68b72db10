//! Runtime configuration from environment.

use anyhow::{Context, Result};
use jetpack_core::SimulationConfig;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub agent_count: usize,
    /// Period of the radio dispatcher
    pub radio_interval_ms: u64,
    /// Chance that a radio call is an emergency landing order
    pub emergency_call_probability: f64,
    pub channel_capacity: usize,
    /// Stop on its own after this many seconds; runs until ctrl-c when unset
    pub run_for_secs: Option<u64>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            agent_count: 40,
            radio_interval_ms: 2_000,
            emergency_call_probability: 0.02,
            channel_capacity: 1_024,
            run_for_secs: None,
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// `JETPACK_CONFIG` names a JSON file holding a [`SimulationConfig`]; the
    /// remaining `JETPACK_*` variables override individual fields.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut simulation = match lookup("JETPACK_CONFIG") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading simulation config {}", path))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing simulation config {}", path))?
            }
            None => defaults.simulation,
        };
        if let Some(seed) = parse(&lookup, "JETPACK_SEED")? {
            simulation.seed = seed;
        }
        if let Some(ms) = parse(&lookup, "JETPACK_TICK_MS")? {
            simulation.tick_interval_ms = ms;
        }
        if let Some(ms) = parse(&lookup, "JETPACK_WEATHER_MS")? {
            simulation.weather_interval_ms = ms;
        }
        simulation.validate()?;

        let emergency_call_probability: f64 =
            parse(&lookup, "JETPACK_EMERGENCY_PROBABILITY")?
                .unwrap_or(defaults.emergency_call_probability);
        if !(0.0..=1.0).contains(&emergency_call_probability) {
            anyhow::bail!(
                "JETPACK_EMERGENCY_PROBABILITY must be within [0, 1], got {}",
                emergency_call_probability
            );
        }

        Ok(Self {
            simulation,
            agent_count: parse(&lookup, "JETPACK_AGENTS")?.unwrap_or(defaults.agent_count),
            radio_interval_ms: parse(&lookup, "JETPACK_RADIO_MS")?
                .unwrap_or(defaults.radio_interval_ms)
                .max(1),
            emergency_call_probability,
            channel_capacity: parse(&lookup, "JETPACK_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.channel_capacity)
                .max(1),
            run_for_secs: parse(&lookup, "JETPACK_RUN_SECS")?,
            log_json: lookup("JETPACK_LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.log_json),
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.agent_count, 40);
        assert_eq!(config.simulation.tick_interval_ms, 50);
        assert!(config.run_for_secs.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides_from_variables() {
        let config = Config::from_lookup(lookup(&[
            ("JETPACK_AGENTS", "12"),
            ("JETPACK_SEED", "7"),
            ("JETPACK_TICK_MS", "20"),
            ("JETPACK_RUN_SECS", "30"),
            ("JETPACK_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.agent_count, 12);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.tick_interval_ms, 20);
        assert_eq!(config.run_for_secs, Some(30));
        assert!(config.log_json);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[("JETPACK_AGENTS", "many")])).is_err());
        assert!(Config::from_lookup(lookup(&[("JETPACK_TICK_MS", "0")])).is_err());
        assert!(
            Config::from_lookup(lookup(&[("JETPACK_EMERGENCY_PROBABILITY", "1.5")])).is_err()
        );
    }

    #[test]
    fn test_simulation_config_file() {
        let path = std::env::temp_dir().join(format!(
            "jetpack-runtime-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"tick_interval_ms": 100, "seed": 99}"#).unwrap();

        let config = Config::from_lookup(lookup(&[(
            "JETPACK_CONFIG",
            path.to_str().unwrap(),
        )]))
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.simulation.tick_interval_ms, 100);
        assert_eq!(config.simulation.seed, 99);
        assert_eq!(config.simulation.weather_interval_ms, 10_000);
    }
}
