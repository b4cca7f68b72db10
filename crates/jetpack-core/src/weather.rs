//! City weather model.
//!
//! Changes on a slower cadence than the flight tick. The flight core only
//! ever reads the last published [`WeatherState`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity at or above which flying is considered unsafe.
pub const UNSAFE_SEVERITY: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    Cloudy,
    Windy,
    Rain,
    Fog,
    Snow,
    Thunderstorm,
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 7] = [
        WeatherCondition::Clear,
        WeatherCondition::Cloudy,
        WeatherCondition::Windy,
        WeatherCondition::Rain,
        WeatherCondition::Fog,
        WeatherCondition::Snow,
        WeatherCondition::Thunderstorm,
    ];

    /// Inclusive severity range this condition can take.
    pub fn severity_range(self) -> (u8, u8) {
        match self {
            WeatherCondition::Clear => (1, 1),
            WeatherCondition::Cloudy => (1, 2),
            WeatherCondition::Windy => (2, 4),
            WeatherCondition::Rain => (2, 4),
            WeatherCondition::Fog => (3, 4),
            WeatherCondition::Snow => (3, 5),
            WeatherCondition::Thunderstorm => (4, 5),
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Windy => "windy",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Thunderstorm => "thunderstorm",
        };
        f.pad(label)
    }
}

/// Published weather reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherState {
    pub condition: WeatherCondition,
    /// 1 (calm) to 5 (extreme)
    pub severity: u8,
    pub safe_to_fly: bool,
}

impl WeatherState {
    /// Build a state, clamping severity into 1..=5 and deriving `safe_to_fly`.
    pub fn new(condition: WeatherCondition, severity: u8) -> Self {
        let severity = severity.clamp(1, 5);
        Self {
            condition,
            severity,
            safe_to_fly: severity < UNSAFE_SEVERITY,
        }
    }

    pub fn clear() -> Self {
        Self::new(WeatherCondition::Clear, 1)
    }
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::clear()
    }
}

/// Random-walk weather generator.
#[derive(Debug)]
pub struct WeatherModel {
    state: WeatherState,
    /// Probability the current condition persists through a change
    persistence: f64,
    rng: StdRng,
}

impl WeatherModel {
    pub fn new(seed: u64) -> Self {
        Self::with_state(WeatherState::clear(), seed)
    }

    pub fn with_state(state: WeatherState, seed: u64) -> Self {
        Self {
            state,
            persistence: 0.6,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_persistence(mut self, persistence: f64) -> Self {
        self.persistence = persistence.clamp(0.0, 1.0);
        self
    }

    pub fn current(&self) -> WeatherState {
        self.state
    }

    /// Advance one weather period and return the new state.
    pub fn advance(&mut self) -> WeatherState {
        let condition = if self.rng.random_bool(self.persistence) {
            self.state.condition
        } else {
            let idx = self.rng.random_range(0..WeatherCondition::ALL.len());
            WeatherCondition::ALL[idx]
        };

        let (low, high) = condition.severity_range();
        let severity = self.rng.random_range(low..=high);
        let next = WeatherState::new(condition, severity);

        if next != self.state {
            tracing::debug!(
                "Weather {} (severity {}) -> {} (severity {})",
                self.state.condition,
                self.state.severity,
                next.condition,
                next.severity
            );
        }
        self.state = next;
        next
    }
}
