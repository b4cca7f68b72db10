//! Collision and accident detection.
//!
//! Classifies every pair of airborne agents by distance once per tick.
//! Accidents are created at the pair midpoint and halt both agents; closer
//! tiers short of an accident are only reported.

use crate::agent::FlightAgent;
use crate::config::ProximityThresholds;
use crate::geometry::Point;
use crate::models::{AccidentRecord, AccidentSeverity, AgentId, AgentStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance tier of a pair of agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityTier {
    Warning,
    Critical,
    Accident,
}

/// A reported close approach that did not produce an accident.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proximity {
    /// Lower agent id of the pair
    pub first: AgentId,
    pub second: AgentId,
    pub distance: f64,
    pub tier: ProximityTier,
}

/// Everything one sweep produced.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub accidents: Vec<AccidentRecord>,
    pub proximities: Vec<Proximity>,
    /// Agents halted by this sweep, in the order they were halted
    pub halted: Vec<AgentId>,
}

/// Pairwise proximity sweep with accident bookkeeping.
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    pub thresholds: ProximityThresholds,
    next_accident_id: u64,
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new(ProximityThresholds::default())
    }
}

impl CollisionDetector {
    pub fn new(thresholds: ProximityThresholds) -> Self {
        Self {
            thresholds,
            next_accident_id: 1,
        }
    }

    /// Tier for a raw distance, `None` beyond the warning distance.
    pub fn classify(&self, distance: f64) -> Option<ProximityTier> {
        if distance < self.thresholds.accident {
            Some(ProximityTier::Accident)
        } else if distance < self.thresholds.critical {
            Some(ProximityTier::Critical)
        } else if distance < self.thresholds.warning {
            Some(ProximityTier::Warning)
        } else {
            None
        }
    }

    fn severity(&self, distance: f64) -> AccidentSeverity {
        let ratio = distance / self.thresholds.accident;
        if ratio < 1.0 / 3.0 {
            AccidentSeverity::Severe
        } else if ratio < 2.0 / 3.0 {
            AccidentSeverity::Major
        } else {
            AccidentSeverity::Minor
        }
    }

    /// Sweep all non-parked agents once.
    ///
    /// Pairs are evaluated in ascending `(lower id, higher id)` order. An agent
    /// halted earlier in this sweep cannot be part of a new accident, and
    /// neither can a pair that was already down in an emergency before it;
    /// such pairs are reported as critical instead. A flying agent that comes
    /// within accident distance of a downed one is a new accident.
    pub fn sweep(&mut self, agents: &mut [FlightAgent], tick: u64) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        let pairs = self.candidate_pairs(agents);

        for (i, j) in pairs {
            let distance = agents[i].position.distance(agents[j].position);
            let Some(tier) = self.classify(distance) else {
                continue;
            };

            let (first, second) = (agents[i].id, agents[j].id);
            let halted_this_sweep =
                outcome.halted.contains(&first) || outcome.halted.contains(&second);
            let both_down_already =
                agents[i].status.is_emergency() && agents[j].status.is_emergency();
            let tier = if tier == ProximityTier::Accident
                && (halted_this_sweep || both_down_already)
            {
                ProximityTier::Critical
            } else {
                tier
            };

            if tier != ProximityTier::Accident {
                outcome.proximities.push(Proximity {
                    first,
                    second,
                    distance,
                    tier,
                });
                continue;
            }

            let position = agents[i].position.midpoint(agents[j].position);
            let record = AccidentRecord {
                id: self.next_accident_id,
                position,
                severity: self.severity(distance),
                timestamp: Utc::now(),
                tick,
                agents: (first, second),
                active: true,
            };
            self.next_accident_id += 1;

            for idx in [i, j] {
                agents[idx].hazards.accident_hazard = true;
                agents[idx].halt();
                outcome.halted.push(agents[idx].id);
            }

            tracing::warn!(
                "Accident #{} between {} and {} at {} ({:.1} units, {:?})",
                record.id,
                first,
                second,
                record.position,
                distance,
                record.severity
            );
            outcome.accidents.push(record);
        }

        outcome
    }

    /// Candidate index pairs `(i, j)` within warning distance of each other's
    /// grid cell, ordered by agent id.
    ///
    /// Uses a uniform grid with cell size equal to the warning distance so
    /// only neighboring cells are compared.
    fn candidate_pairs(&self, agents: &[FlightAgent]) -> Vec<(usize, usize)> {
        let mut order: Vec<usize> = (0..agents.len())
            .filter(|&idx| agents[idx].status != AgentStatus::Parked)
            .collect();
        order.sort_by_key(|&idx| agents[idx].id);
        if order.len() < 2 {
            return Vec::new();
        }

        let cell_size = self.thresholds.warning.max(1.0);
        let cell_of = |p: Point| {
            (
                (p.x / cell_size).floor() as i64,
                (p.y / cell_size).floor() as i64,
            )
        };

        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for &idx in &order {
            grid.entry(cell_of(agents[idx].position))
                .or_default()
                .push(idx);
        }

        let mut pairs = Vec::new();
        for &i in &order {
            let (cx, cy) = cell_of(agents[i].position);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(indices) = grid.get(&(cx + dx, cy + dy)) else {
                        continue;
                    };
                    for &j in indices {
                        if agents[j].id > agents[i].id {
                            pairs.push((i, j));
                        }
                    }
                }
            }
        }

        pairs.sort_by_key(|&(i, j)| (agents[i].id, agents[j].id));
        pairs
    }
}
