//! Waypoint authority arbitration and per-tick motion integration.
//!
//! Several sources compete for the point an agent flies toward. Priority,
//! highest first:
//!
//! 1. radio destination
//! 2. head of the detour queue
//! 3. hold in place while halted, or while landing with no detour left
//! 4. head of the waypoint queue
//! 5. final destination

use crate::agent::FlightAgent;
use crate::config::{HazardMultipliers, SimulationConfig};
use crate::geometry::Point;
use crate::models::{AgentId, AgentStatus, ParkingPhase};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    Radio,
    Detour,
    Hold,
    Waypoint,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTarget {
    pub point: Point,
    pub source: TargetSource,
}

/// Result of one motion step for one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStep {
    pub agent: AgentId,
    pub target: ResolvedTarget,
    /// Source whose target was reached this tick, if any
    pub reached: Option<TargetSource>,
    /// True when the final destination was reached and parking should begin
    pub arrived: bool,
}

/// Point the agent should move toward this tick.
pub fn resolve_target(agent: &FlightAgent) -> ResolvedTarget {
    let hold = ResolvedTarget {
        point: agent.position,
        source: TargetSource::Hold,
    };
    if agent.status == AgentStatus::EmergencyHalt || agent.status == AgentStatus::Parked {
        return hold;
    }

    if let Some(point) = agent.radio_destination {
        return ResolvedTarget {
            point,
            source: TargetSource::Radio,
        };
    }
    if let Some(&point) = agent.detour.front() {
        return ResolvedTarget {
            point,
            source: TargetSource::Detour,
        };
    }
    if agent.status == AgentStatus::EmergencyLanding {
        return hold;
    }
    if let Some(&point) = agent.waypoints.front() {
        return ResolvedTarget {
            point,
            source: TargetSource::Waypoint,
        };
    }
    ResolvedTarget {
        point: agent.destination,
        source: TargetSource::Destination,
    }
}

/// Effective speed for this tick; never above `base_speed`.
pub fn resolve_speed(agent: &FlightAgent, multipliers: &HazardMultipliers) -> f64 {
    if agent.status == AgentStatus::Parked || agent.hazards.emergency_halt {
        return 0.0;
    }

    let flags = &agent.hazards;
    let factor = [
        (flags.inclement_weather, multipliers.inclement_weather),
        (flags.building_collapse, multipliers.building_collapse),
        (flags.accident_hazard, multipliers.accident_hazard),
        (flags.restricted_activity, multipliers.restricted_activity),
    ]
    .into_iter()
    .filter(|(active, _)| *active)
    .map(|(_, multiplier)| multiplier.clamp(0.0, 1.0))
    .fold(1.0_f64, f64::min);

    agent.base_speed * factor
}

/// Resolve target and speed, then move the agent one tick.
pub fn advance(agent: &mut FlightAgent, config: &SimulationConfig) -> MotionStep {
    adjust_altitude(agent, config.climb_rate);

    let speed = resolve_speed(agent, &config.hazards);
    agent.effective_speed = speed;

    let target = resolve_target(agent);
    let mut step = MotionStep {
        agent: agent.id,
        target,
        reached: None,
        arrived: false,
    };
    if target.source == TargetSource::Hold {
        return step;
    }

    agent.position = agent.position.move_toward(target.point, speed);
    if agent.position.distance(target.point) >= config.arrival_epsilon {
        return step;
    }

    step.reached = Some(target.source);
    match target.source {
        TargetSource::Radio => {
            agent.radio_destination = None;
        }
        TargetSource::Detour => {
            agent.detour.pop_front();
        }
        TargetSource::Waypoint => {
            agent.waypoints.pop_front();
        }
        TargetSource::Destination => {
            if matches!(agent.parking, ParkingPhase::EnRoute | ParkingPhase::Departing) {
                agent.parking = ParkingPhase::Arriving;
                step.arrived = true;
            }
        }
        TargetSource::Hold => {}
    }
    agent.refresh_status();
    step
}

fn adjust_altitude(agent: &mut FlightAgent, climb_rate: f64) {
    let Some(target) = agent.radio_altitude else {
        return;
    };
    let delta = target - agent.altitude;
    if delta.abs() <= climb_rate {
        agent.altitude = target;
        agent.radio_altitude = None;
    } else {
        agent.altitude += climb_rate.copysign(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::InstructionSink;

    fn agent() -> FlightAgent {
        FlightAgent::new(
            AgentId(1),
            "JP001",
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            5.0,
        )
    }

    #[test]
    fn test_priority_radio_over_everything() {
        let mut agent = agent().with_waypoints([Point::new(20.0, 0.0)]);
        agent.set_detour([Point::new(0.0, 30.0)]);
        agent.set_radio_destination(Point::new(40.0, 40.0)).unwrap();

        let target = resolve_target(&agent);
        assert_eq!(target.source, TargetSource::Radio);
        assert_eq!(target.point, Point::new(40.0, 40.0));
    }

    #[test]
    fn test_priority_detour_then_waypoint_then_destination() {
        let mut agent = agent().with_waypoints([Point::new(20.0, 0.0)]);
        agent.set_detour([Point::new(0.0, 30.0)]);
        assert_eq!(resolve_target(&agent).source, TargetSource::Detour);

        agent.detour.clear();
        assert_eq!(resolve_target(&agent).source, TargetSource::Waypoint);

        agent.waypoints.clear();
        assert_eq!(resolve_target(&agent).source, TargetSource::Destination);
    }

    #[test]
    fn test_radio_never_yields_waypoint_or_destination() {
        let statuses = [
            AgentStatus::Active,
            AgentStatus::Detour,
            AgentStatus::FollowingInstruction,
            AgentStatus::EmergencyLanding,
        ];
        for status in statuses {
            for with_detour in [false, true] {
                let mut agent = agent().with_waypoints([Point::new(20.0, 0.0)]);
                agent.radio_destination = Some(Point::new(9.0, 9.0));
                if with_detour {
                    agent.detour.push_back(Point::new(1.0, 1.0));
                }
                agent.status = status;
                let source = resolve_target(&agent).source;
                assert!(
                    !matches!(source, TargetSource::Waypoint | TargetSource::Destination),
                    "status {status:?} detour {with_detour} resolved {source:?}"
                );
            }
        }
    }

    #[test]
    fn test_speed_hazard_composition() {
        let multipliers = HazardMultipliers {
            inclement_weather: 0.5,
            building_collapse: 0.25,
            ..HazardMultipliers::default()
        };
        let mut agent = agent();
        assert_eq!(resolve_speed(&agent, &multipliers), 5.0);

        agent.hazards.inclement_weather = true;
        assert_eq!(resolve_speed(&agent, &multipliers), 2.5);

        agent.hazards.building_collapse = true;
        assert_eq!(resolve_speed(&agent, &multipliers), 1.25);

        agent.hazards.emergency_halt = true;
        assert_eq!(resolve_speed(&agent, &multipliers), 0.0);
    }

    #[test]
    fn test_speed_never_exceeds_base() {
        let multipliers = HazardMultipliers::default();
        for bits in 0u8..32 {
            let mut agent = agent();
            agent.hazards.inclement_weather = bits & 1 != 0;
            agent.hazards.building_collapse = bits & 2 != 0;
            agent.hazards.accident_hazard = bits & 4 != 0;
            agent.hazards.restricted_activity = bits & 8 != 0;
            agent.hazards.emergency_halt = bits & 16 != 0;

            let speed = resolve_speed(&agent, &multipliers);
            assert!(speed <= agent.base_speed);
            if agent.hazards.emergency_halt {
                assert_eq!(speed, 0.0);
            }
        }
    }

    #[test]
    fn test_advance_pops_waypoints_in_order() {
        let config = SimulationConfig::default();
        let mut agent = agent().with_waypoints([Point::new(5.0, 0.0), Point::new(10.0, 0.0)]);

        let step = advance(&mut agent, &config);
        assert_eq!(step.reached, Some(TargetSource::Waypoint));
        assert_eq!(agent.waypoints.front(), Some(&Point::new(10.0, 0.0)));

        let step = advance(&mut agent, &config);
        assert_eq!(step.reached, Some(TargetSource::Waypoint));
        assert!(agent.waypoints.is_empty());
        assert_eq!(agent.position, Point::new(10.0, 0.0));
    }

    #[test]
    fn test_advance_clears_radio_on_arrival() {
        let config = SimulationConfig::default();
        let mut agent = agent();
        agent.set_radio_destination(Point::new(0.0, 8.0)).unwrap();

        advance(&mut agent, &config);
        assert_eq!(agent.status, AgentStatus::FollowingInstruction);
        let step = advance(&mut agent, &config);
        assert_eq!(step.reached, Some(TargetSource::Radio));
        assert_eq!(agent.radio_destination, None);
        assert_eq!(agent.status, AgentStatus::Active);
    }

    #[test]
    fn test_advance_marks_arriving_at_destination() {
        let config = SimulationConfig::default();
        let mut agent = agent();
        let mut ticks = 0;
        loop {
            ticks += 1;
            if advance(&mut agent, &config).arrived {
                break;
            }
            assert!(ticks < 100);
        }
        assert_eq!(ticks, 20);
        assert_eq!(agent.parking, ParkingPhase::Arriving);
    }

    #[test]
    fn test_halted_agent_holds_position() {
        let config = SimulationConfig::default();
        let mut agent = agent();
        agent.halt();
        let step = advance(&mut agent, &config);
        assert_eq!(step.target.source, TargetSource::Hold);
        assert_eq!(agent.position, Point::new(0.0, 0.0));
        assert_eq!(agent.effective_speed, 0.0);
    }

    #[test]
    fn test_altitude_drifts_to_radio_altitude() {
        let mut config = SimulationConfig::default();
        config.climb_rate = 2.0;
        let mut agent = agent().with_altitude(10.0);
        agent.set_radio_altitude(15.0).unwrap();

        advance(&mut agent, &config);
        assert_eq!(agent.altitude, 12.0);
        advance(&mut agent, &config);
        assert_eq!(agent.altitude, 14.0);
        advance(&mut agent, &config);
        assert_eq!(agent.altitude, 15.0);
        assert_eq!(agent.radio_altitude, None);
    }
}
