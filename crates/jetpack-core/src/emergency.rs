//! Emergency landing procedure.
//!
//! Halted agents are routed to a safe landing: first off the water (via the
//! terrain oracle's spiral search), then to the nearest free parking slot.
//! When no slot is free the agent waits at its provisional point and the
//! slot search is retried every tick.

use crate::agent::{FlightAgent, LandingPlan};
use crate::config::{LandSearch, LandingFallback};
use crate::geometry::{MapBounds, Point};
use crate::models::{AgentId, AgentStatus, ParkingPhase, SlotId};
use crate::parking::ParkingRegistry;
use crate::terrain::TerrainOracle;
use serde::{Deserialize, Serialize};

/// Result of handling one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmergencyOutcome {
    /// A landing route was built for a halted agent
    Routed {
        agent: AgentId,
        provisional: Point,
        slot: Option<SlotId>,
        over_water: bool,
        /// Set when the land search failed and the fallback policy was used
        fallback: Option<LandingFallback>,
    },
    /// A waiting agent found a free slot
    SlotAssigned { agent: AgentId, slot: SlotId },
}

#[derive(Debug, Clone)]
pub struct EmergencyHandler {
    search: LandSearch,
    slot_search_radius: f64,
    bounds: MapBounds,
}

impl EmergencyHandler {
    pub fn new(search: LandSearch, slot_search_radius: f64, bounds: MapBounds) -> Self {
        Self {
            search,
            slot_search_radius,
            bounds,
        }
    }

    /// Run the procedure for `agent` if it needs it this tick.
    pub fn handle(
        &self,
        agent: &mut FlightAgent,
        terrain: &TerrainOracle,
        registry: &ParkingRegistry,
    ) -> Option<EmergencyOutcome> {
        match agent.status {
            AgentStatus::EmergencyHalt => Some(self.plan_landing(agent, terrain, registry)),
            AgentStatus::EmergencyLanding if agent.detour.is_empty() => {
                self.retry_slot(agent, registry)
            }
            _ => None,
        }
    }

    /// Provisional landing point for `position`, resolving the open-water case.
    pub fn provisional_point(
        &self,
        position: Point,
        terrain: &TerrainOracle,
    ) -> (Point, bool, Option<LandingFallback>) {
        if !terrain.is_water(position) {
            return (position, false, None);
        }
        match terrain.find_nearest_land(position, self.search.max_radius) {
            Ok(land) => (land, true, None),
            Err(err) => {
                let fallback = self.search.fallback;
                let point = match fallback {
                    LandingFallback::MapCenter => self.bounds.center(),
                    LandingFallback::HoldPosition => position,
                };
                tracing::warn!("{}; falling back to {:?} at {}", err, fallback, point);
                (point, true, Some(fallback))
            }
        }
    }

    fn plan_landing(
        &self,
        agent: &mut FlightAgent,
        terrain: &TerrainOracle,
        registry: &ParkingRegistry,
    ) -> EmergencyOutcome {
        let (provisional, over_water, fallback) = self.provisional_point(agent.position, terrain);
        let slot = registry.nearest_unoccupied(provisional, self.slot_search_radius);

        let mut route = Vec::with_capacity(2);
        if provisional != agent.position {
            route.push(provisional);
        }
        if let Some((_, slot_position)) = slot {
            route.push(slot_position);
        }

        agent.radio_destination = None;
        agent.waypoints.clear();
        agent.detour = route.into_iter().collect();
        agent.hazards.emergency_halt = false;
        agent.status = AgentStatus::EmergencyLanding;
        agent.parking = ParkingPhase::EnRoute;
        agent.landing = Some(LandingPlan {
            provisional,
            slot: slot.map(|(id, _)| id),
        });

        match slot {
            Some((id, _)) => tracing::info!(
                "{} emergency landing via {} to {}",
                agent.callsign,
                provisional,
                id
            ),
            None => tracing::warn!(
                "{} emergency landing at {}: no free slot, waiting",
                agent.callsign,
                provisional
            ),
        }

        EmergencyOutcome::Routed {
            agent: agent.id,
            provisional,
            slot: slot.map(|(id, _)| id),
            over_water,
            fallback,
        }
    }

    fn retry_slot(
        &self,
        agent: &mut FlightAgent,
        registry: &ParkingRegistry,
    ) -> Option<EmergencyOutcome> {
        let plan = agent.landing.get_or_insert(LandingPlan {
            provisional: agent.position,
            slot: None,
        });
        if plan.slot.is_some() {
            // Still holding a slot target; the parking pass claims it on arrival.
            return None;
        }

        let (slot, position) = registry.nearest_unoccupied(agent.position, self.slot_search_radius)?;
        plan.slot = Some(slot);
        agent.detour.push_back(position);
        tracing::info!("{} assigned landing slot {}", agent.callsign, slot);
        Some(EmergencyOutcome::SlotAssigned {
            agent: agent.id,
            slot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{TerrainKind, TerrainSurface};
    use std::sync::Arc;

    fn bounds() -> MapBounds {
        MapBounds::new(1000.0, 1000.0, 10.0)
    }

    fn handler(fallback: LandingFallback) -> EmergencyHandler {
        let search = LandSearch {
            fallback,
            ..LandSearch::default()
        };
        EmergencyHandler::new(search, 2_000.0, bounds())
    }

    fn oracle(surface: impl TerrainSurface + 'static, fallback: LandingFallback) -> TerrainOracle {
        let search = LandSearch {
            fallback,
            ..LandSearch::default()
        };
        TerrainOracle::new(Arc::new(surface), bounds(), search)
    }

    fn halted_agent(x: f64, y: f64) -> FlightAgent {
        let mut agent = FlightAgent::new(AgentId(1), "JP001", Point::new(x, y), Point::new(0.0, 0.0), 5.0)
            .with_waypoints([Point::new(1.0, 1.0)]);
        agent.radio_destination = Some(Point::new(9.0, 9.0));
        agent.hazards.accident_hazard = true;
        agent.halt();
        agent
    }

    #[test]
    fn test_land_position_routes_straight_to_nearest_slot() {
        let handler = handler(LandingFallback::MapCenter);
        let terrain = oracle(|_: Point| TerrainKind::Land, LandingFallback::MapCenter);
        let registry = ParkingRegistry::new([Point::new(800.0, 800.0), Point::new(120.0, 100.0)]);
        let mut agent = halted_agent(100.0, 100.0);

        let outcome = handler.handle(&mut agent, &terrain, &registry).unwrap();
        assert_eq!(
            outcome,
            EmergencyOutcome::Routed {
                agent: AgentId(1),
                provisional: Point::new(100.0, 100.0),
                slot: Some(SlotId(2)),
                over_water: false,
                fallback: None,
            }
        );
        assert_eq!(agent.status, AgentStatus::EmergencyLanding);
        assert_eq!(agent.detour, [Point::new(120.0, 100.0)]);
        assert!(agent.radio_destination.is_none());
        assert!(agent.waypoints.is_empty());
        assert!(!agent.hazards.emergency_halt);
        assert!(agent.hazards.accident_hazard);
    }

    #[test]
    fn test_water_position_goes_to_land_before_slot() {
        let handler = handler(LandingFallback::MapCenter);
        let terrain = oracle(
            |p: Point| {
                if p.x < 400.0 {
                    TerrainKind::Water
                } else {
                    TerrainKind::Land
                }
            },
            LandingFallback::MapCenter,
        );
        let registry = ParkingRegistry::new([Point::new(600.0, 500.0)]);
        let mut agent = halted_agent(350.0, 500.0);

        handler.handle(&mut agent, &terrain, &registry).unwrap();
        assert_eq!(agent.detour.len(), 2);
        let landing_point = agent.detour[0];
        assert!(!terrain.is_water(landing_point));
        assert_eq!(agent.detour[1], Point::new(600.0, 500.0));
        assert_eq!(agent.landing.unwrap().provisional, landing_point);
    }

    #[test]
    fn test_fallback_map_center_when_no_land() {
        let handler = handler(LandingFallback::MapCenter);
        let terrain = oracle(|_: Point| TerrainKind::Water, LandingFallback::MapCenter);
        let registry = ParkingRegistry::default();
        let mut agent = halted_agent(100.0, 100.0);

        let outcome = handler.handle(&mut agent, &terrain, &registry).unwrap();
        let EmergencyOutcome::Routed {
            provisional,
            fallback,
            slot,
            ..
        } = outcome
        else {
            panic!("expected routed outcome");
        };
        assert_eq!(provisional, Point::new(500.0, 500.0));
        assert_eq!(fallback, Some(LandingFallback::MapCenter));
        assert_eq!(slot, None);
        assert_eq!(agent.detour, [Point::new(500.0, 500.0)]);
    }

    #[test]
    fn test_fallback_hold_position_when_no_land() {
        let handler = handler(LandingFallback::HoldPosition);
        let terrain = oracle(|_: Point| TerrainKind::Water, LandingFallback::HoldPosition);
        let registry = ParkingRegistry::default();
        let mut agent = halted_agent(100.0, 100.0);

        handler.handle(&mut agent, &terrain, &registry).unwrap();
        assert!(agent.detour.is_empty());
        assert_eq!(agent.landing.unwrap().provisional, Point::new(100.0, 100.0));
        assert_eq!(agent.status, AgentStatus::EmergencyLanding);
    }

    #[test]
    fn test_waiting_agent_retries_until_slot_frees() {
        let handler = handler(LandingFallback::MapCenter);
        let terrain = oracle(|_: Point| TerrainKind::Land, LandingFallback::MapCenter);
        let registry = ParkingRegistry::new([Point::new(150.0, 100.0)]);
        registry.claim(SlotId(1), AgentId(42));
        let mut agent = halted_agent(100.0, 100.0);

        handler.handle(&mut agent, &terrain, &registry).unwrap();
        assert!(agent.detour.is_empty());
        for _ in 0..5 {
            assert_eq!(handler.handle(&mut agent, &terrain, &registry), None);
            assert_eq!(agent.status, AgentStatus::EmergencyLanding);
        }

        registry.release(SlotId(1), AgentId(42));
        assert_eq!(
            handler.handle(&mut agent, &terrain, &registry),
            Some(EmergencyOutcome::SlotAssigned {
                agent: AgentId(1),
                slot: SlotId(1)
            })
        );
        assert_eq!(agent.detour, [Point::new(150.0, 100.0)]);
    }

    #[test]
    fn test_non_emergency_agents_are_ignored() {
        let handler = handler(LandingFallback::MapCenter);
        let terrain = oracle(|_: Point| TerrainKind::Land, LandingFallback::MapCenter);
        let registry = ParkingRegistry::new([Point::new(150.0, 100.0)]);
        let mut agent = FlightAgent::new(AgentId(1), "JP001", Point::new(0.0, 0.0), Point::new(1.0, 1.0), 5.0);
        assert_eq!(handler.handle(&mut agent, &terrain, &registry), None);
    }
}
