//! Parking slots and the rest/park/depart lifecycle.
//!
//! Slot occupancy lives in a `DashMap` keyed by slot id; a claim goes through
//! the map's entry lock, so two claimants racing for the same slot can never
//! both win.

use crate::agent::FlightAgent;
use crate::geometry::{MapBounds, Point};
use crate::models::{AgentId, AgentStatus, ParkingPhase, ParkingSlot, SlotId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Registry of parking slots and their current occupants.
#[derive(Debug, Default)]
pub struct ParkingRegistry {
    slots: Vec<(SlotId, Point)>,
    occupants: DashMap<SlotId, AgentId>,
}

impl ParkingRegistry {
    pub fn new(positions: impl IntoIterator<Item = Point>) -> Self {
        let slots = positions
            .into_iter()
            .enumerate()
            .map(|(idx, position)| (SlotId(idx as u32 + 1), position))
            .collect();
        Self {
            slots,
            occupants: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn position(&self, slot: SlotId) -> Option<Point> {
        self.slots
            .iter()
            .find(|(id, _)| *id == slot)
            .map(|(_, position)| *position)
    }

    pub fn occupant(&self, slot: SlotId) -> Option<AgentId> {
        self.occupants.get(&slot).map(|entry| *entry.value())
    }

    pub fn is_occupied(&self, slot: SlotId) -> bool {
        self.occupants.contains_key(&slot)
    }

    /// Atomically claim a free slot. Returns false if it is taken or unknown.
    pub fn claim(&self, slot: SlotId, agent: AgentId) -> bool {
        if self.position(slot).is_none() {
            return false;
        }
        match self.occupants.entry(slot) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(agent);
                true
            }
        }
    }

    /// Release a slot held by `agent`. Returns false if `agent` did not hold it.
    pub fn release(&self, slot: SlotId, agent: AgentId) -> bool {
        self.occupants
            .remove_if(&slot, |_, occupant| *occupant == agent)
            .is_some()
    }

    pub fn unoccupied(&self) -> Vec<(SlotId, Point)> {
        self.slots
            .iter()
            .filter(|(id, _)| !self.is_occupied(*id))
            .copied()
            .collect()
    }

    /// Closest free slot to `point` within `max_radius` (linear scan).
    pub fn nearest_unoccupied(&self, point: Point, max_radius: f64) -> Option<(SlotId, Point)> {
        self.unoccupied()
            .into_iter()
            .map(|(id, position)| (id, position, position.distance(point)))
            .filter(|(_, _, distance)| *distance <= max_radius)
            .min_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)))
            .map(|(id, position, _)| (id, position))
    }

    /// Uniformly random free slot.
    pub fn random_unoccupied<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(SlotId, Point)> {
        let free = self.unoccupied();
        if free.is_empty() {
            return None;
        }
        Some(free[rng.random_range(0..free.len())])
    }

    pub fn snapshot(&self) -> Vec<ParkingSlot> {
        self.slots
            .iter()
            .map(|(id, position)| ParkingSlot {
                id: *id,
                position: *position,
                occupied: self.is_occupied(*id),
            })
            .collect()
    }
}

/// A phase change produced by [`ParkingLifecycle::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParkingTransition {
    pub agent: AgentId,
    pub from: ParkingPhase,
    pub to: ParkingPhase,
    pub slot: Option<SlotId>,
}

/// Drives agents through EN_ROUTE → ARRIVING → PARKED → DEPARTING → EN_ROUTE.
#[derive(Debug, Clone)]
pub struct ParkingLifecycle {
    dwell_ticks: (u32, u32),
    bounds: MapBounds,
}

impl ParkingLifecycle {
    pub fn new(dwell_ticks: (u32, u32), bounds: MapBounds) -> Self {
        let low = dwell_ticks.0.max(1);
        Self {
            dwell_ticks: (low, dwell_ticks.1.max(low)),
            bounds,
        }
    }

    fn sample_dwell<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.random_range(self.dwell_ticks.0..=self.dwell_ticks.1)
    }

    /// Random destination inside the map's inner extent.
    pub fn random_destination<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let (min, max) = self.bounds.inner_extent();
        let x = if max.x > min.x {
            rng.random_range(min.x..max.x)
        } else {
            min.x
        };
        let y = if max.y > min.y {
            rng.random_range(min.y..max.y)
        } else {
            min.y
        };
        Point::new(x, y)
    }

    /// Put an agent on a slot it has already claimed.
    pub fn park<R: Rng + ?Sized>(&self, agent: &mut FlightAgent, slot: SlotId, rng: &mut R) {
        agent.parking = ParkingPhase::Parked;
        agent.status = AgentStatus::Parked;
        agent.parked_slot = Some(slot);
        agent.effective_speed = 0.0;
        agent.dwell_remaining = self.sample_dwell(rng);
        agent.hazards.accident_hazard = false;
        agent.hazards.emergency_halt = false;
        agent.landing = None;
        agent.detour.clear();
        agent.radio_destination = None;
    }

    /// Advance the agent's parking phase by one tick.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        agent: &mut FlightAgent,
        registry: &ParkingRegistry,
        rng: &mut R,
    ) -> Option<ParkingTransition> {
        match agent.parking {
            ParkingPhase::EnRoute => None,
            ParkingPhase::Arriving => {
                let (slot, _) = registry.random_unoccupied(rng)?;
                if !registry.claim(slot, agent.id) {
                    return None;
                }
                self.park(agent, slot, rng);
                tracing::info!(
                    "{} parked on {} for {} ticks",
                    agent.callsign,
                    slot,
                    agent.dwell_remaining
                );
                Some(ParkingTransition {
                    agent: agent.id,
                    from: ParkingPhase::Arriving,
                    to: ParkingPhase::Parked,
                    slot: Some(slot),
                })
            }
            ParkingPhase::Parked => {
                agent.effective_speed = 0.0;
                agent.dwell_remaining = agent.dwell_remaining.saturating_sub(1);
                if agent.dwell_remaining > 0 {
                    return None;
                }

                let slot = agent.parked_slot.take();
                if let Some(slot) = slot {
                    if !registry.release(slot, agent.id) {
                        tracing::warn!("{} released {} it did not hold", agent.callsign, slot);
                    }
                }
                agent.destination = self.random_destination(rng);
                agent.waypoints.clear();
                agent.parking = ParkingPhase::Departing;
                agent.status = AgentStatus::Active;
                agent.refresh_status();
                tracing::info!(
                    "{} departing toward {}",
                    agent.callsign,
                    agent.destination
                );
                Some(ParkingTransition {
                    agent: agent.id,
                    from: ParkingPhase::Parked,
                    to: ParkingPhase::Departing,
                    slot,
                })
            }
            ParkingPhase::Departing => {
                agent.parking = ParkingPhase::EnRoute;
                Some(ParkingTransition {
                    agent: agent.id,
                    from: ParkingPhase::Departing,
                    to: ParkingPhase::EnRoute,
                    slot: None,
                })
            }
        }
    }
}
