//! Event log.
//!
//! Drains the simulation's events and writes them through `tracing`, one
//! line per event with a JSON payload.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::state::AppState;
use jetpack_core::{ProximityTier, SimEvent};

/// Running count of logged events, keyed by event kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventTally {
    pub counts: BTreeMap<&'static str, u64>,
}

impl EventTally {
    pub fn record(&mut self, event: &SimEvent) {
        *self.counts.entry(kind(event)).or_default() += 1;
    }

    pub fn get(&self, kind: &str) -> u64 {
        self.counts.get(kind).copied().unwrap_or(0)
    }
}

pub fn kind(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::Proximity(_) => "proximity",
        SimEvent::Accident(_) => "accident",
        SimEvent::Emergency(_) => "emergency",
        SimEvent::Parking(_) => "parking",
        SimEvent::WeatherChanged(_) => "weather",
        SimEvent::ClaimLost { .. } => "claim_lost",
    }
}

fn log_event(event: &SimEvent) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!("Failed to encode {} event: {}", kind(event), err);
            return;
        }
    };
    match event {
        SimEvent::Accident(_) => tracing::warn!(target: "jetpack::events", "{}", payload),
        SimEvent::Proximity(p) if p.tier == ProximityTier::Critical => {
            tracing::info!(target: "jetpack::events", "{}", payload)
        }
        SimEvent::Emergency(_) | SimEvent::WeatherChanged(_) => {
            tracing::info!(target: "jetpack::events", "{}", payload)
        }
        _ => tracing::debug!(target: "jetpack::events", "{}", payload),
    }
}

/// Log events until shutdown or until every sender is gone; returns the tally.
pub async fn run_event_log_loop(
    state: Arc<AppState>,
    mut rx: mpsc::Receiver<SimEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> EventTally {
    let mut tally = EventTally::default();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Event log loop shutting down");
                break;
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        state.mark_loop_heartbeat("event-log");
                        log_event(&event);
                        tally.record(&event);
                    }
                    None => {
                        tracing::info!("Event channel closed");
                        break;
                    }
                }
            }
        }
    }

    while let Ok(event) = rx.try_recv() {
        log_event(&event);
        tally.record(&event);
    }
    let dropped = state.dropped_events();
    if dropped > 0 {
        tracing::warn!("{} event(s) dropped on a full channel", dropped);
    }
    tally
}
