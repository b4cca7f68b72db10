//! Channels shared between the runtime loops.
//!
//! The simulation loop is the only owner of the live [`Simulation`]; every
//! other loop sees it through the latest published snapshot.
//!
//! [`Simulation`]: jetpack_core::Simulation

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use jetpack_core::{Instruction, SimEvent, SimulationSnapshot, WeatherState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Receiving ends handed to the loops that consume them.
pub struct StateReceivers {
    pub instructions: mpsc::Receiver<Instruction>,
    pub events: mpsc::Receiver<SimEvent>,
}

pub struct AppState {
    snapshot: watch::Sender<Arc<SimulationSnapshot>>,
    weather: watch::Sender<WeatherState>,
    instruction_tx: mpsc::Sender<Instruction>,
    event_tx: mpsc::Sender<SimEvent>,
    dropped_events: AtomicU64,
    dropped_instructions: AtomicU64,
    heartbeats: DashMap<&'static str, DateTime<Utc>>,
}

impl AppState {
    pub fn new(initial: SimulationSnapshot, capacity: usize) -> (Self, StateReceivers) {
        let (instruction_tx, instructions) = mpsc::channel(capacity);
        let (event_tx, events) = mpsc::channel(capacity);
        let (weather, _) = watch::channel(initial.weather);
        let (snapshot, _) = watch::channel(Arc::new(initial));

        let state = Self {
            snapshot,
            weather,
            instruction_tx,
            event_tx,
            dropped_events: AtomicU64::new(0),
            dropped_instructions: AtomicU64::new(0),
            heartbeats: DashMap::new(),
        };
        (
            state,
            StateReceivers {
                instructions,
                events,
            },
        )
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<SimulationSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Arc<SimulationSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn publish_snapshot(&self, snapshot: SimulationSnapshot) {
        self.snapshot.send_replace(Arc::new(snapshot));
    }

    /// Last published weather; never blocks on the weather loop.
    pub fn weather(&self) -> WeatherState {
        *self.weather.borrow()
    }

    pub fn publish_weather(&self, weather: WeatherState) {
        self.weather.send_replace(weather);
    }

    /// Queue a radio instruction for the next tick.
    ///
    /// Returns false when the queue is full or closed.
    pub fn send_instruction(&self, instruction: Instruction) -> bool {
        match self.instruction_tx.try_send(instruction) {
            Ok(()) => true,
            Err(err) => {
                self.dropped_instructions.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Dropped radio instruction: {}", err);
                false
            }
        }
    }

    /// Hand an event to the event log without waiting.
    pub fn forward_event(&self, event: SimEvent) {
        if self.event_tx.try_send(event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub fn dropped_instructions(&self) -> u64 {
        self.dropped_instructions.load(Ordering::Relaxed)
    }

    pub fn mark_loop_heartbeat(&self, name: &'static str) {
        self.heartbeats.insert(name, Utc::now());
    }

    pub fn last_heartbeat(&self, name: &str) -> Option<DateTime<Utc>> {
        self.heartbeats.get(name).map(|entry| *entry.value())
    }
}
