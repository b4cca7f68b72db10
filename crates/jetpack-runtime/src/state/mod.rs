//! Shared runtime state.

mod store;

pub use store::{AppState, StateReceivers};
