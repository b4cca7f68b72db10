//! Shared library surface for the runtime binary and its tests.

pub mod config;
pub mod loops;
pub mod state;
