//! Background loops for the always-on runtime.

pub mod event_log_loop;
pub mod radio_loop;
pub mod simulation_loop;
pub mod weather_loop;
