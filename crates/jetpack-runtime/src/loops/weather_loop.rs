//! Weather cadence.
//!
//! Advances the weather model on its own, slower period and publishes each
//! reading; the flight clock picks up whatever was published last.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};

use crate::state::AppState;
use jetpack_core::WeatherModel;

pub async fn run_weather_loop(
    state: Arc<AppState>,
    mut model: WeatherModel,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    // The initial reading is already published; the first change waits a full period.
    let mut ticker = interval_at(Instant::now() + period, period);
    state.publish_weather(model.current());

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Weather loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                state.mark_loop_heartbeat("weather");
                let weather = model.advance();
                state.publish_weather(weather);
            }
        }
    }
}
