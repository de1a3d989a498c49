//! Time utilities for game simulation

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // 60 ticks per second

/// Fixed simulation slice handed to every physics step (in seconds)
pub fn tick_delta() -> f64 {
    1.0 / SIMULATION_TPS as f64
}

/// Wall-clock period between two ticks of a match
pub fn tick_period() -> Duration {
    Duration::from_secs_f64(tick_delta())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_period_matches_delta() {
        assert_eq!(tick_delta(), 1.0 / 60.0);
        assert_eq!(tick_period().as_micros(), 16_666);
    }

    #[test]
    fn uptime_after_init() {
        init_server_time();
        assert!(uptime_secs() < 60);
    }
}
