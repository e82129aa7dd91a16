use std::time::Duration;

/// Engine tuning knobs.
///
/// The thresholds are deliberately configuration, not constants: deployments
/// have run anywhere from 10 m to 300 m proximity depending on POI density.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Distance (m) at which a POI counts as entered
    pub proximity_threshold_m: f64,
    /// Extra distance (m) beyond the proximity threshold before playback is
    /// considered wandering
    pub wander_margin_m: f64,
    /// Displacement (m) from the last fetch origin that triggers a POI
    /// refetch
    pub refetch_distance_m: f64,
    /// Detection tick period
    pub tick_period: Duration,
    /// Playback progress poll period
    pub poll_period: Duration,
    /// User identifier forwarded to the data service
    pub user_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m: 30.0,
            wander_margin_m: 100.0,
            refetch_distance_m: 300.0,
            tick_period: Duration::from_millis(300),
            poll_period: Duration::from_millis(200),
            user_id: "default".to_string(),
        }
    }
}
