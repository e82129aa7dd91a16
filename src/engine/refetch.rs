use crate::geo::{distance_meters, Coordinate};

/// Decides when the backend POI set needs refreshing, independent of the
/// tick rate: only once the user has displaced far enough from the last
/// successful fetch origin.
#[derive(Debug, Clone, Copy)]
pub struct RefetchPolicy {
    refetch_distance_m: f64,
}

impl RefetchPolicy {
    pub fn new(refetch_distance_m: f64) -> Self {
        Self { refetch_distance_m }
    }

    /// True when a fetch should happen now. An unset origin always fetches.
    pub fn due(&self, origin: Option<Coordinate>, position: Coordinate) -> bool {
        match origin {
            None => true,
            Some(origin) => distance_meters(origin, position) >= self.refetch_distance_m,
        }
    }
}
