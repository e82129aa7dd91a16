use std::sync::{Arc, RwLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo::{offset_meters, Coordinate};

/// Shared slot holding the most recent known user position.
///
/// Written by whatever position source is wired up (a device GPS adapter, a
/// debug joystick, or [`SimulatedWalk`]); read by the detection tick and the
/// playback poll. `None` means no fix yet — consumers simply skip work.
#[derive(Clone, Default)]
pub struct PositionHandle {
    slot: Arc<RwLock<Option<Coordinate>>>,
}

impl PositionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, coord: Coordinate) {
        *self.slot.write().expect("position lock poisoned") = Some(coord);
    }

    pub fn get(&self) -> Option<Coordinate> {
        *self.slot.read().expect("position lock poisoned")
    }

    pub fn clear(&self) {
        *self.slot.write().expect("position lock poisoned") = None;
    }
}

/// A random stroll generator used by the demo binary and scenario tests.
///
/// Each step nudges the heading by a bounded jitter and advances a fixed
/// number of meters, producing a plausible meandering walk.
pub struct SimulatedWalk {
    position: Coordinate,
    heading_rad: f64,
    step_m: f64,
    turn_jitter_rad: f64,
    rng: StdRng,
}

impl SimulatedWalk {
    pub fn new(start: Coordinate, step_m: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let heading_rad = rng.gen_range(0.0..std::f64::consts::TAU);
        Self {
            position: start,
            heading_rad,
            step_m,
            turn_jitter_rad: 0.4,
            rng,
        }
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    /// Take one step and return the new position
    pub fn advance(&mut self) -> Coordinate {
        let jitter = self.turn_jitter_rad;
        self.heading_rad += self.rng.gen_range(-jitter..jitter);
        let dx = self.step_m * self.heading_rad.cos();
        let dy = self.step_m * self.heading_rad.sin();
        self.position = offset_meters(self.position, dx, dy);
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance_meters;

    #[test]
    fn test_handle_starts_empty() {
        let handle = PositionHandle::new();
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let handle = PositionHandle::new();
        let coord = Coordinate::new(59.3293, 18.0686);
        handle.set(coord);
        assert_eq!(handle.get(), Some(coord));
        handle.clear();
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_walk_steps_are_step_sized() {
        let start = Coordinate::new(59.3293, 18.0686);
        let mut walk = SimulatedWalk::new(start, 5.0, 42);
        let mut prev = walk.position();
        for _ in 0..20 {
            let next = walk.advance();
            let d = distance_meters(prev, next);
            assert!((d - 5.0).abs() < 0.5, "step was {d} m");
            prev = next;
        }
    }

    #[test]
    fn test_walk_is_deterministic_per_seed() {
        let start = Coordinate::new(59.3293, 18.0686);
        let mut a = SimulatedWalk::new(start, 5.0, 7);
        let mut b = SimulatedWalk::new(start, 5.0, 7);
        for _ in 0..10 {
            assert_eq!(a.advance(), b.advance());
        }
    }
}
