use crate::geo::{distance_meters, Coordinate};
use crate::poi::{PoiId, PointOfInterest};

/// Ordered work queue of POIs awaiting narration.
///
/// Re-sorted by live distance before every pop, so a POI the user is now
/// closest to jumps ahead of one detected earlier. Never holds duplicate
/// ids. Mutation happens only under the engine's state lock; resort-and-pop
/// is a single atomic step relative to detector appends.
#[derive(Debug, Default)]
pub struct GuideQueue {
    entries: Vec<PointOfInterest>,
}

impl GuideQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a detection batch, skipping ids already queued
    pub fn push_batch(&mut self, batch: Vec<PointOfInterest>) {
        for poi in batch {
            if !self.contains(&poi.id) {
                self.entries.push(poi);
            }
        }
    }

    /// Re-sort ascending by distance from `position` and remove the front
    /// entry
    pub fn resort_and_pop(&mut self, position: Option<Coordinate>) -> Option<PointOfInterest> {
        if let Some(pos) = position {
            self.entries.sort_by(|a, b| {
                distance_meters(pos, a.coordinates).total_cmp(&distance_meters(pos, b.coordinates))
            });
        }
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub fn contains(&self, id: &PoiId) -> bool {
        self.entries.iter().any(|p| &p.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
