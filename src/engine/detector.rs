use std::collections::HashSet;

use crate::geo::{distance_meters, Coordinate};
use crate::poi::{PoiId, PointOfInterest};

/// Threshold-entry detection over the active POI subset.
///
/// The detected set grows monotonically for the lifetime of a session: a POI
/// triggers at most once, no matter how many ticks the user spends inside
/// its radius.
pub struct ProximityDetector {
    threshold_m: f64,
}

impl ProximityDetector {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    /// Collect POIs newly within threshold of `position`, marking them
    /// detected. The returned batch is sorted nearest-first.
    pub fn scan(
        &self,
        position: Coordinate,
        active: &[PointOfInterest],
        detected: &mut HashSet<PoiId>,
    ) -> Vec<PointOfInterest> {
        let mut entered: Vec<(f64, PointOfInterest)> = Vec::new();
        for poi in active {
            if detected.contains(&poi.id) {
                continue;
            }
            let d = distance_meters(position, poi.coordinates);
            if d <= self.threshold_m {
                detected.insert(poi.id.clone());
                entered.push((d, poi.clone()));
            }
        }
        entered.sort_by(|a, b| a.0.total_cmp(&b.0));
        entered.into_iter().map(|(_, poi)| poi).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::offset_meters;

    const USER: Coordinate = Coordinate {
        latitude: 59.3293,
        longitude: 18.0686,
    };

    fn poi(id: &str, coord: Coordinate) -> PointOfInterest {
        PointOfInterest {
            id: id.to_string(),
            name: id.to_string(),
            coordinates: coord,
            description: None,
            image_url: None,
            categories: None,
        }
    }

    #[test]
    fn test_detects_within_threshold_only() {
        let detector = ProximityDetector::new(30.0);
        let active = vec![
            poi("in", offset_meters(USER, 20.0, 0.0)),
            poi("out", offset_meters(USER, 80.0, 0.0)),
        ];
        let mut detected = HashSet::new();
        let batch = detector.scan(USER, &active, &mut detected);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, "in");
        assert!(detected.contains("in"));
        assert!(!detected.contains("out"));
    }

    #[test]
    fn test_no_double_detection_across_ticks() {
        let detector = ProximityDetector::new(30.0);
        let active = vec![poi("p", offset_meters(USER, 10.0, 0.0))];
        let mut detected = HashSet::new();

        let first = detector.scan(USER, &active, &mut detected);
        assert_eq!(first.len(), 1);

        // User stays inside the radius for many ticks
        for _ in 0..5 {
            let again = detector.scan(USER, &active, &mut detected);
            assert!(again.is_empty());
        }
        assert_eq!(detected.len(), 1);
    }

    #[test]
    fn test_batch_is_sorted_nearest_first() {
        let detector = ProximityDetector::new(100.0);
        let active = vec![
            poi("far", offset_meters(USER, 90.0, 0.0)),
            poi("near", offset_meters(USER, 10.0, 0.0)),
            poi("mid", offset_meters(USER, 50.0, 0.0)),
        ];
        let mut detected = HashSet::new();
        let batch = detector.scan(USER, &active, &mut detected);
        let ids: Vec<_> = batch.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["near", "mid", "far"]);
    }
}
