use std::collections::HashMap;

use crate::geo::{Coordinate, M_PER_DEG_LAT};
use crate::poi::PointOfInterest;

/// Bucket cell height in meters of latitude
/// Must stay well above the proximity threshold so the 3x3 window always
/// covers every POI within threshold distance
const BUCKET_SIZE_M: f64 = 2000.0;

/// Cell height in degrees of latitude
const BUCKET_LAT_DEG: f64 = BUCKET_SIZE_M / M_PER_DEG_LAT;

/// Latitudes are clamped to this band when computing cell widths to avoid
/// dividing by cos(lat) near the poles
const MAX_ABS_LAT_DEG: f64 = 85.0;

/// Cell width in degrees of longitude for the given row, compensated by
/// cos(latitude) at the row's center so cells stay approximately square.
fn bucket_lon_deg(row: i64) -> f64 {
    let center_lat = (row as f64 + 0.5) * BUCKET_LAT_DEG;
    let clamped = center_lat.clamp(-MAX_ABS_LAT_DEG, MAX_ABS_LAT_DEG);
    BUCKET_LAT_DEG / clamped.to_radians().cos()
}

/// Grid cell identifier; two POIs share a bucket iff their keys are equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub row: i64,
    pub col: i64,
}

impl BucketKey {
    pub fn of(coord: Coordinate) -> Self {
        let row = (coord.latitude / BUCKET_LAT_DEG).floor() as i64;
        let col = (coord.longitude / bucket_lon_deg(row)).floor() as i64;
        Self { row, col }
    }
}

/// The 3x3 block of buckets centered on the coordinate's bucket.
///
/// The column index is recomputed per row with that row's own longitude cell
/// width; rows above and below the center can legitimately have a different
/// width than the center row.
pub fn active_keys(coord: Coordinate) -> Vec<BucketKey> {
    let center = BucketKey::of(coord);
    let mut keys = Vec::with_capacity(9);
    for dr in -1..=1 {
        let row = center.row + dr;
        let col = (coord.longitude / bucket_lon_deg(row)).floor() as i64;
        for dc in -1..=1 {
            keys.push(BucketKey { row, col: col + dc });
        }
    }
    keys
}

/// Spatial bucket index over a POI set for O(1) average neighborhood lookup.
///
/// Built once per fetched POI set and replaced wholesale on refetch, never
/// mutated in place.
#[derive(Debug, Default)]
pub struct BucketIndex {
    cells: HashMap<BucketKey, Vec<PointOfInterest>>,
}

impl BucketIndex {
    /// Group all POIs by their bucket key in O(n)
    pub fn build(pois: &[PointOfInterest]) -> Self {
        let mut cells: HashMap<BucketKey, Vec<PointOfInterest>> = HashMap::new();
        for poi in pois {
            let key = BucketKey::of(poi.coordinates);
            cells.entry(key).or_default().push(poi.clone());
        }
        Self { cells }
    }

    /// Union of the POIs in the given buckets.
    ///
    /// No dedup is needed: a POI belongs to exactly one bucket.
    pub fn query(&self, keys: &[BucketKey]) -> Vec<PointOfInterest> {
        let mut result = Vec::new();
        for key in keys {
            if let Some(bucket) = self.cells.get(key) {
                result.extend(bucket.iter().cloned());
            }
        }
        result
    }

    /// Total number of indexed POIs
    pub fn poi_count(&self) -> usize {
        self.cells.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{distance_meters, offset_meters};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

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

    const STOCKHOLM: Coordinate = Coordinate {
        latitude: 59.3293,
        longitude: 18.0686,
    };

    #[test]
    fn test_close_points_share_a_bucket() {
        let a = BucketKey::of(STOCKHOLM);
        let b = BucketKey::of(offset_meters(STOCKHOLM, 5.0, 5.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_and_query() {
        let pois = vec![
            poi("near", offset_meters(STOCKHOLM, 50.0, 50.0)),
            poi("far", offset_meters(STOCKHOLM, 50_000.0, 50_000.0)),
        ];
        let index = BucketIndex::build(&pois);
        assert_eq!(index.poi_count(), 2);

        let active = index.query(&active_keys(STOCKHOLM));
        let ids: Vec<_> = active.iter().map(|p| p.id.as_str()).collect();
        assert!(ids.contains(&"near"));
        assert!(!ids.contains(&"far"));
    }

    #[test]
    fn test_active_keys_are_nine_distinct_cells() {
        let keys = active_keys(STOCKHOLM);
        assert_eq!(keys.len(), 9);
        let mut dedup = keys.clone();
        dedup.sort_by_key(|k| (k.row, k.col));
        dedup.dedup();
        assert_eq!(dedup.len(), 9, "keys must be distinct: {keys:?}");
    }

    #[test]
    fn test_neighbor_rows_use_their_own_cell_width() {
        // At high latitudes adjacent rows have measurably different
        // longitude cell widths; the window must still include the center
        // column of each row.
        let high = Coordinate::new(80.0, 10.0);
        let keys = active_keys(high);
        let center = BucketKey::of(high);
        for dr in -1..=1 {
            let row = center.row + dr;
            let col = (high.longitude / bucket_lon_deg(row)).floor() as i64;
            assert!(keys.contains(&BucketKey { row, col }));
        }
    }

    #[test]
    fn test_threshold_neighbors_always_covered() {
        // Any POI within the proximity threshold of the user must land in
        // the 3x3 window, for random positions and random nearby POIs.
        let mut rng = StdRng::seed_from_u64(7);
        let threshold = 300.0;

        for _ in 0..200 {
            let user = Coordinate::new(rng.gen_range(-84.0..84.0), rng.gen_range(-179.0..179.0));
            let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
            let dist: f64 = rng.gen_range(0.0..threshold);
            let p = poi(
                "p",
                offset_meters(user, dist * angle.cos(), dist * angle.sin()),
            );
            assert!(distance_meters(user, p.coordinates) <= threshold + 1.0);

            let index = BucketIndex::build(std::slice::from_ref(&p));
            let found = index.query(&active_keys(user));
            assert_eq!(found.len(), 1, "POI at {:?} missed from {user:?}", p.coordinates);
        }
    }
}
