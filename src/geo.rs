use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (spherical approximation)
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude
pub const M_PER_DEG_LAT: f64 = 111_320.0;

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// The inner square root argument is clamped to [0, 1] so near-identical
/// and antipodal points stay numerically stable.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let sin_half_d_lat = (d_lat / 2.0).sin();
    let sin_half_d_lon = (d_lon / 2.0).sin();
    let h = sin_half_d_lat * sin_half_d_lat
        + lat1.cos() * lat2.cos() * sin_half_d_lon * sin_half_d_lon;
    let h = h.clamp(0.0, 1.0);

    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Offset a coordinate by meters east (`dx`) and north (`dy`) using a local
/// tangent-plane approximation.
///
/// Only used for synthetic position generation (demo walk, tests); distance
/// truth always comes from [`distance_meters`].
pub fn offset_meters(base: Coordinate, dx_meters: f64, dy_meters: f64) -> Coordinate {
    let lat_deg = dy_meters / M_PER_DEG_LAT;
    let lon_deg = dx_meters / (M_PER_DEG_LAT * base.latitude.to_radians().cos());
    Coordinate {
        latitude: base.latitude + lat_deg,
        longitude: base.longitude + lon_deg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCKHOLM: Coordinate = Coordinate {
        latitude: 59.3293,
        longitude: 18.0686,
    };

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_meters(STOCKHOLM, STOCKHOLM), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let gothenburg = Coordinate::new(57.7089, 11.9746);
        let ab = distance_meters(STOCKHOLM, gothenburg);
        let ba = distance_meters(gothenburg, STOCKHOLM);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // Stockholm to Gothenburg is roughly 397 km as the crow flies
        let gothenburg = Coordinate::new(57.7089, 11.9746);
        let d = distance_meters(STOCKHOLM, gothenburg);
        assert!(d > 390_000.0 && d < 410_000.0, "got {d}");
    }

    #[test]
    fn test_triangle_inequality() {
        let b = Coordinate::new(59.34, 18.08);
        let c = Coordinate::new(59.35, 18.05);
        let ab = distance_meters(STOCKHOLM, b);
        let ac = distance_meters(STOCKHOLM, c);
        let cb = distance_meters(c, b);
        assert!(ab <= ac + cb + 1e-6);
    }

    #[test]
    fn test_antipodal_points_are_stable() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let d = distance_meters(a, b);
        assert!(d.is_finite());
        // Half the Earth's circumference, ~20,015 km
        assert!((d - std::f64::consts::PI * 6_371_000.0).abs() < 1_000.0);
    }

    #[test]
    fn test_offset_matches_distance() {
        let moved = offset_meters(STOCKHOLM, 0.0, 100.0);
        let d = distance_meters(STOCKHOLM, moved);
        assert!((d - 100.0).abs() < 1.0, "got {d}");

        let moved = offset_meters(STOCKHOLM, 100.0, 0.0);
        let d = distance_meters(STOCKHOLM, moved);
        assert!((d - 100.0).abs() < 1.0, "got {d}");
    }
}
