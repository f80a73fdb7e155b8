use serde::{Deserialize, Serialize};

use crate::geo::GeoError;

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A geographic point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside valid ranges before any
    /// geometry runs
    pub fn checked(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) || lat.is_nan() || lng.is_nan() {
            return Err(GeoError::CoordinatesOutOfRange { lat, lng });
        }
        Ok(Self { lat, lng })
    }
}

/// Even-odd ray-casting containment test
///
/// `ring` is an ordered list of `(lng, lat)` vertices as stored from KML.
/// A ring with fewer than 3 vertices never contains anything; degenerate or
/// self-intersecting rings are evaluated as given, without repair.
pub fn ring_contains(ring: &[(f64, f64)], point: &GeoPoint) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let (px, py) = (point.lng, point.lat);
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];

        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Great-circle distance between two points in kilometers
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Containment is a pure function: same inputs always yield the same
    /// answer
    #[test]
    fn prop_containment_is_deterministic() {
        proptest!(|(
            lat in -89.0f64..89.0,
            lng in -179.0f64..179.0,
        )| {
            let ring = vec![
                (-90.52, 14.62),
                (-90.49, 14.62),
                (-90.49, 14.65),
                (-90.52, 14.65),
                (-90.52, 14.62),
            ];
            let point = GeoPoint { lat, lng };
            prop_assert_eq!(ring_contains(&ring, &point), ring_contains(&ring, &point));
        });
    }

    /// Points well inside an axis-aligned box are contained, points well
    /// outside are not
    #[test]
    fn prop_box_containment_matches_bounds() {
        proptest!(|(
            lat in 14.63f64..14.64,
            lng in -90.51f64..-90.50,
        )| {
            let ring = vec![
                (-90.52, 14.62),
                (-90.49, 14.62),
                (-90.49, 14.65),
                (-90.52, 14.65),
                (-90.52, 14.62),
            ];
            let inside = GeoPoint { lat, lng };
            let outside = GeoPoint { lat: lat + 1.0, lng };
            prop_assert!(ring_contains(&ring, &inside));
            prop_assert!(!ring_contains(&ring, &outside));
        });
    }

    /// Distance is non-negative and symmetric
    #[test]
    fn prop_haversine_metric_basics() {
        proptest!(|(
            lat_a in -89.0f64..89.0, lng_a in -179.0f64..179.0,
            lat_b in -89.0f64..89.0, lng_b in -179.0f64..179.0,
        )| {
            let a = GeoPoint { lat: lat_a, lng: lng_a };
            let b = GeoPoint { lat: lat_b, lng: lng_b };
            let d = haversine_km(&a, &b);
            prop_assert!(d >= 0.0);
            prop_assert!((d - haversine_km(&b, &a)).abs() < 1e-6);
        });
    }
}
