use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::Zone;
use crate::geo::{haversine_km, kml, ring_contains, GeoError, GeoPoint};
use crate::restaurants::{Restaurant, RestaurantsRepository};

/// Successful zone resolution for a delivery point
#[derive(Debug, Clone)]
pub struct ZoneResolution {
    pub restaurant: Restaurant,
    /// Copied from the winning restaurant's configured zone; zone is a
    /// pricing attribute, not a geographic computation
    pub zone: Zone,
}

/// Pickup suggestion returned when no polygon covers the point
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NearbyPickup {
    pub restaurant_id: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: f64,
}

/// Outcome of resolving a geographic point against all service areas
#[derive(Debug)]
pub enum AddressResolution {
    Covered(ZoneResolution),
    Uncovered { nearest_pickup: Vec<NearbyPickup> },
}

/// Pure containment pass over the delivery-eligible restaurants
///
/// When several polygons contain the point (overlap at boundaries is
/// legitimate) the restaurant whose stored center is closest by great-circle
/// distance wins. Restaurants with unparseable geofences are skipped.
pub fn resolve_covering(restaurants: &[Restaurant], point: &GeoPoint) -> Option<ZoneResolution> {
    let mut winner: Option<(&Restaurant, f64)> = None;

    for restaurant in restaurants {
        let Some(kml_text) = restaurant.geofence_kml.as_deref() else {
            continue;
        };
        let ring = match kml::parse_ring(kml_text) {
            Ok(ring) => ring,
            Err(err) => {
                tracing::warn!(
                    "Skipping restaurant {} with unparseable geofence: {}",
                    restaurant.id,
                    err
                );
                continue;
            }
        };
        if !ring_contains(&ring, point) {
            continue;
        }

        let distance = haversine_km(&restaurant.center(), point);
        match winner {
            Some((_, best)) if distance >= best => {}
            _ => winner = Some((restaurant, distance)),
        }
    }

    winner.map(|(restaurant, _)| ZoneResolution {
        restaurant: restaurant.clone(),
        zone: restaurant.zone,
    })
}

/// Rank pickup-capable restaurants by distance, strictly ascending
pub fn rank_nearest_pickup(
    restaurants: &[Restaurant],
    point: &GeoPoint,
    limit: usize,
) -> Vec<NearbyPickup> {
    let mut ranked: Vec<NearbyPickup> = restaurants
        .iter()
        .map(|r| NearbyPickup {
            restaurant_id: r.id,
            name: r.name.clone(),
            latitude: r.latitude,
            longitude: r.longitude,
            distance_km: haversine_km(&r.center(), point),
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

/// Resolves which restaurant serves a geographic point
#[derive(Clone)]
pub struct GeofenceResolver {
    restaurants_repo: RestaurantsRepository,
}

impl GeofenceResolver {
    pub fn new(restaurants_repo: RestaurantsRepository) -> Self {
        Self { restaurants_repo }
    }

    /// `resolveZoneAndRestaurant`: containment first, pickup fallback second
    ///
    /// The fallback suggests up to `nearest_limit` pickup restaurants; it
    /// never selects one.
    pub async fn resolve(
        &self,
        lat: f64,
        lng: f64,
        nearest_limit: usize,
    ) -> Result<AddressResolution, GeoError> {
        let point = GeoPoint::checked(lat, lng)?;

        let delivery_candidates = self
            .restaurants_repo
            .list_delivery_active()
            .await
            .map_err(|e| GeoError::DatabaseError(e.to_string()))?;

        if let Some(resolution) = resolve_covering(&delivery_candidates, &point) {
            return Ok(AddressResolution::Covered(resolution));
        }

        let pickup_candidates = self
            .restaurants_repo
            .list_pickup_active()
            .await
            .map_err(|e| GeoError::DatabaseError(e.to_string()))?;

        Ok(AddressResolution::Uncovered {
            nearest_pickup: rank_nearest_pickup(&pickup_candidates, &point, nearest_limit),
        })
    }

    /// Containment-only resolution used by order conversion
    pub async fn resolve_delivery(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<Option<ZoneResolution>, GeoError> {
        let point = GeoPoint::checked(lat, lng)?;

        let delivery_candidates = self
            .restaurants_repo
            .list_delivery_active()
            .await
            .map_err(|e| GeoError::DatabaseError(e.to_string()))?;

        Ok(resolve_covering(&delivery_candidates, &point))
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn pickup_restaurant(id: i32, lat: f64, lng: f64) -> Restaurant {
        Restaurant {
            id,
            name: format!("r{}", id),
            latitude: lat,
            longitude: lng,
            zone: Zone::Capital,
            delivery_active: false,
            pickup_active: true,
            minimum_order_amount: dec!(0),
            geofence_kml: None,
            opens_at: None,
            closes_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// The fallback ranking is always sorted non-descending by distance
    #[test]
    fn prop_nearest_pickup_is_sorted() {
        proptest!(|(
            coords in prop::collection::vec((-89.0f64..89.0, -179.0f64..179.0), 1..12),
            lat in -89.0f64..89.0,
            lng in -179.0f64..179.0,
        )| {
            let restaurants: Vec<Restaurant> = coords
                .iter()
                .enumerate()
                .map(|(i, (la, ln))| pickup_restaurant(i as i32, *la, *ln))
                .collect();
            let point = GeoPoint { lat, lng };

            let ranked = rank_nearest_pickup(&restaurants, &point, restaurants.len());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].distance_km <= pair[1].distance_km);
            }
        });
    }
}
