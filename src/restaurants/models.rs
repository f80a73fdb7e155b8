use chrono::{DateTime, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::catalog::Zone;
use crate::geo::GeoPoint;

/// A restaurant of the chain
///
/// The zone decides which of the four price columns is native to it; the
/// geofence (raw KML ring text) decides which delivery addresses it serves.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Restaurant {
    pub id: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zone: Zone,
    pub delivery_active: bool,
    pub pickup_active: bool,
    pub minimum_order_amount: Decimal,
    #[serde(skip_serializing)]
    pub geofence_kml: Option<String>,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: self.latitude,
            lng: self.longitude,
        }
    }

    /// Whether the restaurant is open at `now`
    ///
    /// Computed on demand from the stored hours; never cached in a column.
    /// Missing hours mean always open; a closing time earlier than the
    /// opening time is an overnight schedule.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match (self.opens_at, self.closes_at) {
            (Some(opens), Some(closes)) => {
                let time = now.time();
                let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), time.second())
                    .unwrap_or(time);
                if opens <= closes {
                    time >= opens && time <= closes
                } else {
                    time >= opens || time <= closes
                }
            }
            _ => true,
        }
    }
}

/// Delivery driver attached to exactly one restaurant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Driver {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
}

/// Restaurant summary for public listings
#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantResponse {
    pub id: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zone: Zone,
    pub delivery_active: bool,
    pub pickup_active: bool,
    pub minimum_order_amount: Decimal,
    pub is_open: bool,
}

impl RestaurantResponse {
    pub fn from_restaurant(restaurant: &Restaurant, now: DateTime<Utc>) -> Self {
        Self {
            id: restaurant.id,
            name: restaurant.name.clone(),
            latitude: restaurant.latitude,
            longitude: restaurant.longitude,
            zone: restaurant.zone,
            delivery_active: restaurant.delivery_active,
            pickup_active: restaurant.pickup_active,
            minimum_order_amount: restaurant.minimum_order_amount,
            is_open: restaurant.is_open_at(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn restaurant(opens: Option<&str>, closes: Option<&str>) -> Restaurant {
        Restaurant {
            id: 1,
            name: "Zona 1".to_string(),
            latitude: 14.6349,
            longitude: -90.5069,
            zone: Zone::Capital,
            delivery_active: true,
            pickup_active: true,
            minimum_order_amount: dec!(50.00),
            geofence_kml: None,
            opens_at: opens.map(|s| NaiveTime::parse_from_str(s, "%H:%M").unwrap()),
            closes_at: closes.map(|s| NaiveTime::parse_from_str(s, "%H:%M").unwrap()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_within_hours() {
        let r = restaurant(Some("08:00"), Some("20:00"));
        let noon = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 4, 22, 0, 0).unwrap();
        assert!(r.is_open_at(noon));
        assert!(!r.is_open_at(late));
    }

    #[test]
    fn test_overnight_hours() {
        let r = restaurant(Some("18:00"), Some("02:00"));
        let evening = Utc.with_ymd_and_hms(2024, 6, 4, 23, 0, 0).unwrap();
        let morning = Utc.with_ymd_and_hms(2024, 6, 4, 1, 0, 0).unwrap();
        let midday = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
        assert!(r.is_open_at(evening));
        assert!(r.is_open_at(morning));
        assert!(!r.is_open_at(midday));
    }

    #[test]
    fn test_missing_hours_means_always_open() {
        let r = restaurant(None, None);
        assert!(r.is_open_at(Utc::now()));
    }

    #[test]
    fn test_inactive_restaurant_is_never_open() {
        let mut r = restaurant(None, None);
        r.is_active = false;
        assert!(!r.is_open_at(Utc::now()));
    }
}
