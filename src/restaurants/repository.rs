use sqlx::PgPool;

use crate::error::ApiError;
use crate::restaurants::{Driver, Restaurant};

const RESTAURANT_COLUMNS: &str = "id, name, latitude, longitude, zone, delivery_active, \
     pickup_active, minimum_order_amount, geofence_kml, opens_at, closes_at, is_active, \
     created_at, updated_at";

/// Repository for the restaurant registry
#[derive(Clone)]
pub struct RestaurantsRepository {
    pool: PgPool,
}

impl RestaurantsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Restaurant>, ApiError> {
        let restaurant = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {} FROM restaurants WHERE id = $1",
            RESTAURANT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(restaurant)
    }

    pub async fn list_active(&self) -> Result<Vec<Restaurant>, ApiError> {
        let restaurants = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {} FROM restaurants WHERE is_active = TRUE ORDER BY name",
            RESTAURANT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }

    /// Restaurants eligible for geofence resolution
    pub async fn list_delivery_active(&self) -> Result<Vec<Restaurant>, ApiError> {
        let restaurants = sqlx::query_as::<_, Restaurant>(&format!(
            r#"
            SELECT {}
            FROM restaurants
            WHERE is_active = TRUE AND delivery_active = TRUE AND geofence_kml IS NOT NULL
            "#,
            RESTAURANT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }

    pub async fn list_pickup_active(&self) -> Result<Vec<Restaurant>, ApiError> {
        let restaurants = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {} FROM restaurants WHERE is_active = TRUE AND pickup_active = TRUE",
            RESTAURANT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(restaurants)
    }
}

/// Repository for driver registry reads
#[derive(Clone)]
pub struct DriversRepository {
    pool: PgPool,
}

impl DriversRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Driver>, ApiError> {
        let driver = sqlx::query_as::<_, Driver>(
            "SELECT id, restaurant_id, name, phone, is_active FROM drivers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(driver)
    }
}
