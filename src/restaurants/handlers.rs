// HTTP handlers for the restaurant registry read surface

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::error::ApiError;
use crate::restaurants::RestaurantResponse;

/// Handler for GET /api/restaurants
pub async fn list_restaurants_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<RestaurantResponse>>, ApiError> {
    let now = Utc::now();
    let restaurants = state.restaurants_repo.list_active().await?;

    let responses = restaurants
        .iter()
        .map(|r| RestaurantResponse::from_restaurant(r, now))
        .collect();

    Ok(Json(responses))
}

/// Handler for GET /api/restaurants/{id}
pub async fn get_restaurant_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant = state
        .restaurants_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Restaurant".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(RestaurantResponse::from_restaurant(
        &restaurant,
        Utc::now(),
    )))
}
