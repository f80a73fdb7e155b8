// HTTP handlers for address validation against store service areas

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::Zone;
use crate::geo::{AddressResolution, GeoError, NearbyPickup};
use crate::restaurants::RestaurantResponse;
use crate::validation::{validate_latitude, validate_longitude};

/// Request DTO for address validation
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateAddressRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Response DTO for address validation
#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateAddressResponse {
    pub is_valid: bool,
    pub delivery_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<RestaurantResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_pickup_locations: Option<Vec<NearbyPickup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler for POST /api/addresses/validate
/// Resolves a coordinate against every restaurant's delivery polygon; when no
/// polygon covers it, suggests the nearest pickup-capable restaurants
#[utoipa::path(
    post,
    path = "/api/addresses/validate",
    request_body = ValidateAddressRequest,
    responses(
        (status = 200, description = "Resolution outcome", body = ValidateAddressResponse),
        (status = 400, description = "Coordinates out of range")
    ),
    tag = "addresses"
)]
pub async fn validate_address_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<ValidateAddressRequest>,
) -> Result<Json<ValidateAddressResponse>, GeoError> {
    // Range validation runs before any geometry
    validate_latitude(request.latitude)
        .and_then(|_| validate_longitude(request.longitude))
        .map_err(|_| GeoError::CoordinatesOutOfRange {
            lat: request.latitude,
            lng: request.longitude,
        })?;

    let nearest_limit = state
        .settings
        .ordering()
        .await
        .map_err(|e| GeoError::DatabaseError(e.to_string()))?
        .nearest_pickup_limit as usize;

    let resolution = state
        .geofence
        .resolve(request.latitude, request.longitude, nearest_limit)
        .await?;

    let response = match resolution {
        AddressResolution::Covered(resolved) => {
            tracing::debug!(
                "Address ({}, {}) resolved to restaurant {} in zone {}",
                request.latitude,
                request.longitude,
                resolved.restaurant.id,
                resolved.zone
            );
            ValidateAddressResponse {
                is_valid: true,
                delivery_available: true,
                zone: Some(resolved.zone),
                restaurant: Some(RestaurantResponse::from_restaurant(
                    &resolved.restaurant,
                    Utc::now(),
                )),
                nearest_pickup_locations: None,
                message: None,
            }
        }
        AddressResolution::Uncovered { nearest_pickup } => ValidateAddressResponse {
            is_valid: false,
            delivery_available: false,
            zone: None,
            restaurant: None,
            nearest_pickup_locations: Some(nearest_pickup),
            message: Some(
                "The address is outside every delivery zone; pickup is available nearby"
                    .to_string(),
            ),
        },
    };

    Ok(Json(response))
}
