use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::catalog::CatalogError;
use crate::geo::GeoError;

/// Error types for cart operations
///
/// Domain preconditions carry distinct machine-readable codes so the client
/// can render a specific message; they are expected outcomes, not crashes.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cart item {0} not found")]
    ItemNotFound(i32),

    #[error("You do not have permission to access this cart")]
    Forbidden,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("The cart is empty")]
    EmptyCart,

    #[error("A delivery address must be attached before switching to delivery")]
    DeliveryAddressRequired,

    #[error("Delivery address {0} not found")]
    AddressNotFound(i32),

    #[error("The delivery address is outside every delivery zone")]
    AddressOutsideDeliveryZone,

    #[error("Restaurant {0} not found or not available for the requested service")]
    RestaurantUnavailable(i32),

    #[error("The referenced item is not available for ordering")]
    ItemInactive,

    #[error("The cart was modified concurrently; retry the operation")]
    Conflict,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Geo(#[from] GeoError),
}

impl CartError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CartError::DatabaseError(_) => "DATABASE_ERROR",
            CartError::ItemNotFound(_) => "CART_ITEM_NOT_FOUND",
            CartError::Forbidden => "FORBIDDEN",
            CartError::InvalidQuantity => "INVALID_QUANTITY",
            CartError::EmptyCart => "CART_EMPTY",
            CartError::DeliveryAddressRequired => "DELIVERY_ADDRESS_REQUIRED",
            CartError::AddressNotFound(_) => "ADDRESS_NOT_FOUND",
            CartError::AddressOutsideDeliveryZone => "ADDRESS_OUTSIDE_DELIVERY_ZONE",
            CartError::RestaurantUnavailable(_) => "RESTAURANT_UNAVAILABLE",
            CartError::ItemInactive => "ITEM_INACTIVE",
            CartError::Conflict => "CONFLICT",
            CartError::Catalog(e) => e.error_code(),
            CartError::Geo(e) => e.error_code(),
        }
    }
}

impl From<sqlx::Error> for CartError {
    fn from(err: sqlx::Error) -> Self {
        CartError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        // Wrapped errors carry their own mapping
        match self {
            CartError::Catalog(e) => return e.into_response(),
            CartError::Geo(e) => return e.into_response(),
            _ => {}
        }

        let status = match &self {
            CartError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CartError::ItemNotFound(_) | CartError::AddressNotFound(_) => StatusCode::NOT_FOUND,
            CartError::Forbidden => StatusCode::FORBIDDEN,
            CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
            CartError::EmptyCart
            | CartError::DeliveryAddressRequired
            | CartError::AddressOutsideDeliveryZone
            | CartError::RestaurantUnavailable(_)
            | CartError::ItemInactive => StatusCode::UNPROCESSABLE_ENTITY,
            CartError::Conflict => {
                tracing::warn!("Concurrent cart modification detected");
                StatusCode::CONFLICT
            }
            CartError::Catalog(_) | CartError::Geo(_) => unreachable!(),
        };

        let body = Json(json!({
            "error_code": self.error_code(),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}
