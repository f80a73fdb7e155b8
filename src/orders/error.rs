use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::cart::{CartError, CartValidationIssue};
use crate::catalog::CatalogError;
use crate::loyalty::LoyaltyError;

/// Error types for order conversion and lifecycle operations
///
/// Every failed precondition aborts the surrounding transaction and leaves
/// the cart, order and ledger exactly as they were.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order not found")]
    NotFound,

    #[error("You do not have permission to access this order")]
    Forbidden,

    #[error("No active cart exists for this customer")]
    CartNotFound,

    #[error("The cart is empty")]
    CartEmpty,

    #[error("The cart failed validation")]
    CartInvalid(Vec<CartValidationIssue>),

    #[error("The cart was already converted")]
    AlreadyConverted,

    #[error("Restaurant {0} is not active")]
    RestaurantInactive(i32),

    #[error("Restaurant {restaurant_id} does not offer {service_type}")]
    ServiceTypeUnsupported {
        restaurant_id: i32,
        service_type: String,
    },

    #[error("A delivery address is required for delivery orders")]
    DeliveryAddressRequired,

    #[error("Delivery address {0} not found")]
    AddressNotFound(i32),

    #[error("The delivery address is outside the chosen restaurant's delivery zone")]
    AddressOutsideDeliveryZone,

    #[error("Scheduled pickup time must be at least {0} minutes from now")]
    ScheduledTooSoon(i32),

    #[error("Points to redeem must be a multiple of {0}")]
    RedemptionStepViolation(i32),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("The order can no longer be cancelled")]
    CancellationNotAllowed,

    #[error("A driver cannot be assigned at this stage")]
    DriverAssignmentNotAllowed,

    #[error("Driver {0} is not available for this restaurant")]
    DriverUnavailable(i32),

    #[error("The restaurant can no longer be changed")]
    RestaurantChangeNotAllowed,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Loyalty(#[from] LoyaltyError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

impl OrderError {
    pub fn error_code(&self) -> &'static str {
        match self {
            OrderError::DatabaseError(_) => "DATABASE_ERROR",
            OrderError::NotFound => "ORDER_NOT_FOUND",
            OrderError::Forbidden => "FORBIDDEN",
            OrderError::CartNotFound => "CART_NOT_FOUND",
            OrderError::CartEmpty => "CART_EMPTY",
            OrderError::CartInvalid(_) => "CART_INVALID",
            OrderError::AlreadyConverted => "CART_ALREADY_CONVERTED",
            OrderError::RestaurantInactive(_) => "RESTAURANT_INACTIVE",
            OrderError::ServiceTypeUnsupported { .. } => "SERVICE_TYPE_UNSUPPORTED",
            OrderError::DeliveryAddressRequired => "DELIVERY_ADDRESS_REQUIRED",
            OrderError::AddressNotFound(_) => "ADDRESS_NOT_FOUND",
            OrderError::AddressOutsideDeliveryZone => "ADDRESS_OUTSIDE_DELIVERY_ZONE",
            OrderError::ScheduledTooSoon(_) => "SCHEDULED_TIME_TOO_SOON",
            OrderError::RedemptionStepViolation(_) => "REDEMPTION_STEP_VIOLATION",
            OrderError::InvalidTransition(_) => "INVALID_STATUS_TRANSITION",
            OrderError::CancellationNotAllowed => "CANCELLATION_NOT_ALLOWED",
            OrderError::DriverAssignmentNotAllowed => "DRIVER_ASSIGNMENT_NOT_ALLOWED",
            OrderError::DriverUnavailable(_) => "DRIVER_UNAVAILABLE",
            OrderError::RestaurantChangeNotAllowed => "RESTAURANT_CHANGE_NOT_ALLOWED",
            OrderError::ValidationError(_) => "VALIDATION_ERROR",
            OrderError::Loyalty(e) => e.error_code(),
            OrderError::Catalog(e) => e.error_code(),
            OrderError::Cart(e) => e.error_code(),
        }
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        // Wrapped errors carry their own mapping
        match self {
            OrderError::Loyalty(e) => return e.into_response(),
            OrderError::Catalog(e) => return e.into_response(),
            OrderError::Cart(e) => return e.into_response(),
            _ => {}
        }

        let details = match &self {
            OrderError::CartInvalid(issues) => serde_json::to_value(issues).ok(),
            _ => None,
        };

        let status = match &self {
            OrderError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            OrderError::NotFound | OrderError::AddressNotFound(_) => StatusCode::NOT_FOUND,
            OrderError::Forbidden => StatusCode::FORBIDDEN,
            OrderError::AlreadyConverted => {
                tracing::warn!("Concurrent conversion attempt rejected");
                StatusCode::CONFLICT
            }
            OrderError::ValidationError(_) => StatusCode::BAD_REQUEST,
            OrderError::CartNotFound
            | OrderError::CartEmpty
            | OrderError::CartInvalid(_)
            | OrderError::RestaurantInactive(_)
            | OrderError::ServiceTypeUnsupported { .. }
            | OrderError::DeliveryAddressRequired
            | OrderError::AddressOutsideDeliveryZone
            | OrderError::ScheduledTooSoon(_)
            | OrderError::RedemptionStepViolation(_)
            | OrderError::InvalidTransition(_)
            | OrderError::CancellationNotAllowed
            | OrderError::DriverAssignmentNotAllowed
            | OrderError::DriverUnavailable(_)
            | OrderError::RestaurantChangeNotAllowed => StatusCode::UNPROCESSABLE_ENTITY,
            OrderError::Loyalty(_) | OrderError::Catalog(_) | OrderError::Cart(_) => {
                unreachable!()
            }
        };

        let body = Json(json!({
            "error_code": self.error_code(),
            "message": self.to_string(),
            "details": details,
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}
