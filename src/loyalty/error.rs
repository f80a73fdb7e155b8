use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

/// Error types for points ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LoyaltyError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Customer {0} not found")]
    CustomerNotFound(i32),

    #[error("Cannot redeem {requested} points with a balance of {balance}")]
    InsufficientPoints { requested: i32, balance: i32 },

    #[error("Points amount must be positive")]
    NonPositivePoints,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl LoyaltyError {
    pub fn error_code(&self) -> &'static str {
        match self {
            LoyaltyError::DatabaseError(_) => "DATABASE_ERROR",
            LoyaltyError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            LoyaltyError::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            LoyaltyError::NonPositivePoints => "INVALID_POINTS_AMOUNT",
            LoyaltyError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }
}

impl From<sqlx::Error> for LoyaltyError {
    fn from(err: sqlx::Error) -> Self {
        LoyaltyError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for LoyaltyError {
    fn into_response(self) -> Response {
        let status = match self {
            LoyaltyError::DatabaseError(ref msg) => {
                tracing::error!("Database error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            LoyaltyError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
            LoyaltyError::InsufficientPoints { .. } | LoyaltyError::NonPositivePoints => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            LoyaltyError::ValidationError(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error_code": self.error_code(),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}
