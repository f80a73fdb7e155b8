use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

/// Error types for geofence resolution
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Coordinates out of range: lat={lat}, lng={lng}")]
    CoordinatesOutOfRange { lat: f64, lng: f64 },

    #[error("Malformed geofence ring: {0}")]
    MalformedRing(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl GeoError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GeoError::CoordinatesOutOfRange { .. } => "COORDINATES_OUT_OF_RANGE",
            GeoError::MalformedRing(_) => "MALFORMED_GEOFENCE",
            GeoError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }
}

impl From<sqlx::Error> for GeoError {
    fn from(err: sqlx::Error) -> Self {
        GeoError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for GeoError {
    fn into_response(self) -> Response {
        let status = match self {
            GeoError::CoordinatesOutOfRange { .. } => StatusCode::BAD_REQUEST,
            GeoError::MalformedRing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GeoError::DatabaseError(ref msg) => {
                tracing::error!("Database error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error_code": self.error_code(),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}
