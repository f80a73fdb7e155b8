use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

/// Error types for catalog reads and price resolution
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Product {0} not found")]
    ProductNotFound(i32),

    #[error("Variant {0} not found")]
    VariantNotFound(i32),

    #[error("Combo {0} not found")]
    ComboNotFound(i32),

    #[error("Product {0} has variants; a variant must be selected")]
    VariantRequired(i32),

    #[error("Product {0} has no complete price set")]
    PriceMissing(i32),

    #[error("Exactly one of product_id or combo_id must be referenced")]
    AmbiguousItemReference,
}

impl CatalogError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogError::DatabaseError(_) => "DATABASE_ERROR",
            CatalogError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CatalogError::VariantNotFound(_) => "VARIANT_NOT_FOUND",
            CatalogError::ComboNotFound(_) => "COMBO_NOT_FOUND",
            CatalogError::VariantRequired(_) => "VARIANT_REQUIRED",
            CatalogError::PriceMissing(_) => "PRICE_MISSING",
            CatalogError::AmbiguousItemReference => "ITEM_REFERENCE_INVALID",
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = match self {
            CatalogError::DatabaseError(ref msg) => {
                tracing::error!("Database error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CatalogError::ProductNotFound(_)
            | CatalogError::VariantNotFound(_)
            | CatalogError::ComboNotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::VariantRequired(_)
            | CatalogError::PriceMissing(_)
            | CatalogError::AmbiguousItemReference => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let body = Json(json!({
            "error_code": self.error_code(),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}
