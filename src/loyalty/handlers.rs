// HTTP handlers for the loyalty read surface and staff adjustments

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::middleware::{AuthenticatedCustomer, StaffUser};
use crate::loyalty::{tier_for_balance, BalanceResponse, LoyaltyError, PointsTransaction};

/// Handler for GET /api/loyalty/balance
/// Returns the authenticated customer's balance, tier, and earn multiplier
pub async fn get_balance_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
) -> Result<Json<BalanceResponse>, LoyaltyError> {
    let record = state
        .customers_repo
        .find_by_id(customer.customer_id)
        .await
        .map_err(|e| LoyaltyError::DatabaseError(e.to_string()))?
        .ok_or(LoyaltyError::CustomerNotFound(customer.customer_id))?;

    let tiers = state.settings.tiers().await?;
    let tier = tier_for_balance(record.points, &tiers);

    Ok(Json(BalanceResponse {
        points: record.points,
        tier: tier.map(|t| t.name.clone()),
        earn_multiplier: tier.map(|t| t.earn_multiplier).unwrap_or(Decimal::ONE),
    }))
}

/// Handler for GET /api/loyalty/transactions
/// Returns the authenticated customer's ledger, newest first
pub async fn list_transactions_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
) -> Result<Json<Vec<PointsTransaction>>, LoyaltyError> {
    let transactions = state
        .points_repo
        .list_for_customer(customer.customer_id)
        .await?;

    Ok(Json(transactions))
}

/// Request DTO for a staff points adjustment
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustPointsRequest {
    pub customer_id: i32,
    pub delta: i32,
    #[validate(length(min = 1, message = "A reason is required"))]
    pub reason: String,
}

/// Handler for POST /api/loyalty/adjust (staff only)
pub async fn adjust_points_handler(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Json(request): Json<AdjustPointsRequest>,
) -> Result<Json<BalanceResponse>, LoyaltyError> {
    request
        .validate()
        .map_err(|e| LoyaltyError::ValidationError(e.to_string()))?;

    let result = state
        .ledger
        .adjust(request.customer_id, request.delta, &request.reason)
        .await?;

    let tiers = state.settings.tiers().await?;
    let tier = tier_for_balance(result.new_balance, &tiers);

    Ok(Json(BalanceResponse {
        points: result.new_balance,
        tier: tier.map(|t| t.name.clone()),
        earn_multiplier: tier.map(|t| t.earn_multiplier).unwrap_or(Decimal::ONE),
    }))
}
