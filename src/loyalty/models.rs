use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PointsTransactionType {
    Earned,
    Redeemed,
    Expired,
    Adjusted,
}

impl PointsTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointsTransactionType::Earned => "earned",
            PointsTransactionType::Redeemed => "redeemed",
            PointsTransactionType::Expired => "expired",
            PointsTransactionType::Adjusted => "adjusted",
        }
    }
}

impl std::fmt::Display for PointsTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only ledger row
///
/// `points` is signed: earning credits are positive, redemptions and
/// expiries negative, adjustments either. The customer's balance is the plain
/// sum of these rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PointsTransaction {
    pub id: i32,
    pub customer_id: i32,
    pub points: i32,
    pub transaction_type: PointsTransactionType,
    pub order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response DTO for the customer's balance
#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub points: i32,
    pub tier: Option<String>,
    pub earn_multiplier: Decimal,
}
