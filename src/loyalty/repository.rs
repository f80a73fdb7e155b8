use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::loyalty::{LoyaltyError, PointsTransaction, PointsTransactionType};

const TRANSACTION_COLUMNS: &str =
    "id, customer_id, points, transaction_type, order_id, notes, created_at";

/// Repository for the append-only points ledger
#[derive(Clone)]
pub struct PointsTransactionsRepository {
    pool: PgPool,
}

impl PointsTransactionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one signed ledger row inside the caller's transaction
    pub async fn append(
        &self,
        conn: &mut PgConnection,
        customer_id: i32,
        points: i32,
        transaction_type: PointsTransactionType,
        order_id: Option<Uuid>,
        notes: Option<&str>,
    ) -> Result<PointsTransaction, sqlx::Error> {
        sqlx::query_as::<_, PointsTransaction>(&format!(
            r#"
            INSERT INTO customer_points_transactions
                (customer_id, points, transaction_type, order_id, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(customer_id)
        .bind(points)
        .bind(transaction_type)
        .bind(order_id)
        .bind(notes)
        .fetch_one(conn)
        .await
    }

    pub async fn list_for_customer(
        &self,
        customer_id: i32,
    ) -> Result<Vec<PointsTransaction>, LoyaltyError> {
        let transactions = sqlx::query_as::<_, PointsTransaction>(&format!(
            r#"
            SELECT {}
            FROM customer_points_transactions
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Signed sum of the customer's ledger; must equal the denormalized
    /// balance at all times
    pub async fn signed_sum(&self, customer_id: i32) -> Result<i64, LoyaltyError> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(points)::BIGINT FROM customer_points_transactions WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }
}
