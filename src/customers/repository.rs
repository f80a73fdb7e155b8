use sqlx::{PgConnection, PgPool};

use crate::customers::{Customer, CustomerAddress};
use crate::error::ApiError;

const CUSTOMER_COLUMNS: &str =
    "id, email, full_name, nit, points, tier_id, created_at, updated_at";

const ADDRESS_COLUMNS: &str =
    "id, customer_id, label, address_line, reference, latitude, longitude, created_at";

/// Repository for customer and address book reads
#[derive(Clone)]
pub struct CustomersRepository {
    pool: PgPool,
}

impl CustomersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Customer>, ApiError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Locking read used inside conversion and ledger transactions so two
    /// concurrent conversions cannot double-spend points
    pub async fn lock(
        &self,
        conn: &mut PgConnection,
        id: i32,
    ) -> Result<Option<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE id = $1 FOR UPDATE",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Persist a recomputed balance and tier inside the caller's transaction
    pub async fn update_points_and_tier(
        &self,
        conn: &mut PgConnection,
        id: i32,
        points: i32,
        tier_id: Option<i32>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE customers SET points = $1, tier_id = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(points)
        .bind(tier_id)
        .bind(id)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn find_address(&self, address_id: i32) -> Result<Option<CustomerAddress>, ApiError> {
        let address = sqlx::query_as::<_, CustomerAddress>(&format!(
            "SELECT {} FROM customer_addresses WHERE id = $1",
            ADDRESS_COLUMNS
        ))
        .bind(address_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    pub async fn list_addresses(&self, customer_id: i32) -> Result<Vec<CustomerAddress>, ApiError> {
        let addresses = sqlx::query_as::<_, CustomerAddress>(&format!(
            "SELECT {} FROM customer_addresses WHERE customer_id = $1 ORDER BY id",
            ADDRESS_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }
}
