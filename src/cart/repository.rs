use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::cart::{Cart, CartItem, SelectedOption};
use crate::catalog::{ServiceType, Zone};

const CART_COLUMNS: &str = "id, customer_id, restaurant_id, service_type, zone, \
     delivery_address_id, status, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, cart_id, product_id, combo_id, variant_id, quantity, \
     selected_options, unit_price, regular_unit_price, promotion_id, subtotal";

/// New line values captured at insert time
#[derive(Debug)]
pub struct NewCartItem {
    pub product_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    pub selected_options: Vec<SelectedOption>,
    pub unit_price: Decimal,
    pub regular_unit_price: Decimal,
    pub promotion_id: Option<i32>,
    pub subtotal: Decimal,
}

/// Repository for cart rows
#[derive(Clone)]
pub struct CartsRepository {
    pool: PgPool,
}

impl CartsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_active(&self, customer_id: i32) -> Result<Option<Cart>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            "SELECT {} FROM carts WHERE customer_id = $1 AND status = 'active'",
            CART_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, cart_id: Uuid) -> Result<Option<Cart>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            "SELECT {} FROM carts WHERE id = $1",
            CART_COLUMNS
        ))
        .bind(cart_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Locking read of the customer's active cart; every cart mutation and
    /// the conversion take this lock first
    pub async fn lock_active(
        &self,
        conn: &mut PgConnection,
        customer_id: i32,
    ) -> Result<Option<Cart>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            "SELECT {} FROM carts WHERE customer_id = $1 AND status = 'active' FOR UPDATE",
            CART_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn create_active(
        &self,
        conn: &mut PgConnection,
        customer_id: i32,
    ) -> Result<Cart, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            r#"
            INSERT INTO carts (customer_id)
            VALUES ($1)
            RETURNING {}
            "#,
            CART_COLUMNS
        ))
        .bind(customer_id)
        .fetch_one(conn)
        .await
    }

    /// Persist the cart's `{restaurant, service_type, zone, address}` context
    pub async fn update_context(
        &self,
        conn: &mut PgConnection,
        cart_id: Uuid,
        restaurant_id: Option<i32>,
        service_type: ServiceType,
        zone: Zone,
        delivery_address_id: Option<i32>,
    ) -> Result<Cart, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            r#"
            UPDATE carts
            SET restaurant_id = $1, service_type = $2, zone = $3,
                delivery_address_id = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            CART_COLUMNS
        ))
        .bind(restaurant_id)
        .bind(service_type)
        .bind(zone)
        .bind(delivery_address_id)
        .bind(cart_id)
        .fetch_one(conn)
        .await
    }

    /// Flip the cart to `converted`; returns the number of rows affected
    ///
    /// The `status = 'active'` guard makes conversion at-most-once under
    /// concurrency: the loser of the race affects zero rows.
    pub async fn mark_converted(
        &self,
        conn: &mut PgConnection,
        cart_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE carts SET status = 'converted', updated_at = NOW() \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(cart_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Repository for cart line rows
#[derive(Clone)]
pub struct CartItemsRepository {
    pool: PgPool,
}

impl CartItemsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, cart_id: Uuid) -> Result<Vec<CartItem>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {} FROM cart_items WHERE cart_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_in(
        &self,
        conn: &mut PgConnection,
        cart_id: Uuid,
    ) -> Result<Vec<CartItem>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {} FROM cart_items WHERE cart_id = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(cart_id)
        .fetch_all(conn)
        .await
    }

    pub async fn find_by_id(&self, item_id: i32) -> Result<Option<CartItem>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {} FROM cart_items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        cart_id: Uuid,
        item: NewCartItem,
    ) -> Result<CartItem, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(&format!(
            r#"
            INSERT INTO cart_items
                (cart_id, product_id, combo_id, variant_id, quantity, selected_options,
                 unit_price, regular_unit_price, promotion_id, subtotal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(cart_id)
        .bind(item.product_id)
        .bind(item.combo_id)
        .bind(item.variant_id)
        .bind(item.quantity)
        .bind(Json(item.selected_options))
        .bind(item.unit_price)
        .bind(item.regular_unit_price)
        .bind(item.promotion_id)
        .bind(item.subtotal)
        .fetch_one(conn)
        .await
    }

    pub async fn update_line(
        &self,
        conn: &mut PgConnection,
        item_id: i32,
        quantity: i32,
        selected_options: Vec<SelectedOption>,
        unit_price: Decimal,
        regular_unit_price: Decimal,
        promotion_id: Option<i32>,
        subtotal: Decimal,
    ) -> Result<CartItem, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(&format!(
            r#"
            UPDATE cart_items
            SET quantity = $1, selected_options = $2, unit_price = $3,
                regular_unit_price = $4, promotion_id = $5, subtotal = $6
            WHERE id = $7
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(quantity)
        .bind(Json(selected_options))
        .bind(unit_price)
        .bind(regular_unit_price)
        .bind(promotion_id)
        .bind(subtotal)
        .bind(item_id)
        .fetch_one(conn)
        .await
    }

    pub async fn delete(&self, conn: &mut PgConnection, item_id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_all(
        &self,
        conn: &mut PgConnection,
        cart_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }
}
