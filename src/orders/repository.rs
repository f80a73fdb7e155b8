use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::cart::SelectedOption;
use crate::catalog::{ServiceType, Zone};
use crate::customers::AddressSnapshot;
use crate::orders::{
    ActorType, Order, OrderItem, OrderStatus, OrderStatusHistory, PaymentMethod, ProductSnapshot,
};

const ORDER_COLUMNS: &str = "id, customer_id, restaurant_id, cart_id, service_type, zone, \
     status, payment_method, driver_id, subtotal, discount_total, delivery_fee, tax, total, \
     points_earned, points_redeemed, delivery_address_snapshot, nit_snapshot, scheduled_for, \
     scheduled_pickup_time, cancellation_reason, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, combo_id, variant_id, \
     product_snapshot, quantity, selected_options, unit_price, regular_unit_price, subtotal";

const HISTORY_COLUMNS: &str =
    "id, order_id, previous_status, new_status, changed_by_type, notes, created_at";

/// Values frozen into a new order row at conversion time
#[derive(Debug)]
pub struct NewOrder {
    pub customer_id: i32,
    pub restaurant_id: i32,
    pub cart_id: Uuid,
    pub service_type: ServiceType,
    pub zone: Zone,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub points_earned: i32,
    pub points_redeemed: i32,
    pub delivery_address_snapshot: Option<AddressSnapshot>,
    pub nit_snapshot: Option<String>,
    pub scheduled_for: Option<chrono::DateTime<chrono::Utc>>,
    pub scheduled_pickup_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Values frozen into a new order line
#[derive(Debug)]
pub struct NewOrderItem {
    pub product_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub product_snapshot: ProductSnapshot,
    pub quantity: i32,
    pub selected_options: Vec<SelectedOption>,
    pub unit_price: Decimal,
    pub regular_unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Repository for order rows
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        order: NewOrder,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders
                (customer_id, restaurant_id, cart_id, service_type, zone, payment_method,
                 subtotal, discount_total, delivery_fee, tax, total, points_earned,
                 points_redeemed, delivery_address_snapshot, nit_snapshot, scheduled_for,
                 scheduled_pickup_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.customer_id)
        .bind(order.restaurant_id)
        .bind(order.cart_id)
        .bind(order.service_type)
        .bind(order.zone)
        .bind(order.payment_method)
        .bind(order.subtotal)
        .bind(order.discount_total)
        .bind(order.delivery_fee)
        .bind(order.tax)
        .bind(order.total)
        .bind(order.points_earned)
        .bind(order.points_redeemed)
        .bind(order.delivery_address_snapshot.map(Json))
        .bind(order.nit_snapshot)
        .bind(order.scheduled_for)
        .bind(order.scheduled_pickup_time)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Locking read for lifecycle mutations
    pub async fn lock(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn list_for_customer(&self, customer_id: i32) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Orders still moving through the pipeline
    pub async fn list_active_for_customer(
        &self,
        customer_id: i32,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE customer_id = $1
              AND status IN ('pending', 'confirmed', 'preparing', 'ready', 'out_for_delivery')
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update_status(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        new_status: OrderStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $1,
                cancellation_reason = COALESCE($2, cancellation_reason),
                updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(new_status)
        .bind(cancellation_reason)
        .bind(order_id)
        .fetch_one(conn)
        .await
    }

    pub async fn assign_driver(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        driver_id: Option<i32>,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET driver_id = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(driver_id)
        .bind(order_id)
        .fetch_one(conn)
        .await
    }

    /// Move the order to another restaurant, clearing any driver assignment
    pub async fn change_restaurant(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        restaurant_id: i32,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET restaurant_id = $1, driver_id = NULL, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(restaurant_id)
        .bind(order_id)
        .fetch_one(conn)
        .await
    }
}

/// Repository for order line rows
#[derive(Clone)]
pub struct OrderItemsRepository {
    pool: PgPool,
}

impl OrderItemsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        item: NewOrderItem,
    ) -> Result<OrderItem, sqlx::Error> {
        sqlx::query_as::<_, OrderItem>(&format!(
            r#"
            INSERT INTO order_items
                (order_id, product_id, combo_id, variant_id, product_snapshot, quantity,
                 selected_options, unit_price, regular_unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.combo_id)
        .bind(item.variant_id)
        .bind(Json(item.product_snapshot))
        .bind(item.quantity)
        .bind(Json(item.selected_options))
        .bind(item.unit_price)
        .bind(item.regular_unit_price)
        .bind(item.subtotal)
        .fetch_one(conn)
        .await
    }

    pub async fn list(&self, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
        sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY id",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }
}

/// Repository for the append-only status history
///
/// Rows are inserted and read, never updated or deleted.
#[derive(Clone)]
pub struct StatusHistoryRepository {
    pool: PgPool,
}

impl StatusHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        previous_status: Option<OrderStatus>,
        new_status: OrderStatus,
        changed_by_type: ActorType,
        notes: Option<&str>,
    ) -> Result<OrderStatusHistory, sqlx::Error> {
        sqlx::query_as::<_, OrderStatusHistory>(&format!(
            r#"
            INSERT INTO order_status_history
                (order_id, previous_status, new_status, changed_by_type, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            HISTORY_COLUMNS
        ))
        .bind(order_id)
        .bind(previous_status)
        .bind(new_status)
        .bind(changed_by_type)
        .bind(notes)
        .fetch_one(conn)
        .await
    }

    pub async fn list(&self, order_id: Uuid) -> Result<Vec<OrderStatusHistory>, sqlx::Error> {
        sqlx::query_as::<_, OrderStatusHistory>(&format!(
            r#"
            SELECT {}
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
            HISTORY_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }
}
