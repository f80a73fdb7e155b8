use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cart::SelectedOption;
use crate::catalog::{ServiceType, Zone};
use crate::customers::AddressSnapshot;
use crate::restaurants::Driver;

/// Order status enum representing the lifecycle of an order
///
/// `out_for_delivery` and `delivered` only occur on delivery orders;
/// `completed` closes pickup orders. `cancelled` and `refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// States that never accept a forward transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who performed a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Customer,
    Staff,
    Driver,
    System,
}

impl std::fmt::Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActorType::Customer => "customer",
            ActorType::Staff => "staff",
            ActorType::Driver => "driver",
            ActorType::System => "system",
        };
        write!(f, "{}", s)
    }
}

/// Payment method chosen at checkout; settlement is external
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

/// Immutable snapshot created from a cart; never re-priced after creation
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: i32,
    pub restaurant_id: i32,
    pub cart_id: Uuid,
    pub service_type: ServiceType,
    pub zone: Zone,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub driver_id: Option<i32>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub points_earned: i32,
    pub points_redeemed: i32,
    pub delivery_address_snapshot: Option<Json<AddressSnapshot>>,
    pub nit_snapshot: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Name and description at order time; the catalog row may change later
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSnapshot {
    pub name: String,
    pub description: String,
}

/// Immutable order line
#[derive(Debug, Clone, FromRow)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: Uuid,
    pub product_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub product_snapshot: Json<ProductSnapshot>,
    pub quantity: i32,
    pub selected_options: Json<Vec<SelectedOption>>,
    pub unit_price: Decimal,
    pub regular_unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Append-only status change record; never mutated or deleted
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct OrderStatusHistory {
    pub id: i32,
    pub order_id: Uuid,
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub changed_by_type: ActorType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for POST /api/orders
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub restaurant_id: i32,
    pub service_type: ServiceType,
    pub delivery_address_id: Option<i32>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub points_to_redeem: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub nit: Option<String>,
}

/// Request DTO for cancelling an order
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: String,
}

/// Request DTO for a staff status change
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub notes: Option<String>,
}

/// Request DTO for driver assignment
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDriverRequest {
    pub driver_id: i32,
}

/// Request DTO for moving an order to another restaurant
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRestaurantRequest {
    pub restaurant_id: i32,
}

/// Response DTO for an order line
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i32,
    pub product_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub product_snapshot: ProductSnapshot,
    pub quantity: i32,
    pub selected_options: Vec<SelectedOption>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            combo_id: item.combo_id,
            variant_id: item.variant_id,
            product_snapshot: item.product_snapshot.0,
            quantity: item.quantity,
            selected_options: item.selected_options.0,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        }
    }
}

/// Response DTO for an order with its lines
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub restaurant_id: i32,
    pub service_type: ServiceType,
    pub zone: Zone,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub driver_id: Option<i32>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub points_earned: i32,
    pub points_redeemed: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<AddressSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nit: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub scheduled_pickup_time: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_parts(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            restaurant_id: order.restaurant_id,
            service_type: order.service_type,
            zone: order.zone,
            status: order.status,
            payment_method: order.payment_method,
            driver_id: order.driver_id,
            subtotal: order.subtotal,
            discount_total: order.discount_total,
            delivery_fee: order.delivery_fee,
            tax: order.tax,
            total: order.total,
            points_earned: order.points_earned,
            points_redeemed: order.points_redeemed,
            delivery_address: order.delivery_address_snapshot.map(|j| j.0),
            nit: order.nit_snapshot,
            scheduled_for: order.scheduled_for,
            scheduled_pickup_time: order.scheduled_pickup_time,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Response DTO for GET /api/orders/{id}/track
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackOrderResponse {
    pub id: Uuid,
    pub status: OrderStatus,
    pub service_type: ServiceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<Driver>,
    pub history: Vec<OrderStatusHistory>,
}

/// Response DTO for POST /api/orders/{id}/reorder
#[derive(Debug, Serialize, ToSchema)]
pub struct ReorderResponse {
    pub cart: crate::cart::CartResponse,
    /// Lines that could not be re-added because their items are gone or
    /// inactive
    pub skipped: Vec<String>,
}
